// Completion module
// Request shaping and response extraction for the text-completion endpoint

pub mod sanitize;


use anyhow::{Context, anyhow};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ApiKey, Config};

pub use sanitize::sanitize;

/// One prompt as submitted by the front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Sampling temperature, typically 0.0 to 2.0
    #[serde(deserialize_with = "lenient_f64")]
    pub freshness: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub frequency_penalty: f64,
    #[serde(deserialize_with = "lenient_u32")]
    pub max_tokens: u32,
    pub model_id: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("max_tokens must be a positive integer")]
    ZeroMaxTokens,
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    #[error("model_id cannot be empty")]
    EmptyModel,
    #[error("model_id contains characters not allowed in a URL path: {0}")]
    InvalidModel(String),
}

impl CompletionRequest {
    #[inline]
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.max_tokens == 0 {
            return Err(RequestError::ZeroMaxTokens);
        }
        if !self.freshness.is_finite() {
            return Err(RequestError::NonFinite("freshness"));
        }
        if !self.frequency_penalty.is_finite() {
            return Err(RequestError::NonFinite("frequency_penalty"));
        }
        if self.model_id.trim().is_empty() {
            return Err(RequestError::EmptyModel);
        }
        if self
            .model_id
            .chars()
            .any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace())
        {
            return Err(RequestError::InvalidModel(self.model_id.clone()));
        }
        Ok(())
    }
}

/// Failures of the completion call as reported to callers. Details are logged
/// but never carried in the message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Failed to generate text")]
    Generation,
    #[error("Invalid response from OpenAI")]
    InvalidResponse,
}

/// Entry for the model selector of the front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
struct CompletionPayload<'a> {
    prompt: &'a str,
    temperature: f64,
    frequency_penalty: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Blocking client for the `/engines/{model}/completions` endpoint
#[derive(Debug, Clone)]
pub struct CompletionClient {
    base_url: String,
    api_key: ApiKey,
    agent: ureq::Agent,
}

impl CompletionClient {
    #[inline]
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let api_key = config
            .require_api_key()
            .context("Completion client needs a provider credential")?
            .clone();

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.openai.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn completion_url(&self, model_id: &str) -> String {
        format!("{}/engines/{}/completions", self.base_url, model_id)
    }

    /// Send `request` and return the raw `choices[0].text`
    #[inline]
    pub fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let url = self.completion_url(&request.model_id);
        let payload = CompletionPayload {
            prompt: &request.prompt,
            temperature: request.freshness,
            frequency_penalty: request.frequency_penalty,
            max_tokens: request.max_tokens,
        };
        let payload_json = serde_json::to_string(&payload).map_err(|e| {
            warn!("Failed to serialize completion request: {}", e);
            CompletionError::Generation
        })?;

        debug!("Requesting completion from {}", url);

        let response_text = match self
            .agent
            .post(url.as_str())
            .header("Authorization", self.api_key.bearer())
            .header("Content-Type", "application/json")
            .send(&payload_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
        {
            Ok(text) => text,
            Err(ureq::Error::StatusCode(status)) => {
                warn!("Completion endpoint returned HTTP {}", status);
                return Err(CompletionError::Generation);
            }
            Err(e) => {
                warn!("Completion request to {} failed: {}", url, e);
                return Err(CompletionError::Generation);
            }
        };

        extract_text(&response_text)
    }

    /// Models the credential can use, sorted by id
    #[inline]
    pub fn list_models(&self) -> anyhow::Result<Vec<ModelOption>> {
        let url = format!("{}/models", self.base_url);

        let response_text = self
            .agent
            .get(url.as_str())
            .header("Authorization", self.api_key.bearer())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| anyhow!("Failed to list models from {}: {}", url, e))?;

        let models: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        let mut options: Vec<ModelOption> = models
            .data
            .into_iter()
            .map(|model| ModelOption {
                label: model.id.clone(),
                value: model.id,
            })
            .collect();
        options.sort_by(|a, b| a.value.cmp(&b.value));

        debug!("Found {} models", options.len());
        Ok(options)
    }
}

/// Read `choices[0].text` from a completion response body
#[inline]
pub fn extract_text(body: &str) -> Result<String, CompletionError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        warn!("Completion response is not JSON: {}", e);
        CompletionError::InvalidResponse
    })?;

    value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            warn!("Completion response has no choices[0].text");
            CompletionError::InvalidResponse
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::<f64>::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::<f64>::deserialize(deserializer)? {
        NumberOrString::Number(value) => whole_u32(value)
            .ok_or_else(|| de::Error::custom(format!("expected a whole number, got {value}"))),
        NumberOrString::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

/// `50` and `50.0` are both accepted; fractions and negatives are not
fn whole_u32(value: f64) -> Option<u32> {
    (value.is_finite() && value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value))
        .then_some(value as u32)
}
