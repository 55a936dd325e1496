#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end pipeline runs against mock completion and embedding endpoints
// Run with: cargo test --test integration_pipeline

use prompt_graph::completion::CompletionRequest;
use prompt_graph::config::{ApiKey, Config, OpenAiConfig};
use prompt_graph::graph::{Edge, build_graph};
use prompt_graph::pipeline::{CompletionPipeline, PipelineError};
use prompt_graph::storage::CsvEmbeddingStore;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, base_dir: &std::path::Path) -> Config {
    Config {
        openai: OpenAiConfig {
            base_url: format!("{}/v1", server.uri()),
            api_key: ApiKey::new("integration-key"),
            ..OpenAiConfig::default()
        },
        ..Config::with_base_dir(base_dir)
    }
}

fn start_request() -> CompletionRequest {
    CompletionRequest {
        prompt: "Start".to_string(),
        freshness: 0.9,
        frequency_penalty: 0.1,
        max_tokens: 120,
        model_id: "text-davinci-003".to_string(),
    }
}

async fn mount_embedding(server: &MockServer, input: &str, vector: &[f32]) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_json(json!({
            "input": [input],
            "model": "text-embedding-ada-002"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": vector, "index": 0}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn completion_is_sanitized_embedded_and_recorded() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    Mock::given(method("POST"))
        .and(path("/v1/engines/text-davinci-003/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "choices": [{"text": "A\n\n#B", "index": 0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Newlines are flattened before reaching the embedding endpoint.
    mount_embedding(&server, "Start", &[0.1]).await;
    mount_embedding(&server, "A B", &[0.2]).await;
    mount_embedding(&server, "Start A B", &[0.3]).await;

    let config = test_config(&server, temp_dir.path());
    let pipeline = CompletionPipeline::from_config(&config).expect("pipeline should build");

    let text = pipeline
        .generate(&start_request())
        .expect("pipeline should succeed");
    assert_eq!(text, "A\nB");

    let store = CsvEmbeddingStore::new(config.embeddings_path());
    assert_eq!(store.len().expect("len"), 1);
    let table = fs::read_to_string(store.path()).expect("table should exist");
    assert!(table.ends_with("\"[0.1]\",\"[0.2]\",\"[0.3]\",\"Start A\\nB\"\n"));

    let graph = build_graph("Start", &text);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(
        graph.edges,
        vec![Edge { from: 1, to: 2 }, Edge { from: 2, to: 3 }]
    );
}

#[tokio::test]
async fn repeated_prompts_append_new_rows() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    Mock::given(method("POST"))
        .and(path("/v1/engines/text-davinci-003/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"choices": [{"text": "same"}]})),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"embedding": [1.0]}]})),
        )
        .expect(6)
        .mount(&server)
        .await;

    let config = test_config(&server, temp_dir.path());
    let pipeline = CompletionPipeline::from_config(&config).expect("pipeline should build");

    pipeline
        .generate(&start_request())
        .expect("first run should succeed");
    pipeline
        .generate(&start_request())
        .expect("second run should succeed");

    assert_eq!(
        CsvEmbeddingStore::new(config.embeddings_path())
            .len()
            .expect("len"),
        2
    );
}

#[tokio::test]
async fn upstream_failure_leaves_no_trace() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    Mock::given(method("POST"))
        .and(path("/v1/engines/text-davinci-003/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, temp_dir.path());
    let pipeline = CompletionPipeline::from_config(&config).expect("pipeline should build");

    let result = pipeline.generate(&start_request());
    assert!(matches!(result, Err(PipelineError::Generation)));
    assert!(!config.embeddings_path().exists());
}

#[tokio::test]
async fn embedding_outage_fails_the_request() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    Mock::given(method("POST"))
        .and(path("/v1/engines/text-davinci-003/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"choices": [{"text": "ok"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, temp_dir.path());
    let pipeline = CompletionPipeline::from_config(&config).expect("pipeline should build");

    let result = pipeline.generate(&start_request());
    assert!(matches!(result, Err(PipelineError::Embedding(_))));
    assert!(!config.embeddings_path().exists());
}

#[test]
fn pipeline_requires_credentials() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::with_base_dir(temp_dir.path());

    assert!(CompletionPipeline::from_config(&config).is_err());
}
