use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::completion::CompletionRequest;
use crate::config::Config;
use crate::graph::build_graph;
use crate::pipeline::CompletionPipeline;
use crate::server;
use crate::storage::CsvEmbeddingStore;

/// Start the HTTP server
#[inline]
pub async fn serve_http(config: &Config) -> Result<()> {
    config
        .require_api_key()
        .context("Cannot serve completions without a provider credential")?;
    server::serve(config).await
}

/// Run a single prompt through the pipeline and print the completion
#[inline]
pub fn generate_once(config: &Config, request: &CompletionRequest) -> Result<()> {
    request.validate().context("Invalid completion request")?;

    let pipeline = CompletionPipeline::from_config(config)?;
    let text = pipeline.generate(request)?;
    println!("{}", text);
    Ok(())
}

/// Print the conversation graph for `text` as JSON. Reads stdin when no text
/// is given.
#[inline]
pub fn print_graph(prompt: &str, text: Option<String>) -> Result<()> {
    let body = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read completion text from stdin")?;
            buffer.trim_end_matches('\n').to_string()
        }
    };

    let graph = build_graph(prompt, &body);
    let json = serde_json::to_string_pretty(&graph).context("Failed to serialize graph")?;
    println!("{}", json);
    Ok(())
}

/// Show where data lives and how many embedding rows have been recorded
#[inline]
pub fn show_status(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let store = CsvEmbeddingStore::new(config.embeddings_path());
    let rows = store.len().context("Failed to read embeddings table")?;

    info!("Status requested for {}", config_dir.display());
    println!("Embeddings table: {}", store.path().display());
    println!("  Recorded rows: {}", rows);
    println!("Log file: {}", config.log_path().display());
    println!(
        "Provider credential: {}",
        if config.openai.api_key.is_some() {
            "set"
        } else {
            "missing"
        }
    );
    Ok(())
}
