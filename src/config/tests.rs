use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn partial_config_with_defaults() {
    let partial_toml = r#"
        [server]
        port = 9000
    "#;

    let config: Config = toml::from_str(partial_toml).expect("should parse toml correctly");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.openai, OpenAiConfig::default());
    assert_eq!(config.storage, StorageConfig::default());
}

#[test]
fn complete_valid_config() {
    let valid_toml = r#"
        [openai]
        base_url = "http://localhost:8080/v1"
        embedding_model = "text-embedding-3-small"
        timeout_seconds = 30

        [server]
        host = "0.0.0.0"
        port = 5000

        [storage]
        embeddings_file = "data/embeddings.csv"
        log_file = "prompt-graph.log"
    "#;

    let config: Config = toml::from_str(valid_toml).expect("should parse toml correctly");
    assert!(config.validate().is_ok());
    assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
    assert_eq!(config.server.address(), "0.0.0.0:5000");
}

#[test]
fn invalid_toml_handling() {
    let invalid_toml = r#"
        [server
        port = "invalid_port"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}

#[test]
fn init_config_writes_defaults_once() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_dir = temp_dir.path().join(".prompt-graph");

    init_config(&config_dir).expect("should write defaults");
    let config_path = config_dir.join("config.toml");
    assert!(config_path.exists());

    fs::write(&config_path, "[server]\nport = 7000\n").expect("should overwrite config");
    init_config(&config_dir).expect("should leave existing config alone");

    let content = fs::read_to_string(&config_path).expect("should read config");
    assert!(content.contains("7000"));
}
