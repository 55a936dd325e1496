use clap::{Parser, Subcommand};
use prompt_graph::commands::{generate_once, print_graph, serve_http, show_status};
use prompt_graph::completion::CompletionRequest;
use prompt_graph::config::{Config, get_config_dir, init_config, show_config};
use prompt_graph::graph::DEFAULT_ROOT_LABEL;
use prompt_graph::{RelayError, Result, logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prompt-graph")]
#[command(about = "Relay prompts to a completion API, record embeddings and draw the conversation graph")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.prompt-graph)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Send one prompt through the pipeline and print the completion
    Generate {
        /// Prompt text
        prompt: String,
        /// Completion model id
        #[arg(long)]
        model: String,
        /// Sampling temperature
        #[arg(long, default_value_t = 0.7)]
        freshness: f64,
        /// Frequency penalty
        #[arg(long, default_value_t = 0.0)]
        frequency_penalty: f64,
        /// Maximum number of tokens to generate
        #[arg(long, default_value_t = 256)]
        max_tokens: u32,
    },
    /// Print the conversation graph for a completion as JSON
    Graph {
        /// Completion text; read from stdin when omitted
        text: Option<String>,
        /// Label of the root node
        #[arg(long, default_value = DEFAULT_ROOT_LABEL)]
        prompt: String,
    },
    /// Show the current configuration
    Config {
        /// Write the default configuration file instead
        #[arg(long)]
        init: bool,
    },
    /// Show the embeddings table and log locations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| RelayError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Serve => {
            let config = Config::load(&config_dir)?;
            logging::init_with_file(&config.log_path())?;
            serve_http(&config).await?;
        }
        Commands::Generate {
            prompt,
            model,
            freshness,
            frequency_penalty,
            max_tokens,
        } => {
            let config = Config::load(&config_dir)?;
            logging::init_with_file(&config.log_path())?;
            let request = CompletionRequest {
                prompt,
                freshness,
                frequency_penalty,
                max_tokens,
                model_id: model,
            };
            tokio::task::spawn_blocking(move || generate_once(&config, &request))
                .await
                .map_err(|e| RelayError::Other(e.into()))??;
        }
        Commands::Graph { text, prompt } => {
            logging::init_stderr();
            print_graph(&prompt, text)?;
        }
        Commands::Config { init } => {
            logging::init_stderr();
            if init {
                init_config(&config_dir)?;
            } else {
                show_config(&config_dir)?;
            }
        }
        Commands::Status => {
            logging::init_stderr();
            show_status(&config_dir)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["prompt-graph", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Serve));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn generate_command_defaults() {
        let cli = Cli::try_parse_from(["prompt-graph", "generate", "Hello", "--model", "davinci"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Generate {
                prompt,
                model,
                freshness,
                frequency_penalty,
                max_tokens,
            } = parsed.command
            {
                assert_eq!(prompt, "Hello");
                assert_eq!(model, "davinci");
                assert!((freshness - 0.7).abs() < f64::EPSILON);
                assert!(frequency_penalty.abs() < f64::EPSILON);
                assert_eq!(max_tokens, 256);
            } else {
                panic!("expected generate command");
            }
        }
    }

    #[test]
    fn generate_requires_model() {
        let cli = Cli::try_parse_from(["prompt-graph", "generate", "Hello"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn graph_command_with_global_config_dir() {
        let cli = Cli::try_parse_from([
            "prompt-graph",
            "graph",
            "A\nB",
            "--config-dir",
            "/tmp/pg",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/pg")));
            if let Commands::Graph { text, prompt } = parsed.command {
                assert_eq!(text.as_deref(), Some("A\nB"));
                assert_eq!(prompt, "Start");
            } else {
                panic!("expected graph command");
            }
        }
    }

    #[test]
    fn config_init_flag() {
        let cli = Cli::try_parse_from(["prompt-graph", "config", "--init"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Config { init: true }));
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["prompt-graph", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }
}
