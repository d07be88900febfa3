use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chat_rag::commands::{ask, doctor, ingest_text, list_records, read_input, reset_store, search};
use chat_rag::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "chat-rag")]
#[command(about = "Retrieval-augmented chat over your own text with a local Ollama server")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector database
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, chunking and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Split text into chunks, embed them and store them
    Ingest {
        /// File to ingest; reads stdin when neither a file nor --text is given
        file: Option<PathBuf>,
        /// Text to ingest directly
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Sentences per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Sentences shared by consecutive chunks
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Ask a question, answered from the stored text
    Ask {
        question: String,
        /// Send the question to the chat model without retrieved context
        #[arg(long)]
        no_retrieval: bool,
        /// Number of stored chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the stored chunks closest to a question
    Search {
        question: String,
        /// Number of stored chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// List every stored chunk
    List,
    /// Delete all stored chunks
    Reset {
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Check the Ollama connection and configured models
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().context("Failed to locate the configuration directory")?,
    };

    if let Commands::Config { show } = cli.command {
        if show {
            show_config(&Config::load(&config_dir)?)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Ingest {
            file,
            text,
            chunk_size,
            overlap,
        } => {
            let input = read_input(file.as_deref(), text)?;
            ingest_text(&config, &input, chunk_size, overlap).await?;
        }
        Commands::Ask {
            question,
            no_retrieval,
            top_k,
        } => {
            ask(&config, &question, !no_retrieval, top_k).await?;
        }
        Commands::Search { question, top_k } => {
            search(&config, &question, top_k).await?;
        }
        Commands::List => {
            list_records(&config).await?;
        }
        Commands::Reset { yes } => {
            reset_store(&config, yes).await?;
        }
        Commands::Doctor => {
            doctor(&config).await?;
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
        let cli = Cli::try_parse_from(["chat-rag", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::List));
            assert!(parsed.config_dir.is_none());
        }
    }

    #[test]
    fn ingest_with_file_and_window() {
        let cli = Cli::try_parse_from([
            "chat-rag",
            "ingest",
            "notes.txt",
            "--chunk-size",
            "2",
            "--overlap",
            "1",
        ]);

        let Ok(parsed) = cli else {
            panic!("ingest should parse");
        };
        let Commands::Ingest {
            file,
            text,
            chunk_size,
            overlap,
        } = parsed.command
        else {
            panic!("expected ingest command");
        };

        assert_eq!(file, Some(PathBuf::from("notes.txt")));
        assert_eq!(text, None);
        assert_eq!(chunk_size, Some(2));
        assert_eq!(overlap, Some(1));
    }

    #[test]
    fn ingest_file_conflicts_with_text() {
        let cli = Cli::try_parse_from(["chat-rag", "ingest", "notes.txt", "--text", "inline"]);

        let Err(err) = cli else {
            panic!("file and --text must conflict");
        };
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn ask_without_retrieval() {
        let cli = Cli::try_parse_from(["chat-rag", "ask", "Why?", "--no-retrieval", "--top-k", "5"]);

        let Ok(parsed) = cli else {
            panic!("ask should parse");
        };
        let Commands::Ask {
            question,
            no_retrieval,
            top_k,
        } = parsed.command
        else {
            panic!("expected ask command");
        };

        assert_eq!(question, "Why?");
        assert!(no_retrieval);
        assert_eq!(top_k, Some(5));
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from(["chat-rag", "search", "birds", "--config-dir", "/tmp/rag"]);

        let Ok(parsed) = cli else {
            panic!("search should parse");
        };
        assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/rag")));
        assert!(matches!(parsed.command, Commands::Search { .. }));
    }

    #[test]
    fn reset_yes_flag() {
        let cli = Cli::try_parse_from(["chat-rag", "reset", "-y"]);
        assert!(matches!(
            cli.map(|parsed| parsed.command),
            Ok(Commands::Reset { yes: true })
        ));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["chat-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["chat-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["chat-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
