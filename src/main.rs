use anyhow::Result;
use clap::{Parser, Subcommand};
use log::warn;
use pitchdeck::config::Config;
use pitchdeck::llm::create_llm;
use pitchdeck::server::{serve, AppState};
use pitchdeck::workflow::WorkflowManager;
use std::path::PathBuf;
use std::sync::Arc;

/// Turn a film script or treatment into a ten-slide pitch deck.
#[derive(Parser, Debug)]
#[command(name = "pitchdeck", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Address to bind, overrides config.yml
        #[arg(long)]
        bind: Option<String>,
    },
    /// Build a deck from a local document without the wizard
    Build {
        /// Script, treatment or synopsis to analyze
        document: PathBuf,
        /// Output directory, overrides config.yml
        #[arg(long)]
        out: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please check 'config.yml' for syntax errors.");
            return Err(e);
        }
    };
    config.apply_env();

    if !config.has_credentials() {
        warn!(
            "No API key configured for provider '{}'; model calls will fail until one is set",
            config.llm.provider
        );
    }

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let llm = create_llm(&config.llm)?;
            let bind_address = bind.unwrap_or_else(|| config.bind_address.clone());
            serve(
                AppState::new(Arc::from(llm)),
                &bind_address,
                config.max_upload_bytes(),
            )
            .await?;
        }
        Command::Build { document, out } => {
            if let Some(out) = out {
                config.output_folder = out;
            }
            let llm = create_llm(&config.llm)?;
            let manager = WorkflowManager::new(config, llm);
            manager.build_deck(&document).await?;
        }
    }

    Ok(())
}
