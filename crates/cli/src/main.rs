//! DocQA
//!
//! Ask questions about the documents in a local folder, from the terminal
//! or a browser.

mod commands;

use clap::{Parser, ValueEnum};
use docqa_core::{config::AppConfig, logging, AppResult};
use docqa_knowledge::{build_answerer, build_store, QuestionAnswerer};
use std::sync::Arc;

/// Document question answering over PDF, DOCX and TXT files
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Document question answering over local files", long_about = None)]
#[command(version)]
struct Cli {
    /// Front end to start
    #[arg(short, long, value_enum, default_value_t = Mode::Cli)]
    mode: Mode,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Interactive prompt in the terminal
    Cli,
    /// Chat page served over HTTP
    Web,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Environment file and configuration are loaded before anything else
    let config = AppConfig::load()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("DocQA starting in {:?} mode", cli.mode);
    if let Some(env_file) = &config.env_file {
        tracing::debug!("Loaded environment from {:?}", env_file);
    }
    if let Some(config_file) = &config.config_file {
        tracing::debug!("Loaded configuration from {:?}", config_file);
    }

    config.validate()?;

    for (name, profile) in config.llm.models.iter() {
        tracing::debug!(
            "Model {}: {} (temperature {}, streaming {})",
            name,
            profile.model,
            profile.temperature,
            profile.streaming
        );
    }

    // Ingestion or index failures end the process here
    let store = Arc::new(build_store(&config).await?);
    let answerer: Arc<dyn QuestionAnswerer> = Arc::new(build_answerer(&config, store)?);

    let result = match cli.mode {
        Mode::Cli => {
            let color = !config.no_color && logging::supports_color();
            commands::repl::run_stdio(answerer.as_ref(), color).await
        }
        Mode::Web => commands::web::serve(&config.web, answerer).await,
    };

    match &result {
        Ok(_) => tracing::info!("DocQA stopped"),
        Err(e) => tracing::error!("DocQA failed: {}", e),
    }

    result
}
