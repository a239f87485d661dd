//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod model_list;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::model_list::list_models;
use crate::core::capture::{FileFrameSource, FrameSource};
use crate::core::config::Config;
use crate::core::constants::DEFAULT_ENDPOINT;
use crate::ui::chat_loop::{run_chat, ChatParams};

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "A terminal chat studio for streaming model backends")]
#[command(
    long_about = "Atelier is a full-screen terminal chat interface that connects to a \
streaming model backend for real-time conversations. Responses stream into the \
transcript as they are generated.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Tab               Cycle through the model catalog\n\
  Ctrl+G            Toggle image capture on/off\n\
  Ctrl+R            Reconnect to the backend\n\
  Ctrl+L            Refresh the model catalog\n\
  Up/Down           Scroll through chat history\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat, or list available models if no model specified
    #[arg(short = 'm', long, global = true, value_name = "MODEL", num_args = 0..=1, default_missing_value = "")]
    pub model: Option<String>,

    /// Backend endpoint URL (overrides the config)
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Enable logging of the conversation to the specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List the models the backend reports
    Models,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

/// Diagnostics go to a file named by ATELIER_TRACE, never to the terminal
/// the UI owns.
fn init_tracing() {
    let Ok(path) = std::env::var("ATELIER_TRACE") else {
        return;
    };
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("atelier=debug"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        Err(e) => eprintln!("could not open trace file {path}: {e}"),
    }
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| config.endpoint.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Set { key, value } => {
            let mut config = config;
            let value = value.map(|v| v.join(" ")).filter(|v| !v.is_empty());
            match (key.as_str(), value) {
                ("endpoint", Some(val)) => {
                    config.endpoint = Some(val.clone());
                    config.save()?;
                    println!("✅ Set endpoint to: {val}");
                }
                ("default-model", Some(val)) => {
                    config.default_model = Some(val.clone());
                    config.save()?;
                    println!("✅ Set default-model to: {val}");
                }
                ("capture-source", Some(val)) => {
                    config.capture_source = Some(PathBuf::from(&val));
                    config.save()?;
                    println!("✅ Set capture-source to: {val}");
                }
                ("endpoint" | "default-model" | "capture-source", None) => {
                    config.print_all();
                }
                (other, _) => {
                    eprintln!("❌ Unknown config key: {other}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = config;
            match key.as_str() {
                "endpoint" => config.endpoint = None,
                "default-model" => config.default_model = None,
                "capture-source" => config.capture_source = None,
                other => {
                    eprintln!("❌ Unknown config key: {other}");
                    std::process::exit(1);
                }
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Models => list_models(&endpoint, &config).await,
        Commands::Chat => match args.model.as_deref() {
            Some("") => {
                // -m was provided without a value, list available models
                list_models(&endpoint, &config).await
            }
            model => {
                let model = model
                    .map(str::to_string)
                    .or_else(|| config.default_model.clone());
                let capture_source: Box<dyn FrameSource> =
                    Box::new(FileFrameSource::new(config.capture_source.clone()));
                run_chat(ChatParams {
                    endpoint,
                    model,
                    log_file: args.log,
                    capture_source,
                })
                .await
            }
        },
    }
}
