//! Model listing functionality
//!
//! This module handles listing the models a backend reports, outside the
//! full-screen interface.

use std::error::Error;

use crate::core::config::Config;
use crate::core::constants::CONNECT_TIMEOUT;
use crate::core::session::fetch_models;

pub async fn list_models(endpoint: &str, config: &Config) -> Result<(), Box<dyn Error>> {
    println!("🤖 Available models at {endpoint}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(default_model) = &config.default_model {
        println!("🎯 Default model: {default_model} (from config)");
        println!();
    }

    let client = reqwest::Client::new();
    let response = match tokio::time::timeout(CONNECT_TIMEOUT, fetch_models(&client, endpoint)).await
    {
        Ok(result) => result.map_err(|e| e as Box<dyn Error>)?,
        Err(_) => {
            return Err(format!(
                "backend did not answer within {}s",
                CONNECT_TIMEOUT.as_secs()
            )
            .into())
        }
    };

    if response.models.is_empty() {
        println!("No models reported by the backend.");
    } else {
        println!("Found {} models:", response.models.len());
        println!();
        for model in &response.models {
            println!("  • {model}");
        }
    }

    Ok(())
}
