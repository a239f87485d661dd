//! Shared constants used across the application

use std::time::Duration;

/// Backend endpoint used when neither the CLI nor the config names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";

/// Model identifier used when the catalog is empty and nothing was selected.
pub const FALLBACK_MODEL: &str = "gemini-1.5-pro-preview-0409";

/// Maximum connect attempts before reporting failure.
pub const CONNECT_ATTEMPTS: u32 = 5;

/// Fixed delay between connect attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Per-attempt timeout for the connect probe and catalog requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
