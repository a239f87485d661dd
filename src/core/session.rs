//! Chat session client: one live connection to the backend and all message
//! traffic over it.
//!
//! The client is the IO half of the session. It spawns background tasks for
//! the connect probe, catalog requests, and response streams; every outcome
//! comes back to the event loop as a [`SessionEvent`] over one unbounded
//! channel. Tasks never touch app state directly.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ModelsResponse, OutboundMessage, StreamChunk};
use crate::core::constants::{CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, CONNECT_TIMEOUT};
use crate::utils::url::construct_api_url;

/// Connection status of the session, driven entirely by backend connection
/// events, never directly by user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

/// Events emitted by the session's background tasks.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connecting { attempt: u32 },
    Connected { models: Vec<String> },
    ConnectFailed { error: String },
    Disconnected,
    ModelsLoaded { models: Vec<String> },
    ModelsFailed { error: String },
    Chunk { text: String, stream_id: u64 },
    StreamError { message: String, stream_id: u64 },
    StreamEnd { stream_id: u64 },
}

/// Parameters for one outbound send.
pub struct SendParams {
    pub envelope: OutboundMessage,
    pub stream_id: u64,
}

pub struct SessionClient {
    client: reqwest::Client,
    endpoint: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    stream_cancel: CancellationToken,
}

impl SessionClient {
    pub fn new(endpoint: String) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                client: reqwest::Client::new(),
                endpoint,
                events: tx,
                stream_cancel: CancellationToken::new(),
            },
            rx,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Establish the session: a bounded-retry probe with a fixed backoff
    /// delay and a per-attempt timeout. The probe doubles as the initial
    /// catalog request, so a successful connect installs the model list
    /// immediately.
    pub fn connect(&self) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let mut last_error = String::new();
            for attempt in 1..=CONNECT_ATTEMPTS {
                let _ = tx.send(SessionEvent::Connecting { attempt });
                debug!(attempt, endpoint = %endpoint, "connecting to backend");
                match tokio::time::timeout(CONNECT_TIMEOUT, fetch_models(&client, &endpoint)).await
                {
                    Ok(Ok(response)) => {
                        debug!(models = response.models.len(), "connected");
                        let _ = tx.send(SessionEvent::Connected {
                            models: response.models,
                        });
                        return;
                    }
                    Ok(Err(e)) => {
                        warn!(attempt, error = %e, "connect attempt failed");
                        last_error = e.to_string();
                    }
                    Err(_) => {
                        warn!(attempt, "connect attempt timed out");
                        last_error =
                            format!("timed out after {}s", CONNECT_TIMEOUT.as_secs());
                    }
                }
                if attempt < CONNECT_ATTEMPTS {
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
            let _ = tx.send(SessionEvent::ConnectFailed { error: last_error });
        });
    }

    /// Re-request the model catalog from the backend.
    pub fn request_models(&self) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let event =
                match tokio::time::timeout(CONNECT_TIMEOUT, fetch_models(&client, &endpoint)).await
                {
                    Ok(Ok(response)) => SessionEvent::ModelsLoaded {
                        models: response.models,
                    },
                    Ok(Err(e)) => SessionEvent::ModelsFailed {
                        error: e.to_string(),
                    },
                    Err(_) => SessionEvent::ModelsFailed {
                        error: format!("timed out after {}s", CONNECT_TIMEOUT.as_secs()),
                    },
                };
            let _ = tx.send(event);
        });
    }

    /// Send one message envelope and stream the response back as events. Any
    /// stream still in flight is cancelled first; the transcript-side stream
    /// id guard drops whatever it already produced.
    pub fn spawn_send(&mut self, params: SendParams) {
        self.stream_cancel.cancel();
        self.stream_cancel = CancellationToken::new();

        let SendParams {
            envelope,
            stream_id,
        } = params;
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let tx = self.events.clone();
        let cancel_token = self.stream_cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = async {
                    let url = construct_api_url(&endpoint, "messages");
                    match client
                        .post(url)
                        .header("Content-Type", "application/json")
                        .json(&envelope)
                        .send()
                        .await
                    {
                        Ok(response) => {
                            if !response.status().is_success() {
                                let error_text = response
                                    .text()
                                    .await
                                    .unwrap_or_else(|_| "<no body>".to_string());
                                let _ = tx.send(SessionEvent::StreamError {
                                    message: format_backend_error(&error_text),
                                    stream_id,
                                });
                                let _ = tx.send(SessionEvent::StreamEnd { stream_id });
                                return;
                            }

                            let mut stream = response.bytes_stream();
                            let mut buffer: Vec<u8> = Vec::new();

                            while let Some(chunk) = stream.next().await {
                                if cancel_token.is_cancelled() {
                                    return;
                                }

                                if let Ok(chunk_bytes) = chunk {
                                    buffer.extend_from_slice(&chunk_bytes);

                                    while let Some(newline_pos) = memchr(b'\n', &buffer) {
                                        let line_str = match std::str::from_utf8(&buffer[..newline_pos]) {
                                            Ok(s) => s.trim(),
                                            Err(e) => {
                                                warn!(error = %e, "invalid UTF-8 in stream");
                                                buffer.drain(..=newline_pos);
                                                continue;
                                            }
                                        };

                                        let should_end = process_sse_line(line_str, &tx, stream_id);
                                        buffer.drain(..=newline_pos);
                                        if should_end {
                                            return;
                                        }
                                    }
                                }
                            }

                            // Stream ended naturally (connection closed).
                            let _ = tx.send(SessionEvent::StreamEnd { stream_id });
                        }
                        Err(e) => {
                            let _ = tx.send(SessionEvent::StreamError {
                                message: format_backend_error(&e.to_string()),
                                stream_id,
                            });
                            let _ = tx.send(SessionEvent::StreamEnd { stream_id });
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    /// Release the channel. Idempotent; safe whether or not a connection is
    /// open.
    pub fn disconnect(&mut self) {
        self.stream_cancel.cancel();
        self.stream_cancel = CancellationToken::new();
        let _ = self.events.send(SessionEvent::Disconnected);
    }
}

pub async fn fetch_models(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<ModelsResponse, Box<dyn std::error::Error + Send + Sync>> {
    let models_url = construct_api_url(endpoint, "models");
    let response = client
        .get(models_url)
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(format!("catalog request failed with status {status}: {error_text}").into());
    }

    let models_response = response.json::<ModelsResponse>().await?;
    Ok(models_response)
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(
    payload: &str,
    tx: &mpsc::UnboundedSender<SessionEvent>,
    stream_id: u64,
) -> bool {
    if payload == "[DONE]" {
        let _ = tx.send(SessionEvent::StreamEnd { stream_id });
        return true;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            let _ = tx.send(SessionEvent::Chunk {
                text: chunk.text,
                stream_id,
            });
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }

            let _ = tx.send(SessionEvent::StreamError {
                message: format_backend_error(payload),
                stream_id,
            });
            let _ = tx.send(SessionEvent::StreamEnd { stream_id });
            true
        }
    }
}

fn process_sse_line(
    line: &str,
    tx: &mpsc::UnboundedSender<SessionEvent>,
    stream_id: u64,
) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx, stream_id))
        .unwrap_or(false)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Collapse a raw backend error body to a one-line notice.
pub fn format_backend_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "backend error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("backend error: {summary}");
            }
        }
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("backend error: {collapsed}")
}
