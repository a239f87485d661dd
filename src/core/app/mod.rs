//! Application state: one state object owning the transcript, the session
//! connection status, the model catalog, and the capture toggle. Inbound
//! session events and UI inputs become [`AppAction`]s applied by the reducer
//! in [`actions`]; nothing else mutates shared state.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::capture::{CaptureSession, FrameSource};
use crate::core::constants::FALLBACK_MODEL;
use crate::core::message::{Notice, NoticeKind, Transcript};
use crate::core::session::ConnectionStatus;
use crate::logging::SessionLog;

pub mod actions;

pub use actions::{apply_action, AppAction, AppActionContext, AppCommand};

/// Session-side state owned by the app and mutated only by the reducer.
#[derive(Debug, Default)]
pub struct SessionState {
    pub status: ConnectionStatus,
    pub models: Vec<String>,
    pub selected_model: Option<String>,
    pub current_stream_id: u64,
    pub is_streaming: bool,
    stream_counter: u64,
}

impl SessionState {
    /// Replace the catalog. If nothing is selected yet, the first returned
    /// model becomes the selection.
    pub fn install_catalog(&mut self, models: Vec<String>) {
        self.models = models;
        if self.selected_model.is_none() {
            self.selected_model = self.models.first().cloned();
        }
    }

    /// The model identifier sent with outbound messages.
    pub fn active_model(&self) -> &str {
        self.selected_model.as_deref().unwrap_or(FALLBACK_MODEL)
    }

    /// Advance the selection to the next catalog entry, wrapping around.
    pub fn cycle_model(&mut self) -> Option<&str> {
        if self.models.is_empty() {
            return None;
        }
        let next = match self
            .selected_model
            .as_deref()
            .and_then(|current| self.models.iter().position(|m| m == current))
        {
            Some(index) => (index + 1) % self.models.len(),
            None => 0,
        };
        self.selected_model = Some(self.models[next].clone());
        self.selected_model.as_deref()
    }

    /// Start a new response stream, superseding any prior one. Chunks tagged
    /// with an older stream id are dropped by the reducer, which is what
    /// keeps at most one AI message streaming at a time.
    pub fn begin_stream(&mut self) -> u64 {
        self.stream_counter += 1;
        self.current_stream_id = self.stream_counter;
        self.is_streaming = true;
        self.current_stream_id
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }
}

pub struct AppParams {
    pub model_override: Option<String>,
    pub log_file: Option<String>,
    pub capture_source: Box<dyn FrameSource>,
}

pub struct App {
    pub transcript: Transcript,
    pub input: String,
    pub notices: Vec<Notice>,
    pub session: SessionState,
    pub logging: SessionLog,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub exit_requested: bool,
    pub capture: Option<CaptureSession>,
    capture_source: Box<dyn FrameSource>,
}

impl App {
    pub fn new(params: AppParams) -> Result<Self, Box<dyn std::error::Error>> {
        let AppParams {
            model_override,
            log_file,
            capture_source,
        } = params;

        let session = SessionState {
            selected_model: model_override,
            ..SessionState::default()
        };

        Ok(App {
            transcript: Transcript::default(),
            input: String::new(),
            notices: Vec::new(),
            session,
            logging: SessionLog::new(log_file)?,
            scroll_offset: 0,
            auto_scroll: true,
            exit_requested: false,
            capture: None,
            capture_source,
        })
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture.is_some()
    }

    /// Stop any live capture stream, releasing every track.
    pub fn release_capture(&mut self) {
        if let Some(session) = self.capture.take() {
            session.stop();
        }
    }

    pub(crate) fn capture_source(&self) -> &dyn FrameSource {
        self.capture_source.as_ref()
    }

    /// Transcript rendered as display lines: user turns prefixed and
    /// colored, AI turns plain, a spacer line between entries.
    pub fn build_display_lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();

        for msg in self.transcript.entries() {
            if msg.role.is_ai() {
                for content_line in msg.content.lines() {
                    if content_line.trim().is_empty() {
                        lines.push(Line::from(""));
                    } else {
                        lines.push(Line::from(Span::styled(
                            content_line,
                            Style::default().fg(Color::White),
                        )));
                    }
                }
            } else {
                let mut spans = vec![
                    Span::styled(
                        "You: ",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.content.as_str(), Style::default().fg(Color::Cyan)),
                ];
                if msg.image.is_some() {
                    spans.push(Span::styled(
                        " [image]",
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                lines.push(Line::from(spans));
            }
            lines.push(Line::from(""));
        }

        lines
    }

    /// Transcript viewport rows for a given terminal height: the input box
    /// takes three rows, the status bar one, the title one.
    pub fn transcript_viewport_height(term_height: u16) -> u16 {
        term_height.saturating_sub(5)
    }

    pub fn max_scroll_offset(&self, term_height: u16) -> u16 {
        let total = self.build_display_lines().len() as u16;
        total.saturating_sub(Self::transcript_viewport_height(term_height))
    }

    pub fn scroll_to_bottom(&mut self, term_height: u16) {
        self.scroll_offset = self.max_scroll_offset(term_height);
    }

    /// Count of notices with the given severity, used by tests to pin the
    /// exactly-one-notification property.
    pub fn notice_count(&self, kind: NoticeKind) -> usize {
        self.notices.iter().filter(|n| n.kind == kind).count()
    }
}
