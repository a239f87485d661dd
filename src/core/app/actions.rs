use tracing::warn;

use super::App;
use crate::api::OutboundMessage;
use crate::core::capture::CaptureSession;
use crate::core::message::{Message, Notice};
use crate::core::session::{ConnectionStatus, SendParams, SessionEvent};

/// Discrete state transitions. Session events and UI inputs both arrive
/// here; the reducer is the only writer of shared app state.
pub enum AppAction {
    Connecting { attempt: u32 },
    Connected { models: Vec<String> },
    ConnectFailed { error: String },
    Disconnected,
    ModelsLoaded { models: Vec<String> },
    ModelsFailed { error: String },
    AppendChunk { text: String, stream_id: u64 },
    StreamErrored { message: String, stream_id: u64 },
    StreamCompleted { stream_id: u64 },
    SubmitMessage { text: String },
    CycleModel,
    ToggleCapture,
    Reconnect,
    RefreshModels,
    ScrollUp { lines: u16 },
    ScrollDown { lines: u16 },
}

impl From<SessionEvent> for AppAction {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Connecting { attempt } => AppAction::Connecting { attempt },
            SessionEvent::Connected { models } => AppAction::Connected { models },
            SessionEvent::ConnectFailed { error } => AppAction::ConnectFailed { error },
            SessionEvent::Disconnected => AppAction::Disconnected,
            SessionEvent::ModelsLoaded { models } => AppAction::ModelsLoaded { models },
            SessionEvent::ModelsFailed { error } => AppAction::ModelsFailed { error },
            SessionEvent::Chunk { text, stream_id } => AppAction::AppendChunk { text, stream_id },
            SessionEvent::StreamError { message, stream_id } => {
                AppAction::StreamErrored { message, stream_id }
            }
            SessionEvent::StreamEnd { stream_id } => AppAction::StreamCompleted { stream_id },
        }
    }
}

/// Terminal geometry at dispatch time, needed for scroll math.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppActionContext {
    pub term_width: u16,
    pub term_height: u16,
}

/// Side effects the event loop executes after the reducer runs.
pub enum AppCommand {
    SpawnSend(SendParams),
    Connect,
    RequestModels,
}

pub fn apply_action(app: &mut App, action: AppAction, ctx: AppActionContext) -> Option<AppCommand> {
    match action {
        AppAction::Connecting { attempt } => {
            app.session.status = ConnectionStatus::Connecting;
            if attempt > 1 {
                app.push_notice(Notice::warning(format!("reconnecting (attempt {attempt})")));
            }
            None
        }
        AppAction::Connected { models } => {
            app.session.status = ConnectionStatus::Connected;
            let count = models.len();
            app.session.install_catalog(models);
            app.push_notice(Notice::info(format!("connected ({count} models)")));
            None
        }
        AppAction::ConnectFailed { error } => {
            app.session.status = ConnectionStatus::Error;
            app.push_notice(Notice::error(format!("connection failed: {error}")));
            None
        }
        AppAction::Disconnected => {
            app.session.status = ConnectionStatus::Disconnected;
            app.session.is_streaming = false;
            None
        }
        AppAction::ModelsLoaded { models } => {
            let count = models.len();
            app.session.install_catalog(models);
            app.push_notice(Notice::info(format!("model catalog refreshed ({count})")));
            None
        }
        AppAction::ModelsFailed { error } => {
            app.push_notice(Notice::error(format!("model catalog request failed: {error}")));
            None
        }
        AppAction::AppendChunk { text, stream_id } => {
            if !app.session.is_current_stream(stream_id) {
                return None;
            }
            app.transcript.append_ai_chunk(&text);
            if app.auto_scroll {
                app.scroll_to_bottom(ctx.term_height);
            }
            None
        }
        AppAction::StreamErrored { message, stream_id } => {
            if app.session.is_current_stream(stream_id) {
                app.session.is_streaming = false;
                app.push_notice(Notice::error(message));
            }
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            if app.session.is_current_stream(stream_id) {
                app.session.is_streaming = false;
                if let Some(last) = app.transcript.last() {
                    if last.role.is_ai() {
                        if let Err(e) = app.logging.log_message(&last.content) {
                            warn!(error = %e, "failed to log response");
                        }
                    }
                }
            }
            None
        }
        AppAction::SubmitMessage { text } => handle_submit(app, text, ctx),
        AppAction::CycleModel => {
            let next = app.session.cycle_model().map(str::to_string);
            match next {
                Some(model) => app.push_notice(Notice::info(format!("model: {model}"))),
                None => app.push_notice(Notice::warning("no models available")),
            }
            None
        }
        AppAction::ToggleCapture => {
            match app.capture.take() {
                Some(session) => {
                    session.stop();
                    app.push_notice(Notice::info("capture off"));
                }
                None => match CaptureSession::acquire(app.capture_source()) {
                    Ok(session) => {
                        app.capture = Some(session);
                        app.push_notice(Notice::info("capture on"));
                    }
                    Err(e) => app.push_notice(Notice::error(format!("capture: {e}"))),
                },
            }
            None
        }
        AppAction::Reconnect => {
            if app.session.status == ConnectionStatus::Connecting {
                None
            } else {
                Some(AppCommand::Connect)
            }
        }
        AppAction::RefreshModels => Some(AppCommand::RequestModels),
        AppAction::ScrollUp { lines } => {
            app.auto_scroll = false;
            app.scroll_offset = app.scroll_offset.saturating_sub(lines);
            None
        }
        AppAction::ScrollDown { lines } => {
            let max = app.max_scroll_offset(ctx.term_height);
            app.scroll_offset = app.scroll_offset.saturating_add(lines).min(max);
            if app.scroll_offset >= max {
                app.auto_scroll = true;
            }
            None
        }
    }
}

fn handle_submit(app: &mut App, text: String, ctx: AppActionContext) -> Option<AppCommand> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    if !app.session.status.is_connected() {
        app.push_notice(Notice::error("not connected: message dropped"));
        return None;
    }

    let mut image = None;
    match app.capture.as_mut().map(|c| c.capture_attachment()) {
        Some(Ok(attachment)) => image = Some(attachment),
        Some(Err(e)) => app.push_notice(Notice::warning(format!(
            "capture failed, sending without image: {e}"
        ))),
        None => {}
    }

    let history = app.transcript.history();

    if let Err(e) = app.logging.log_message(&format!("You: {text}")) {
        warn!(error = %e, "failed to log message");
    }

    app.transcript.push(Message::user(text.clone(), image.clone()));
    let stream_id = app.session.begin_stream();
    if app.auto_scroll {
        app.scroll_to_bottom(ctx.term_height);
    }

    let envelope = OutboundMessage {
        text,
        model: app.session.active_model().to_string(),
        image_base64: image.map(|attachment| attachment.base64),
        history,
    };

    Some(AppCommand::SpawnSend(SendParams {
        envelope,
        stream_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::AppParams;
    use crate::core::capture::test_support::StubSource;
    use crate::core::capture::Track;
    use crate::core::message::{NoticeKind, Role};

    fn test_app() -> App {
        App::new(AppParams {
            model_override: None,
            log_file: None,
            capture_source: Box::new(StubSource::new(b"frame")),
        })
        .expect("app")
    }

    fn ctx() -> AppActionContext {
        AppActionContext {
            term_width: 80,
            term_height: 24,
        }
    }

    fn connect(app: &mut App, models: &[&str]) {
        let action = AppAction::Connected {
            models: models.iter().map(|m| m.to_string()).collect(),
        };
        apply_action(app, action, ctx());
    }

    #[test]
    fn catalog_without_selection_selects_first_model() {
        let mut app = test_app();
        connect(&mut app, &["m1", "m2"]);
        assert_eq!(app.session.status, ConnectionStatus::Connected);
        assert_eq!(app.session.selected_model.as_deref(), Some("m1"));
    }

    #[test]
    fn catalog_does_not_override_existing_selection() {
        let mut app = App::new(AppParams {
            model_override: Some("preferred".to_string()),
            log_file: None,
            capture_source: Box::new(StubSource::new(b"frame")),
        })
        .expect("app");
        connect(&mut app, &["m1", "m2"]);
        assert_eq!(app.session.selected_model.as_deref(), Some("preferred"));
    }

    #[test]
    fn submit_while_disconnected_drops_message_with_one_error() {
        let mut app = test_app();
        let command = apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "hello".to_string(),
            },
            ctx(),
        );
        assert!(command.is_none());
        assert!(app.transcript.is_empty());
        assert_eq!(app.notice_count(NoticeKind::Error), 1);
    }

    #[test]
    fn submit_while_connected_spawns_send_with_selected_model() {
        let mut app = test_app();
        connect(&mut app, &["m1", "m2"]);

        let command = apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "hello".to_string(),
            },
            ctx(),
        );

        let Some(AppCommand::SpawnSend(params)) = command else {
            panic!("expected a send command");
        };
        assert_eq!(params.envelope.model, "m1");
        assert_eq!(params.envelope.text, "hello");
        assert!(params.envelope.history.is_empty());
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript.entries()[0].role, Role::User);
    }

    #[test]
    fn selection_persists_across_sends() {
        let mut app = test_app();
        connect(&mut app, &["m1", "m2"]);
        apply_action(&mut app, AppAction::CycleModel, ctx());
        assert_eq!(app.session.selected_model.as_deref(), Some("m2"));

        for text in ["first", "second"] {
            let command = apply_action(
                &mut app,
                AppAction::SubmitMessage {
                    text: text.to_string(),
                },
                ctx(),
            );
            let Some(AppCommand::SpawnSend(params)) = command else {
                panic!("expected a send command");
            };
            assert_eq!(params.envelope.model, "m2");
        }
    }

    #[test]
    fn chunks_fold_into_one_ai_message() {
        let mut app = test_app();
        connect(&mut app, &["m1"]);
        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "hi".to_string(),
            },
            ctx(),
        );
        let stream_id = app.session.current_stream_id;

        for fragment in ["He", "llo"] {
            apply_action(
                &mut app,
                AppAction::AppendChunk {
                    text: fragment.to_string(),
                    stream_id,
                },
                ctx(),
            );
        }

        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.entries()[0].role, Role::User);
        assert_eq!(app.transcript.entries()[0].content, "hi");
        assert_eq!(app.transcript.entries()[1].role, Role::Ai);
        assert_eq!(app.transcript.entries()[1].content, "Hello");
    }

    #[test]
    fn stale_stream_chunks_are_dropped() {
        let mut app = test_app();
        connect(&mut app, &["m1"]);
        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "hi".to_string(),
            },
            ctx(),
        );
        let first_stream = app.session.current_stream_id;
        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "again".to_string(),
            },
            ctx(),
        );

        apply_action(
            &mut app,
            AppAction::AppendChunk {
                text: "late".to_string(),
                stream_id: first_stream,
            },
            ctx(),
        );

        // Only the two user messages; the stale fragment never landed.
        assert_eq!(app.transcript.len(), 2);
        assert!(app.transcript.entries().iter().all(|m| m.role == Role::User));
    }

    #[test]
    fn stream_completion_clears_streaming_flag() {
        let mut app = test_app();
        connect(&mut app, &["m1"]);
        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "hi".to_string(),
            },
            ctx(),
        );
        let stream_id = app.session.current_stream_id;
        assert!(app.session.is_streaming);

        apply_action(&mut app, AppAction::StreamCompleted { stream_id }, ctx());
        assert!(!app.session.is_streaming);
    }

    #[test]
    fn toggle_capture_stops_all_tracks_on_disable() {
        let mut app = test_app();
        apply_action(&mut app, AppAction::ToggleCapture, ctx());
        assert!(app.capture_enabled());

        apply_action(&mut app, AppAction::ToggleCapture, ctx());
        assert!(!app.capture_enabled());

        apply_action(&mut app, AppAction::ToggleCapture, ctx());
        assert!(app.capture_enabled());
    }

    #[test]
    fn capture_tracks_observed_stopped_after_toggle_off() {
        let source = StubSource::new(b"frame");
        let opened = source.opened_tracks.clone();
        let mut app = App::new(AppParams {
            model_override: None,
            log_file: None,
            capture_source: Box::new(source),
        })
        .expect("app");

        apply_action(&mut app, AppAction::ToggleCapture, ctx());
        assert!(opened.lock().unwrap().iter().all(Track::is_live));

        apply_action(&mut app, AppAction::ToggleCapture, ctx());
        assert!(opened.lock().unwrap().iter().all(|t| !t.is_live()));
    }

    #[test]
    fn submit_with_capture_attaches_image() {
        let mut app = test_app();
        connect(&mut app, &["m1"]);
        apply_action(&mut app, AppAction::ToggleCapture, ctx());

        let command = apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "look at this".to_string(),
            },
            ctx(),
        );

        let Some(AppCommand::SpawnSend(params)) = command else {
            panic!("expected a send command");
        };
        assert!(params.envelope.image_base64.is_some());
        assert!(app.transcript.entries()[0].image.is_some());
    }

    #[test]
    fn history_carries_prior_turns_but_not_current_text() {
        let mut app = test_app();
        connect(&mut app, &["m1"]);
        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "first".to_string(),
            },
            ctx(),
        );
        let stream_id = app.session.current_stream_id;
        apply_action(
            &mut app,
            AppAction::AppendChunk {
                text: "reply".to_string(),
                stream_id,
            },
            ctx(),
        );

        let command = apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "second".to_string(),
            },
            ctx(),
        );
        let Some(AppCommand::SpawnSend(params)) = command else {
            panic!("expected a send command");
        };
        assert_eq!(params.envelope.history.len(), 2);
        assert_eq!(params.envelope.history[0].content, "first");
        assert_eq!(params.envelope.history[1].content, "reply");
        assert_eq!(params.envelope.text, "second");
    }

    #[test]
    fn connect_failure_sets_error_status_and_notice() {
        let mut app = test_app();
        apply_action(
            &mut app,
            AppAction::ConnectFailed {
                error: "refused".to_string(),
            },
            ctx(),
        );
        assert_eq!(app.session.status, ConnectionStatus::Error);
        assert_eq!(app.notice_count(NoticeKind::Error), 1);
    }

    #[test]
    fn reconnect_is_ignored_while_already_connecting() {
        let mut app = test_app();
        apply_action(&mut app, AppAction::Connecting { attempt: 1 }, ctx());
        assert!(apply_action(&mut app, AppAction::Reconnect, ctx()).is_none());

        apply_action(&mut app, AppAction::Disconnected, ctx());
        assert!(matches!(
            apply_action(&mut app, AppAction::Reconnect, ctx()),
            Some(AppCommand::Connect)
        ));
    }
}
