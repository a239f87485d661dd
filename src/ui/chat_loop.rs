//! Main chat event loop.
//!
//! One process-wide session client is created here and injected into the
//! loop; it connects on startup and disconnects on teardown. All state
//! mutation happens through the action reducer: inbound session events and
//! key presses become [`AppAction`]s, and the commands the reducer returns
//! are executed against the session client.

use std::{error::Error, io, time::Duration};

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::core::app::{apply_action, App, AppAction, AppActionContext, AppCommand, AppParams};
use crate::core::capture::FrameSource;
use crate::core::session::{SessionClient, SessionEvent};
use crate::ui::renderer::ui;

type ChatTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub struct ChatParams {
    pub endpoint: String,
    pub model: Option<String>,
    pub log_file: Option<String>,
    pub capture_source: Box<dyn FrameSource>,
}

pub async fn run_chat(params: ChatParams) -> Result<(), Box<dyn Error>> {
    let ChatParams {
        endpoint,
        model,
        log_file,
        capture_source,
    } = params;

    let mut app = App::new(AppParams {
        model_override: model,
        log_file,
        capture_source,
    })?;

    let (mut session, mut events) = SessionClient::new(endpoint);
    session.connect();

    let mut terminal = setup_terminal()?;
    let result = run_event_loop(&mut terminal, &mut app, &mut session, &mut events);

    session.disconnect();
    app.release_capture();
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<ChatTerminal, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout)).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_event_loop(
    terminal: &mut ChatTerminal,
    app: &mut App,
    session: &mut SessionClient,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let size = terminal.size()?;
        let ctx = AppActionContext {
            term_width: size.width,
            term_height: size.height,
        };

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = action_for_key(app, key) {
                        dispatch(app, session, action, ctx);
                    }
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            dispatch(app, session, AppAction::from(event), ctx);
        }

        if app.exit_requested {
            return Ok(());
        }
    }
}

fn dispatch(app: &mut App, session: &mut SessionClient, action: AppAction, ctx: AppActionContext) {
    if let Some(command) = apply_action(app, action, ctx) {
        match command {
            AppCommand::SpawnSend(params) => session.spawn_send(params),
            AppCommand::Connect => session.connect(),
            AppCommand::RequestModels => session.request_models(),
        }
    }
}

/// Map a key press to an action. Plain editing keys mutate the input buffer
/// directly; everything that touches shared state goes through the reducer.
fn action_for_key(app: &mut App, key: KeyEvent) -> Option<AppAction> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_requested = true;
            None
        }
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(AppAction::Reconnect)
        }
        KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(AppAction::ToggleCapture)
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(AppAction::RefreshModels)
        }
        KeyCode::Tab => Some(AppAction::CycleModel),
        KeyCode::Enter => {
            let text = std::mem::take(&mut app.input);
            Some(AppAction::SubmitMessage { text })
        }
        KeyCode::Esc => {
            app.input.clear();
            None
        }
        KeyCode::Backspace => {
            app.input.pop();
            None
        }
        KeyCode::Up => Some(AppAction::ScrollUp { lines: 1 }),
        KeyCode::Down => Some(AppAction::ScrollDown { lines: 1 }),
        KeyCode::PageUp => Some(AppAction::ScrollUp { lines: 10 }),
        KeyCode::PageDown => Some(AppAction::ScrollDown { lines: 10 }),
        KeyCode::Char(c) => {
            app.input.push(c);
            None
        }
        _ => None,
    }
}
