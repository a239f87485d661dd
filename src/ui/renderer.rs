//! Terminal rendering: transcript pane, input box, status bar.

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::app::App;
use crate::core::message::NoticeKind;
use crate::core::session::ConnectionStatus;

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let lines = app.build_display_lines();

    // Account for the title row.
    let viewport = chunks[0].height.saturating_sub(1);
    let total_lines = lines.len() as u16;
    let max_offset = total_lines.saturating_sub(viewport);
    let scroll_offset = app.scroll_offset.min(max_offset);

    let transcript = Paragraph::new(lines)
        .block(Block::default().title("Atelier"))
        .wrap(Wrap { trim: true })
        .scroll((scroll_offset, 0));
    f.render_widget(transcript, chunks[0]);

    let input_title = if app.session.is_streaming {
        "Message (streaming… Enter to send, Ctrl+C to quit)"
    } else {
        "Message (Enter to send, Ctrl+C to quit)"
    };
    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[1]);

    f.render_widget(status_line(app), chunks[2]);

    f.set_cursor_position((
        chunks[1].x + 1 + UnicodeWidthStr::width(app.input.as_str()) as u16,
        chunks[1].y + 1,
    ));
}

fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Connecting => Color::Yellow,
        ConnectionStatus::Error => Color::Red,
        ConnectionStatus::Disconnected => Color::DarkGray,
    }
}

fn notice_color(kind: NoticeKind) -> Color {
    match kind {
        NoticeKind::Info => Color::DarkGray,
        NoticeKind::Warning => Color::Yellow,
        NoticeKind::Error => Color::Red,
    }
}

fn status_line(app: &App) -> Paragraph<'_> {
    let status = app.session.status;
    let mut spans = vec![
        Span::styled(
            "● ",
            Style::default()
                .fg(status_color(status))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status.as_str(), Style::default().fg(status_color(status))),
        Span::raw(" · "),
        Span::styled(
            app.session.active_model().to_string(),
            Style::default().fg(Color::Cyan),
        ),
    ];
    if app.capture_enabled() {
        spans.push(Span::raw(" · "));
        spans.push(Span::styled("capture", Style::default().fg(Color::Magenta)));
    }
    if let Some(notice) = app.last_notice() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            notice.text.as_str(),
            Style::default().fg(notice_color(notice.kind)),
        ));
    }
    Paragraph::new(Line::from(spans))
}
