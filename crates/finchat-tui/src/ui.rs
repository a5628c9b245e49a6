//! UI rendering for the chat view.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use finchat_core::{Message, Sender};

use crate::state::UiState;

/// Main render function.
pub fn render(frame: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with connection indicator
            Constraint::Min(0),    // Conversation
            Constraint::Length(3), // Input bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state);
    render_messages(frame, chunks[1], state);
    render_input(frame, chunks[2], state);
}

fn render_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let indicator = if state.connected {
        Span::styled("connected", Style::default().fg(Color::Green))
    } else {
        Span::styled(
            "offline - messages will be queued",
            Style::default().fg(Color::Red),
        )
    };

    let mut spans = vec![Span::raw("Status: "), indicator];
    if let Some(status) = &state.status {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Finance Bot "),
    );
    frame.render_widget(header, area);
}

fn render_messages(frame: &mut Frame, area: Rect, state: &UiState) {
    // Bottom-anchored: show the most recent messages that fit.
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.messages.len().saturating_sub(visible);

    let items: Vec<ListItem> = state.messages[start..].iter().map(message_item).collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Conversation "),
    );
    frame.render_widget(list, area);
}

fn message_item(message: &Message) -> ListItem<'_> {
    let when = clock_time(&message.timestamp);
    let (label, style) = match message.sender {
        Sender::User => ("you", Style::default().fg(Color::Cyan)),
        Sender::Bot => ("bot", Style::default().fg(Color::White)),
    };

    let mut spans = vec![
        Span::styled(format!("[{when}] "), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{label}: "), style.add_modifier(Modifier::BOLD)),
        Span::raw(message.text.as_str()),
    ];
    if message.pending {
        spans.push(Span::styled(
            " (queued)",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn render_input(frame: &mut Frame, area: Rect, state: &UiState) {
    let input = Paragraph::new(state.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Enter send | ^L clear | ^X logout | Esc quit "),
    );
    frame.render_widget(input, area);
}

fn clock_time(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|_| "--:--".to_string())
}
