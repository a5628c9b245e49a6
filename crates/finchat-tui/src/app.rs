//! Application state and main event loop.

use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use finchat_client::{SessionCommand, SessionUpdate};

use crate::state::UiState;
use crate::ui;

/// Main application with UI state and channel handles.
pub struct App {
    /// Current UI state snapshot for rendering.
    state: UiState,

    /// Receiver for updates from the session.
    updates: mpsc::Receiver<SessionUpdate>,

    /// Sender for commands to the session.
    commands: mpsc::Sender<SessionCommand>,

    /// Set when the user asked to log out rather than just quit.
    logout: bool,
}

impl App {
    /// Create a new application instance with channel handles.
    pub fn new(
        updates: mpsc::Receiver<SessionUpdate>,
        commands: mpsc::Sender<SessionCommand>,
    ) -> Self {
        Self {
            state: UiState::default(),
            updates,
            commands,
            logout: false,
        }
    }

    /// Run the main event loop.
    ///
    /// This runs on the main thread and handles:
    /// - Drawing the UI
    /// - Processing keyboard input
    /// - Receiving updates from the session
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> std::io::Result<()> {
        loop {
            terminal.draw(|frame| ui::render(frame, &self.state))?;

            // Poll terminal events (non-blocking with short timeout)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press
                        && self.handle_key(key.code, key.modifiers)
                    {
                        break; // quit requested
                    }
                }
            }

            // Drain session updates (non-blocking)
            while let Ok(update) = self.updates.try_recv() {
                self.apply_update(update);
            }
        }

        let _ = self.commands.blocking_send(SessionCommand::Shutdown);
        Ok(())
    }

    /// Whether the user quit via logout.
    pub fn logout_requested(&self) -> bool {
        self.logout
    }

    /// Apply an update from the session to the UI state.
    fn apply_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::History(messages) => {
                self.state.messages = messages;
                self.state.status = None;
            }
            SessionUpdate::Connected(connected) => {
                self.state.connected = connected;
                if connected {
                    self.state.status = None;
                }
            }
            SessionUpdate::ReplyOutstanding => {
                self.state.status = Some("Waiting for the bot's reply...".to_string());
            }
            SessionUpdate::ConnectError(reason) => {
                self.state.status = Some(format!("Connection failed: {reason}"));
            }
        }
    }

    /// Handle a key press.
    ///
    /// Returns true if the app should quit.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match code {
                KeyCode::Char('c') => return true,
                KeyCode::Char('l') => {
                    let _ = self.commands.blocking_send(SessionCommand::ClearHistory);
                }
                KeyCode::Char('x') => {
                    self.logout = true;
                    return true;
                }
                _ => {}
            }
            return false;
        }

        match code {
            KeyCode::Esc => return true,
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.state.input);
                if !text.trim().is_empty() {
                    let _ = self.commands.blocking_send(SessionCommand::Send(text));
                }
            }
            KeyCode::Backspace => {
                self.state.input.pop();
            }
            KeyCode::Char(c) => {
                self.state.input.push(c);
            }
            _ => {}
        }
        false
    }
}
