//! Main application state and event loop.

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::screens::{HistoryScreen, Screen, ScreenAction};
use crate::services::{CaptureController, ClipboardHistoryStore, ClipboardProvider};

/// Application state.
pub struct App {
    should_quit: bool,

    history_screen: HistoryScreen,

    // Polls the clipboard while the terminal is unfocused
    capture: CaptureController,
}

impl App {
    /// Create a new application instance.
    pub fn new(
        config: Arc<Config>,
        store: Arc<ClipboardHistoryStore>,
        clipboard: Arc<dyn ClipboardProvider>,
    ) -> Self {
        let capture = CaptureController::new(store.clone(), clipboard.clone(), &config.capture);
        let history_screen = HistoryScreen::new(store, clipboard, config);

        Self {
            should_quit: false,
            history_screen,
            capture,
        }
    }

    /// Run the application.
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Load initial data
        if let Err(e) = self.history_screen.reload().await {
            self.history_screen
                .notify_error(format!("Failed to load history: {}", e));
        }

        // Main event loop
        let result = self.event_loop(&mut terminal).await;

        self.capture.stop_polling();

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableFocusChange
        )?;
        terminal.show_cursor()?;

        result
    }

    /// Main event loop.
    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            self.history_screen.refresh_if_changed().await;
            self.history_screen.tick();

            // Draw UI
            terminal.draw(|f| self.draw(f))?;

            // Poll for events with timeout
            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if key.modifiers == KeyModifiers::CONTROL
                            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
                        {
                            self.should_quit = true;
                        } else {
                            let action = self.history_screen.handle_key(key).await;
                            self.handle_action(action);
                        }
                    }
                    Event::FocusLost => self.capture.on_focus_lost(),
                    Event::FocusGained => self.capture.on_focus_gained(),
                    _ => {}
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_action(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::None => {}
            ScreenAction::Quit => self.should_quit = true,
            ScreenAction::OpenLink(url) => match open::that_detached(&url) {
                Ok(()) => {
                    info!(%url, "opened link");
                    self.history_screen.notify("Opened in browser");
                }
                Err(e) => {
                    warn!(error = %e, "failed to open link");
                    self.history_screen
                        .notify_error(format!("Failed to open browser: {}", e));
                }
            },
        }
    }

    /// Draw the UI.
    fn draw(&mut self, f: &mut ratatui::Frame) {
        use ratatui::layout::{Constraint, Direction, Layout};
        use ratatui::style::{Color, Style};
        use ratatui::text::{Line, Span};
        use ratatui::widgets::Paragraph;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),    // Main content
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.history_screen.draw(f, chunks[0]);

        let capture_state = if self.capture.is_polling() {
            Span::styled("● watching", Style::default().fg(Color::Green))
        } else {
            Span::styled("○ paused", Style::default().fg(Color::DarkGray))
        };

        let mut spans = vec![Span::raw(" "), capture_state];
        for (key, label) in [
            ("j/k", " Nav"),
            ("Enter", " Copy"),
            ("d", " Delete"),
            ("D", " Clear"),
            ("o", " Open"),
            ("q", " Quit"),
        ] {
            spans.push(Span::raw(" │ "));
            spans.push(Span::styled(key, Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(label, Style::default().fg(Color::Gray)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
    }
}
