//! History screen - the clipboard history popup.

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use ratatui_garnish::{shadow::HalfShadow, GarnishableStatefulWidget, GarnishableWidget, Padding};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::warn;

use crate::config::Config;
use crate::models::Link;
use crate::services::{ClipboardHistoryStore, ClipboardProvider};

use super::{Screen, ScreenAction};

/// Transient feedback message shown at the bottom of the screen.
#[derive(Debug, Clone)]
pub struct Snackbar {
    pub message: String,
    pub is_error: bool,
    shown_at: Instant,
}

/// Popup listing the clipboard history.
pub struct HistoryScreen {
    store: Arc<ClipboardHistoryStore>,
    clipboard: Arc<dyn ClipboardProvider>,
    config: Arc<Config>,
    changes: watch::Receiver<u64>,

    // UI state
    list_state: ListState,
    confirm_clear: bool,
    snackbar: Option<Snackbar>,
    // Last reload could not read the stored history
    load_failed: bool,

    // Cached data
    entries: Vec<String>,
}

impl HistoryScreen {
    /// Create a new history screen.
    pub fn new(
        store: Arc<ClipboardHistoryStore>,
        clipboard: Arc<dyn ClipboardProvider>,
        config: Arc<Config>,
    ) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            clipboard,
            config,
            changes,
            list_state: ListState::default(),
            confirm_clear: false,
            snackbar: None,
            load_failed: false,
            entries: Vec::new(),
        }
    }

    /// Reload entries from the store.
    pub async fn reload(&mut self) -> anyhow::Result<()> {
        self.changes.borrow_and_update();
        self.entries = match self.store.read_all().await {
            Ok(entries) => entries,
            Err(e) => {
                self.load_failed = true;
                return Err(e.into());
            }
        };
        self.load_failed = false;

        let selected = match self.list_state.selected() {
            _ if self.entries.is_empty() => None,
            Some(i) => Some(i.min(self.entries.len() - 1)),
            None => Some(0),
        };
        self.list_state.select(selected);
        Ok(())
    }

    /// Reload if the store changed since the last reload.
    pub async fn refresh_if_changed(&mut self) {
        if !self.changes.has_changed().unwrap_or(false) {
            return;
        }
        if let Err(e) = self.reload().await {
            warn!(error = %e, "failed to reload history");
            self.notify_error(format!("Failed to load history: {}", e));
        }
    }

    /// Drop the snackbar once it has been visible long enough.
    pub fn tick(&mut self) {
        let ttl = self.config.display.snackbar_duration();
        if self
            .snackbar
            .as_ref()
            .is_some_and(|s| s.shown_at.elapsed() >= ttl)
        {
            self.snackbar = None;
        }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[cfg(test)]
    pub fn snackbar(&self) -> Option<&Snackbar> {
        self.snackbar.as_ref()
    }

    /// Whether a dialog is capturing all keys.
    #[cfg(test)]
    pub fn is_modal(&self) -> bool {
        self.confirm_clear
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.snackbar = Some(Snackbar {
            message: message.into(),
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.snackbar = Some(Snackbar {
            message: message.into(),
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    fn selected_entry(&self) -> Option<&String> {
        self.list_state.selected().and_then(|i| self.entries.get(i))
    }

    fn move_up(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            let new_index = if selected == 0 {
                self.entries.len().saturating_sub(1)
            } else {
                selected - 1
            };
            self.list_state.select(Some(new_index));
        }
    }

    fn move_down(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            let new_index = if selected >= self.entries.len().saturating_sub(1) {
                0
            } else {
                selected + 1
            };
            self.list_state.select(Some(new_index));
        }
    }

    /// Copy the selected entry back to the clipboard and make it the most recent.
    async fn copy_selected(&mut self) {
        let Some(text) = self.selected_entry().cloned() else {
            return;
        };

        if let Err(e) = self.clipboard.write_text(&text).await {
            warn!(error = %e, "copy to clipboard failed");
            self.notify_error(format!("Copy failed: {}", e));
            return;
        }

        match self.store.promote(&text).await {
            Ok(_) => {
                self.list_state.select(Some(0));
                self.after_mutation("Copied to clipboard").await;
            }
            Err(e) => self.notify_error(format!("Copied, but history update failed: {}", e)),
        }
    }

    async fn delete_selected(&mut self) {
        let Some(text) = self.selected_entry().cloned() else {
            return;
        };

        match self.store.remove(&text).await {
            Ok(_) => self.after_mutation("Entry deleted").await,
            Err(e) => self.notify_error(format!("Delete failed: {}", e)),
        }
    }

    async fn clear_all(&mut self) {
        match self.store.clear().await {
            Ok(()) => self.after_mutation("History cleared").await,
            Err(e) => self.notify_error(format!("Clear failed: {}", e)),
        }
    }

    async fn after_mutation(&mut self, message: &str) {
        match self.reload().await {
            Ok(()) => self.notify(message),
            Err(e) => self.notify_error(format!("Failed to load history: {}", e)),
        }
    }

    fn draw_list(&mut self, f: &mut Frame, area: Rect) {
        let max_chars = self.config.display.preview_chars;
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut spans = vec![
                    Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(preview_line(entry, max_chars), Style::default().fg(Color::White)),
                ];
                if let Some(link) = Link::detect(entry) {
                    spans.push(Span::styled(
                        format!("  [{}]", link.label()),
                        Style::default().fg(Color::Magenta),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("History ({})", item_count_label(self.entries.len())))
            .border_style(Style::default().fg(Color::Cyan));

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("► ");

        let garnished = GarnishableStatefulWidget::garnish(list, HalfShadow::default());
        f.render_stateful_widget(garnished, area, &mut self.list_state);
    }

    fn draw_empty(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("History ({})", item_count_label(0)));
        let text = "Nothing copied yet\n\nCopy text in another window: the clipboard is\nwatched while this window is unfocused.";
        let empty = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(empty, area);
    }

    fn draw_preview(&self, f: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        if let Some(entry) = self.selected_entry() {
            for line in entry.lines() {
                lines.push(Line::raw(line.to_string()));
            }
            if let Some(link) = Link::detect(entry) {
                lines.push(Line::raw(""));
                lines.push(Line::from(vec![
                    Span::styled("link      ", Style::default().fg(Color::DarkGray)),
                    Span::styled(link.label(), Style::default().fg(Color::Magenta)),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("thumbnail ", Style::default().fg(Color::DarkGray)),
                    Span::raw(link.thumbnail_url()),
                ]));
            }
        }

        let preview = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Preview"))
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: false })
            .garnish(Padding::horizontal(1));
        f.render_widget(preview, area);
    }

    fn draw_snackbar(&self, f: &mut Frame, area: Rect) {
        let Some(snackbar) = &self.snackbar else {
            return;
        };
        let width = (snackbar.message.chars().count() as u16 + 4).min(area.width);
        let rect = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + area.height.saturating_sub(3),
            width,
            height: 3.min(area.height),
        };
        let color = if snackbar.is_error { Color::Red } else { Color::Green };
        let bar = Paragraph::new(snackbar.message.as_str())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)))
            .style(Style::default().fg(color));
        f.render_widget(Clear, rect);
        f.render_widget(bar, rect);
    }

    fn draw_confirm(&self, f: &mut Frame, area: Rect) {
        let rect = centered_rect(44, 5, area);
        let question = if self.load_failed {
            "Delete unreadable history?".to_string()
        } else {
            format!("Delete all {}?", item_count_label(self.entries.len()))
        };
        let dialog = Paragraph::new(vec![
            Line::raw(question),
            Line::raw(""),
            Line::from(vec![
                Span::styled("y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::raw(" Delete   "),
                Span::styled("n", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(" Cancel"),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Clear history")
                .border_style(Style::default().fg(Color::Red)),
        )
        .garnish(HalfShadow::default());
        f.render_widget(Clear, rect);
        f.render_widget(dialog, rect);
    }
}

#[async_trait]
impl Screen for HistoryScreen {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // History list
                Constraint::Percentage(40), // Preview
            ])
            .split(area);

        if self.entries.is_empty() {
            self.draw_empty(f, chunks[0]);
        } else {
            self.draw_list(f, chunks[0]);
        }
        self.draw_preview(f, chunks[1]);

        if self.confirm_clear {
            self.draw_confirm(f, area);
        }
        self.draw_snackbar(f, area);
    }

    async fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        if self.confirm_clear {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_clear = false;
                    self.clear_all().await;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_clear = false;
                }
                _ => {}
            }
            return ScreenAction::None;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_down(),
            KeyCode::Enter | KeyCode::Char('y') => self.copy_selected().await,
            KeyCode::Delete | KeyCode::Char('d') => self.delete_selected().await,
            KeyCode::Char('D') => {
                if !self.entries.is_empty() || self.load_failed {
                    self.confirm_clear = true;
                }
            }
            KeyCode::Char('o') => {
                if let Some(link) = self.selected_entry().and_then(|e| Link::detect(e)) {
                    return ScreenAction::OpenLink(link.url().to_string());
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => return ScreenAction::Quit,
            _ => {}
        }
        ScreenAction::None
    }
}

/// "1 item" / "N items".
pub fn item_count_label(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

/// Single-line, truncated rendering of an entry for the list.
fn preview_line(text: &str, max_chars: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let sanitized = sanitized.trim();
    if sanitized.chars().count() > max_chars {
        let truncated: String = sanitized.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        sanitized.to_string()
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_SIZE;
    use crate::services::clipboard::testing::FakeClipboard;
    use crate::services::history_store::LIST_KEY;
    use crate::services::{KeyValueStore, MemoryStore};
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    struct Harness {
        store: Arc<ClipboardHistoryStore>,
        clipboard: Arc<FakeClipboard>,
        screen: HistoryScreen,
    }

    async fn harness(items: &[&str]) -> Harness {
        let store = Arc::new(ClipboardHistoryStore::new(
            Arc::new(MemoryStore::new()),
            MAX_SIZE,
        ));
        for item in items.iter().rev() {
            store.add(item).await.unwrap();
        }
        let clipboard = Arc::new(FakeClipboard::new());
        let mut screen = HistoryScreen::new(
            store.clone(),
            clipboard.clone(),
            Arc::new(Config::default()),
        );
        screen.reload().await.unwrap();
        Harness {
            store,
            clipboard,
            screen,
        }
    }

    fn rendered(screen: &mut HistoryScreen) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| screen.draw(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_item_count_label() {
        assert_eq!(item_count_label(0), "0 items");
        assert_eq!(item_count_label(1), "1 item");
        assert_eq!(item_count_label(15), "15 items");
    }

    #[test]
    fn test_preview_line() {
        assert_eq!(preview_line("  a\nb\tc ", 80), "a b c");
        assert_eq!(preview_line("abcdef", 3), "abc...");
        assert_eq!(preview_line("héllo", 5), "héllo");
    }

    #[tokio::test]
    async fn test_copy_back_promotes_and_writes_clipboard() {
        let mut h = harness(&["c", "b", "a"]).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Down)).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Down)).await;

        h.screen.handle_key(KeyEvent::from(KeyCode::Enter)).await;

        assert_eq!(h.clipboard.contents(), Some("a".to_string()));
        assert_eq!(h.store.read_all().await.unwrap(), vec!["a", "c", "b"]);
        assert_eq!(h.screen.entries(), &["a", "c", "b"]);
        assert!(!h.screen.snackbar().unwrap().is_error);
    }

    #[tokio::test]
    async fn test_copy_failure_is_reported_and_not_promoted() {
        let mut h = harness(&["c", "b", "a"]).await;
        *h.clipboard.fail_writes.lock().unwrap() = true;
        h.screen.handle_key(KeyEvent::from(KeyCode::Up)).await;

        h.screen.handle_key(KeyEvent::from(KeyCode::Enter)).await;

        let snackbar = h.screen.snackbar().unwrap();
        assert!(snackbar.is_error);
        assert!(snackbar.message.starts_with("Copy failed"));
        assert_eq!(h.store.read_all().await.unwrap(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_delete_selected() {
        let mut h = harness(&["c", "b", "a"]).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Char('j'))).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Char('d'))).await;

        assert_eq!(h.screen.entries(), &["c", "a"]);
        assert_eq!(h.screen.snackbar().unwrap().message, "Entry deleted");
    }

    #[tokio::test]
    async fn test_delete_last_entry_clamps_selection() {
        let mut h = harness(&["b", "a"]).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Up)).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Delete)).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Delete)).await;

        assert!(h.screen.entries().is_empty());
        assert!(h.store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let mut h = harness(&["b", "a"]).await;

        h.screen.handle_key(KeyEvent::from(KeyCode::Char('D'))).await;
        assert!(h.screen.is_modal());
        h.screen.handle_key(KeyEvent::from(KeyCode::Char('n'))).await;
        assert!(!h.screen.is_modal());
        assert_eq!(h.store.read_all().await.unwrap().len(), 2);

        h.screen.handle_key(KeyEvent::from(KeyCode::Char('D'))).await;
        h.screen.handle_key(KeyEvent::from(KeyCode::Char('y'))).await;
        assert!(h.store.read_all().await.unwrap().is_empty());
        assert_eq!(h.screen.snackbar().unwrap().message, "History cleared");
    }

    #[tokio::test]
    async fn test_open_link_action() {
        let mut h = harness(&["https://docs.rs/tokio", "plain"]).await;
        let action = h.screen.handle_key(KeyEvent::from(KeyCode::Char('o'))).await;
        assert_eq!(action, ScreenAction::OpenLink("https://docs.rs/tokio".to_string()));

        h.screen.handle_key(KeyEvent::from(KeyCode::Down)).await;
        let action = h.screen.handle_key(KeyEvent::from(KeyCode::Char('o'))).await;
        assert_eq!(action, ScreenAction::None);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_background_capture() {
        let mut h = harness(&["a"]).await;
        h.store.add("from poll").await.unwrap();

        h.screen.refresh_if_changed().await;

        assert_eq!(h.screen.entries(), &["from poll", "a"]);
    }

    #[tokio::test]
    async fn test_render_empty_state() {
        let mut h = harness(&[]).await;
        let screen = rendered(&mut h.screen);
        assert!(screen.contains("Nothing copied yet"));
        assert!(screen.contains("History (0 items)"));
    }

    #[tokio::test]
    async fn test_render_list_with_link_label() {
        let mut h = harness(&["hello world", "https://www.youtube.com/watch?v=abc"]).await;
        let screen = rendered(&mut h.screen);
        assert!(screen.contains("History (2 items)"));
        assert!(screen.contains("hello world"));
        assert!(screen.contains("youtube"));
    }

    #[tokio::test]
    async fn test_unreadable_history_can_be_cleared() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(LIST_KEY, json!({"not": "a list"})).await.unwrap();
        let store = Arc::new(ClipboardHistoryStore::new(backend, MAX_SIZE));
        let mut screen = HistoryScreen::new(
            store.clone(),
            Arc::new(FakeClipboard::new()),
            Arc::new(Config::default()),
        );
        assert!(screen.reload().await.is_err());

        screen.handle_key(KeyEvent::from(KeyCode::Char('D'))).await;
        assert!(screen.is_modal());
        assert!(rendered(&mut screen).contains("Delete unreadable history?"));
        screen.handle_key(KeyEvent::from(KeyCode::Char('y'))).await;

        assert_eq!(screen.snackbar().unwrap().message, "History cleared");
        store.add("fresh").await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_snackbar_expires() {
        let mut h = harness(&["a"]).await;
        h.screen.notify("Copied to clipboard");
        h.screen.tick();
        assert!(h.screen.snackbar().is_some());

        let mut config = Config::default();
        config.display.snackbar_ms = 0;
        h.screen.config = Arc::new(config);
        h.screen.tick();
        assert!(h.screen.snackbar().is_none());
    }
}
