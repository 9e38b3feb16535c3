//! Capture triggers feeding the clipboard history.
//!
//! Three producers add text to the store:
//! - an explicit "add selection" action ([`CaptureController::add_selection`]),
//! - copy events ([`CaptureController::on_copy`]), followed by one delayed
//!   clipboard read,
//! - a periodic clipboard poll that runs while the user is away from the
//!   window (focus lost or window hidden).
//!
//! Copy events and polls remember the last text they captured and skip
//! unchanged content, so a clipboard that stays the same is added once.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::StoreResult;
use crate::models::AddOutcome;

use super::clipboard::{read_with_fallback, ClipboardProvider};
use super::history_store::ClipboardHistoryStore;

/// Where a captured text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Selection,
    Copy,
    Poll,
}

/// State shared with the poll timer and delayed reads.
struct CaptureState {
    store: Arc<ClipboardHistoryStore>,
    clipboard: Arc<dyn ClipboardProvider>,
    last_seen: Mutex<String>,
}

impl CaptureState {
    async fn poll_once(&self) -> bool {
        match read_with_fallback(self.clipboard.as_ref()).await {
            Some(text) => self.capture_if_new(text, CaptureSource::Poll).await,
            None => false,
        }
    }

    /// Add text unless it is empty or equal to the last captured text.
    async fn capture_if_new(&self, text: String, source: CaptureSource) -> bool {
        {
            let mut last_seen = self.last_seen.lock().unwrap_or_else(|p| p.into_inner());
            if text.is_empty() || *last_seen == text {
                return false;
            }
            *last_seen = text.clone();
        }

        match self.store.add(&text).await {
            Ok(outcome) => {
                debug!(?source, ?outcome, "captured clipboard text");
                true
            }
            Err(e) => {
                warn!(?source, error = %e, "failed to store captured text");
                false
            }
        }
    }
}

/// Result of [`CaptureController::on_copy`].
pub struct CopyCapture {
    /// Whether the copied text itself was new.
    pub captured: bool,
    /// The delayed clipboard read scheduled after the copy.
    pub fallback: JoinHandle<()>,
}

/// Owns the capture triggers for one session.
pub struct CaptureController {
    state: Arc<CaptureState>,
    poll_interval: Duration,
    copy_fallback_delay: Duration,
    timer: Option<JoinHandle<()>>,
}

impl CaptureController {
    pub fn new(
        store: Arc<ClipboardHistoryStore>,
        clipboard: Arc<dyn ClipboardProvider>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            state: Arc::new(CaptureState {
                store,
                clipboard,
                last_seen: Mutex::new(String::new()),
            }),
            poll_interval: config.poll_interval(),
            copy_fallback_delay: config.copy_fallback_delay(),
            timer: None,
        }
    }

    /// Explicitly add selected text.
    pub async fn add_selection(&self, text: &str) -> StoreResult<AddOutcome> {
        let outcome = self.state.store.add(text).await?;
        debug!(source = ?CaptureSource::Selection, ?outcome, "added selection");
        Ok(outcome)
    }

    /// Handle a copy: capture the copied text, then re-read the clipboard
    /// after a short delay in case the copy produced something else.
    pub async fn on_copy(&self, selected: &str) -> CopyCapture {
        let captured = self
            .state
            .capture_if_new(selected.to_string(), CaptureSource::Copy)
            .await;

        let state = Arc::clone(&self.state);
        let delay = self.copy_fallback_delay;
        let fallback = tokio::spawn(async move {
            time::sleep(delay).await;
            state.poll_once().await;
        });

        CopyCapture { captured, fallback }
    }

    /// Read the clipboard once. Returns whether new text was captured.
    pub async fn poll_once(&self) -> bool {
        self.state.poll_once().await
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_some()
    }

    /// Start the poll timer. No-op if it is already running.
    pub fn start_polling(&mut self) -> bool {
        if self.timer.is_some() {
            return false;
        }

        let state = Arc::clone(&self.state);
        let period = self.poll_interval;
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.poll_once().await;
            }
        }));
        info!(interval_ms = period.as_millis() as u64, "clipboard polling started");
        true
    }

    /// Stop the poll timer. No-op if it is not running.
    pub fn stop_polling(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                info!("clipboard polling stopped");
                true
            }
            None => false,
        }
    }

    /// The user left the window.
    pub fn on_focus_lost(&mut self) {
        self.start_polling();
    }

    /// The user came back to the window.
    pub fn on_focus_gained(&mut self) {
        self.stop_polling();
    }

    /// The window was hidden (`true`) or shown again (`false`).
    pub fn on_visibility_change(&mut self, hidden: bool) {
        if hidden {
            self.start_polling();
        } else {
            self.stop_polling();
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
