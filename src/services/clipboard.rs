//! Clipboard operations.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::ClipboardError;

/// Access to the system clipboard.
///
/// Reads can wait on another application (the selection owner on X11 and
/// Wayland), so implementations must not block the async runtime.
#[async_trait]
pub trait ClipboardProvider: Send + Sync {
    /// Read text from the regular clipboard.
    async fn read_text(&self) -> Result<String, ClipboardError>;

    /// Read the current text selection, used when the clipboard cannot be read.
    async fn read_selection(&self) -> Result<String, ClipboardError>;

    /// Replace the clipboard contents with `text`.
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard backed by `arboard`.
///
/// The handle is opened lazily and kept alive: on Linux, text we set is
/// only served while the owning `Clipboard` exists. Every call runs on the
/// blocking thread pool.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Arc<Mutex<Option<arboard::Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_handle<T, F>(&self, f: F) -> Result<T, ClipboardError>
    where
        T: Send + 'static,
        F: FnOnce(&mut arboard::Clipboard) -> Result<T, ClipboardError> + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || {
            let mut guard = handle.lock().unwrap_or_else(|p| p.into_inner());
            if guard.is_none() {
                let clipboard = arboard::Clipboard::new()
                    .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
                *guard = Some(clipboard);
            }
            match guard.as_mut() {
                Some(clipboard) => f(clipboard),
                None => Err(ClipboardError::Unavailable("no clipboard handle".to_string())),
            }
        })
        .await
        .map_err(|e| ClipboardError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl ClipboardProvider for SystemClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        self.with_handle(|cb| cb.get_text().map_err(|e| ClipboardError::Read(e.to_string())))
            .await
    }

    #[cfg(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    ))]
    async fn read_selection(&self) -> Result<String, ClipboardError> {
        use arboard::{GetExtLinux, LinuxClipboardKind};

        self.with_handle(|cb| {
            cb.get()
                .clipboard(LinuxClipboardKind::Primary)
                .text()
                .map_err(|e| ClipboardError::Read(e.to_string()))
        })
        .await
    }

    #[cfg(not(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    )))]
    async fn read_selection(&self) -> Result<String, ClipboardError> {
        Err(ClipboardError::Unsupported)
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let text = text.to_string();
        self.with_handle(move |cb| {
            cb.set_text(text)
                .map_err(|e| ClipboardError::Write(e.to_string()))
        })
        .await
    }
}

/// Read clipboard text, falling back to the current selection.
///
/// Returns `None` when both fail or produce nothing.
pub async fn read_with_fallback(clipboard: &dyn ClipboardProvider) -> Option<String> {
    match clipboard.read_text().await {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "clipboard read failed, trying selection");
            match clipboard.read_selection().await {
                Ok(text) if !text.is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "selection read failed, dropping capture");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory clipboard for tests.

    use super::*;

    #[derive(Default)]
    pub struct FakeClipboard {
        pub text: Mutex<Option<String>>,
        pub selection: Mutex<Option<String>>,
        pub fail_writes: Mutex<bool>,
        pub reads: Mutex<usize>,
    }

    impl FakeClipboard {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, text: &str) {
            *self.text.lock().unwrap() = Some(text.to_string());
        }

        /// Make regular reads fail, as when permission is denied.
        pub fn deny_reads(&self) {
            *self.text.lock().unwrap() = None;
        }

        pub fn set_selection(&self, text: &str) {
            *self.selection.lock().unwrap() = Some(text.to_string());
        }

        pub fn contents(&self) -> Option<String> {
            self.text.lock().unwrap().clone()
        }

        pub fn read_count(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    #[async_trait]
    impl ClipboardProvider for FakeClipboard {
        async fn read_text(&self) -> Result<String, ClipboardError> {
            *self.reads.lock().unwrap() += 1;
            self.text
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ClipboardError::Read("permission denied".to_string()))
        }

        async fn read_selection(&self) -> Result<String, ClipboardError> {
            self.selection
                .lock()
                .unwrap()
                .clone()
                .ok_or(ClipboardError::Unsupported)
        }

        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(ClipboardError::Write("clipboard busy".to_string()));
            }
            self.set(text);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeClipboard;
    use super::*;

    #[tokio::test]
    async fn test_read_prefers_clipboard() {
        let cb = FakeClipboard::new();
        cb.set("clip");
        cb.set_selection("sel");
        assert_eq!(read_with_fallback(&cb).await, Some("clip".to_string()));
    }

    #[tokio::test]
    async fn test_read_falls_back_to_selection() {
        let cb = FakeClipboard::new();
        cb.set_selection("sel");
        assert_eq!(read_with_fallback(&cb).await, Some("sel".to_string()));
    }

    #[tokio::test]
    async fn test_read_drops_when_both_fail() {
        let cb = FakeClipboard::new();
        assert_eq!(read_with_fallback(&cb).await, None);
    }

    #[tokio::test]
    async fn test_empty_clipboard_does_not_fall_back() {
        let cb = FakeClipboard::new();
        cb.set("");
        cb.set_selection("sel");
        assert_eq!(read_with_fallback(&cb).await, None);
    }
}
