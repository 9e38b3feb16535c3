//! Backend services.

pub mod capture;
pub mod clipboard;
pub mod history_store;
pub mod kv_store;

pub use capture::CaptureController;
pub use clipboard::{ClipboardProvider, SystemClipboard};
pub use history_store::ClipboardHistoryStore;
pub use kv_store::{KeyValueStore, MemoryStore, SqliteStore};
