//! Data models for the clipboard history.

pub mod history;
pub mod link;

pub use history::{AddOutcome, HistoryList, PromoteOutcome, MAX_SIZE};
pub use link::Link;
