//! Bounded, de-duplicated clipboard history list.

/// Default number of entries kept in the history.
pub const MAX_SIZE: usize = 15;

/// Result of [`HistoryList::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Text was empty; nothing changed.
    Ignored,
    /// Text is already in the list; its position is kept.
    Duplicate,
    /// Text was inserted at the front, evicting the oldest entry if the list was full.
    Inserted { evicted: Option<String> },
}

/// Result of [`HistoryList::promote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// Text was empty; nothing changed.
    Ignored,
    /// Existing entry moved from `from` to the front.
    Moved { from: usize },
    /// Text was not in the list and has been inserted at the front.
    Inserted { evicted: Option<String> },
}

/// Ordered history of captured text, most recent first.
///
/// Holds at most `capacity` entries and never the same text twice.
/// Equality is exact string comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryList {
    entries: Vec<String>,
    capacity: usize,
}

impl HistoryList {
    /// Create an empty list holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a list from persisted entries.
    ///
    /// Empty strings and repeated entries are dropped and the tail is cut
    /// off when the stored list is longer than `capacity`.
    pub fn from_entries(entries: Vec<String>, capacity: usize) -> Self {
        let mut list = Self::new(capacity);
        for entry in entries {
            if list.entries.len() == list.capacity {
                break;
            }
            if !entry.is_empty() && !list.contains(&entry) {
                list.entries.push(entry);
            }
        }
        list
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.position(text).is_some()
    }

    fn position(&self, text: &str) -> Option<usize> {
        self.entries.iter().position(|e| e == text)
    }

    /// Insert text captured in the background.
    ///
    /// Existing entries are left where they are, so re-detecting the same
    /// clipboard content does not reorder the list.
    pub fn add(&mut self, text: &str) -> AddOutcome {
        if text.is_empty() {
            return AddOutcome::Ignored;
        }
        if self.contains(text) {
            return AddOutcome::Duplicate;
        }
        let evicted = self.push_front(text);
        AddOutcome::Inserted { evicted }
    }

    /// Move text to the front, inserting it if it is not in the list.
    pub fn promote(&mut self, text: &str) -> PromoteOutcome {
        if text.is_empty() {
            return PromoteOutcome::Ignored;
        }
        match self.position(text) {
            Some(from) => {
                let entry = self.entries.remove(from);
                self.entries.insert(0, entry);
                PromoteOutcome::Moved { from }
            }
            None => {
                let evicted = self.push_front(text);
                PromoteOutcome::Inserted { evicted }
            }
        }
    }

    /// Remove the first occurrence of text. Returns its former index.
    pub fn remove(&mut self, text: &str) -> Option<usize> {
        let index = self.position(text)?;
        self.entries.remove(index);
        Some(index)
    }

    fn push_front(&mut self, text: &str) -> Option<String> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop()
        } else {
            None
        };
        self.entries.insert(0, text.to_string());
        evicted
    }
}

impl Default for HistoryList {
    fn default() -> Self {
        Self::new(MAX_SIZE)
    }
}
