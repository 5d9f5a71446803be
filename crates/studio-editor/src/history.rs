//! Undo/Redo history.
//!
//! Every state-changing call records a snapshot of the page as it was
//! before the change. Undo swaps the current page with the newest past
//! snapshot; redo does the reverse. A new change after an undo discards the
//! redo side (linear history, no branches).
//!
//! Snapshots are plain `PageData` clones. The page shares its structure
//! through reference counting, so a snapshot costs a few pointer copies
//! rather than a deep copy of the tree.
//!
//! Drag gestures use **batching**: the page is captured when the gesture
//! starts, mutations apply live while it runs, and a single entry is pushed
//! when it ends.

use std::collections::VecDeque;

use studio_core::PageData;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Tunables for `History`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum undo depth; the oldest entry is dropped on overflow.
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// One restorable state plus the description of the change that left it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub snapshot: PageData,
    pub label: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<HistoryEntry>,
    future: Vec<HistoryEntry>,
    limit: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Page captured at the start of the outermost batch.
    batch_snapshot: Option<PageData>,
    batch_label: String,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::with_capacity(config.limit),
            future: Vec::new(),
            limit: config.limit,
            batch_depth: 0,
            batch_snapshot: None,
            batch_label: String::new(),
        }
    }

    /// Record the state that existed before a change.
    ///
    /// Inside a batch this is ignored: the batch snapshot already holds the
    /// state to return to.
    pub fn record(&mut self, before: PageData, label: &str) {
        if self.batch_depth > 0 {
            return;
        }
        self.push(HistoryEntry {
            snapshot: before,
            label: label.to_string(),
        });
    }

    fn push(&mut self, entry: HistoryEntry) {
        log::debug!("history: record {:?}", entry.label);
        self.past.push_back(entry);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        // Clear redo stack on new action
        self.future.clear();
    }

    /// Start a batch group. All changes until the matching `end_batch()`
    /// become one undo step.
    pub fn begin_batch(&mut self, current: &PageData, label: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(current.clone());
            self.batch_label = label.to_string();
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the page
    /// differs from its start, push one entry.
    pub fn end_batch(&mut self, current: &PageData) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let label = std::mem::take(&mut self.batch_label);
        if let Some(before) = self.batch_snapshot.take()
            && before != *current
        {
            self.push(HistoryEntry {
                snapshot: before,
                label,
            });
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Restore the newest past state into `current`. Returns its label.
    pub fn undo(&mut self, current: &mut PageData) -> Option<String> {
        let entry = self.past.pop_back()?;
        let previous = std::mem::replace(current, entry.snapshot);
        log::debug!("history: undo {:?}", entry.label);
        self.future.push(HistoryEntry {
            snapshot: previous,
            label: entry.label.clone(),
        });
        Some(entry.label)
    }

    /// Restore the newest undone state into `current`. Returns its label.
    pub fn redo(&mut self, current: &mut PageData) -> Option<String> {
        let entry = self.future.pop()?;
        let previous = std::mem::replace(current, entry.snapshot);
        log::debug!("history: redo {:?}", entry.label);
        self.past.push_back(HistoryEntry {
            snapshot: previous,
            label: entry.label.clone(),
        });
        Some(entry.label)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.past.len()
    }

    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    /// Description of the step `undo()` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.past.back().map(|e| e.label.as_str())
    }

    /// Description of the step `redo()` would reapply.
    pub fn redo_label(&self) -> Option<&str> {
        self.future.last().map(|e| e.label.as_str())
    }

    /// Drop all history, including any open batch. Used when switching
    /// documents so undo never crosses into an unrelated page.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_label.clear();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_with_title(title: &str) -> PageData {
        let mut data = PageData::new();
        data.root_mut().props.insert("title".into(), json!(title));
        data
    }

    /// Apply a title change the way the session does: snapshot, then write.
    fn retitle(history: &mut History, data: &mut PageData, title: &str) {
        let before = data.clone();
        data.root_mut().props.insert("title".into(), json!(title));
        history.record(before, &format!("title {title}"));
    }

    #[test]
    fn undo_redo_roundtrip() {
        let mut history = History::default();
        let mut data = page_with_title("v0");
        let v0 = data.clone();

        retitle(&mut history, &mut data, "v1");
        let v1 = data.clone();

        assert_eq!(history.undo(&mut data).as_deref(), Some("title v1"));
        assert_eq!(data, v0);
        assert_eq!(history.redo(&mut data).as_deref(), Some("title v1"));
        assert_eq!(data, v1);
    }

    #[test]
    fn empty_history_is_noop() {
        let mut history = History::default();
        let mut data = page_with_title("v0");
        assert!(history.undo(&mut data).is_none());
        assert!(history.redo(&mut data).is_none());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn redo_clears_on_new_action() {
        let mut history = History::default();
        let mut data = page_with_title("v0");
        retitle(&mut history, &mut data, "v1");
        history.undo(&mut data);
        assert!(history.can_redo());

        retitle(&mut history, &mut data, "v2");
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_trims_oldest() {
        let mut history = History::new(HistoryConfig { limit: 3 });
        let mut data = page_with_title("v0");
        for i in 1..=5 {
            retitle(&mut history, &mut data, &format!("v{i}"));
        }
        let mut undo_count = 0;
        while history.undo(&mut data).is_some() {
            undo_count += 1;
        }
        assert_eq!(undo_count, 3);
        // Oldest reachable state is v2, not v0.
        assert_eq!(data.root.props["title"], "v2");
    }

    #[test]
    fn batch_undo_is_single_step() {
        let mut history = History::default();
        let mut data = page_with_title("v0");
        let v0 = data.clone();

        history.begin_batch(&data, "drag");
        for i in 1..=5 {
            retitle(&mut history, &mut data, &format!("v{i}"));
        }
        history.end_batch(&data);

        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.undo_label(), Some("drag"));
        history.undo(&mut data);
        assert_eq!(data, v0);
        assert!(!history.can_undo());
    }

    #[test]
    fn nested_batches_close_once() {
        let mut history = History::default();
        let mut data = page_with_title("v0");

        history.begin_batch(&data, "outer");
        history.begin_batch(&data, "inner");
        retitle(&mut history, &mut data, "v1");
        history.end_batch(&data);
        assert!(history.is_batching());
        assert!(!history.can_undo());
        history.end_batch(&data);

        assert!(!history.is_batching());
        assert_eq!(history.undo_label(), Some("outer"));
    }

    #[test]
    fn empty_batch_no_undo_entry() {
        let mut history = History::default();
        let data = page_with_title("v0");
        history.begin_batch(&data, "drag");
        history.end_batch(&data);
        assert!(!history.can_undo());
    }

    #[test]
    fn clear_forgets_everything() {
        let mut history = History::default();
        let mut data = page_with_title("v0");
        retitle(&mut history, &mut data, "v1");
        retitle(&mut history, &mut data, "v2");
        history.undo(&mut data);
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(data.root.props["title"], "v1");
    }
}
