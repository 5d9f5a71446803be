//! Editing session: one open page plus its history and save state.
//!
//! The session is an explicit value the embedder owns and passes around,
//! so several pages can be open at once without sharing any state. Every
//! mutation method snapshots the page, applies the change through
//! `mutations`, and records a history entry when the page actually changed.

use chrono::{DateTime, Utc};
use studio_core::{ComponentId, IdGenerator, PageData, Props, Severity, ZoneId, validate_document};

use crate::error::{Result, StudioError};
use crate::history::{History, HistoryConfig};
use crate::mutations::{ComponentPatch, MutationOutcome, PageMutation, apply_mutation};

/// Prefix for generated component ids.
pub const DEFAULT_ID_PREFIX: &str = "c";

#[derive(Debug, Clone)]
pub struct EditorSession {
    pub site_id: Option<String>,
    pub page_id: Option<String>,
    data: PageData,
    history: History,
    ids: IdGenerator,
    id_prefix: String,
    /// Unsaved edits exist.
    pub is_dirty: bool,
    /// A save is in flight (set by the embedder).
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Last save failure, forwarded to the UI as-is.
    pub error: Option<String>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default(), DEFAULT_ID_PREFIX)
    }

    pub fn with_config(history: HistoryConfig, id_prefix: &str) -> Self {
        Self {
            site_id: None,
            page_id: None,
            data: PageData::new(),
            history: History::new(history),
            ids: IdGenerator::new(id_prefix),
            id_prefix: id_prefix.to_string(),
            is_dirty: false,
            is_saving: false,
            last_saved_at: None,
            error: None,
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Open a page. History is cleared and the session starts clean.
    pub fn initialize(&mut self, site_id: &str, page_id: &str, data: PageData) {
        log::debug!(
            "session: open {site_id}/{page_id} ({} components)",
            data.len()
        );
        self.site_id = Some(site_id.to_string());
        self.page_id = Some(page_id.to_string());
        self.ids = IdGenerator::resume(&self.id_prefix, &data);
        self.data = data;
        self.history.clear();
        self.is_dirty = false;
        self.is_saving = false;
        self.error = None;
    }

    /// Parse and open a page without structural checks.
    pub fn load_json(&mut self, site_id: &str, page_id: &str, json: &str) -> Result<()> {
        let data = PageData::from_json(json)?;
        self.initialize(site_id, page_id, data);
        Ok(())
    }

    /// Parse and open a page, refusing documents with structural errors.
    /// Warnings (such as orphaned records) are logged and accepted.
    pub fn load_json_strict(&mut self, site_id: &str, page_id: &str, json: &str) -> Result<()> {
        let data = PageData::from_json(json)?;
        let (errors, warnings): (Vec<_>, Vec<_>) = validate_document(&data)
            .into_iter()
            .partition(|d| d.severity == Severity::Error);
        if !errors.is_empty() {
            log::warn!(
                "session: rejected {site_id}/{page_id}: {} structural error(s)",
                errors.len()
            );
            return Err(StudioError::invalid(&errors));
        }
        for warning in &warnings {
            log::warn!("session: {site_id}/{page_id}: {}", warning.message);
        }
        self.initialize(site_id, page_id, data);
        Ok(())
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(self.data.to_json()?)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Record a successful save now.
    pub fn mark_saved(&mut self) {
        self.mark_saved_at(Utc::now());
    }

    pub fn mark_saved_at(&mut self, at: DateTime<Utc>) {
        log::debug!("session: saved at {at}");
        self.is_dirty = false;
        self.is_saving = false;
        self.error = None;
        self.last_saved_at = Some(at);
    }

    pub fn set_saving(&mut self, saving: bool) {
        self.is_saving = saving;
    }

    /// Store a save failure. Setting an error ends the in-flight save.
    pub fn set_error(&mut self, error: Option<String>) {
        if error.is_some() {
            self.is_saving = false;
        }
        self.error = error;
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply a mutation, recording history when the page changed.
    pub fn apply(&mut self, mutation: PageMutation) -> MutationOutcome {
        let label = mutation.label();
        let before = self.data.clone();
        let outcome = apply_mutation(&mut self.data, &mut self.ids, mutation);
        self.is_dirty = true;
        if outcome.changed {
            self.history.record(before, &label);
        }
        outcome
    }

    pub fn add_component(
        &mut self,
        kind: &str,
        props: Props,
        parent_id: ComponentId,
        index: Option<usize>,
        zone_id: Option<ZoneId>,
    ) -> Option<ComponentId> {
        self.apply(PageMutation::AddComponent {
            kind: kind.to_string(),
            props,
            parent_id,
            index,
            zone_id,
        })
        .created
    }

    pub fn update_component(&mut self, id: ComponentId, patch: ComponentPatch) -> bool {
        self.apply(PageMutation::UpdateComponent { id, patch }).changed
    }

    pub fn update_component_props(&mut self, id: ComponentId, props: Props) -> bool {
        self.apply(PageMutation::UpdateComponentProps { id, props })
            .changed
    }

    pub fn delete_component(&mut self, id: ComponentId) -> bool {
        self.apply(PageMutation::DeleteComponent { id }).changed
    }

    pub fn delete_components(&mut self, ids: &[ComponentId]) -> bool {
        self.apply(PageMutation::DeleteComponents { ids: ids.to_vec() })
            .changed
    }

    pub fn duplicate_component(&mut self, id: ComponentId) -> Option<ComponentId> {
        self.apply(PageMutation::DuplicateComponent { id }).created
    }

    pub fn move_component(
        &mut self,
        id: ComponentId,
        parent_id: ComponentId,
        index: usize,
        zone_id: Option<ZoneId>,
    ) -> bool {
        self.apply(PageMutation::MoveComponent {
            id,
            parent_id,
            index,
            zone_id,
        })
        .changed
    }

    pub fn update_root_props(&mut self, props: Props) -> bool {
        self.apply(PageMutation::UpdateRootProps { props }).changed
    }

    /// Replace the whole page as one undoable step.
    pub fn set_data(&mut self, data: PageData) -> bool {
        self.ids.observe(&data);
        self.apply(PageMutation::SetData {
            data: Box::new(data),
        })
        .changed
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Revert the last change. Returns its label.
    pub fn undo(&mut self) -> Option<String> {
        let label = self.history.undo(&mut self.data)?;
        self.is_dirty = true;
        Some(label)
    }

    /// Reapply the last undone change. Returns its label.
    pub fn redo(&mut self) -> Option<String> {
        let label = self.history.redo(&mut self.data)?;
        self.is_dirty = true;
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Group the following mutations into one undo step (drag gestures).
    pub fn begin_batch(&mut self, label: &str) {
        self.history.begin_batch(&self.data, label);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch(&self.data);
    }
}
