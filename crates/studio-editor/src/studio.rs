//! The editor handle a UI surface holds: one session plus its selection.
//!
//! Keyboard intents resolved by `ShortcutMap` are dispatched here, since
//! most of them act on "whatever is selected".

use studio_core::ComponentId;

use crate::mutations::ComponentPatch;
use crate::selection::SelectionState;
use crate::session::EditorSession;
use crate::shortcuts::{ShortcutAction, ShortcutMap};

#[derive(Debug, Clone, Default)]
pub struct Studio {
    pub session: EditorSession,
    pub selection: SelectionState,
}

impl Studio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_session(session: EditorSession) -> Self {
        Self {
            session,
            selection: SelectionState::default(),
        }
    }

    /// Drop selected ids the page no longer contains. Call after any
    /// change made through `session` directly.
    pub fn sync_selection(&mut self) -> bool {
        self.selection.prune(self.session.data())
    }

    /// Resolve a key event and perform the bound action.
    /// Returns whether anything changed.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        match ShortcutMap::resolve(key, ctrl, shift, alt, meta) {
            Some(action) => self.perform(action),
            None => false,
        }
    }

    /// Perform an editor intent. Returns whether the page or the selection
    /// changed.
    pub fn perform(&mut self, action: ShortcutAction) -> bool {
        log::debug!("studio: {action:?}");
        let changed = match action {
            ShortcutAction::Undo => self.session.undo().is_some(),
            ShortcutAction::Redo => self.session.redo().is_some(),
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::Duplicate => self.duplicate_selected(),
            ShortcutAction::ToggleLocked => self.toggle_flag(
                |c| c.locked,
                ComponentPatch::locked,
                "Toggle lock",
            ),
            ShortcutAction::ToggleHidden => self.toggle_flag(
                |c| c.hidden,
                ComponentPatch::hidden,
                "Toggle visibility",
            ),
            ShortcutAction::SelectAll => {
                let all = self.session.data().preorder();
                let before = self.selection.clone();
                self.selection.select_multiple(&all);
                self.selection != before
            }
            ShortcutAction::SelectNext => self.selection.select_next(self.session.data()),
            ShortcutAction::SelectPrevious => {
                self.selection.select_previous(self.session.data())
            }
            ShortcutAction::Deselect => {
                let had_selection = !self.selection.is_empty();
                self.selection.clear_selection();
                had_selection
            }
        };
        self.sync_selection();
        changed
    }

    /// Selected ids that still exist and are not locked.
    fn editable_selection(&self) -> Vec<ComponentId> {
        let data = self.session.data();
        self.selection
            .resolved_ids(data)
            .into_iter()
            .filter(|id| data.get(*id).is_some_and(|c| !c.locked))
            .collect()
    }

    fn delete_selected(&mut self) -> bool {
        let targets = self.editable_selection();
        if targets.is_empty() {
            return false;
        }
        let changed = self.session.delete_components(&targets);
        self.selection.clear_selection();
        changed
    }

    fn duplicate_selected(&mut self) -> bool {
        let targets = self.editable_selection();
        if targets.is_empty() {
            return false;
        }
        self.session.begin_batch("Duplicate selection");
        let clones: Vec<ComponentId> = targets
            .into_iter()
            .filter_map(|id| self.session.duplicate_component(id))
            .collect();
        self.session.end_batch();
        if clones.is_empty() {
            return false;
        }
        self.selection.select_multiple(&clones);
        true
    }

    /// Flip a boolean flag on every selected component. The new value is
    /// the opposite of the primary's current value, so a mixed selection
    /// ends up uniform.
    fn toggle_flag(
        &mut self,
        read: impl Fn(&studio_core::Component) -> bool,
        patch: impl Fn(bool) -> ComponentPatch,
        label: &str,
    ) -> bool {
        let data = self.session.data();
        let targets = self.selection.resolved_ids(data);
        let Some(primary) = self
            .selection
            .resolved_primary(data)
            .or_else(|| targets.first().copied())
        else {
            return false;
        };
        let Some(value) = data.get(primary).map(|c| !read(c)) else {
            return false;
        };

        self.session.begin_batch(label);
        let mut changed = false;
        for id in targets {
            changed |= self.session.update_component(id, patch(value));
        }
        self.session.end_batch();
        changed
    }
}
