//! Selection state.
//!
//! Tracks which components the user has picked. The selection holds ids,
//! not references, so it never blocks a delete: ids that stop resolving are
//! treated as deselected by the `resolved_*` readers and dropped for good by
//! `prune`.

use serde::Serialize;
use studio_core::{ComponentId, PageData};

/// Current selection: an ordered set of ids plus the primary (last picked).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub primary_id: Option<ComponentId>,
    /// Selected ids in pick order, without duplicates.
    pub selected_ids: Vec<ComponentId>,
    pub is_multi_select: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select exactly `id`, leaving multi-select.
    pub fn select(&mut self, id: ComponentId) {
        self.primary_id = Some(id);
        self.selected_ids = vec![id];
        self.is_multi_select = false;
    }

    /// Shift+click behavior: the first toggle enters multi-select with just
    /// `id`; later toggles add or remove `id`.
    pub fn toggle_select(&mut self, id: ComponentId) {
        if !self.is_multi_select {
            self.primary_id = Some(id);
            self.selected_ids = vec![id];
            self.is_multi_select = true;
            return;
        }
        if let Some(pos) = self.selected_ids.iter().position(|s| *s == id) {
            self.selected_ids.remove(pos);
            self.primary_id = self.selected_ids.last().copied();
        } else {
            self.selected_ids.push(id);
            self.primary_id = Some(id);
        }
    }

    pub fn add_to_selection(&mut self, id: ComponentId) {
        if !self.selected_ids.contains(&id) {
            self.selected_ids.push(id);
        }
        self.primary_id = Some(id);
        self.is_multi_select = self.selected_ids.len() > 1;
    }

    pub fn remove_from_selection(&mut self, id: ComponentId) {
        self.selected_ids.retain(|s| *s != id);
        self.primary_id = self.selected_ids.last().copied();
        self.is_multi_select = self.selected_ids.len() > 1;
    }

    /// Replace the selection wholesale. The last id becomes primary.
    pub fn select_multiple(&mut self, ids: &[ComponentId]) {
        self.selected_ids.clear();
        for &id in ids {
            if !self.selected_ids.contains(&id) {
                self.selected_ids.push(id);
            }
        }
        self.primary_id = ids.last().copied();
        self.is_multi_select = self.selected_ids.len() > 1;
    }

    pub fn clear_selection(&mut self) {
        *self = Self::default();
    }

    pub fn is_selected(&self, id: ComponentId) -> bool {
        self.selected_ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_ids.is_empty()
    }

    /// Turning multi-select off collapses to the primary; turning it on
    /// only sets the flag.
    pub fn set_multi_select(&mut self, enabled: bool) {
        self.is_multi_select = enabled;
        if !enabled {
            self.selected_ids = self.primary_id.into_iter().collect();
        }
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    /// Select the node after the primary in pre-order.
    ///
    /// With nothing selected, selects the first node of the page. Returns
    /// whether the selection changed; it does not when the page is empty,
    /// the primary is already last, or the primary no longer resolves.
    pub fn select_next(&mut self, data: &PageData) -> bool {
        self.step(data, |order, at| match at {
            Some(i) => order.get(i + 1).copied(),
            None => order.first().copied(),
        })
    }

    /// Mirror of `select_next`: the node before the primary in pre-order,
    /// or the last node when nothing is selected.
    pub fn select_previous(&mut self, data: &PageData) -> bool {
        self.step(data, |order, at| match at {
            Some(i) => i.checked_sub(1).and_then(|p| order.get(p).copied()),
            None => order.last().copied(),
        })
    }

    fn step(
        &mut self,
        data: &PageData,
        pick: impl FnOnce(&[ComponentId], Option<usize>) -> Option<ComponentId>,
    ) -> bool {
        let order = data.preorder();
        let at = match self.primary_id {
            Some(primary) => match order.iter().position(|id| *id == primary) {
                Some(i) => Some(i),
                None => return false,
            },
            None => None,
        };
        let Some(target) = pick(&order, at) else {
            return false;
        };
        self.select(target);
        true
    }

    // ─── Degradation ─────────────────────────────────────────────────────

    /// The primary id, if it still names a component in `data`.
    pub fn resolved_primary(&self, data: &PageData) -> Option<ComponentId> {
        self.primary_id.filter(|id| data.contains(*id))
    }

    /// Selected ids that still name components in `data`.
    pub fn resolved_ids(&self, data: &PageData) -> Vec<ComponentId> {
        self.selected_ids
            .iter()
            .copied()
            .filter(|id| data.contains(*id))
            .collect()
    }

    /// Drop ids that no longer resolve. Returns whether anything changed.
    pub fn prune(&mut self, data: &PageData) -> bool {
        let before = self.selected_ids.len();
        self.selected_ids.retain(|id| data.contains(*id));
        let primary_gone = self.primary_id.is_some_and(|id| !data.contains(id));
        if before == self.selected_ids.len() && !primary_gone {
            return false;
        }
        if primary_gone {
            self.primary_id = self.selected_ids.last().copied();
        }
        if self.selected_ids.len() <= 1 {
            self.is_multi_select = false;
        }
        log::debug!(
            "selection: pruned to {} id(s)",
            self.selected_ids.len()
        );
        true
    }
}
