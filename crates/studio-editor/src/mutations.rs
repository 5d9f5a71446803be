//! Mutation operations over a Studio page.
//!
//! Every operation keeps the tree invariants intact and treats unknown ids
//! as silent no-ops, so a stale UI event (a prop update queued behind a
//! delete, say) can never corrupt the page. Each function reports whether
//! the page actually changed; the session uses that to decide whether a
//! history entry is worth recording.
//!
//! Writes go through the copy-on-write accessors on `PageData`, so a
//! mutation clones only the records it touches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use studio_core::{Component, ComponentId, IdGenerator, PageData, Placement, Props, ZoneId};

/// Shallow field overrides for `update_component`.
///
/// Structural fields (`id`, `children`, `parentId`, `zoneId`) are only
/// changed through `move_component`, so they are not patchable here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComponentPatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Replaces the whole props map (use `update_component_props` to merge).
    pub props: Option<Props>,
    pub locked: Option<bool>,
    pub hidden: Option<bool>,
}

impl ComponentPatch {
    pub fn locked(locked: bool) -> Self {
        Self {
            locked: Some(locked),
            ..Default::default()
        }
    }

    pub fn hidden(hidden: bool) -> Self {
        Self {
            hidden: Some(hidden),
            ..Default::default()
        }
    }

    fn changes(&self, component: &Component) -> bool {
        self.kind.as_ref().is_some_and(|k| *k != component.kind)
            || self.props.as_ref().is_some_and(|p| *p != component.props)
            || self.locked.is_some_and(|l| l != component.locked)
            || self.hidden.is_some_and(|h| h != component.hidden)
    }
}

/// A mutation that can be applied to the page from an editor intent.
#[derive(Debug, Clone)]
pub enum PageMutation {
    AddComponent {
        kind: String,
        props: Props,
        /// `ComponentId::root()` for top-level placement.
        parent_id: ComponentId,
        index: Option<usize>,
        /// Takes precedence over `parent_id` when present.
        zone_id: Option<ZoneId>,
    },
    UpdateComponent {
        id: ComponentId,
        patch: ComponentPatch,
    },
    UpdateComponentProps {
        id: ComponentId,
        props: Props,
    },
    DeleteComponent {
        id: ComponentId,
    },
    DeleteComponents {
        ids: Vec<ComponentId>,
    },
    DuplicateComponent {
        id: ComponentId,
    },
    MoveComponent {
        id: ComponentId,
        parent_id: ComponentId,
        index: usize,
        zone_id: Option<ZoneId>,
    },
    UpdateRootProps {
        props: Props,
    },
    /// Replace the whole page (bulk load, paste of a full document).
    SetData {
        data: Box<PageData>,
    },
}

impl PageMutation {
    /// Short human-readable description, used as the history label.
    pub fn label(&self) -> String {
        match self {
            PageMutation::AddComponent { kind, .. } => format!("Add {kind}"),
            PageMutation::UpdateComponent { id, .. } => format!("Update {id}"),
            PageMutation::UpdateComponentProps { id, .. } => format!("Edit {id}"),
            PageMutation::DeleteComponent { id } => format!("Delete {id}"),
            PageMutation::DeleteComponents { ids } => format!("Delete {} components", ids.len()),
            PageMutation::DuplicateComponent { id } => format!("Duplicate {id}"),
            PageMutation::MoveComponent { id, .. } => format!("Move {id}"),
            PageMutation::UpdateRootProps { .. } => "Edit page".to_string(),
            PageMutation::SetData { .. } => "Replace page".to_string(),
        }
    }
}

/// Result of applying a `PageMutation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Whether the page differs from before.
    pub changed: bool,
    /// The id created by an add or duplicate.
    pub created: Option<ComponentId>,
}

impl MutationOutcome {
    fn changed(changed: bool) -> Self {
        Self {
            changed,
            created: None,
        }
    }

    fn created(created: Option<ComponentId>) -> Self {
        Self {
            changed: created.is_some(),
            created,
        }
    }
}

/// Apply one mutation to `data`, drawing fresh ids from `ids`.
pub fn apply_mutation(
    data: &mut PageData,
    ids: &mut IdGenerator,
    mutation: PageMutation,
) -> MutationOutcome {
    match mutation {
        PageMutation::AddComponent {
            kind,
            props,
            parent_id,
            index,
            zone_id,
        } => MutationOutcome::created(add_component(
            data, ids, &kind, props, parent_id, index, zone_id,
        )),
        PageMutation::UpdateComponent { id, patch } => {
            MutationOutcome::changed(update_component(data, id, patch))
        }
        PageMutation::UpdateComponentProps { id, props } => {
            MutationOutcome::changed(update_component_props(data, id, props))
        }
        PageMutation::DeleteComponent { id } => {
            MutationOutcome::changed(delete_component(data, id))
        }
        PageMutation::DeleteComponents { ids: doomed } => {
            MutationOutcome::changed(delete_components(data, &doomed))
        }
        PageMutation::DuplicateComponent { id } => {
            MutationOutcome::created(duplicate_component(data, ids, id))
        }
        PageMutation::MoveComponent {
            id,
            parent_id,
            index,
            zone_id,
        } => MutationOutcome::changed(move_component(data, id, parent_id, index, zone_id)),
        PageMutation::UpdateRootProps { props } => {
            MutationOutcome::changed(update_root_props(data, props))
        }
        PageMutation::SetData { data: next } => {
            let changed = *data != *next;
            *data = *next;
            MutationOutcome::changed(changed)
        }
    }
}

// ─── Operations ──────────────────────────────────────────────────────────

/// Create a component and place it. Returns the new id.
///
/// With a zone, the component goes into that zone (created if absent);
/// otherwise under `parent_id`, where `ComponentId::root()` means top level.
/// Returns `None` and creates nothing when the parent does not resolve.
pub fn add_component(
    data: &mut PageData,
    ids: &mut IdGenerator,
    kind: &str,
    props: Props,
    parent_id: ComponentId,
    index: Option<usize>,
    zone_id: Option<ZoneId>,
) -> Option<ComponentId> {
    let placement = Placement::resolve(parent_id, zone_id);
    if let Placement::Parent(parent) = &placement
        && !data.contains(*parent)
    {
        log::trace!("add {kind}: parent {parent} not found");
        return None;
    }

    let id = ids.next_id(data);
    let mut component = Component::new(id, kind, props);
    component.set_placement(&placement);
    data.components_mut().insert(id, Arc::new(component));
    data.insert_into(&placement, index, id);
    log::trace!("add {kind} as {id} into {placement:?}");
    Some(id)
}

/// Shallow-merge top-level fields into a component.
pub fn update_component(data: &mut PageData, id: ComponentId, patch: ComponentPatch) -> bool {
    let Some(current) = data.get(id) else {
        return false;
    };
    if !patch.changes(current) {
        return false;
    }
    let Some(component) = data.get_mut(id) else {
        return false;
    };
    if let Some(kind) = patch.kind {
        component.kind = kind;
    }
    if let Some(props) = patch.props {
        component.props = props;
    }
    if let Some(locked) = patch.locked {
        component.locked = locked;
    }
    if let Some(hidden) = patch.hidden {
        component.hidden = hidden;
    }
    true
}

/// Shallow-merge `partial` into a component's props.
pub fn update_component_props(data: &mut PageData, id: ComponentId, partial: Props) -> bool {
    let Some(current) = data.get(id) else {
        return false;
    };
    if !merge_changes(&current.props, &partial) {
        return false;
    }
    let Some(component) = data.get_mut(id) else {
        return false;
    };
    component.props.extend(partial);
    true
}

/// Shallow-merge `partial` into the page-level props.
pub fn update_root_props(data: &mut PageData, partial: Props) -> bool {
    if !merge_changes(&data.root.props, &partial) {
        return false;
    }
    data.root_mut().props.extend(partial);
    true
}

fn merge_changes(current: &Props, partial: &Props) -> bool {
    partial
        .iter()
        .any(|(key, value)| current.get(key) != Some(value))
}

/// Remove a component, its whole subtree, and every zone they own.
pub fn delete_component(data: &mut PageData, id: ComponentId) -> bool {
    let Some(component) = data.get(id) else {
        return false;
    };
    let placement = component.placement();

    // Collect everything first so a malformed tree is never half-deleted.
    let doomed: HashSet<ComponentId> = data.subtree(id).into_iter().collect();

    data.remove_from(&placement, id);
    let components = data.components_mut();
    for gone in &doomed {
        components.remove(gone);
    }

    let owns_zone = |zone: &ZoneId| zone.owner().is_some_and(|o| doomed.contains(&o));
    if data.zones.keys().any(owns_zone) {
        data.zones_mut().retain(|zone, _| !owns_zone(zone));
    }

    log::trace!("delete {id} ({} components)", doomed.len());
    true
}

/// Delete each id in turn. Ids already removed with an earlier subtree are
/// skipped.
pub fn delete_components(data: &mut PageData, ids: &[ComponentId]) -> bool {
    let mut changed = false;
    for &id in ids {
        changed |= delete_component(data, id);
    }
    changed
}

/// Deep-clone the subtree at `id` with fresh ids and place the clone right
/// after the original. Returns the clone's root id.
pub fn duplicate_component(
    data: &mut PageData,
    ids: &mut IdGenerator,
    id: ComponentId,
) -> Option<ComponentId> {
    let placement = data.get(id)?.placement();
    if data.placement_list(&placement).is_none() && !matches!(placement, Placement::Zone(_)) {
        log::trace!("duplicate {id}: placement {placement:?} not found");
        return None;
    }

    let subtree = data.subtree(id);
    let mut mapping: HashMap<ComponentId, ComponentId> = HashMap::with_capacity(subtree.len());
    for &old in &subtree {
        mapping.insert(old, ids.next_id(data));
    }
    let remap = |old: ComponentId| mapping.get(&old).copied();

    let mut clones = Vec::with_capacity(subtree.len());
    let mut zones = Vec::new();
    for &old in &subtree {
        let Some(source) = data.get(old) else {
            continue;
        };
        let Some(new_id) = remap(old) else {
            continue;
        };
        let mut clone = source.clone();
        clone.id = new_id;
        clone.children = source.children.iter().filter_map(|&c| remap(c)).collect();
        if old != id {
            clone.parent_id = source.parent_id.map(|p| remap(p).unwrap_or(p));
            clone.zone_id = source.zone_id.as_ref().map(|zone| {
                zone.owner()
                    .and_then(remap)
                    .map_or_else(|| zone.clone(), |owner| zone.with_owner(owner))
            });
        }
        clones.push(clone);

        for (zone, members) in data.owned_zones(old) {
            let members: Vec<ComponentId> = members.iter().filter_map(|&m| remap(m)).collect();
            zones.push((zone.with_owner(new_id), members));
        }
    }

    let new_root = remap(id)?;
    let components = data.components_mut();
    for clone in clones {
        components.insert(clone.id, Arc::new(clone));
    }
    if !zones.is_empty() {
        data.zones_mut().extend(zones);
    }
    let after = data.position_of(id).map(|(_, index)| index + 1);
    data.insert_into(&placement, after, new_root);

    log::trace!("duplicate {id} as {new_root} ({} components)", mapping.len());
    Some(new_root)
}

/// Move `id` into a new placement list at `index` (clamped).
///
/// `zone_id` wins over `parent_id`; `ComponentId::root()` means top level.
/// Moves into the component itself or one of its descendants are rejected,
/// as are moves to a parent that does not exist.
pub fn move_component(
    data: &mut PageData,
    id: ComponentId,
    parent_id: ComponentId,
    index: usize,
    zone_id: Option<ZoneId>,
) -> bool {
    let Some(component) = data.get(id) else {
        return false;
    };
    let from = component.placement();
    let to = Placement::resolve(parent_id, zone_id);

    let host = match &to {
        Placement::Root => None,
        Placement::Parent(parent) => {
            if !data.contains(*parent) {
                log::trace!("move {id}: parent {parent} not found");
                return false;
            }
            Some(*parent)
        }
        Placement::Zone(zone) => data.zone_host(zone),
    };
    if let Some(host) = host
        && (host == id || data.is_ancestor_of(id, host))
    {
        log::trace!("move {id}: {host} is inside the moved subtree");
        return false;
    }

    if from == to
        && let Some((_, current)) = data.position_of(id)
        && let Some(list) = data.placement_list(&to)
        && current == index.min(list.len().saturating_sub(1))
    {
        return false;
    }

    data.remove_from(&from, id);
    data.insert_into(&to, Some(index), id);
    if let Some(component) = data.get_mut(id) {
        component.set_placement(&to);
    }
    log::trace!("move {id} from {from:?} to {to:?} at {index}");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use studio_core::validate_document;

    fn id(s: &str) -> ComponentId {
        ComponentId::intern(s)
    }

    fn props(value: serde_json::Value) -> Props {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Props::new(),
        }
    }

    fn root() -> ComponentId {
        ComponentId::root()
    }

    fn assert_valid(data: &PageData) {
        let diags = validate_document(data);
        assert!(diags.is_empty(), "invalid page: {diags:?}");
    }

    #[test]
    fn add_scenario() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();

        let c1 = add_component(
            &mut data,
            &mut ids,
            "hero",
            props(json!({ "title": "Welcome" })),
            root(),
            None,
            None,
        )
        .unwrap();
        assert_eq!(c1.as_str(), "c1");
        assert_eq!(data.root.children, vec![c1]);

        let c2 = add_component(&mut data, &mut ids, "text", Props::new(), c1, None, None).unwrap();
        assert_eq!(c2.as_str(), "c2");
        assert_eq!(data.get(c1).unwrap().children.as_slice(), &[c2]);
        assert_eq!(data.get(c2).unwrap().parent_id, Some(c1));
        assert_valid(&data);

        assert!(delete_component(&mut data, c1));
        assert!(data.root.children.is_empty());
        assert!(data.is_empty());
        assert_valid(&data);
    }

    #[test]
    fn add_into_zone_creates_list_and_clamps() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let cols = add_component(&mut data, &mut ids, "columns", Props::new(), root(), None, None)
            .unwrap();
        let zone = ZoneId::new(cols, "left");

        let a = add_component(&mut data, &mut ids, "text", Props::new(), cols, None, Some(zone.clone()))
            .unwrap();
        let b = add_component(&mut data, &mut ids, "text", Props::new(), root(), Some(0), Some(zone.clone()))
            .unwrap();
        let c = add_component(&mut data, &mut ids, "text", Props::new(), root(), Some(42), Some(zone.clone()))
            .unwrap();

        assert_eq!(data.zones[&zone], vec![b, a, c]);
        assert_eq!(data.get(a).unwrap().parent_id, None);
        assert_eq!(data.get(a).unwrap().zone_id.as_ref(), Some(&zone));
        assert_valid(&data);
    }

    #[test]
    fn add_under_missing_parent_creates_nothing() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let made = add_component(&mut data, &mut ids, "text", Props::new(), id("ghost"), None, None);
        assert_eq!(made, None);
        assert!(data.is_empty());
    }

    #[test]
    fn update_merges_fields_and_props() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let c = add_component(&mut data, &mut ids, "text", props(json!({ "a": 1, "b": 2 })), root(), None, None)
            .unwrap();

        assert!(update_component(&mut data, c, ComponentPatch::locked(true)));
        assert!(!update_component(&mut data, c, ComponentPatch::locked(true)));
        assert!(data.get(c).unwrap().locked);

        assert!(update_component_props(&mut data, c, props(json!({ "b": 3, "c": 4 }))));
        assert_eq!(
            serde_json::Value::Object(data.get(c).unwrap().props.clone()),
            json!({ "a": 1, "b": 3, "c": 4 })
        );
        assert!(!update_component_props(&mut data, c, props(json!({ "a": 1 }))));
        assert!(!update_component_props(&mut data, id("ghost"), props(json!({ "a": 1 }))));

        assert!(update_root_props(&mut data, props(json!({ "title": "Home" }))));
        assert_eq!(data.root.props["title"], "Home");
    }

    #[test]
    fn delete_unknown_is_noop() {
        let mut data = PageData::new();
        assert!(!delete_component(&mut data, id("ghost")));
    }

    #[test]
    fn delete_drops_owned_zones() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let cols = add_component(&mut data, &mut ids, "columns", Props::new(), root(), None, None)
            .unwrap();
        let zone = ZoneId::new(cols, "left");
        let inner = add_component(&mut data, &mut ids, "text", Props::new(), root(), None, Some(zone.clone()))
            .unwrap();

        assert!(delete_component(&mut data, cols));
        assert!(!data.contains(inner));
        assert!(!data.zones.contains_key(&zone));
        assert_valid(&data);
    }

    #[test]
    fn colon_in_owner_id_keeps_zone_with_its_owner() {
        let mut data = PageData::from_json(
            r#"{
                "root": { "children": ["a", "a:b"], "props": {} },
                "components": {
                    "a": { "id": "a", "type": "box", "props": {} },
                    "a:b": { "id": "a:b", "type": "columns", "props": {} },
                    "x": { "id": "x", "type": "text", "props": {}, "zoneId": "a:b:main" }
                },
                "zones": { "a:b:main": ["x"] }
            }"#,
        )
        .unwrap();
        assert_valid(&data);
        assert_eq!(data.tree_parent(id("x")), Some(id("a:b")));

        let mut ids = IdGenerator::default();
        let copy = duplicate_component(&mut data, &mut ids, id("a:b")).unwrap();
        assert_eq!(data.zones[&ZoneId::new(copy, "main")].len(), 1);
        assert_valid(&data);

        assert!(delete_component(&mut data, id("a:b")));
        assert!(!data.contains(id("x")));
        assert!(!data.zones.contains_key(&ZoneId::from("a:b:main")));
        assert_eq!(data.root.children, vec![id("a"), copy]);
        assert_valid(&data);
    }

    #[test]
    fn delete_components_tolerates_overlap() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let parent = add_component(&mut data, &mut ids, "section", Props::new(), root(), None, None)
            .unwrap();
        let child = add_component(&mut data, &mut ids, "text", Props::new(), parent, None, None)
            .unwrap();

        assert!(delete_components(&mut data, &[parent, child]));
        assert!(data.is_empty());
        assert_valid(&data);
    }

    #[test]
    fn duplicate_leaf_is_placed_after_original() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let c1 = add_component(&mut data, &mut ids, "hero", props(json!({ "title": "Welcome" })), root(), None, None)
            .unwrap();
        let other = add_component(&mut data, &mut ids, "footer", Props::new(), root(), None, None)
            .unwrap();

        let c3 = duplicate_component(&mut data, &mut ids, c1).unwrap();
        assert_eq!(c3.as_str(), "c3");
        assert_eq!(data.root.children, vec![c1, c3, other]);
        assert_eq!(data.get(c3).unwrap().props, data.get(c1).unwrap().props);
        assert_valid(&data);
    }

    #[test]
    fn duplicate_subtree_rewrites_internal_references() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let cols = add_component(&mut data, &mut ids, "columns", Props::new(), root(), None, None)
            .unwrap();
        let child = add_component(&mut data, &mut ids, "text", Props::new(), cols, None, None)
            .unwrap();
        let zoned = add_component(&mut data, &mut ids, "card", Props::new(), root(), None, Some(ZoneId::new(cols, "left")))
            .unwrap();

        let copy = duplicate_component(&mut data, &mut ids, cols).unwrap();
        let copy_children = data.tree_children(Some(copy));
        assert_eq!(copy_children.len(), 2);
        assert!(!copy_children.contains(&child));
        assert!(!copy_children.contains(&zoned));
        assert!(data.zones.contains_key(&ZoneId::new(copy, "left")));
        assert_eq!(data.len(), 6);
        assert_valid(&data);
    }

    #[test]
    fn duplicate_unknown_returns_none() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        assert_eq!(duplicate_component(&mut data, &mut ids, id("ghost")), None);
    }

    #[test]
    fn move_between_parent_and_zone() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let a = add_component(&mut data, &mut ids, "section", Props::new(), root(), None, None)
            .unwrap();
        let b = add_component(&mut data, &mut ids, "columns", Props::new(), root(), None, None)
            .unwrap();
        let x = add_component(&mut data, &mut ids, "text", Props::new(), a, None, None).unwrap();
        let zone = ZoneId::new(b, "right");

        assert!(move_component(&mut data, x, root(), 0, Some(zone.clone())));
        assert!(data.get(a).unwrap().children.is_empty());
        assert_eq!(data.zones[&zone], vec![x]);
        assert_eq!(data.get(x).unwrap().zone_id.as_ref(), Some(&zone));
        assert_valid(&data);

        assert!(move_component(&mut data, x, root(), 0, None));
        assert_eq!(data.root.children, vec![x, a, b]);
        assert_eq!(data.get(x).unwrap().placement(), Placement::Root);
        assert_valid(&data);
    }

    #[test]
    fn move_within_list_reorders() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let a = add_component(&mut data, &mut ids, "a", Props::new(), root(), None, None).unwrap();
        let b = add_component(&mut data, &mut ids, "b", Props::new(), root(), None, None).unwrap();
        let c = add_component(&mut data, &mut ids, "c", Props::new(), root(), None, None).unwrap();

        assert!(move_component(&mut data, a, root(), 99, None));
        assert_eq!(data.root.children, vec![b, c, a]);
        assert!(!move_component(&mut data, a, root(), 2, None));
        assert!(!move_component(&mut data, a, root(), 7, None));
    }

    #[test]
    fn move_into_own_descendant_is_rejected() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let outer = add_component(&mut data, &mut ids, "section", Props::new(), root(), None, None)
            .unwrap();
        let inner = add_component(&mut data, &mut ids, "section", Props::new(), outer, None, None)
            .unwrap();
        let before = data.clone();

        assert!(!move_component(&mut data, outer, inner, 0, None));
        assert!(!move_component(&mut data, outer, outer, 0, None));
        assert!(!move_component(&mut data, outer, root(), 0, Some(ZoneId::new(inner, "main"))));
        assert!(!move_component(&mut data, outer, id("ghost"), 0, None));
        assert_eq!(data, before);
    }

    #[test]
    fn set_data_reports_change() {
        let mut data = PageData::new();
        let mut ids = IdGenerator::default();
        let same = apply_mutation(
            &mut data,
            &mut ids,
            PageMutation::SetData {
                data: Box::new(PageData::new()),
            },
        );
        assert!(!same.changed);

        let mut other = PageData::new();
        add_component(&mut other, &mut ids, "text", Props::new(), root(), None, None);
        let replaced = apply_mutation(
            &mut data,
            &mut ids,
            PageMutation::SetData {
                data: Box::new(other.clone()),
            },
        );
        assert!(replaced.changed);
        assert_eq!(data, other);
    }
}
