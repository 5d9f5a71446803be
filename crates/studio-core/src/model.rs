//! Core data model for Studio pages.
//!
//! A page is a tree of components stored flat: `components` maps every id to
//! its record, and ordering lives in placement lists (`root.children`, each
//! component's `children`, and named `zones`). Every component sits in
//! exactly one placement list.
//!
//! The maps are reference-counted so a `PageData` clone is O(1) and shares
//! all structure with the original. Writes go through `Arc::make_mut`: the
//! first write after a clone copies the map spine (one pointer per record)
//! and the single touched record, never the records themselves.

use crate::id::{ComponentId, ZoneId};
use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Arbitrary JSON-compatible configuration attached to a component.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// Ordered child ids of a component. Most components have few children.
pub type Children = SmallVec<[ComponentId; 4]>;

// ─── Components ──────────────────────────────────────────────────────────

/// A single node in the editable page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: ComponentId,

    /// Renderer tag (`hero`, `text`, `columns`, …). Opaque to the model.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub props: Props,

    #[serde(default, skip_serializing_if = "is_empty_children")]
    pub children: Children,

    /// Owning component; absent for top-level and zone-placed components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ComponentId>,

    /// Zone holding this component; takes the place of `parent_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<ZoneId>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

fn is_empty_children(children: &Children) -> bool {
    children.is_empty()
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Component {
    pub fn new(id: ComponentId, kind: impl Into<String>, props: Props) -> Self {
        Self {
            id,
            kind: kind.into(),
            props,
            children: SmallVec::new(),
            parent_id: None,
            zone_id: None,
            locked: false,
            hidden: false,
        }
    }

    /// Where this component claims to live, from its back-references.
    pub fn placement(&self) -> Placement {
        if let Some(zone) = &self.zone_id {
            return Placement::Zone(zone.clone());
        }
        match self.parent_id {
            Some(parent) if !parent.is_root() => Placement::Parent(parent),
            _ => Placement::Root,
        }
    }

    /// Point the back-references at `placement`.
    pub fn set_placement(&mut self, placement: &Placement) {
        match placement {
            Placement::Root => {
                self.parent_id = None;
                self.zone_id = None;
            }
            Placement::Parent(parent) => {
                self.parent_id = Some(*parent);
                self.zone_id = None;
            }
            Placement::Zone(zone) => {
                self.parent_id = None;
                self.zone_id = Some(zone.clone());
            }
        }
    }
}

/// The synthetic top of the page: top-level ordering plus page props.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
    #[serde(default)]
    pub children: Vec<ComponentId>,
    #[serde(default)]
    pub props: Props,
}

/// One of the three kinds of placement list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placement {
    Root,
    Parent(ComponentId),
    Zone(ZoneId),
}

impl Placement {
    /// A zone wins over a parent; the root sentinel maps to `Root`.
    pub fn resolve(parent: ComponentId, zone: Option<ZoneId>) -> Self {
        match zone {
            Some(zone) => Placement::Zone(zone),
            None if parent.is_root() => Placement::Root,
            None => Placement::Parent(parent),
        }
    }
}

// ─── Page ────────────────────────────────────────────────────────────────

/// The whole editable document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageData {
    #[serde(default)]
    pub root: Arc<RootNode>,

    #[serde(default, serialize_with = "serialize_sorted")]
    pub components: Arc<HashMap<ComponentId, Arc<Component>>>,

    #[serde(default)]
    pub zones: Arc<BTreeMap<ZoneId, Vec<ComponentId>>>,
}

/// Emit components ordered by id so serialized pages are stable.
fn serialize_sorted<S: Serializer>(
    components: &Arc<HashMap<ComponentId, Arc<Component>>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let sorted: BTreeMap<&str, &Component> = components
        .iter()
        .map(|(id, c)| (id.as_str(), c.as_ref()))
        .collect();
    sorted.serialize(serializer)
}

impl PartialEq for PageData {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.root, &other.root) || self.root == other.root)
            && (Arc::ptr_eq(&self.components, &other.components)
                || self.components == other.components)
            && (Arc::ptr_eq(&self.zones, &other.zones) || self.zones == other.zones)
    }
}

impl PageData {
    /// An empty page: a root with no children.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: PageData = serde_json::from_str(json)?;
        log::debug!("loaded page with {} components", data.len());
        Ok(data)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id).map(Arc::as_ref)
    }

    // ─── Copy-on-write access ────────────────────────────────────────────

    /// Mutable access to one component; clones only that record if shared.
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        if !self.contains(id) {
            return None;
        }
        Arc::make_mut(&mut self.components)
            .get_mut(&id)
            .map(Arc::make_mut)
    }

    pub fn root_mut(&mut self) -> &mut RootNode {
        Arc::make_mut(&mut self.root)
    }

    pub fn components_mut(&mut self) -> &mut HashMap<ComponentId, Arc<Component>> {
        Arc::make_mut(&mut self.components)
    }

    pub fn zones_mut(&mut self) -> &mut BTreeMap<ZoneId, Vec<ComponentId>> {
        Arc::make_mut(&mut self.zones)
    }

    // ─── Placement lists ─────────────────────────────────────────────────

    /// The ordered ids of a placement list, if it exists.
    pub fn placement_list(&self, placement: &Placement) -> Option<&[ComponentId]> {
        match placement {
            Placement::Root => Some(&self.root.children),
            Placement::Parent(parent) => self.get(*parent).map(|c| c.children.as_slice()),
            Placement::Zone(zone) => self.zones.get(zone).map(Vec::as_slice),
        }
    }

    /// The placement and index of `id` within its list.
    pub fn position_of(&self, id: ComponentId) -> Option<(Placement, usize)> {
        let placement = self.get(id)?.placement();
        let index = self
            .placement_list(&placement)?
            .iter()
            .position(|&c| c == id)?;
        Some((placement, index))
    }

    /// Insert `id` into a placement list at `index` (clamped; `None` appends).
    ///
    /// Creates the zone list or the parent's children list when absent.
    /// Returns `false` when the list cannot exist (unknown parent).
    pub fn insert_into(
        &mut self,
        placement: &Placement,
        index: Option<usize>,
        id: ComponentId,
    ) -> bool {
        fn clamp(index: Option<usize>, len: usize) -> usize {
            index.map_or(len, |i| i.min(len))
        }
        match placement {
            Placement::Root => {
                let list = &mut self.root_mut().children;
                let at = clamp(index, list.len());
                list.insert(at, id);
            }
            Placement::Parent(parent) => {
                let Some(parent) = self.get_mut(*parent) else {
                    return false;
                };
                let at = clamp(index, parent.children.len());
                parent.children.insert(at, id);
            }
            Placement::Zone(zone) => {
                let list = self.zones_mut().entry(zone.clone()).or_default();
                let at = clamp(index, list.len());
                list.insert(at, id);
            }
        }
        true
    }

    /// Remove `id` from a placement list; returns the index it had.
    pub fn remove_from(&mut self, placement: &Placement, id: ComponentId) -> Option<usize> {
        let index = self
            .placement_list(placement)?
            .iter()
            .position(|&c| c == id)?;
        match placement {
            Placement::Root => {
                self.root_mut().children.remove(index);
            }
            Placement::Parent(parent) => {
                self.get_mut(*parent)?.children.remove(index);
            }
            Placement::Zone(zone) => {
                self.zones_mut().get_mut(zone)?.remove(index);
            }
        }
        Some(index)
    }

    // ─── Zones ───────────────────────────────────────────────────────────

    /// The component hosting `zone`, or `None` for page-level zones
    /// (no owner, `root` owner, or an owner not in this page).
    pub fn zone_host(&self, zone: &ZoneId) -> Option<ComponentId> {
        zone.owner().filter(|owner| self.contains(*owner))
    }

    /// Zones owned by `owner`, in zone-id order.
    ///
    /// Agrees with `ZoneId::owner`: `a:b:main` belongs to `a:b`, not `a`.
    pub fn owned_zones(
        &self,
        owner: ComponentId,
    ) -> impl Iterator<Item = (&ZoneId, &Vec<ComponentId>)> {
        let start = ZoneId::from(format!("{}:", owner.as_str()).as_str());
        // ';' is the byte after ':', so this bounds every `<owner>:…` key.
        let end = ZoneId::from(format!("{};", owner.as_str()).as_str());
        self.zones
            .range(start..end)
            .filter(move |(zone, _)| zone.owner() == Some(owner))
    }

    // ─── Tree queries ────────────────────────────────────────────────────

    /// Children in tree order: ordinary children, then zone members.
    ///
    /// `None` is the root, whose tree children also include page-level zones.
    pub fn tree_children(&self, owner: Option<ComponentId>) -> Vec<ComponentId> {
        match owner {
            None => {
                let mut out = self.root.children.clone();
                for (zone, members) in self.zones.iter() {
                    if self.zone_host(zone).is_none() {
                        out.extend(members.iter().copied());
                    }
                }
                out
            }
            Some(id) => {
                let Some(component) = self.get(id) else {
                    return Vec::new();
                };
                let mut out: Vec<ComponentId> = component.children.to_vec();
                for (_, members) in self.owned_zones(id) {
                    out.extend(members.iter().copied());
                }
                out
            }
        }
    }

    /// The tree parent of `id` (`None` for top-level components).
    pub fn tree_parent(&self, id: ComponentId) -> Option<ComponentId> {
        match self.get(id)?.placement() {
            Placement::Root => None,
            Placement::Parent(parent) => Some(parent),
            Placement::Zone(zone) => self.zone_host(&zone),
        }
    }

    /// Ancestors of `id`, nearest first. Stops on a malformed cycle.
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.tree_parent(current) {
            if !seen.insert(parent) {
                break;
            }
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: ComponentId, descendant: ComponentId) -> bool {
        ancestor != descendant && self.ancestors(descendant).contains(&ancestor)
    }

    /// `id` and all of its transitive descendants, in pre-order.
    ///
    /// Each id is visited once, so a malformed cycle cannot loop forever.
    pub fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) || !self.contains(current) {
                continue;
            }
            out.push(current);
            let children = self.tree_children(Some(current));
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Transitive descendants of `id`, excluding `id`.
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut subtree = self.subtree(id);
        if !subtree.is_empty() {
            subtree.remove(0);
        }
        subtree
    }

    /// Every reachable component in depth-first pre-order.
    pub fn preorder(&self) -> Vec<ComponentId> {
        let mut out = Vec::with_capacity(self.len());
        let mut seen = HashSet::new();
        for top in self.tree_children(None) {
            for id in self.subtree(top) {
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        out
    }
}
