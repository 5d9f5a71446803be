//! Structural validation for Studio pages.
//!
//! Reports broken tree invariants without modifying the page. The editor
//! never repairs documents; loaders use this to refuse malformed input and
//! tests use it to check that every mutation leaves a well-formed tree.

use crate::id::ComponentId;
use crate::model::{PageData, Placement};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashMap;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The tree is inconsistent; mutations may misbehave.
    Error,
    /// Consistent but suspicious (e.g. unreachable records).
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The component this diagnostic refers to.
    pub component_id: ComponentId,
    /// Human-readable message.
    pub message: String,
    pub severity: Severity,
    /// Short rule identifier (e.g. "dangling-reference", "cycle").
    pub rule: &'static str,
}

impl Diagnostic {
    fn error(component_id: ComponentId, rule: &'static str, message: String) -> Self {
        Self {
            component_id,
            message,
            severity: Severity::Error,
            rule,
        }
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run every structural rule over the page and return diagnostics.
#[must_use]
pub fn validate_document(data: &PageData) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let lists = placement_lists(data);
    check_dangling(&lists, data, &mut diags);
    check_duplicates(&lists, &mut diags);
    check_back_references(data, &mut diags);
    check_orphans(&lists, data, &mut diags);
    check_cycles(data, &mut diags);
    diags
}

/// True when the page has no error-level findings.
#[must_use]
pub fn is_well_formed(data: &PageData) -> bool {
    validate_document(data)
        .iter()
        .all(|d| d.severity != Severity::Error)
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Every placement list in the page, with a label for messages.
fn placement_lists(data: &PageData) -> Vec<(String, Placement, Vec<ComponentId>)> {
    let mut lists = vec![(
        "root".to_string(),
        Placement::Root,
        data.root.children.clone(),
    )];
    let mut owners: Vec<_> = data.components.keys().copied().collect();
    owners.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    for owner in owners {
        if let Some(component) = data.get(owner)
            && !component.children.is_empty()
        {
            lists.push((
                format!("children of `{owner}`"),
                Placement::Parent(owner),
                component.children.to_vec(),
            ));
        }
    }
    for (zone, members) in data.zones.iter() {
        lists.push((
            format!("zone `{zone}`"),
            Placement::Zone(zone.clone()),
            members.clone(),
        ));
    }
    lists
}

/// Invariant 1: listed ids must exist.
fn check_dangling(
    lists: &[(String, Placement, Vec<ComponentId>)],
    data: &PageData,
    diags: &mut Vec<Diagnostic>,
) {
    for (label, _, members) in lists {
        for &id in members {
            if !data.contains(id) {
                diags.push(Diagnostic::error(
                    id,
                    "dangling-reference",
                    format!("`{id}` is listed in {label} but has no component record."),
                ));
            }
        }
    }
}

/// Invariant 3: an id appears in at most one placement list, once.
fn check_duplicates(lists: &[(String, Placement, Vec<ComponentId>)], diags: &mut Vec<Diagnostic>) {
    let mut first_seen: HashMap<ComponentId, &str> = HashMap::new();
    for (label, _, members) in lists {
        for &id in members {
            if let Some(previous) = first_seen.insert(id, label) {
                diags.push(Diagnostic::error(
                    id,
                    "duplicate-placement",
                    format!("`{id}` is listed in both {previous} and {label}."),
                ));
            }
        }
    }
}

/// Invariant 2: back-references agree with the lists, and each record
/// agrees with its key.
fn check_back_references(data: &PageData, diags: &mut Vec<Diagnostic>) {
    for (&id, component) in data.components.iter() {
        if id.is_root() {
            diags.push(Diagnostic::error(
                id,
                "reserved-id",
                "`root` is reserved for the page root.".to_string(),
            ));
        }
        if component.id != id {
            diags.push(Diagnostic::error(
                id,
                "id-mismatch",
                format!("record stored under `{id}` carries id `{}`.", component.id),
            ));
        }
        let has_parent = component.parent_id.is_some_and(|p| !p.is_root());
        if has_parent && component.zone_id.is_some() {
            diags.push(Diagnostic::error(
                id,
                "ambiguous-placement",
                format!("`{id}` has both a parentId and a zoneId."),
            ));
            continue;
        }
        let placement = component.placement();
        let listed = data
            .placement_list(&placement)
            .is_some_and(|list| list.contains(&id));
        if listed {
            continue;
        }
        let (rule, message) = match &placement {
            Placement::Root => (
                "parent-mismatch",
                format!("`{id}` has no parent but is not in the root children."),
            ),
            Placement::Parent(parent) if !data.contains(*parent) => (
                "parent-mismatch",
                format!("`{id}` points at missing parent `{parent}`."),
            ),
            Placement::Parent(parent) => (
                "parent-mismatch",
                format!("`{id}` claims parent `{parent}` which does not list it."),
            ),
            Placement::Zone(zone) => (
                "zone-mismatch",
                format!("`{id}` claims zone `{zone}` which does not list it."),
            ),
        };
        diags.push(Diagnostic::error(id, rule, message));
    }
}

/// Records that no placement list mentions at all.
fn check_orphans(
    lists: &[(String, Placement, Vec<ComponentId>)],
    data: &PageData,
    diags: &mut Vec<Diagnostic>,
) {
    for &id in data.components.keys() {
        let listed = lists.iter().any(|(_, _, members)| members.contains(&id));
        if !listed {
            diags.push(Diagnostic {
                component_id: id,
                message: format!("`{id}` is not placed anywhere in the page."),
                severity: Severity::Warning,
                rule: "orphan",
            });
        }
    }
}

/// Invariant 4: containment must be acyclic.
fn check_cycles(data: &PageData, diags: &mut Vec<Diagnostic>) {
    let mut graph: DiGraphMap<ComponentId, ()> = DiGraphMap::new();
    for (&id, component) in data.components.iter() {
        graph.add_node(id);
        for &child in &component.children {
            graph.add_edge(id, child, ());
        }
        for (_, members) in data.owned_zones(id) {
            for &member in members {
                graph.add_edge(id, member, ());
            }
        }
    }
    for scc in tarjan_scc(&graph) {
        let is_cycle = scc.len() > 1 || scc.iter().any(|&n| graph.contains_edge(n, n));
        if !is_cycle {
            continue;
        }
        for &id in &scc {
            diags.push(Diagnostic::error(
                id,
                "cycle",
                format!("`{id}` is its own ancestor ({} components in the cycle).", scc.len()),
            ));
        }
    }
}
