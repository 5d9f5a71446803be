use crate::model::PageData;
use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for component IDs: fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// The reserved id of the synthetic document root.
const ROOT: &str = "root";

/// A lightweight, interned identifier for components in a page.
/// Internally a `Spur` index (4 bytes, Copy, O(1) Eq and Hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(Spur);

impl ComponentId {
    /// Intern a string as a ComponentId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        ComponentId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// The root sentinel. Never a key in `PageData::components`.
    pub fn root() -> Self {
        Self::intern(ROOT)
    }

    pub fn is_root(&self) -> bool {
        self.as_str() == ROOT
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl Serialize for ComponentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ComponentId::intern(&s))
    }
}

// ─── Zones ───────────────────────────────────────────────────────────────

/// Identifier of a named slot, in the compound form `<owner>:<slot>`.
///
/// The slot is everything after the last `:`, so component ids may contain
/// `:` but slot names may not. A zone whose owner part is missing or `root`
/// is a page-level zone.
/// Ordered lexicographically so zone iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Build the zone id for `slot` on `owner`.
    pub fn new(owner: ComponentId, slot: &str) -> Self {
        ZoneId(format!("{}:{slot}", owner.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The component that owns this zone, if any.
    pub fn owner(&self) -> Option<ComponentId> {
        let (owner, _) = self.0.rsplit_once(':')?;
        if owner.is_empty() || owner == ROOT {
            return None;
        }
        Some(ComponentId::intern(owner))
    }

    /// The slot name (the whole id when there is no owner part).
    pub fn slot(&self) -> &str {
        self.0.rsplit_once(':').map_or(self.0.as_str(), |(_, slot)| slot)
    }

    /// The same slot re-homed on another owner.
    pub fn with_owner(&self, owner: ComponentId) -> Self {
        Self::new(owner, self.slot())
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        ZoneId(s.to_string())
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Id generation ───────────────────────────────────────────────────────

/// Generates fresh component ids (`c1`, `c2`, …) for one editing session.
///
/// Owned by the session rather than a process-wide counter, so two open
/// documents never interfere. Ids are monotonic and never reused within a
/// generator's lifetime, including ids that only survive in undo history.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("c")
    }
}

impl IdGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 1,
        }
    }

    /// A generator that continues after the largest `<prefix><N>` in `data`.
    pub fn resume(prefix: &str, data: &PageData) -> Self {
        let mut generator = Self::new(prefix);
        generator.observe(data);
        generator
    }

    /// Advance past every numbered id already present in `data`.
    pub fn observe(&mut self, data: &PageData) {
        let highest = data
            .components
            .keys()
            .filter_map(|id| id.as_str().strip_prefix(self.prefix.as_str()))
            .filter_map(|n| n.parse::<u64>().ok())
            .max();
        if let Some(n) = highest {
            self.next = self.next.max(n + 1);
        }
    }

    /// Produce an id not present in `data`, and not already named as the
    /// owner of a page-level zone (which the new component would adopt).
    pub fn next_id(&mut self, data: &PageData) -> ComponentId {
        loop {
            let candidate = ComponentId::intern(&format!("{}{}", self.prefix, self.next));
            self.next += 1;
            if !data.contains(candidate)
                && !candidate.is_root()
                && data.owned_zones(candidate).next().is_none()
            {
                return candidate;
            }
        }
    }
}
