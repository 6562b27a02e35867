//! Identifier ledger: reservation, assignment and lifecycle status.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use termstore_kernel::{ComponentCategory, Namespace, Result, Sctid, TermstoreError};
use tracing::debug;

/// Where an identifier is in its lifecycle.
///
/// ```text
/// available ──reserve/register──▶ reserved ──commit──▶ assigned ──publish──▶ published
///     ▲                              │                    │                     │
///     └────────────release───────────┴────────────────────┘      deprecate ─────┴──▶ deprecated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStatus {
    Available,
    Reserved,
    Assigned,
    Published,
    Deprecated,
}

impl IdentifierStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Assigned => "assigned",
            Self::Published => "published",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for IdentifierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hands out component identifiers and tracks the status of each.
///
/// Reservations and registrations made inside a transaction are `reserved`
/// until `commit` assigns them; `rollback` makes them available again.
/// `release`, `publish` and `deprecate` take effect immediately and return
/// the ids whose status changed.
pub trait IdentifierRecorder {
    /// Up to `count` identifiers never handed out before. Returns fewer when
    /// the namespace has nothing left.
    fn reserve(
        &mut self,
        namespace: &Namespace,
        category: ComponentCategory,
        count: usize,
    ) -> Result<Vec<String>>;

    /// Record caller-chosen identifiers. Taken ids are `AlreadyExists`.
    fn register(&mut self, ids: &[String]) -> Result<()>;

    /// Status of one id. Ids the ledger never saw are `available`.
    fn status(&self, id: &str) -> IdentifierStatus;

    fn statuses(&self, ids: &[String]) -> BTreeMap<String, IdentifierStatus> {
        ids.iter().map(|id| (id.clone(), self.status(id))).collect()
    }

    /// Return reserved or assigned ids to the pool.
    fn release(&mut self, ids: &[String]) -> Result<Vec<String>>;

    /// Mark ids as part of a published release.
    fn publish(&mut self, ids: &[String]) -> Result<Vec<String>>;

    /// Retire assigned or published ids for good.
    fn deprecate(&mut self, ids: &[String]) -> Result<Vec<String>>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self);
}

type Sequence = (Namespace, ComponentCategory);

/// Sequential item ids per namespace and category.
#[derive(Debug, Clone)]
pub struct MemoryIdentifierRecorder {
    /// Committed statuses; available ids are absent.
    ledger: BTreeMap<String, IdentifierStatus>,
    pending: BTreeSet<String>,
    next_item: BTreeMap<Sequence, u64>,
    staged_next_item: BTreeMap<Sequence, u64>,
    start_item: u64,
    item_limit: Option<u64>,
}

impl Default for MemoryIdentifierRecorder {
    fn default() -> Self {
        Self {
            ledger: BTreeMap::new(),
            pending: BTreeSet::new(),
            next_item: BTreeMap::new(),
            staged_next_item: BTreeMap::new(),
            start_item: 1,
            item_limit: None,
        }
    }
}

impl MemoryIdentifierRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// First item id of every sequence.
    pub fn with_start_item(mut self, start_item: u64) -> Self {
        self.start_item = start_item.max(1);
        self
    }

    /// Highest item id any sequence may reach.
    pub fn with_item_limit(mut self, item_limit: u64) -> Self {
        self.item_limit = Some(item_limit);
        self
    }

    pub fn is_assigned(&self, id: &str) -> bool {
        self.status(id) == IdentifierStatus::Assigned
    }

    pub fn assigned(&self) -> impl Iterator<Item = &str> {
        self.ledger
            .iter()
            .filter(|(_, status)| **status == IdentifierStatus::Assigned)
            .map(|(id, _)| id.as_str())
    }

    fn taken(&self, id: &str) -> bool {
        self.status(id) != IdentifierStatus::Available
    }

    /// Move every id whose status is in `from` to `to`. Ids already at `to`
    /// are skipped; any other status fails the whole call.
    fn transition(
        &mut self,
        ids: &[String],
        action: &'static str,
        from: &[IdentifierStatus],
        to: IdentifierStatus,
    ) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        let mut changing = Vec::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let status = self.status(id);
            if status == to {
                continue;
            }
            if !from.contains(&status) {
                return Err(TermstoreError::validation(format!(
                    "cannot {action} identifier '{id}': it is {status}"
                )));
            }
            changing.push(id.clone());
        }

        for id in &changing {
            self.pending.remove(id);
            if to == IdentifierStatus::Available {
                self.ledger.remove(id);
            } else {
                self.ledger.insert(id.clone(), to);
            }
        }
        if !changing.is_empty() {
            debug!(action, count = changing.len(), status = %to, "Changed identifier status");
        }
        Ok(changing)
    }
}

impl IdentifierRecorder for MemoryIdentifierRecorder {
    fn reserve(
        &mut self,
        namespace: &Namespace,
        category: ComponentCategory,
        count: usize,
    ) -> Result<Vec<String>> {
        let key = (namespace.clone(), category);
        let mut item = self
            .staged_next_item
            .get(&key)
            .or_else(|| self.next_item.get(&key))
            .copied()
            .unwrap_or(self.start_item);
        let max_item = Sctid::max_item_id(namespace);
        let last_item = self.item_limit.map_or(max_item, |limit| limit.min(max_item));

        let mut reserved = Vec::new();
        while reserved.len() < count && item <= last_item {
            let id = Sctid::generate(item, namespace, category)?.into_string();
            item += 1;
            if !self.taken(&id) {
                self.pending.insert(id.clone());
                reserved.push(id);
            }
        }
        self.staged_next_item.insert(key, item);

        debug!(
            namespace = %namespace,
            category = %category,
            requested = count,
            reserved = reserved.len(),
            "Reserved identifiers"
        );
        Ok(reserved)
    }

    fn register(&mut self, ids: &[String]) -> Result<()> {
        if let Some(taken) = ids.iter().find(|id| self.taken(id)) {
            return Err(TermstoreError::already_exists("identifier", taken.as_str()));
        }
        let mut seen = BTreeSet::new();
        if let Some(repeated) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(TermstoreError::already_exists("identifier", repeated.as_str()));
        }
        self.pending.extend(ids.iter().cloned());
        Ok(())
    }

    fn status(&self, id: &str) -> IdentifierStatus {
        if self.pending.contains(id) {
            return IdentifierStatus::Reserved;
        }
        self.ledger
            .get(id)
            .copied()
            .unwrap_or(IdentifierStatus::Available)
    }

    fn release(&mut self, ids: &[String]) -> Result<Vec<String>> {
        self.transition(
            ids,
            "release",
            &[IdentifierStatus::Reserved, IdentifierStatus::Assigned],
            IdentifierStatus::Available,
        )
    }

    fn publish(&mut self, ids: &[String]) -> Result<Vec<String>> {
        self.transition(
            ids,
            "publish",
            &[IdentifierStatus::Available, IdentifierStatus::Assigned],
            IdentifierStatus::Published,
        )
    }

    fn deprecate(&mut self, ids: &[String]) -> Result<Vec<String>> {
        self.transition(
            ids,
            "deprecate",
            &[IdentifierStatus::Assigned, IdentifierStatus::Published],
            IdentifierStatus::Deprecated,
        )
    }

    fn commit(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        self.ledger.extend(
            pending
                .into_iter()
                .map(|id| (id, IdentifierStatus::Assigned)),
        );
        let staged = std::mem::take(&mut self.staged_next_item);
        self.next_item.extend(staged);
        Ok(())
    }

    fn rollback(&mut self) {
        if !self.pending.is_empty() {
            debug!(released = self.pending.len(), "Released identifier reservations");
        }
        self.pending.clear();
        self.staged_next_item.clear();
    }
}
