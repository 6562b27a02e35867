//! Collision-free identifier allocation from a namespace.

use serde::Serialize;
use std::collections::BTreeSet;
use termstore_kernel::{ComponentCategory, EditConfig, Namespace, Result, TermstoreError};
use termstore_store::{IdentifierRecorder, RevisionStore};
use tracing::{debug, info, warn};

/// Ids handed out for one (namespace, category) group.
///
/// The ids stay reserved with the recorder until the enclosing transaction
/// commits or rolls back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationTicket {
    pub namespace: Namespace,
    pub category: ComponentCategory,
    pub ids: Vec<String>,
    /// Reservation rounds it took.
    pub attempts: usize,
    /// Reserved ids dropped because the store already held them.
    pub collisions: usize,
}

impl ReservationTicket {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    max_attempts: usize,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(&EditConfig::default())
    }
}

impl IdAllocator {
    pub fn new(config: &EditConfig) -> Self {
        Self::with_max_attempts(config.id_max_attempts)
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Reserve `count` ids unused by both the recorder and the store.
    ///
    /// Each round asks the recorder for the ids still missing and drops the
    /// ones the store already holds. Fails with `ExhaustedResource` when
    /// `max_attempts` rounds do not yield `count` ids, or earlier once the
    /// recorder has nothing left. Reservations made before the failure are
    /// left for the caller to roll back.
    pub fn allocate<S, R>(
        &self,
        store: &S,
        recorder: &mut R,
        category: ComponentCategory,
        namespace: &Namespace,
        count: usize,
    ) -> Result<ReservationTicket>
    where
        S: RevisionStore + ?Sized,
        R: IdentifierRecorder + ?Sized,
    {
        let mut ids = Vec::new();
        let mut seen = BTreeSet::new();
        let mut attempts = 0;
        let mut collisions = 0;

        while ids.len() < count && attempts < self.max_attempts {
            attempts += 1;
            let reserved = recorder.reserve(namespace, category, count - ids.len())?;
            if reserved.is_empty() {
                break;
            }
            for id in reserved {
                if store.contains_id(&id) || !seen.insert(id.clone()) {
                    debug!(id = %id, "Discarded colliding identifier");
                    collisions += 1;
                    continue;
                }
                ids.push(id);
            }
        }

        if ids.len() < count {
            warn!(
                namespace = %namespace,
                category = %category,
                requested = count,
                allocated = ids.len(),
                attempts,
                "Namespace exhausted"
            );
            return Err(TermstoreError::ExhaustedResource {
                namespace: namespace.to_string(),
                category: category.to_string(),
                requested: count,
                allocated: ids.len(),
            });
        }

        info!(
            namespace = %namespace,
            category = %category,
            count,
            attempts,
            collisions,
            "Allocated identifiers"
        );
        Ok(ReservationTicket {
            namespace: namespace.clone(),
            category,
            ids,
            attempts,
            collisions,
        })
    }
}
