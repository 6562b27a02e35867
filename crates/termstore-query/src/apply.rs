//! Applying evaluation batches to a store.

use crate::change::{ChangeKind, MemberChange};
use crate::evaluator::{EvaluationCursor, EvaluationStats, QueryEvaluator};
use serde::Serialize;
use termstore_kernel::{Member, MemberPayload, Result, TermstoreError};
use termstore_reconcile::{ensure_active, remove_or_deactivate};
use termstore_store::{QueryResolver, RevisionStore};
use tracing::{debug, info, instrument, warn};

/// Apply one batch of changes to members of `target_refset_id`.
///
/// `add` creates a simple member recorded in `module_id`; `remove` and
/// `change` also move the member they touch to `module_id`. Returns the
/// number of changes that modified the store.
pub fn apply_changes<S: RevisionStore + ?Sized>(
    store: &mut S,
    target_refset_id: &str,
    module_id: &str,
    changes: &[MemberChange],
) -> Result<usize> {
    let mut applied = 0;
    for change in changes {
        let changed = match change.kind {
            ChangeKind::Add => {
                store.add_member(Member::new(
                    target_refset_id,
                    &change.referenced_component_id,
                    module_id,
                    MemberPayload::Simple,
                ))?;
                true
            }
            ChangeKind::Remove => {
                let member = change_member(store, change)?;
                remove_or_deactivate(store, &member, Some(module_id))?
            }
            ChangeKind::Change => {
                let member = change_member(store, change)?;
                ensure_active(store, &member, Some(module_id))?
            }
        };
        if changed {
            applied += 1;
        }
    }
    Ok(applied)
}

fn change_member<S: RevisionStore + ?Sized>(store: &S, change: &MemberChange) -> Result<Member> {
    let member_id = change.member_id.as_deref().ok_or_else(|| {
        TermstoreError::validation(format!(
            "{} change for component '{}' names no member",
            change.kind, change.referenced_component_id
        ))
    })?;
    store.member(member_id)
}

impl EvaluationCursor {
    /// Apply a batch this cursor produced.
    pub fn apply<S: RevisionStore + ?Sized>(
        &self,
        store: &mut S,
        changes: &[MemberChange],
    ) -> Result<usize> {
        apply_changes(store, self.target_refset_id(), self.module_id(), changes)
    }
}

/// Outcome of a full evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub batches: usize,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    /// Changes that actually modified the store.
    pub applied: usize,
}

impl EvaluationSummary {
    fn new(stats: EvaluationStats, batches: usize, applied: usize) -> Self {
        Self {
            batches,
            added: stats.added,
            removed: stats.removed,
            changed: stats.changed,
            applied,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.removed + self.changed
    }
}

impl QueryEvaluator {
    /// Evaluate `query_member_id` to completion, committing after each batch.
    ///
    /// A failing batch is rolled back; batches committed before it stay.
    #[instrument(skip(self, store, resolver))]
    pub fn run<S, R>(
        &self,
        store: &mut S,
        resolver: &R,
        query_member_id: &str,
    ) -> Result<EvaluationSummary>
    where
        S: RevisionStore + ?Sized,
        R: QueryResolver + ?Sized,
    {
        let mut cursor = self.evaluate(&*store, query_member_id)?;
        let mut batches = 0;
        let mut applied = 0;

        while let Some(batch) = cursor.next_batch(&*store, resolver)? {
            batches += 1;
            let outcome = cursor.apply(store, &batch).and_then(|count| {
                store.commit(&format!("query member {query_member_id}: batch {batches}"))?;
                Ok(count)
            });
            match outcome {
                Ok(count) => {
                    debug!(batch = batches, size = batch.len(), applied = count, "Committed query batch");
                    applied += count;
                }
                Err(err) => {
                    warn!(batch = batches, error = %err, "Query batch failed, rolling back");
                    store.rollback();
                    return Err(err);
                }
            }
        }

        let summary = EvaluationSummary::new(cursor.stats(), batches, applied);
        info!(
            refset = %cursor.target_refset_id(),
            batches,
            applied,
            "Query member evaluated"
        );
        Ok(summary)
    }
}
