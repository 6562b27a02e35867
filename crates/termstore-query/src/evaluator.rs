//! Two-phase diff of a query's result against its target refset.
//!
//! Phase 1 (expected) pages through the query result. For each page the
//! target refset's members referencing the page's components are scanned in
//! id order:
//! - the first member per component keeps it (`change` if inactive)
//! - any later active member for the same component is `remove`d
//! - components nobody referenced are `add`ed
//!
//! Phase 2 (unexpected) keyset-pages over the refset's active members and
//! removes every member whose component the query no longer matches.
//! Phase 2 only starts once phase 1 is exhausted.

use crate::change::{ChangeKind, MemberChange};
use std::collections::{BTreeSet, VecDeque};
use termstore_kernel::{EditConfig, MemberPayload, Result, TermstoreError};
use termstore_store::{MemberQuery, QueryResolver, RevisionStore};
use tracing::{debug, info};

/// Page and batch sizes of query evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryEvaluator {
    page_size: usize,
    batch_size: usize,
}

impl QueryEvaluator {
    pub fn new(config: &EditConfig) -> Self {
        Self {
            page_size: config.query_page_size.max(1),
            batch_size: config.change_batch_size.max(1),
        }
    }

    /// Start evaluating query member `query_member_id`.
    ///
    /// Inactive query members and blank expressions yield a cursor with no
    /// changes.
    pub fn evaluate<S: RevisionStore + ?Sized>(
        &self,
        store: &S,
        query_member_id: &str,
    ) -> Result<EvaluationCursor> {
        let member = store.member(query_member_id)?;
        let MemberPayload::Query { query } = &member.payload else {
            return Err(TermstoreError::validation(format!(
                "member '{query_member_id}' is a {} member, not a query member",
                member.kind()
            )));
        };

        let expression = query.trim().to_string();
        let phase = if !member.active || expression.is_empty() {
            debug!(member = %member.id, active = member.active, "Query member yields no changes");
            Phase::Done
        } else {
            Phase::Expected { after: None }
        };

        Ok(EvaluationCursor {
            target_refset_id: member.referenced_component_id.clone(),
            module_id: member.module_id.clone(),
            expression,
            page_size: self.page_size,
            batch_size: self.batch_size,
            phase,
            buffer: VecDeque::new(),
            stats: EvaluationStats::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Expected { after: Option<String> },
    Unexpected { after: Option<String> },
    Done,
}

/// Number of changes emitted so far, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

impl EvaluationStats {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.changed
    }

    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Add => self.added += 1,
            ChangeKind::Remove => self.removed += 1,
            ChangeKind::Change => self.changed += 1,
        }
    }
}

/// A paused evaluation.
///
/// Each batch is computed against the store passed to
/// [`EvaluationCursor::next_batch`], so the caller applies and commits one
/// batch before asking for the next. Every batch must be applied: removals
/// of unexpected members are only emitted once all expected pages are done.
#[derive(Debug, Clone)]
pub struct EvaluationCursor {
    target_refset_id: String,
    module_id: String,
    expression: String,
    page_size: usize,
    batch_size: usize,
    phase: Phase,
    buffer: VecDeque<MemberChange>,
    stats: EvaluationStats,
}

impl EvaluationCursor {
    pub fn target_refset_id(&self) -> &str {
        &self.target_refset_id
    }

    /// Module recorded on members this evaluation adds or touches.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = module_id.into();
        self
    }

    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done && self.buffer.is_empty()
    }

    /// The next batch of at most `change_batch_size` changes, or `None` once
    /// the evaluation is exhausted.
    pub fn next_batch<S, R>(&mut self, store: &S, resolver: &R) -> Result<Option<Vec<MemberChange>>>
    where
        S: RevisionStore + ?Sized,
        R: QueryResolver + ?Sized,
    {
        while self.buffer.len() < self.batch_size {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Expected { after } => {
                    self.phase = self.scan_expected(store, resolver, after)?;
                }
                Phase::Unexpected { after } => {
                    self.phase = self.scan_unexpected(store, resolver, after)?;
                }
                Phase::Done => break,
            }
        }

        if self.buffer.is_empty() {
            return Ok(None);
        }
        let take = self.buffer.len().min(self.batch_size);
        let batch: Vec<MemberChange> = self.buffer.drain(..take).collect();
        if self.is_done() {
            info!(
                refset = %self.target_refset_id,
                added = self.stats.added,
                removed = self.stats.removed,
                changed = self.stats.changed,
                "Query evaluation complete"
            );
        }
        Ok(Some(batch))
    }

    fn push(&mut self, change: MemberChange) {
        self.stats.record(change.kind);
        self.buffer.push_back(change);
    }

    fn scan_expected<S, R>(&mut self, store: &S, resolver: &R, after: Option<String>) -> Result<Phase>
    where
        S: RevisionStore + ?Sized,
        R: QueryResolver + ?Sized,
    {
        let page = resolver.resolve_page(&self.expression, after.as_deref(), self.page_size)?;
        let mut expected: BTreeSet<String> = page.ids.into_iter().collect();
        let mut consumed = BTreeSet::new();

        if !expected.is_empty() {
            let mut query = MemberQuery::refset(self.target_refset_id.clone(), self.page_size)
                .referencing(expected.clone());
            loop {
                let members = store.search_members(&query)?;
                for member in members.items {
                    let component_id = &member.referenced_component_id;
                    if expected.remove(component_id) {
                        consumed.insert(component_id.clone());
                        if !member.active {
                            self.push(MemberChange::change(component_id, &member.id));
                        }
                    } else if member.active && consumed.contains(component_id) {
                        self.push(MemberChange::remove(component_id, &member.id));
                    }
                }
                match members.search_after {
                    Some(next) => query = query.after(Some(next)),
                    None => break,
                }
            }
        }

        for component_id in expected {
            self.push(MemberChange::add(component_id));
        }

        Ok(match page.search_after {
            Some(next) => Phase::Expected { after: Some(next) },
            None => Phase::Unexpected { after: None },
        })
    }

    fn scan_unexpected<S, R>(&mut self, store: &S, resolver: &R, after: Option<String>) -> Result<Phase>
    where
        S: RevisionStore + ?Sized,
        R: QueryResolver + ?Sized,
    {
        let query = MemberQuery::refset(self.target_refset_id.clone(), self.page_size)
            .active(true)
            .after(after);
        let page = store.search_members(&query)?;

        let candidates: BTreeSet<String> = page
            .items
            .iter()
            .map(|member| member.referenced_component_id.clone())
            .collect();
        let matched = if candidates.is_empty() {
            BTreeSet::new()
        } else {
            resolver.matching(&self.expression, &candidates)?
        };
        for member in &page.items {
            if !matched.contains(&member.referenced_component_id) {
                self.push(MemberChange::remove(
                    &member.referenced_component_id,
                    &member.id,
                ));
            }
        }

        Ok(match page.search_after {
            Some(next) => Phase::Unexpected { after: Some(next) },
            None => Phase::Done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termstore_kernel::{Component, EffectiveTime, Member};
    use termstore_store::{MemoryQueryResolver, MemoryRevisionStore};

    const CORE: &str = "900000000000207008";
    const QUERY_REFSET: &str = "900000000000512005";
    const TARGET: &str = "723264001";
    const EXPRESSION: &str = "<< 404684003";

    fn query_member(active: bool, expression: &str) -> Member {
        let member = Member::with_id(
            "q-1",
            QUERY_REFSET,
            TARGET,
            CORE,
            MemberPayload::Query {
                query: expression.to_string(),
            },
        );
        if active { member } else { member.inactive() }
    }

    fn simple(id: &str, component: &str) -> Member {
        Member::with_id(id, TARGET, component, CORE, MemberPayload::Simple)
    }

    fn drain(cursor: &mut EvaluationCursor, store: &MemoryRevisionStore, resolver: &MemoryQueryResolver) -> Vec<Vec<MemberChange>> {
        let mut batches = Vec::new();
        while let Some(batch) = cursor.next_batch(store, resolver).expect("batch") {
            batches.push(batch);
        }
        batches
    }

    fn config(page: usize, batch: usize) -> EditConfig {
        EditConfig {
            query_page_size: page,
            change_batch_size: batch,
            ..EditConfig::default()
        }
    }

    #[test]
    fn two_phase_diff_emits_add_change_remove() {
        let store = MemoryRevisionStore::from_snapshot(
            vec![Component::concept(TARGET, CORE)],
            vec![
                query_member(true, EXPRESSION),
                simple("m-1", "c-1"),
                simple("m-2", "c-2").inactive(),
                simple("m-3", "c-2"),
                simple("m-4", "c-9"),
                simple("m-5", "c-1").published(EffectiveTime::parse("20230131").expect("date")).inactive(),
            ],
        )
        .expect("store");
        let resolver = MemoryQueryResolver::new().define(EXPRESSION, ["c-1", "c-2", "c-3"]);

        let mut cursor = QueryEvaluator::new(&config(2, 100))
            .evaluate(&store, "q-1")
            .expect("evaluate");
        assert_eq!(cursor.target_refset_id(), TARGET);
        let batches = drain(&mut cursor, &store, &resolver);

        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![
                MemberChange::change("c-2", "m-2"),
                MemberChange::remove("c-2", "m-3"),
                MemberChange::add("c-3"),
                MemberChange::remove("c-9", "m-4"),
            ]
        );
        assert_eq!(
            cursor.stats(),
            EvaluationStats {
                added: 1,
                removed: 2,
                changed: 1
            }
        );
        assert!(cursor.is_done());
    }

    #[test]
    fn batches_respect_the_batch_size() {
        let store = MemoryRevisionStore::from_snapshot(vec![], vec![query_member(true, EXPRESSION)])
            .expect("store");
        let ids: Vec<String> = (1..=7).map(|n| format!("c-{n}")).collect();
        let resolver = MemoryQueryResolver::new().define(EXPRESSION, ids);

        let mut cursor = QueryEvaluator::new(&config(3, 3))
            .evaluate(&store, "q-1")
            .expect("evaluate");
        let sizes: Vec<usize> = drain(&mut cursor, &store, &resolver)
            .iter()
            .map(Vec::len)
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn inactive_or_blank_query_yields_nothing() {
        let resolver = MemoryQueryResolver::new();
        for member in [query_member(false, EXPRESSION), query_member(true, "   ")] {
            let store = MemoryRevisionStore::from_snapshot(vec![], vec![member, simple("m-1", "c-1")])
                .expect("store");
            let mut cursor = QueryEvaluator::new(&EditConfig::default())
                .evaluate(&store, "q-1")
                .expect("evaluate");
            assert_eq!(cursor.next_batch(&store, &resolver).expect("batch"), None);
        }
    }

    #[test]
    fn non_query_member_is_rejected() {
        let store = MemoryRevisionStore::from_snapshot(vec![], vec![simple("m-1", "c-1")])
            .expect("store");
        let err = QueryEvaluator::new(&EditConfig::default())
            .evaluate(&store, "m-1")
            .expect_err("simple member");
        assert!(matches!(err, TermstoreError::Validation(_)));
    }
}
