//! Deterministic in-memory revision store.
//!
//! This is the reference `RevisionStore`:
//! - committed state keyed by id (ordered, so scans are id-sorted)
//! - a staging overlay that reads see immediately
//! - an append-only commit history; committed revisions are never edited

use crate::history::{CommitRecord, HistoryError, RevisionChange, changes_digest};
use crate::revision::{MemberPage, MemberQuery, RevisionStore};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use termstore_kernel::{Component, Member, Result, TermstoreError};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct MemoryRevisionStore {
    components: BTreeMap<String, Component>,
    members: BTreeMap<String, Member>,
    by_referenced: BTreeMap<String, BTreeSet<String>>,
    published: BTreeMap<String, Member>,
    staged_components: BTreeMap<String, Component>,
    /// `None` marks a member deleted in the current transaction.
    staged_members: BTreeMap<String, Option<Member>>,
    pending: Vec<RevisionChange>,
    history: Vec<CommitRecord>,
}

impl MemoryRevisionStore {
    /// Build a store whose committed baseline is the given content.
    ///
    /// Released members with an effective time seed the published revisions.
    pub fn from_snapshot(components: Vec<Component>, members: Vec<Member>) -> Result<Self> {
        let mut store = Self::default();
        for component in components {
            store.apply_committed(&RevisionChange::ComponentAdded { component })?;
        }
        for member in members {
            store.apply_committed(&RevisionChange::MemberAdded { member })?;
        }
        Ok(store)
    }

    /// Rebuild a store by replaying `records` on top of `baseline`.
    pub fn replay(
        baseline: MemoryRevisionStore,
        records: &[CommitRecord],
    ) -> std::result::Result<Self, HistoryError> {
        let mut store = baseline;
        store.rollback();
        for record in records {
            record.check()?;
            let expected = store.history.len() as u64 + 1;
            if record.sequence != expected {
                return Err(HistoryError::OutOfOrder {
                    expected,
                    actual: record.sequence,
                });
            }
            for change in &record.changes {
                store
                    .apply_committed(change)
                    .map_err(|source| HistoryError::Replay {
                        sequence: record.sequence,
                        source,
                    })?;
            }
            store.history.push(record.clone());
        }
        Ok(store)
    }

    /// Committed history in commit order.
    pub fn history(&self) -> &[CommitRecord] {
        &self.history
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Every visible member (staged writes included), ordered by id.
    pub fn members(&self) -> Vec<Member> {
        self.scan_members(None, usize::MAX, |_| true).0
    }

    /// Every visible component, ordered by id.
    pub fn components(&self) -> Vec<Component> {
        let mut merged = self.components.clone();
        for (id, component) in &self.staged_components {
            merged.insert(id.clone(), component.clone());
        }
        merged.into_values().collect()
    }

    /// Whether two stores hold the same committed content.
    pub fn same_state(&self, other: &MemoryRevisionStore) -> bool {
        self.components == other.components && self.members == other.members
    }

    fn current_member(&self, id: &str) -> Option<&Member> {
        match self.staged_members.get(id) {
            Some(staged) => staged.as_ref(),
            None => self.members.get(id),
        }
    }

    fn current_component(&self, id: &str) -> Option<&Component> {
        self.staged_components
            .get(id)
            .or_else(|| self.components.get(id))
    }

    /// Merge committed and staged members in id order, strictly after `after`.
    ///
    /// Returns the accepted members (at most `limit`) and whether more
    /// accepted members follow.
    fn scan_members<F>(&self, after: Option<&str>, limit: usize, mut accept: F) -> (Vec<Member>, bool)
    where
        F: FnMut(&Member) -> bool,
    {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let mut committed = self
            .members
            .range::<str, _>((lower, Bound::Unbounded))
            .peekable();
        let mut staged = self
            .staged_members
            .range::<str, _>((lower, Bound::Unbounded))
            .peekable();

        let mut out = Vec::new();
        loop {
            let order = match (committed.peek(), staged.peek()) {
                (None, None) => break,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((left, _)), Some((right, _))) => left.as_str().cmp(right.as_str()),
            };
            let next = match order {
                Ordering::Less => committed.next().map(|(_, member)| Some(member)),
                Ordering::Greater => staged.next().map(|(_, member)| member.as_ref()),
                Ordering::Equal => {
                    committed.next();
                    staged.next().map(|(_, member)| member.as_ref())
                }
            };

            if let Some(Some(member)) = next {
                if accept(member) {
                    if out.len() == limit {
                        return (out, true);
                    }
                    out.push(member.clone());
                }
            }
        }
        (out, false)
    }

    fn stage(&mut self, change: RevisionChange) {
        match &change {
            RevisionChange::ComponentAdded { component } => {
                self.staged_components
                    .insert(component.id.clone(), component.clone());
            }
            RevisionChange::MemberAdded { member } => {
                self.staged_members
                    .insert(member.id.clone(), Some(member.clone()));
            }
            RevisionChange::MemberUpdated { after, .. } => {
                self.staged_members
                    .insert(after.id.clone(), Some(after.clone()));
            }
            RevisionChange::MemberDeleted { member } => {
                self.staged_members.insert(member.id.clone(), None);
            }
        }
        self.pending.push(change);
    }

    /// Apply one change straight to committed state.
    pub(crate) fn apply_committed(&mut self, change: &RevisionChange) -> Result<()> {
        match change {
            RevisionChange::ComponentAdded { component } => {
                if self.components.contains_key(&component.id)
                    || self.members.contains_key(&component.id)
                {
                    return Err(TermstoreError::already_exists("component", &component.id));
                }
                self.components
                    .insert(component.id.clone(), component.clone());
            }
            RevisionChange::MemberAdded { member } => {
                if self.members.contains_key(&member.id)
                    || self.components.contains_key(&member.id)
                {
                    return Err(TermstoreError::already_exists("member", &member.id));
                }
                self.by_referenced
                    .entry(member.referenced_component_id.clone())
                    .or_default()
                    .insert(member.id.clone());
                self.record_published(member);
                self.members.insert(member.id.clone(), member.clone());
            }
            RevisionChange::MemberUpdated { before, after } => {
                match self.members.get(&before.id) {
                    Some(current) if current == before => {}
                    Some(_) => {
                        return Err(TermstoreError::Storage(format!(
                            "stale revision of member '{}'",
                            before.id
                        )));
                    }
                    None => return Err(TermstoreError::not_found("member", &before.id)),
                }
                self.record_published(after);
                self.members.insert(after.id.clone(), after.clone());
            }
            RevisionChange::MemberDeleted { member } => {
                if self.members.remove(&member.id).is_none() {
                    return Err(TermstoreError::not_found("member", &member.id));
                }
                if let Some(ids) = self.by_referenced.get_mut(&member.referenced_component_id) {
                    ids.remove(&member.id);
                    if ids.is_empty() {
                        self.by_referenced.remove(&member.referenced_component_id);
                    }
                }
                self.published.remove(&member.id);
            }
        }
        Ok(())
    }

    fn record_published(&mut self, member: &Member) {
        if member.released && member.effective_time.is_set() {
            self.published.insert(member.id.clone(), member.clone());
        }
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn component(&self, id: &str) -> Result<Component> {
        self.current_component(id)
            .cloned()
            .ok_or_else(|| TermstoreError::not_found("component", id))
    }

    fn member(&self, id: &str) -> Result<Member> {
        self.current_member(id)
            .cloned()
            .ok_or_else(|| TermstoreError::not_found("member", id))
    }

    fn contains_id(&self, id: &str) -> bool {
        self.current_component(id).is_some() || self.current_member(id).is_some()
    }

    fn members_referencing(&self, component_id: &str) -> Vec<Member> {
        let mut ids: BTreeSet<&str> = self
            .by_referenced
            .get(component_id)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default();
        for (id, staged) in &self.staged_members {
            if staged
                .as_ref()
                .is_some_and(|member| member.referenced_component_id == component_id)
            {
                ids.insert(id.as_str());
            }
        }

        ids.into_iter()
            .filter_map(|id| self.current_member(id))
            .filter(|member| member.referenced_component_id == component_id)
            .cloned()
            .collect()
    }

    fn search_members(&self, query: &MemberQuery) -> Result<MemberPage> {
        if query.limit == 0 {
            return Err(TermstoreError::validation("member search limit must be positive"));
        }

        let (items, has_more) = match &query.referenced_component_ids {
            Some(component_ids) => {
                let mut candidates: Vec<Member> = component_ids
                    .iter()
                    .flat_map(|component_id| self.members_referencing(component_id))
                    .filter(|member| {
                        query
                            .search_after
                            .as_deref()
                            .is_none_or(|after| member.id.as_str() > after)
                    })
                    .filter(|member| query.matches(member))
                    .collect();
                candidates.sort_by(|left, right| left.id.cmp(&right.id));
                let has_more = candidates.len() > query.limit;
                candidates.truncate(query.limit);
                (candidates, has_more)
            }
            None => self.scan_members(query.search_after.as_deref(), query.limit, |member| {
                query.matches(member)
            }),
        };

        let search_after = if has_more {
            items.last().map(|member| member.id.clone())
        } else {
            None
        };
        Ok(MemberPage {
            items,
            search_after,
        })
    }

    fn published_member(&self, id: &str) -> Option<Member> {
        self.published.get(id).cloned()
    }

    fn add_component(&mut self, component: Component) -> Result<()> {
        if self.contains_id(&component.id) {
            return Err(TermstoreError::already_exists("component", &component.id));
        }
        debug!(id = %component.id, category = %component.category, "Staged component");
        self.stage(RevisionChange::ComponentAdded { component });
        Ok(())
    }

    fn add_member(&mut self, member: Member) -> Result<()> {
        if self.contains_id(&member.id) {
            return Err(TermstoreError::already_exists("member", &member.id));
        }
        debug!(id = %member.id, refset = %member.refset_id, "Staged member");
        self.stage(RevisionChange::MemberAdded { member });
        Ok(())
    }

    fn update_member(&mut self, old: &Member, new: Member) -> Result<()> {
        if old.id != new.id {
            return Err(TermstoreError::validation(format!(
                "member update cannot change id '{}' to '{}'",
                old.id, new.id
            )));
        }
        let current = self
            .current_member(&old.id)
            .ok_or_else(|| TermstoreError::not_found("member", &old.id))?;
        if current != old {
            return Err(TermstoreError::Storage(format!(
                "stale revision of member '{}'",
                old.id
            )));
        }
        if *old == new {
            return Ok(());
        }
        self.stage(RevisionChange::MemberUpdated {
            before: old.clone(),
            after: new,
        });
        Ok(())
    }

    fn delete_member(&mut self, member: &Member, force: bool) -> Result<()> {
        let current = self
            .current_member(&member.id)
            .cloned()
            .ok_or_else(|| TermstoreError::not_found("member", &member.id))?;
        if current.released && !force {
            return Err(TermstoreError::validation(format!(
                "released member '{}' cannot be deleted, deactivate it instead",
                member.id
            )));
        }
        self.stage(RevisionChange::MemberDeleted { member: current });
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<Option<CommitRecord>> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let digest = changes_digest(&self.pending)
            .map_err(|err| TermstoreError::Storage(err.to_string()))?;
        let changes = std::mem::take(&mut self.pending);
        self.staged_components.clear();
        self.staged_members.clear();
        for change in &changes {
            self.apply_committed(change)?;
        }

        let sequence = self.history.len() as u64 + 1;
        let record = CommitRecord::sealed(sequence, message, digest, changes, Utc::now());
        info!(
            sequence,
            changes = record.changes.len(),
            digest = %record.digest,
            "Committed revision"
        );
        self.history.push(record.clone());
        Ok(Some(record))
    }

    fn rollback(&mut self) {
        if !self.pending.is_empty() {
            debug!(discarded = self.pending.len(), "Rolled back staged changes");
        }
        self.pending.clear();
        self.staged_components.clear();
        self.staged_members.clear();
    }
}
