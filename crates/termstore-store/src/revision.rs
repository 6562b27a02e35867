//! The revision store contract.

use crate::history::CommitRecord;
use std::collections::BTreeSet;
use termstore_kernel::{Component, Member, Result};

/// Keyset-paged member search.
///
/// Results are always ordered by member id; `search_after` continues after
/// the last id of the previous page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberQuery {
    pub refset_id: Option<String>,
    pub referenced_component_ids: Option<BTreeSet<String>>,
    pub active: Option<bool>,
    pub search_after: Option<String>,
    pub limit: usize,
}

impl MemberQuery {
    pub fn refset(refset_id: impl Into<String>, limit: usize) -> Self {
        Self {
            refset_id: Some(refset_id.into()),
            limit,
            ..Self::default()
        }
    }

    pub fn referencing(mut self, component_ids: BTreeSet<String>) -> Self {
        self.referenced_component_ids = Some(component_ids);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn after(mut self, member_id: Option<String>) -> Self {
        self.search_after = member_id;
        self
    }

    pub fn matches(&self, member: &Member) -> bool {
        if let Some(refset_id) = &self.refset_id {
            if &member.refset_id != refset_id {
                return false;
            }
        }
        if let Some(ids) = &self.referenced_component_ids {
            if !ids.contains(&member.referenced_component_id) {
                return false;
            }
        }
        if let Some(active) = self.active {
            if member.active != active {
                return false;
            }
        }
        true
    }
}

/// One page of a member search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPage {
    pub items: Vec<Member>,
    /// Continuation token; `None` once the last page was returned.
    pub search_after: Option<String>,
}

/// Transactional container for components and members.
///
/// Reads observe the writes staged in the current transaction. Nothing is
/// visible to other readers until `commit`; `rollback` discards every
/// staged write.
pub trait RevisionStore {
    /// Lookup one component. Missing ids are `NotFound`.
    fn component(&self, id: &str) -> Result<Component>;

    /// Lookup one member. Missing ids are `NotFound`.
    fn member(&self, id: &str) -> Result<Member>;

    /// Whether any component or member already uses `id`.
    fn contains_id(&self, id: &str) -> bool;

    /// Every member referencing `component_id`, ordered by member id.
    fn members_referencing(&self, component_id: &str) -> Vec<Member>;

    fn search_members(&self, query: &MemberQuery) -> Result<MemberPage>;

    /// The most recently published revision of a member, if it was ever released.
    fn published_member(&self, id: &str) -> Option<Member>;

    fn add_component(&mut self, component: Component) -> Result<()>;

    fn add_member(&mut self, member: Member) -> Result<()>;

    /// Replace `old` with `new`. `old` must be the current revision.
    fn update_member(&mut self, old: &Member, new: Member) -> Result<()>;

    /// Hard-delete a member. Released members require `force`.
    fn delete_member(&mut self, member: &Member, force: bool) -> Result<()>;

    /// Make every staged write visible. Returns `None` when nothing was staged.
    fn commit(&mut self, message: &str) -> Result<Option<CommitRecord>>;

    fn rollback(&mut self);
}
