//! Staged member candidates and the mutation primitives built on them.
//!
//! Every member mutation goes the same way: copy the current revision, edit
//! the copy, then hand `(original, candidate)` to the store. `apply` owns the
//! effective-time bookkeeping so no caller has to:
//! - content unchanged except publication fields: explicit republish, kept as is
//! - content equal to the last published revision: published date restored
//! - any other content change: effective time unset

use termstore_kernel::{EffectiveTime, Member, Result};
use termstore_store::RevisionStore;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMember {
    original: Member,
    candidate: Member,
}

impl StagedMember {
    pub fn new(original: Member) -> Self {
        Self {
            candidate: original.clone(),
            original,
        }
    }

    pub fn original(&self) -> &Member {
        &self.original
    }

    pub fn candidate(&self) -> &Member {
        &self.candidate
    }

    pub fn ensure_active(&mut self) -> &mut Self {
        self.candidate.active = true;
        self
    }

    pub fn deactivate(&mut self) -> &mut Self {
        self.candidate.active = false;
        self
    }

    pub fn refresh_module(&mut self, module_id: &str) -> &mut Self {
        if self.candidate.module_id != module_id {
            self.candidate.module_id = module_id.to_string();
        }
        self
    }

    /// Point the payload at a new value, keeping the payload kind.
    pub fn retarget(&mut self, value: &str) -> &mut Self {
        self.candidate.payload = self.candidate.payload.with_value(value);
        self
    }

    pub fn clear_effective_time(&mut self) -> &mut Self {
        self.candidate.effective_time = EffectiveTime::UNSET;
        self
    }

    /// Stamp a release date on an otherwise unchanged member.
    pub fn republish(&mut self, effective_time: EffectiveTime) -> &mut Self {
        self.candidate.effective_time = effective_time;
        self.candidate.released = true;
        self
    }

    pub fn is_changed(&self) -> bool {
        self.original != self.candidate
    }

    /// Hand the candidate to the store. Returns whether anything changed.
    pub fn apply<S: RevisionStore + ?Sized>(mut self, store: &mut S) -> Result<bool> {
        if !self.is_changed() {
            return Ok(false);
        }

        if !self.candidate.same_content(&self.original) {
            match store.published_member(&self.original.id) {
                Some(published) if published.same_content(&self.candidate) => {
                    debug!(id = %self.original.id, effective_time = %published.effective_time, "Restored published effective time");
                    self.candidate.effective_time = published.effective_time;
                    self.candidate.released = true;
                }
                _ => {
                    self.clear_effective_time();
                }
            }
        }

        if !self.is_changed() {
            return Ok(false);
        }
        store.update_member(&self.original, self.candidate)?;
        Ok(true)
    }
}

/// Reactivate `member` if needed. Reactivation also moves it to `module_id`.
pub fn ensure_active<S: RevisionStore + ?Sized>(
    store: &mut S,
    member: &Member,
    module_id: Option<&str>,
) -> Result<bool> {
    if member.active {
        return Ok(false);
    }
    let mut staged = StagedMember::new(member.clone());
    staged.ensure_active();
    if let Some(module_id) = module_id {
        staged.refresh_module(module_id);
    }
    staged.apply(store)
}

/// Hard-delete an unreleased member, deactivate a released one.
///
/// Released members that are already inactive are left alone.
pub fn remove_or_deactivate<S: RevisionStore + ?Sized>(
    store: &mut S,
    member: &Member,
    module_id: Option<&str>,
) -> Result<bool> {
    if !member.released {
        store.delete_member(member, false)?;
        return Ok(true);
    }
    if !member.active {
        return Ok(false);
    }
    let mut staged = StagedMember::new(member.clone());
    staged.deactivate();
    if let Some(module_id) = module_id {
        staged.refresh_module(module_id);
    }
    staged.apply(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termstore_kernel::{Component, MemberPayload, TermstoreError};
    use termstore_store::MemoryRevisionStore;

    const CORE: &str = "900000000000207008";
    const MODEL: &str = "900000000000012004";
    const SAME_AS: &str = "900000000000527005";

    fn association(target: &str) -> Member {
        Member::with_id(
            "a-1",
            SAME_AS,
            "138875005",
            CORE,
            MemberPayload::Association {
                target_component_id: target.to_string(),
            },
        )
    }

    fn published(target: &str) -> Member {
        association(target).published(EffectiveTime::parse("20230131").expect("date"))
    }

    fn store_with(member: Member) -> MemoryRevisionStore {
        MemoryRevisionStore::from_snapshot(
            vec![Component::concept("138875005", CORE)],
            vec![member],
        )
        .expect("store should build")
    }

    #[test]
    fn content_change_unsets_effective_time() {
        let mut store = store_with(published("404684003"));
        let mut staged = StagedMember::new(store.member("a-1").expect("member"));
        staged.retarget("71388002");
        assert!(staged.apply(&mut store).expect("apply"));

        let after = store.member("a-1").expect("member");
        assert_eq!(after.value(), Some("71388002"));
        assert!(!after.effective_time.is_set());
        assert!(after.released);
    }

    #[test]
    fn reverting_to_published_content_restores_effective_time() {
        let mut store = store_with(published("404684003"));
        let mut staged = StagedMember::new(store.member("a-1").expect("member"));
        staged.retarget("71388002");
        staged.apply(&mut store).expect("apply");

        let mut staged = StagedMember::new(store.member("a-1").expect("member"));
        staged.retarget("404684003");
        assert!(staged.apply(&mut store).expect("apply"));
        assert_eq!(store.member("a-1").expect("member"), published("404684003"));
    }

    #[test]
    fn republish_keeps_the_new_date() {
        let mut store = store_with(association("404684003"));
        let date = EffectiveTime::parse("20240731").expect("date");
        let mut staged = StagedMember::new(store.member("a-1").expect("member"));
        staged.republish(date);
        assert!(staged.apply(&mut store).expect("apply"));

        let after = store.member("a-1").expect("member");
        assert_eq!(after.effective_time, date);
        assert!(after.released);
    }

    #[test]
    fn unchanged_candidate_is_not_written() {
        let mut store = store_with(association("404684003"));
        let mut staged = StagedMember::new(store.member("a-1").expect("member"));
        staged.ensure_active().refresh_module(CORE);
        assert!(!staged.apply(&mut store).expect("apply"));
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn remove_or_deactivate_respects_release_state() {
        let mut store = store_with(association("404684003"));
        let member = store.member("a-1").expect("member");
        assert!(remove_or_deactivate(&mut store, &member, None).expect("remove"));
        assert!(matches!(
            store.member("a-1"),
            Err(TermstoreError::NotFound { .. })
        ));

        let mut store = store_with(published("404684003"));
        let member = store.member("a-1").expect("member");
        assert!(remove_or_deactivate(&mut store, &member, Some(MODEL)).expect("deactivate"));
        let after = store.member("a-1").expect("member");
        assert!(!after.active);
        assert_eq!(after.module_id, MODEL);
        assert!(!after.effective_time.is_set());

        assert!(!remove_or_deactivate(&mut store, &after, Some(MODEL)).expect("no-op"));
    }

    #[test]
    fn ensure_active_reactivates_and_remodules() {
        let mut store = store_with(published("404684003").inactive());
        let member = store.member("a-1").expect("member");
        assert!(ensure_active(&mut store, &member, Some(MODEL)).expect("reactivate"));
        let after = store.member("a-1").expect("member");
        assert!(after.active);
        assert_eq!(after.module_id, MODEL);

        assert!(!ensure_active(&mut store, &after, Some(CORE)).expect("already active"));
    }
}
