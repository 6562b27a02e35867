//! Member-kind registry and single-member updates.
//!
//! Each payload kind registers a [`MemberKind`] strategy. Updating a member
//! is always the same pipeline:
//!
//! ```text
//! lookup (NotFound) → dispatch on kind (UnsupportedOperation)
//!   → validate (Validation) → execute on a staged candidate → store update
//! ```

use crate::staged::StagedMember;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use termstore_kernel::concepts::{ACCEPTABLE, PREFERRED};
use termstore_kernel::{EffectiveTime, Member, MemberKindTag, Result, Sctid, TermstoreError};
use termstore_store::RevisionStore;
use tracing::{debug, instrument};

/// Property bag of a single-member update. Absent properties stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemberUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptability_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_time: Option<EffectiveTime>,
}

impl MemberUpdate {
    /// The explicit effective-time-only republish.
    pub fn republish(effective_time: EffectiveTime) -> Self {
        Self {
            effective_time: Some(effective_time),
            ..Self::default()
        }
    }

    /// An update setting the payload property of `kind` to `value`.
    pub fn payload(kind: MemberKindTag, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match kind {
            MemberKindTag::Simple => Self::default(),
            MemberKindTag::Association => Self {
                target_component_id: value,
                ..Self::default()
            },
            MemberKindTag::Language => Self {
                acceptability_id: value,
                ..Self::default()
            },
            MemberKindTag::AttributeValue => Self {
                value_id: value,
                ..Self::default()
            },
            MemberKindTag::Query => Self {
                query: value,
                ..Self::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_effective_time_only(&self) -> bool {
        self.effective_time.is_some()
            && Self {
                effective_time: None,
                ..self.clone()
            }
            .is_empty()
    }

    /// Payload properties present on the update, with their wire names.
    fn payload_properties(&self) -> Vec<(&'static str, &str)> {
        [
            ("targetComponentId", self.target_component_id.as_deref()),
            ("acceptabilityId", self.acceptability_id.as_deref()),
            ("valueId", self.value_id.as_deref()),
            ("query", self.query.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
    }

    /// The payload value for a kind whose property is `own`, rejecting any
    /// other payload property.
    fn payload_value(&self, kind: MemberKindTag, own: Option<&str>) -> Result<Option<&str>> {
        let mut value = None;
        for (name, candidate) in self.payload_properties() {
            if Some(name) != own {
                return Err(TermstoreError::validation(format!(
                    "property '{name}' does not apply to {kind} members"
                )));
            }
            value = Some(candidate);
        }
        Ok(value)
    }
}

/// Strategy for one payload kind.
pub trait MemberKind: fmt::Debug {
    fn tag(&self) -> MemberKindTag;

    /// Check the update against the current revision before anything is staged.
    fn validate(&self, member: &Member, update: &MemberUpdate) -> Result<()>;

    /// Stage the kind-specific part of the update.
    fn execute(&self, staged: &mut StagedMember, update: &MemberUpdate) -> Result<()>;
}

fn require_sctid(property: &str, value: &str) -> Result<()> {
    Sctid::parse(value).map(|_| ()).map_err(|err| {
        TermstoreError::validation(format!("{property} '{value}' is not a component id: {err}"))
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleKind;

impl MemberKind for SimpleKind {
    fn tag(&self) -> MemberKindTag {
        MemberKindTag::Simple
    }

    fn validate(&self, _member: &Member, update: &MemberUpdate) -> Result<()> {
        update.payload_value(self.tag(), None).map(|_| ())
    }

    fn execute(&self, _staged: &mut StagedMember, _update: &MemberUpdate) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationKind;

impl MemberKind for AssociationKind {
    fn tag(&self) -> MemberKindTag {
        MemberKindTag::Association
    }

    fn validate(&self, member: &Member, update: &MemberUpdate) -> Result<()> {
        if let Some(target) = update.payload_value(self.tag(), Some("targetComponentId"))? {
            require_sctid("targetComponentId", target)?;
            if target == member.referenced_component_id {
                return Err(TermstoreError::validation(format!(
                    "component '{target}' cannot be associated with itself"
                )));
            }
        }
        Ok(())
    }

    fn execute(&self, staged: &mut StagedMember, update: &MemberUpdate) -> Result<()> {
        if let Some(target) = &update.target_component_id {
            staged.retarget(target);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageKind;

impl MemberKind for LanguageKind {
    fn tag(&self) -> MemberKindTag {
        MemberKindTag::Language
    }

    fn validate(&self, _member: &Member, update: &MemberUpdate) -> Result<()> {
        match update.payload_value(self.tag(), Some("acceptabilityId"))? {
            Some(value) if value != ACCEPTABLE && value != PREFERRED => Err(
                TermstoreError::validation(format!("'{value}' is not an acceptability value")),
            ),
            _ => Ok(()),
        }
    }

    fn execute(&self, staged: &mut StagedMember, update: &MemberUpdate) -> Result<()> {
        if let Some(value) = &update.acceptability_id {
            staged.retarget(value);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeValueKind;

impl MemberKind for AttributeValueKind {
    fn tag(&self) -> MemberKindTag {
        MemberKindTag::AttributeValue
    }

    fn validate(&self, _member: &Member, update: &MemberUpdate) -> Result<()> {
        match update.payload_value(self.tag(), Some("valueId"))? {
            Some(value) => require_sctid("valueId", value),
            None => Ok(()),
        }
    }

    fn execute(&self, staged: &mut StagedMember, update: &MemberUpdate) -> Result<()> {
        if let Some(value) = &update.value_id {
            staged.retarget(value);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryKind;

impl MemberKind for QueryKind {
    fn tag(&self) -> MemberKindTag {
        MemberKindTag::Query
    }

    fn validate(&self, _member: &Member, update: &MemberUpdate) -> Result<()> {
        match update.payload_value(self.tag(), Some("query"))? {
            Some(query) if query.trim().is_empty() => {
                Err(TermstoreError::validation("query expression is blank"))
            }
            _ => Ok(()),
        }
    }

    fn execute(&self, staged: &mut StagedMember, update: &MemberUpdate) -> Result<()> {
        if let Some(query) = &update.query {
            staged.retarget(query.trim());
        }
        Ok(())
    }
}

/// The built-in strategy for `tag`.
pub fn builtin_kind(tag: MemberKindTag) -> &'static dyn MemberKind {
    match tag {
        MemberKindTag::Simple => &SimpleKind,
        MemberKindTag::Association => &AssociationKind,
        MemberKindTag::Language => &LanguageKind,
        MemberKindTag::AttributeValue => &AttributeValueKind,
        MemberKindTag::Query => &QueryKind,
    }
}

/// Payload kind → strategy.
#[derive(Debug)]
pub struct MemberKindRegistry {
    kinds: BTreeMap<MemberKindTag, Box<dyn MemberKind>>,
}

impl Default for MemberKindRegistry {
    /// Every built-in kind.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(SimpleKind);
        registry.register(AssociationKind);
        registry.register(LanguageKind);
        registry.register(AttributeValueKind);
        registry.register(QueryKind);
        registry
    }
}

impl MemberKindRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Register `kind`, replacing and returning any strategy for the same tag.
    pub fn register(&mut self, kind: impl MemberKind + 'static) -> Option<Box<dyn MemberKind>> {
        self.kinds.insert(kind.tag(), Box::new(kind))
    }

    pub fn get(&self, tag: MemberKindTag) -> Result<&dyn MemberKind> {
        self.kinds
            .get(&tag)
            .map(|kind| &**kind)
            .ok_or_else(|| TermstoreError::unsupported(format!("no handler for {tag} members")))
    }

    pub fn tags(&self) -> impl Iterator<Item = MemberKindTag> + '_ {
        self.kinds.keys().copied()
    }

    /// Apply `update` to member `member_id`. Returns whether the store changed.
    #[instrument(skip(self, store, update))]
    pub fn update_member<S: RevisionStore + ?Sized>(
        &self,
        store: &mut S,
        member_id: &str,
        update: &MemberUpdate,
    ) -> Result<bool> {
        let member = store.member(member_id)?;
        let kind = self.get(member.kind())?;
        if update.is_empty() {
            return Ok(false);
        }

        if let Some(effective_time) = update.effective_time {
            if !update.is_effective_time_only() {
                return Err(TermstoreError::validation(
                    "effectiveTime can only be updated on its own",
                ));
            }
            if !effective_time.is_set() {
                return Err(TermstoreError::validation(
                    "republishing requires an effective time",
                ));
            }
            let mut staged = StagedMember::new(member);
            staged.republish(effective_time);
            let changed = staged.apply(store)?;
            debug!(changed, effective_time = %effective_time, "Republished member");
            return Ok(changed);
        }

        if update
            .module_id
            .as_deref()
            .is_some_and(|module_id| module_id.trim().is_empty())
        {
            return Err(TermstoreError::validation("moduleId is blank"));
        }
        kind.validate(&member, update)?;

        let mut staged = StagedMember::new(member);
        match update.active {
            Some(true) => {
                staged.ensure_active();
            }
            Some(false) => {
                staged.deactivate();
            }
            None => {}
        }
        if let Some(module_id) = &update.module_id {
            staged.refresh_module(module_id);
        }
        kind.execute(&mut staged, update)?;

        let changed = staged.apply(store)?;
        debug!(changed, kind = %kind.tag(), "Updated member");
        Ok(changed)
    }
}
