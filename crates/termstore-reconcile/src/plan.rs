//! Reconciliation plans and the pure planners that produce them.
//!
//! Planning never touches a store. It reads snapshots of the existing
//! members and decides, per member, one of:
//! - keep (`reuse`, or `reactivate` when inactive)
//! - repoint at another value (`retarget`)
//! - drop (`remove` when unreleased, `deactivate` when released)
//!
//! plus a `create` for every desired entry nothing was kept for.

use crate::desired::{AcceptabilityMap, AssociationTargets, SingletonValue};
use crate::preference::ModulePreference;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use termstore_kernel::{Member, MemberKindTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOp {
    Reuse,
    Retarget,
    Reactivate,
    Deactivate,
    Remove,
    Create,
}

impl PlanOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reuse => "reuse",
            Self::Retarget => "retarget",
            Self::Reactivate => "reactivate",
            Self::Deactivate => "deactivate",
            Self::Remove => "remove",
            Self::Create => "create",
        }
    }
}

impl fmt::Display for PlanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub op: PlanOp,
    /// Existing member the step acts on; `None` for `create`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub refset_id: String,
    /// Value the member holds once the step is applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl PlanStep {
    fn existing(op: PlanOp, member: &Member, value: Option<&str>) -> Self {
        Self {
            op,
            member_id: Some(member.id.clone()),
            refset_id: member.refset_id.clone(),
            value: value.map(str::to_string),
        }
    }

    fn create(refset_id: &str, value: &str) -> Self {
        Self {
            op: PlanOp::Create,
            member_id: None,
            refset_id: refset_id.to_string(),
            value: Some(value.to_string()),
        }
    }

    fn keep(member: &Member) -> Self {
        let op = if member.active {
            PlanOp::Reuse
        } else {
            PlanOp::Reactivate
        };
        Self::existing(op, member, member.value())
    }

    fn retarget(member: &Member, value: &str) -> Self {
        Self::existing(PlanOp::Retarget, member, Some(value))
    }

    /// Released members that are already inactive need nothing.
    fn retire(member: &Member) -> Option<Self> {
        if !member.released {
            Some(Self::existing(PlanOp::Remove, member, member.value()))
        } else if member.active {
            Some(Self::existing(PlanOp::Deactivate, member, member.value()))
        } else {
            None
        }
    }
}

/// The ordered mutations that bring one member category of a component to
/// its desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPlan {
    pub component_id: String,
    /// Payload kind of the members the plan creates.
    pub kind: MemberKindTag,
    /// Module recorded on created, retargeted and reactivated members.
    pub module_id: String,
    pub steps: Vec<PlanStep>,
}

impl ReconciliationPlan {
    pub fn count(&self, op: PlanOp) -> usize {
        self.steps.iter().filter(|step| step.op == op).count()
    }

    /// Whether applying the plan leaves the store untouched.
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|step| step.op == PlanOp::Reuse)
    }
}

fn sorted_of_kind(existing: &[Member], kind: MemberKindTag) -> Vec<&Member> {
    let mut members: Vec<&Member> = existing
        .iter()
        .filter(|member| member.kind() == kind)
        .collect();
    members.sort_by(|left, right| left.id.cmp(&right.id));
    members
}

/// Multi-valued, multi-key categories such as historical associations.
pub fn plan_associations(existing: &[Member], targets: &AssociationTargets) -> Vec<PlanStep> {
    let mut remaining: BTreeMap<String, BTreeSet<String>> = targets.clone().into_map();
    let mut steps = Vec::new();
    let mut unmatched = Vec::new();

    for member in sorted_of_kind(existing, MemberKindTag::Association) {
        let value = member.value().unwrap_or_default();
        let consumed = remaining
            .get_mut(&member.refset_id)
            .is_some_and(|targets| targets.remove(value));
        if consumed {
            steps.push(PlanStep::keep(member));
        } else {
            unmatched.push(member);
        }
    }

    for member in unmatched {
        let next = remaining
            .get_mut(&member.refset_id)
            .and_then(BTreeSet::pop_first);
        match next {
            Some(target) => steps.push(PlanStep::retarget(member, &target)),
            None => steps.extend(PlanStep::retire(member)),
        }
    }

    for (refset_id, targets) in &remaining {
        for target in targets {
            steps.push(PlanStep::create(refset_id, target));
        }
    }
    steps
}

/// Single-valued categories keyed by refset, such as language acceptability.
pub fn plan_acceptability(
    existing: &[Member],
    acceptability: &AcceptabilityMap,
    preference: &ModulePreference,
) -> Vec<PlanStep> {
    let mut by_refset: BTreeMap<&str, Vec<&Member>> = BTreeMap::new();
    for member in sorted_of_kind(existing, MemberKindTag::Language) {
        by_refset
            .entry(member.refset_id.as_str())
            .or_default()
            .push(member);
    }

    let mut steps = Vec::new();
    for (refset_id, members) in &by_refset {
        let Some(desired) = acceptability.get(refset_id) else {
            steps.extend(members.iter().filter_map(|member| PlanStep::retire(member)));
            continue;
        };

        let holders = members
            .iter()
            .copied()
            .filter(|member| member.value() == Some(desired));
        let (kept, holds_value) = match preference.pick(holders) {
            Some(holder) => (holder, true),
            None => match preference.pick(members.iter().copied()) {
                Some(member) => (member, false),
                None => continue,
            },
        };

        for member in members {
            if member.id != kept.id {
                steps.extend(PlanStep::retire(member));
            } else if holds_value {
                steps.push(PlanStep::keep(member));
            } else {
                steps.push(PlanStep::retarget(member, desired));
            }
        }
    }

    for (refset_id, value) in acceptability.iter() {
        if !by_refset.contains_key(refset_id) {
            steps.push(PlanStep::create(refset_id, value));
        }
    }
    steps
}

/// At most one member in `refset_id`, such as the inactivation indicator.
pub fn plan_singleton(existing: &[Member], refset_id: &str, value: &SingletonValue) -> Vec<PlanStep> {
    if *value == SingletonValue::Unchanged {
        return Vec::new();
    }

    let mut members: Vec<&Member> = existing
        .iter()
        .filter(|member| member.refset_id == refset_id)
        .collect();
    members.sort_by(|left, right| left.id.cmp(&right.id));

    let mut members = members.into_iter();
    let mut steps = Vec::new();
    match (members.next(), value) {
        (None, SingletonValue::Value(desired)) => steps.push(PlanStep::create(refset_id, desired)),
        (None, _) => {}
        (Some(first), SingletonValue::Value(desired)) => {
            if first.value() == Some(desired.as_str()) {
                steps.push(PlanStep::keep(first));
            } else {
                steps.push(PlanStep::retarget(first, desired));
            }
        }
        (Some(first), _) => steps.extend(PlanStep::retire(first)),
    }
    steps.extend(members.filter_map(PlanStep::retire));
    steps
}
