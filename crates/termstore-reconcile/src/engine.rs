//! Plan, then apply: the member reconciliation entry points.

use crate::desired::DesiredState;
use crate::plan::{
    PlanOp, PlanStep, ReconciliationPlan, plan_acceptability, plan_associations, plan_singleton,
};
use crate::preference::ModulePreference;
use crate::registry::{MemberUpdate, builtin_kind};
use crate::staged::{StagedMember, ensure_active, remove_or_deactivate};
use termstore_kernel::concepts::inactivation_indicator_refset;
use termstore_kernel::{
    Component, EditConfig, Member, MemberKindTag, MemberPayload, Result, TermstoreError,
};
use termstore_store::{ModuleResolver, RevisionStore};
use tracing::{debug, instrument};

/// Reconciles a component's members against a desired state.
///
/// Holds no mutable state; one instance serves any number of edits.
#[derive(Debug, Clone)]
pub struct Reconciler<M> {
    modules: M,
    secondary_modules: Vec<String>,
}

impl<M: ModuleResolver> Reconciler<M> {
    pub fn new(modules: M, config: &EditConfig) -> Self {
        Self {
            modules,
            secondary_modules: config.secondary_modules.clone(),
        }
    }

    pub fn preference(&self, component: &Component) -> ModulePreference {
        ModulePreference::new(self.modules.resolve(component), &self.secondary_modules)
    }

    /// Compute the plan without touching any store.
    ///
    /// Desired values go through the same per-kind checks as a single-member
    /// update, so nothing is planned that `update_member` would reject.
    pub fn plan(
        &self,
        component: &Component,
        existing: &[Member],
        desired: &DesiredState,
    ) -> Result<ReconciliationPlan> {
        desired.validate()?;
        let module_id = self.modules.resolve(component);

        let (kind, steps) = match desired {
            DesiredState::Associations { targets } => (
                MemberKindTag::Association,
                targets
                    .as_ref()
                    .map(|targets| plan_associations(existing, targets))
                    .unwrap_or_default(),
            ),
            DesiredState::Acceptability { acceptability } => (
                MemberKindTag::Language,
                acceptability
                    .as_ref()
                    .map(|acceptability| {
                        plan_acceptability(existing, acceptability, &self.preference(component))
                    })
                    .unwrap_or_default(),
            ),
            DesiredState::InactivationIndicator { value } => {
                let refset_id = inactivation_indicator_refset(component.category).ok_or_else(|| {
                    TermstoreError::unsupported(format!(
                        "{} components carry no inactivation indicator",
                        component.category
                    ))
                })?;
                (
                    MemberKindTag::AttributeValue,
                    plan_singleton(existing, refset_id, value),
                )
            }
        };

        let strategy = builtin_kind(kind);
        for (refset_id, value) in desired.entries() {
            let candidate = Member::with_id(
                String::new(),
                refset_id,
                &component.id,
                &module_id,
                MemberPayload::from_value(kind, value),
            );
            strategy.validate(&candidate, &MemberUpdate::payload(kind, value))?;
        }

        Ok(ReconciliationPlan {
            component_id: component.id.clone(),
            kind,
            module_id,
            steps,
        })
    }

    /// Apply a plan step by step. Returns whether the store changed.
    #[instrument(skip_all, fields(component = %plan.component_id, steps = plan.steps.len()))]
    pub fn apply<S: RevisionStore + ?Sized>(
        &self,
        store: &mut S,
        plan: &ReconciliationPlan,
    ) -> Result<bool> {
        let mut changed = false;
        for step in &plan.steps {
            let step_changed = apply_step(store, plan, step)?;
            if step_changed {
                debug!(op = %step.op, member = ?step.member_id, refset = %step.refset_id, "Applied plan step");
            }
            changed |= step_changed;
        }
        Ok(changed)
    }

    /// Bring `existing` in line with `desired`. Returns whether the store changed.
    pub fn reconcile<S: RevisionStore + ?Sized>(
        &self,
        store: &mut S,
        component: &Component,
        existing: &[Member],
        desired: &DesiredState,
    ) -> Result<bool> {
        if desired.is_unchanged() {
            return Ok(false);
        }
        let plan = self.plan(component, existing, desired)?;
        debug!(
            component = %component.id,
            kind = %plan.kind,
            reuse = plan.count(PlanOp::Reuse),
            retarget = plan.count(PlanOp::Retarget),
            reactivate = plan.count(PlanOp::Reactivate),
            deactivate = plan.count(PlanOp::Deactivate),
            remove = plan.count(PlanOp::Remove),
            create = plan.count(PlanOp::Create),
            "Planned reconciliation"
        );
        self.apply(store, &plan)
    }

    /// Like [`Reconciler::reconcile`], reading the component and its members
    /// from the store.
    pub fn reconcile_component<S: RevisionStore + ?Sized>(
        &self,
        store: &mut S,
        component_id: &str,
        desired: &DesiredState,
    ) -> Result<bool> {
        let component = store.component(component_id)?;
        let existing = store.members_referencing(component_id);
        self.reconcile(store, &component, &existing, desired)
    }
}

fn step_member<S: RevisionStore + ?Sized>(store: &S, step: &PlanStep) -> Result<Member> {
    let member_id = step.member_id.as_deref().ok_or_else(|| {
        TermstoreError::validation(format!("{} step on refset '{}' names no member", step.op, step.refset_id))
    })?;
    store.member(member_id)
}

fn step_value(step: &PlanStep) -> Result<&str> {
    step.value.as_deref().ok_or_else(|| {
        TermstoreError::validation(format!("{} step on refset '{}' carries no value", step.op, step.refset_id))
    })
}

fn apply_step<S: RevisionStore + ?Sized>(
    store: &mut S,
    plan: &ReconciliationPlan,
    step: &PlanStep,
) -> Result<bool> {
    let module_id = plan.module_id.as_str();
    match step.op {
        PlanOp::Reuse => Ok(false),
        PlanOp::Reactivate => {
            let member = step_member(store, step)?;
            ensure_active(store, &member, Some(module_id))
        }
        PlanOp::Retarget => {
            let member = step_member(store, step)?;
            let mut staged = StagedMember::new(member);
            staged
                .retarget(step_value(step)?)
                .ensure_active()
                .refresh_module(module_id);
            staged.apply(store)
        }
        PlanOp::Deactivate | PlanOp::Remove => {
            let member = step_member(store, step)?;
            remove_or_deactivate(store, &member, Some(module_id))
        }
        PlanOp::Create => {
            let member = Member::new(
                &step.refset_id,
                &plan.component_id,
                module_id,
                MemberPayload::from_value(plan.kind, step_value(step)?),
            );
            store.add_member(member)?;
            Ok(true)
        }
    }
}
