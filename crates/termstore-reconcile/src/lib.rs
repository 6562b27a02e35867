//! # termstore-reconcile
//!
//! Keeps a component's reference-set members consistent with a declared
//! target state while reusing member identities and never rewriting
//! published content in place.
//!
//! ## Pipeline
//!
//! ```text
//! DesiredState ──plan──▶ ReconciliationPlan ──apply──▶ StagedMember ──▶ RevisionStore
//!   (associations,          (reuse, retarget,            (effective-time
//!    acceptability,          reactivate, deactivate,      bookkeeping)
//!    singleton)              remove, create)
//! ```
//!
//! Planning is pure; applying goes exclusively through the store's
//! `add_member`, `update_member` and `delete_member`.

pub mod desired;
pub mod engine;
pub mod plan;
pub mod preference;
pub mod registry;
pub mod staged;

pub use desired::{AcceptabilityMap, AssociationTargets, DesiredState, SingletonValue};
pub use engine::Reconciler;
pub use plan::{
    PlanOp, PlanStep, ReconciliationPlan, plan_acceptability, plan_associations, plan_singleton,
};
pub use preference::ModulePreference;
pub use registry::{
    AssociationKind, AttributeValueKind, LanguageKind, MemberKind, MemberKindRegistry,
    MemberUpdate, QueryKind, SimpleKind, builtin_kind,
};
pub use staged::{StagedMember, ensure_active, remove_or_deactivate};
