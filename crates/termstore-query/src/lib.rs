//! # termstore-query
//!
//! Query-computed reference-set membership. A query member names a target
//! refset and holds an expression; evaluating it diffs the expression's
//! result against the refset's current members and yields batches of
//! [`MemberChange`]s.
//!
//! ```text
//! QueryEvaluator::evaluate ──▶ EvaluationCursor ──next_batch──▶ Vec<MemberChange>
//!                                     ▲                                │
//!                                     └────── commit ◀── apply ◀───────┘
//! ```
//!
//! [`QueryEvaluator::run`] drives the loop to completion.

pub mod apply;
pub mod change;
pub mod evaluator;

pub use apply::{EvaluationSummary, apply_changes};
pub use change::{ChangeKind, MemberChange};
pub use evaluator::{EvaluationCursor, EvaluationStats, QueryEvaluator};
