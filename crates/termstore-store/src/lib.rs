//! # termstore-store
//!
//! The collaborators the editing core talks to, and deterministic in-memory
//! implementations of each.
//!
//! This crate provides:
//! - `RevisionStore` (transactional lookup/add/update/delete/commit)
//! - `QueryResolver` (paged set-expression resolution)
//! - `IdentifierRecorder` (identifier ledger: reserve, assign, publish, deprecate, release)
//! - `ModuleResolver` (module id for edits made on behalf of a component)
//! - an append-only commit history with JSONL read/write and replay
//!
//! It intentionally does not reconcile or allocate anything. Those concerns
//! live in `termstore-reconcile`, `termstore-query` and `termstore-ids`.
//!
//! ## Data model
//!
//! ```text
//! staged writes  ──commit──▶  committed state  ──append──▶  history (JSONL)
//!      ▲                                                        │
//!      └──────────────── rollback discards                 replay
//! ```

pub mod history;
pub mod memory;
pub mod recorder;
pub mod resolver;
pub mod revision;

pub use history::{
    COMMIT_RECORD_SCHEMA, CommitRecord, HistoryError, RevisionChange, changes_digest,
    read_history, read_history_from_path, replay_history, write_history, write_history_to_path,
};
pub use memory::MemoryRevisionStore;
pub use recorder::{IdentifierRecorder, IdentifierStatus, MemoryIdentifierRecorder};
pub use resolver::{
    ComponentModule, FixedModule, IdPage, MemoryQueryResolver, ModuleResolver, QueryResolver,
};
pub use revision::{MemberPage, MemberQuery, RevisionStore};
