//! # Termstore Kernel
//!
//! Shared vocabulary of the terminology editing core: what a component is,
//! what a reference-set member is, how identifiers are shaped, and how
//! failures are classified.
//!
//! This crate is **storage-agnostic**: it does not know where components
//! live or how queries are evaluated. Those collaborators are modelled as
//! traits in `termstore-store`.
//!
//! ## Architecture
//!
//! ```text
//! Sctid / Namespace     ← item + namespace + partition + Verhoeff check digit
//!     │
//! Component             ← concept / description / relationship identity
//!     │
//! Member                ← refset membership referencing one component
//!     │
//! MemberPayload         ← simple / association / language / attribute value / query
//!     │
//! EffectiveTime         ← publication date, or unset while pending
//! ```

pub mod component;
pub mod concepts;
pub mod config;
pub mod effective_time;
pub mod error;
pub mod identifier;
pub mod member;

pub use component::{Component, ComponentCategory};
pub use config::{ConfigError, EditConfig};
pub use effective_time::EffectiveTime;
pub use error::{ErrorClass, TermstoreError};
pub use identifier::{Namespace, Partition, Sctid, verhoeff_check_digit};
pub use member::{Member, MemberKindTag, MemberPayload};

/// Result alias used across the termstore crates.
pub type Result<T> = std::result::Result<T, TermstoreError>;
