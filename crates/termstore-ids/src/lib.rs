//! # termstore-ids
//!
//! Assigns concrete identifiers to new components inside an edit
//! transaction.
//!
//! - [`IdAllocator`] reserves namespace ids from an `IdentifierRecorder`,
//!   discarding ids the revision store already holds, for a bounded number
//!   of rounds.
//! - [`CreateRequest`] trees describe what is created; caller-chosen ids
//!   and namespace-generated ids can be mixed freely.
//! - [`CreateExecutor`] runs a batch of trees as one transaction over the
//!   store and the recorder.

pub mod allocator;
pub mod executor;
pub mod request;

pub use allocator::{IdAllocator, ReservationTicket};
pub use executor::{CreateExecutor, CreateOutcome};
pub use request::{
    ConceptRequest, CreateRequest, DescriptionRequest, IdStrategy, MemberRequest,
    RelationshipRequest,
};
