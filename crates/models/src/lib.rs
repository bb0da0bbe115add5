//! Entities of the review store and the validation rules applied to their
//! create/update payloads.

pub mod errors;
pub mod identity;
pub mod user;
pub mod review;

pub use identity::{derive_id, RecordId};
