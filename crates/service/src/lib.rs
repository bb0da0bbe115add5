//! Storage core of the review service.
//! - `storage`: delimited-text codec and the generic whole-file record store.
//! - `file`: the user and review stores built on it.
//! - `stats`: read-only aggregates over reviews.

pub mod errors;
pub mod storage;
pub mod directory;
pub mod file;
pub mod stats;
