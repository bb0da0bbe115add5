//! Storage building blocks for the service layer
//!
//! A delimited-text dialect, a whole-file resource with a writer lock, and a
//! generic record store that combines the two through a [`record_store::RecordCodec`].

pub mod delimited;
pub mod flat_file;
pub mod record_store;
