//! Shared helpers for the review store workspace: logging setup, runtime
//! environment checks and the JSON envelope types returned over HTTP.

pub mod types;
pub mod utils;
pub mod env;
