//! File-backed entity stores.

pub mod user_store;
pub mod review_store;
