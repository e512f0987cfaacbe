//! File-backed record services.

pub mod user_store;
