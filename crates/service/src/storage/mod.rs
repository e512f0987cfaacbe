//! Storage abstractions for the service layer
//!
//! Contains the reusable file-backed snapshot store used by services that
//! persist small integer-keyed maps as JSON.

pub mod json_snapshot_store;
