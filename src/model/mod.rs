//! Core data model types for messages and addresses.

pub mod address;
pub mod metadata;
