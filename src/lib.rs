//! `emldigest` — groups a local `.eml` archive into conversations and
//! topical clusters for digest display.
//!
//! This crate provides the core library: metadata extraction over an
//! archive of messages, conversation reconstruction from identity keys,
//! content clustering over TF-IDF features, and the reconciliation step
//! that picks one display label per message.

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod store;
