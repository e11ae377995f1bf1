//! Core types: errors, configuration, the key-value settings store.

pub mod config;
pub mod errors;
pub mod store;
