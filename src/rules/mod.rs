//! Naming conventions: rule model, text codec, and the live rule engine.

pub mod codec;
pub mod engine;
pub mod naming;
