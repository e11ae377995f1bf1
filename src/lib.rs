#![forbid(unsafe_code)]

//! Asset hygiene checker (ahc): finds content that breaks project conventions
//! and offers fixes.
//!
//! Three checks run over the primary content namespace:
//! 1. **Unused assets**: nothing reachable from a playable level depends on them
//! 2. **Naming conventions**: prefix/suffix rules keyed on asset type and properties
//! 3. **Redirectors**: stubs left behind by moves and renames
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use asset_hygiene::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use asset_hygiene::core::config::Config;
//! use asset_hygiene::scanner::orchestrator::ScanOrchestrator;
//! ```

pub mod prelude;

pub mod assets;
pub mod core;
pub mod logger;
pub mod rules;
pub mod scanner;
