//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use asset_hygiene::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{AhcError, Result};
pub use crate::core::store::{ConfigStore, FileConfigStore, MemoryConfigStore, Subscription};

// Assets
pub use crate::assets::inventory::{AssetInventory, InventoryProvider};
pub use crate::assets::model::{Asset, AssetPath, PropertyKind, PropertyValue};
pub use crate::assets::types::{TypeRef, TypeRegistry, TypeSystem};

// Rules
pub use crate::rules::engine::NamingRuleEngine;
pub use crate::rules::naming::{NamingRule, PropertyPredicate, RuleSet};

// Scanner
pub use crate::scanner::actions::{ExecutionReport, MutationExecutor, PlanRecorder};
pub use crate::scanner::checks::{Check, CheckId, CheckInfo, ScanEntry};
pub use crate::scanner::orchestrator::ScanOrchestrator;

// Logger
pub use crate::logger::jsonl::ActivityLog;
