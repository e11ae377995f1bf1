//! Host mutations and their bookkeeping.
//!
//! Checks never mutate assets themselves; they hand a plan to a
//! [`MutationExecutor`]. [`PlanRecorder`] records the plan without touching
//! anything (dry run), and [`AssetInventory`] applies it to the in-memory
//! inventory so the result can be written back to the manifest.

#![allow(missing_docs)]

use std::collections::HashSet;

use parking_lot::Mutex;
use serde::Serialize;

use crate::assets::inventory::{AssetInventory, InventoryProvider};
use crate::assets::model::{Asset, AssetPath};
use crate::assets::types::TypeRef;
use crate::core::errors::{AhcError, Result};
use crate::scanner::redirector::resolve_redirect_target;

/// Type stamped on the stubs [`AssetInventory`] leaves behind on rename.
pub const REDIRECTOR_TYPE: &str = "/Script/CoreUObject.ObjectRedirector";

/// Mutation operations provided by the host.
pub trait MutationExecutor: Send + Sync {
    /// Rename within the same folder; returns the new path. A redirector is
    /// left at the old path.
    fn rename_asset(&self, path: &AssetPath, new_name: &str) -> Result<AssetPath>;

    /// Repoint every referencer of each stub at its destination and remove
    /// the stubs.
    fn fixup_redirectors(&self, paths: &[AssetPath]) -> Result<()>;

    /// Returns how many assets were deleted.
    fn delete_assets(&self, paths: &[AssetPath]) -> Result<usize>;
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    Rename { path: AssetPath, new_name: String },
    FixupRedirectors { paths: Vec<AssetPath> },
    Delete { paths: Vec<AssetPath> },
}

/// Executor that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct PlanRecorder {
    actions: Mutex<Vec<PlannedAction>>,
}

impl PlanRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn actions(&self) -> Vec<PlannedAction> {
        self.actions.lock().clone()
    }

    #[must_use]
    pub fn into_actions(self) -> Vec<PlannedAction> {
        self.actions.into_inner()
    }
}

impl MutationExecutor for PlanRecorder {
    fn rename_asset(&self, path: &AssetPath, new_name: &str) -> Result<AssetPath> {
        self.actions.lock().push(PlannedAction::Rename {
            path: path.clone(),
            new_name: new_name.to_string(),
        });
        Ok(path.with_base_name(new_name))
    }

    fn fixup_redirectors(&self, paths: &[AssetPath]) -> Result<()> {
        self.actions.lock().push(PlannedAction::FixupRedirectors {
            paths: paths.to_vec(),
        });
        Ok(())
    }

    fn delete_assets(&self, paths: &[AssetPath]) -> Result<usize> {
        self.actions.lock().push(PlannedAction::Delete {
            paths: paths.to_vec(),
        });
        Ok(paths.len())
    }
}

// ──────────────────── in-memory mutation ────────────────────

impl MutationExecutor for AssetInventory {
    fn rename_asset(&self, path: &AssetPath, new_name: &str) -> Result<AssetPath> {
        if new_name.is_empty() || new_name.contains(['/', '.']) {
            return Err(AhcError::mutation(
                path.as_str(),
                format!("invalid asset name {new_name:?}"),
            ));
        }
        let Some(mut asset) = self.asset(path) else {
            return Err(AhcError::UnknownAsset {
                path: path.to_string(),
            });
        };
        let new_path = path.with_base_name(new_name);
        if new_path == *path {
            return Ok(new_path);
        }
        if self.asset(&new_path).is_some() {
            return Err(AhcError::mutation(
                path.as_str(),
                format!("{new_path} already exists"),
            ));
        }

        self.remove(path);
        asset.path = new_path.clone();
        asset.name = new_name.to_string();
        self.upsert(asset);
        self.upsert(
            Asset::new(path.as_str(), TypeRef::new(REDIRECTOR_TYPE))
                .with_redirect_target(format!("{new_path}.{new_name}")),
        );
        Ok(new_path)
    }

    fn fixup_redirectors(&self, paths: &[AssetPath]) -> Result<()> {
        let mut resolved = Vec::with_capacity(paths.len());
        for path in paths {
            let target = self
                .asset(path)
                .ok_or_else(|| AhcError::UnknownAsset {
                    path: path.to_string(),
                })?
                .redirect_target
                .ok_or_else(|| AhcError::mutation(path.as_str(), "not a redirector"))?;
            resolved.push((path.clone(), AssetPath::new(resolve_redirect_target(&target))));
        }

        self.edit_all(|asset| {
            for dependency in &mut asset.dependencies {
                if let Some((_, destination)) = resolved.iter().find(|(stub, _)| stub == dependency)
                {
                    *dependency = destination.clone();
                }
            }
            let mut seen = HashSet::new();
            asset
                .dependencies
                .retain(|dependency| seen.insert(dependency.clone()));
        });
        for (stub, _) in &resolved {
            self.remove(stub);
        }
        Ok(())
    }

    fn delete_assets(&self, paths: &[AssetPath]) -> Result<usize> {
        if let Some(missing) = paths.iter().find(|path| self.asset(path).is_none()) {
            return Err(AhcError::UnknownAsset {
                path: missing.to_string(),
            });
        }
        Ok(paths
            .iter()
            .filter(|path| self.remove(path).is_some())
            .count())
    }
}

// ──────────────────── execution report ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub path: AssetPath,
    pub error_code: String,
    pub message: String,
}

/// Per-asset outcome of executing one check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub check: String,
    pub succeeded: Vec<AssetPath>,
    pub failed: Vec<ActionFailure>,
}

impl ExecutionReport {
    #[must_use]
    pub fn new(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            ..Self::default()
        }
    }

    pub fn record_ok(&mut self, path: &AssetPath) {
        self.succeeded.push(path.clone());
    }

    pub fn record_err(&mut self, path: &AssetPath, err: &AhcError) {
        self.failed.push(ActionFailure {
            path: path.clone(),
            error_code: err.code().to_string(),
            message: err.to_string(),
        });
    }

    pub fn record(&mut self, path: &AssetPath, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.record_ok(path),
            Err(err) => self.record_err(path, &err),
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
