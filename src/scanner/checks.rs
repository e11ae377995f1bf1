//! The check capability shared by every scan pass, plus per-asset results.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assets::inventory::InventoryProvider;
use crate::assets::model::{Asset, AssetPath};
use crate::assets::types::TypeSystem;
use crate::scanner::actions::{ExecutionReport, MutationExecutor};

/// Stable small id, assigned by registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(pub u16);

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation metadata for a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInfo {
    /// Short machine name (`unused`, `naming`, `redirector`).
    pub key: &'static str,
    pub heading: &'static str,
    /// Tooltip body; `{Asset}` is replaced by the finding payload.
    pub tooltip: &'static str,
    pub filter_name: &'static str,
    pub apply_all_label: &'static str,
    pub style: &'static str,
}

impl CheckInfo {
    #[must_use]
    pub fn render_tooltip(&self, finding: &str) -> String {
        self.tooltip.replace("{Asset}", finding)
    }
}

/// Findings of one asset keyed by check id.
pub type Findings = BTreeMap<CheckId, String>;

/// One row of the scan result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEntry {
    pub asset: Asset,
    pub findings: Findings,
}

impl ScanEntry {
    #[must_use]
    pub fn path(&self) -> &AssetPath {
        &self.asset.path
    }

    #[must_use]
    pub fn finding(&self, check: CheckId) -> Option<&str> {
        self.findings.get(&check).map(String::as_str)
    }
}

/// What a check can see while scanning a batch.
pub struct ScanContext<'a> {
    /// Every asset in the primary namespace. The batch being scanned may be a
    /// single asset; graph-wide checks still traverse this full set.
    pub universe: &'a [Asset],
    pub types: &'a dyn TypeSystem,
    /// Type lookups go to the provider rather than scanning `universe`.
    pub inventory: &'a dyn InventoryProvider,
}

/// A scan pass with an optional fix.
pub trait Check: Send + Sync {
    fn info(&self) -> &CheckInfo;

    /// Findings for assets of `batch`; assets without a finding are omitted.
    fn scan(&self, batch: &[Asset], ctx: &ScanContext<'_>) -> Vec<(AssetPath, String)>;

    /// Apply the fix for each `(asset, finding)` pair. Failures are recorded
    /// per asset and never stop the rest of the batch.
    fn execute(
        &self,
        targets: &[(Asset, String)],
        executor: &dyn MutationExecutor,
        report: &mut ExecutionReport,
    );
}
