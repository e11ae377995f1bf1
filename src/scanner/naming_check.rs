//! Naming convention check backed by the live rule engine.

#![allow(missing_docs)]

use std::sync::Arc;

use crate::assets::model::{Asset, AssetPath};
use crate::rules::engine::NamingRuleEngine;
use crate::scanner::actions::{ExecutionReport, MutationExecutor};
use crate::scanner::checks::{Check, CheckInfo, ScanContext};

pub struct NamingCheck {
    info: CheckInfo,
    engine: Arc<NamingRuleEngine>,
}

impl NamingCheck {
    #[must_use]
    pub fn new(engine: Arc<NamingRuleEngine>) -> Self {
        Self {
            info: CheckInfo {
                key: "naming",
                heading: "Improper naming",
                tooltip: "The name of this asset does not follow the defined format.\n\
                          Suggested asset name: {Asset}.\n\nClick to apply naming",
                filter_name: "Naming conventions",
                apply_all_label: "Apply all naming conventions",
                style: "Action.Naming",
            },
            engine,
        }
    }
}

impl Check for NamingCheck {
    fn info(&self) -> &CheckInfo {
        &self.info
    }

    fn scan(&self, batch: &[Asset], _ctx: &ScanContext<'_>) -> Vec<(AssetPath, String)> {
        batch
            .iter()
            .filter_map(|asset| {
                self.engine
                    .suggest_name(asset)
                    .map(|name| (asset.path.clone(), name))
            })
            .collect()
    }

    /// Rename, then fix up the redirector the rename leaves at the old path.
    fn execute(
        &self,
        targets: &[(Asset, String)],
        executor: &dyn MutationExecutor,
        report: &mut ExecutionReport,
    ) {
        for (asset, suggested) in targets {
            let outcome = executor
                .rename_asset(&asset.path, suggested)
                .and_then(|_| executor.fixup_redirectors(std::slice::from_ref(&asset.path)));
            report.record(&asset.path, outcome);
        }
    }
}
