//! Redirector detection: stubs left behind by moves and renames.

#![allow(missing_docs)]

use crate::assets::model::{Asset, AssetPath};
use crate::assets::types::{TypeRef, TypeSystem};
use crate::core::config::ScanConfig;
use crate::scanner::actions::{ExecutionReport, MutationExecutor};
use crate::scanner::checks::{Check, CheckInfo, ScanContext};

/// Package path of a destination object path: everything from the last `.`
/// on is dropped (`/Game/Foo/Bar.Bar` → `/Game/Foo/Bar`).
#[must_use]
pub fn resolve_redirect_target(destination: &str) -> &str {
    destination
        .rfind('.')
        .map_or(destination, |idx| &destination[..idx])
}

/// Resolved destination package if `asset` is a redirector, `None` otherwise.
#[must_use]
pub fn detect(asset: &Asset, redirector_type: &TypeRef, types: &dyn TypeSystem) -> Option<String> {
    if !types.is_subtype_of(&asset.asset_type, redirector_type) {
        return None;
    }
    asset
        .redirect_target
        .as_deref()
        .map(|target| resolve_redirect_target(target).to_string())
}

pub struct RedirectorCheck {
    info: CheckInfo,
    redirector_type: TypeRef,
}

impl RedirectorCheck {
    #[must_use]
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            info: CheckInfo {
                key: "redirector",
                heading: "Redirector",
                tooltip: "This asset redirects to {Asset}.\n\nClick to fix up referencers",
                filter_name: "Redirectors",
                apply_all_label: "Fix up all redirectors",
                style: "Action.Redirector",
            },
            redirector_type: TypeRef::new(config.redirector_type.clone()),
        }
    }
}

impl Check for RedirectorCheck {
    fn info(&self) -> &CheckInfo {
        &self.info
    }

    fn scan(&self, batch: &[Asset], ctx: &ScanContext<'_>) -> Vec<(AssetPath, String)> {
        batch
            .iter()
            .filter_map(|asset| {
                detect(asset, &self.redirector_type, ctx.types)
                    .map(|target| (asset.path.clone(), target))
            })
            .collect()
    }

    fn execute(
        &self,
        targets: &[(Asset, String)],
        executor: &dyn MutationExecutor,
        report: &mut ExecutionReport,
    ) {
        for (asset, _) in targets {
            let outcome = executor.fixup_redirectors(std::slice::from_ref(&asset.path));
            report.record(&asset.path, outcome);
        }
    }
}
