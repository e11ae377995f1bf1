//! Reachability from root assets: anything no root depends on, directly or
//! transitively, is unused.

#![allow(missing_docs)]

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::assets::model::{Asset, AssetPath};
use crate::assets::types::TypeRef;
use crate::core::config::ScanConfig;
use crate::scanner::actions::{ExecutionReport, MutationExecutor};
use crate::scanner::checks::{Check, CheckInfo, ScanContext};

/// Assets of `assets` not reachable from any of `roots`.
///
/// Multi-source BFS over outgoing dependency edges. Edges to assets outside
/// `assets` are ignored, and so are roots that are not part of `assets`.
#[must_use]
pub fn find_unused<'a>(
    assets: &'a [Asset],
    roots: impl IntoIterator<Item = &'a AssetPath>,
) -> BTreeSet<AssetPath> {
    let index: HashMap<&AssetPath, &Asset> =
        assets.iter().map(|asset| (&asset.path, asset)).collect();

    let mut visited: HashSet<&AssetPath> = HashSet::with_capacity(assets.len());
    let mut queue: VecDeque<&AssetPath> = VecDeque::new();
    for root in roots {
        if let Some((path, _)) = index.get_key_value(root)
            && visited.insert(*path)
        {
            queue.push_back(*path);
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(asset) = index.get(current) else {
            continue;
        };
        for dependency in &asset.dependencies {
            if let Some((path, _)) = index.get_key_value(dependency)
                && visited.insert(*path)
            {
                queue.push_back(*path);
            }
        }
    }

    assets
        .iter()
        .filter(|asset| !visited.contains(&asset.path))
        .map(|asset| asset.path.clone())
        .collect()
}

/// Flags assets no playable level depends on. Redirectors are exempt.
pub struct UnusedCheck {
    info: CheckInfo,
    namespace: String,
    root_type: TypeRef,
    redirector_type: TypeRef,
}

impl UnusedCheck {
    #[must_use]
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            info: CheckInfo {
                key: "unused",
                heading: "Unused Asset",
                tooltip: "This asset is not used by a playable level.\n\nClick to delete",
                filter_name: "Unused assets",
                apply_all_label: "Delete all unused assets",
                style: "Action.Unused",
            },
            namespace: config.namespace.clone(),
            root_type: TypeRef::new(config.root_type.clone()),
            redirector_type: TypeRef::new(config.redirector_type.clone()),
        }
    }
}

impl Check for UnusedCheck {
    fn info(&self) -> &CheckInfo {
        &self.info
    }

    fn scan(&self, batch: &[Asset], ctx: &ScanContext<'_>) -> Vec<(AssetPath, String)> {
        // A freshly added level may not be in the inventory yet.
        let fresh = batch
            .iter()
            .filter(|asset| ctx.types.is_subtype_of(&asset.asset_type, &self.root_type))
            .map(|asset| asset.path.clone());
        let roots: Vec<AssetPath> = ctx
            .inventory
            .assets_by_type(&self.root_type)
            .into_iter()
            .map(|asset| asset.path)
            .chain(fresh)
            .filter(|path| path.is_in_namespace(&self.namespace))
            .collect();
        let unused = find_unused(ctx.universe, &roots);

        batch
            .iter()
            .filter(|asset| {
                unused.contains(&asset.path)
                    && !ctx.types.is_subtype_of(&asset.asset_type, &self.redirector_type)
            })
            .map(|asset| (asset.path.clone(), String::new()))
            .collect()
    }

    fn execute(
        &self,
        targets: &[(Asset, String)],
        executor: &dyn MutationExecutor,
        report: &mut ExecutionReport,
    ) {
        for (asset, _) in targets {
            let outcome = executor
                .delete_assets(std::slice::from_ref(&asset.path))
                .map(|_| ());
            report.record(&asset.path, outcome);
        }
    }
}
