//! Scan orchestration: runs every registered check over the inventory and
//! publishes the per-asset findings as an immutable snapshot.
//!
//! Scan pipeline:
//! 1. Pull the inventory; the namespace-filtered set is the graph universe.
//! 2. Candidates are universe assets whose display name equals their base
//!    name (when required) and that no exclusion pattern covers.
//! 3. Each check scans the candidates in registration order.
//! 4. Assets without findings are dropped; the rest is sorted by path.
//!
//! Readers get an `Arc` snapshot and never block a scan. Rescan requests that
//! arrive while a scan is running (for instance from a result listener) are
//! coalesced into one follow-up scan.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::assets::inventory::InventoryProvider;
use crate::assets::model::{Asset, AssetPath};
use crate::assets::types::TypeSystem;
use crate::core::config::ScanConfig;
use crate::core::errors::{AhcError, Result};
use crate::core::store::{Observer, ObserverList, Subscription};
use crate::logger::jsonl::{ActivityLog, EventType};
use crate::rules::engine::NamingRuleEngine;
use crate::scanner::actions::{ExecutionReport, MutationExecutor};
use crate::scanner::checks::{Check, CheckId, CheckInfo, Findings, ScanContext, ScanEntry};
use crate::scanner::exclusion::ExclusionSet;
use crate::scanner::naming_check::NamingCheck;
use crate::scanner::reachability::UnusedCheck;
use crate::scanner::redirector::RedirectorCheck;

/// Ids of the default checks, in registration order.
pub const UNUSED_CHECK: CheckId = CheckId(0);
pub const NAMING_CHECK: CheckId = CheckId(1);
pub const REDIRECTOR_CHECK: CheckId = CheckId(2);

#[derive(Debug, Default)]
struct ScanState {
    scanning: bool,
    pending: bool,
}

pub struct ScanOrchestrator {
    inventory: Arc<dyn InventoryProvider>,
    types: Arc<dyn TypeSystem>,
    engine: Arc<NamingRuleEngine>,
    checks: Vec<Box<dyn Check>>,
    config: ScanConfig,
    exclusions: ExclusionSet,
    results: ArcSwap<Vec<ScanEntry>>,
    /// Serializes result replacement between full and incremental updates.
    write_lock: Mutex<()>,
    state: Mutex<ScanState>,
    started: AtomicBool,
    scans_completed: AtomicU64,
    assets_scanned: AtomicUsize,
    listeners: Arc<ObserverList>,
    store_subscription: Mutex<Option<Subscription>>,
    log: ActivityLog,
}

impl ScanOrchestrator {
    /// Orchestrator with the default checks: unused, naming, redirector.
    pub fn new(
        inventory: Arc<dyn InventoryProvider>,
        engine: Arc<NamingRuleEngine>,
        config: &ScanConfig,
        log: ActivityLog,
    ) -> Result<Arc<Self>> {
        let checks: Vec<Box<dyn Check>> = vec![
            Box::new(UnusedCheck::new(config)),
            Box::new(NamingCheck::new(Arc::clone(&engine))),
            Box::new(RedirectorCheck::new(config)),
        ];
        Self::with_checks(inventory, engine, config, checks, log)
    }

    /// Orchestrator with a custom check list; ids follow list order.
    pub fn with_checks(
        inventory: Arc<dyn InventoryProvider>,
        engine: Arc<NamingRuleEngine>,
        config: &ScanConfig,
        checks: Vec<Box<dyn Check>>,
        log: ActivityLog,
    ) -> Result<Arc<Self>> {
        if checks.len() > usize::from(u16::MAX) {
            return Err(AhcError::InvalidConfig {
                details: "too many checks registered".to_string(),
            });
        }
        let exclusions = ExclusionSet::new(&config.excluded_paths)?;
        Ok(Arc::new(Self {
            inventory,
            types: Arc::clone(engine.types()),
            engine,
            checks,
            config: config.clone(),
            exclusions,
            results: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            state: Mutex::new(ScanState::default()),
            started: AtomicBool::new(false),
            scans_completed: AtomicU64::new(0),
            assets_scanned: AtomicUsize::new(0),
            listeners: ObserverList::new(),
            store_subscription: Mutex::new(None),
            log,
        }))
    }

    /// Follow configuration changes and run the first scan. Fails on a
    /// second call.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AhcError::AlreadyStarted);
        }
        let weak = Arc::downgrade(self);
        let subscription = self.engine.subscribe_store(Arc::new(move || {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator
                    .log
                    .info(EventType::ConfigChanged, |e| e.with_details("rescan requested"));
                orchestrator.request_rescan();
            }
        }));
        *self.store_subscription.lock() = Some(subscription);
        self.request_rescan();
        Ok(())
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// `(id, metadata)` of each registered check, in id order.
    pub fn checks(&self) -> impl Iterator<Item = (CheckId, &CheckInfo)> {
        self.checks
            .iter()
            .enumerate()
            .map(|(idx, check)| (check_id(idx), check.info()))
    }

    /// Look up a check by its key (`naming`) or numeric id (`1`).
    #[must_use]
    pub fn find_check(&self, name: &str) -> Option<CheckId> {
        let name = name.trim();
        self.checks()
            .find(|(id, info)| info.key.eq_ignore_ascii_case(name) || id.to_string() == name)
            .map(|(id, _)| id)
    }

    /// Current immutable result snapshot.
    #[must_use]
    pub fn scan_results(&self) -> Arc<Vec<ScanEntry>> {
        self.results.load_full()
    }

    #[must_use]
    pub fn scans_completed(&self) -> u64 {
        self.scans_completed.load(Ordering::SeqCst)
    }

    /// Candidates examined by the last full scan, flagged or not.
    #[must_use]
    pub fn assets_scanned(&self) -> usize {
        self.assets_scanned.load(Ordering::SeqCst)
    }

    /// Called after every result update, outside of any lock.
    pub fn subscribe_results(&self, observer: Observer) -> Subscription {
        self.listeners.subscribe(observer)
    }

    /// Run a full scan, or mark one pending if a scan is already running.
    pub fn request_rescan(&self) {
        {
            let mut state = self.state.lock();
            if state.scanning {
                state.pending = true;
                return;
            }
            state.scanning = true;
        }
        loop {
            self.full_scan();
            let mut state = self.state.lock();
            if state.pending {
                state.pending = false;
                continue;
            }
            state.scanning = false;
            break;
        }
    }

    /// Scan one new or changed asset and merge it into the results.
    pub fn on_asset_added(&self, asset: &Asset) {
        let universe = self.universe_with(asset);
        let entries = if self.is_candidate(asset) {
            self.scan_batch(std::slice::from_ref(asset), &universe)
        } else {
            Vec::new()
        };
        self.update_results(|results| {
            results.retain(|entry| entry.asset.path != asset.path);
            results.extend(entries);
        });
    }

    pub fn on_asset_removed(&self, path: &AssetPath) {
        if !self.scan_results().iter().any(|entry| entry.path() == path) {
            return;
        }
        self.update_results(|results| results.retain(|entry| entry.path() != path));
    }

    pub fn on_asset_renamed(&self, old_path: &AssetPath, asset: &Asset) {
        self.on_asset_removed(old_path);
        self.on_asset_added(asset);
    }

    /// Apply `check`'s fix to `paths` (every flagged asset when `paths` is
    /// empty), then rescan.
    pub fn request_check_execution(
        &self,
        check: CheckId,
        paths: &[AssetPath],
        executor: &dyn MutationExecutor,
    ) -> Result<ExecutionReport> {
        let Some(runner) = self.checks.get(usize::from(check.0)) else {
            return Err(AhcError::UnknownCheck { id: check.0 });
        };
        let info = runner.info();
        let mut report = ExecutionReport::new(info.key);

        let snapshot = self.scan_results();
        let flagged: BTreeMap<&AssetPath, (&Asset, &str)> = snapshot
            .iter()
            .filter_map(|entry| {
                entry
                    .finding(check)
                    .map(|finding| (entry.path(), (&entry.asset, finding)))
            })
            .collect();

        let mut targets = Vec::new();
        if paths.is_empty() {
            targets.extend(
                flagged
                    .values()
                    .map(|(asset, finding)| ((*asset).clone(), (*finding).to_string())),
            );
        } else {
            for path in paths {
                match flagged.get(path) {
                    Some((asset, finding)) => {
                        targets.push(((*asset).clone(), (*finding).to_string()));
                    }
                    None => report.record_err(
                        path,
                        &AhcError::UnknownAsset {
                            path: path.to_string(),
                        },
                    ),
                }
            }
        }

        runner.execute(&targets, executor, &mut report);

        for path in &report.succeeded {
            self.log
                .info(EventType::ActionExecuted, |e| e.with_check(info.key).with_path(path.as_str()));
        }
        for failure in &report.failed {
            self.log.warn(EventType::ActionFailed, |mut e| {
                e.ok = Some(false);
                e.error_code = Some(failure.error_code.clone());
                e.error_message = Some(failure.message.clone());
                e.with_check(info.key).with_path(failure.path.as_str())
            });
        }

        if !targets.is_empty() {
            self.request_rescan();
        }
        Ok(report)
    }

    // ──────────────────── internals ────────────────────

    fn full_scan(&self) {
        let started = Instant::now();
        let universe: Vec<Asset> = self
            .inventory
            .all_assets()
            .into_iter()
            .filter(|asset| asset.path.is_in_namespace(&self.config.namespace))
            .collect();
        let candidates: Vec<Asset> = universe
            .iter()
            .filter(|asset| self.is_candidate(asset))
            .cloned()
            .collect();
        let entries = self.scan_batch(&candidates, &universe);
        let finding_count: usize = entries.iter().map(|entry| entry.findings.len()).sum();

        self.assets_scanned.store(candidates.len(), Ordering::SeqCst);
        self.update_results(|results| *results = entries);
        self.scans_completed.fetch_add(1, Ordering::SeqCst);

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.log.info(EventType::ScanComplete, |mut e| {
            e.asset_count = Some(candidates.len());
            e.finding_count = Some(finding_count);
            e.rule_count = Some(self.engine.rules().len());
            e.duration_ms = Some(elapsed);
            e
        });
    }

    /// Namespace, display-name and exclusion filters.
    fn is_candidate(&self, asset: &Asset) -> bool {
        asset.path.is_in_namespace(&self.config.namespace)
            && (!self.config.require_name_match || asset.name_matches_path())
            && !self.exclusions.is_excluded(&asset.path)
    }

    /// Namespace-filtered inventory with `asset` in it, replacing any stale copy.
    fn universe_with(&self, asset: &Asset) -> Vec<Asset> {
        let mut universe: Vec<Asset> = self
            .inventory
            .all_assets()
            .into_iter()
            .filter(|candidate| {
                candidate.path != asset.path
                    && candidate.path.is_in_namespace(&self.config.namespace)
            })
            .collect();
        universe.push(asset.clone());
        universe
    }

    fn scan_batch(&self, batch: &[Asset], universe: &[Asset]) -> Vec<ScanEntry> {
        let ctx = ScanContext {
            universe,
            types: self.types.as_ref(),
            inventory: self.inventory.as_ref(),
        };
        let mut findings: BTreeMap<AssetPath, Findings> = BTreeMap::new();
        for (idx, check) in self.checks.iter().enumerate() {
            let id = check_id(idx);
            for (path, finding) in check.scan(batch, &ctx) {
                findings.entry(path).or_default().insert(id, finding);
            }
        }
        batch
            .iter()
            .filter_map(|asset| {
                let findings = findings.remove(&asset.path)?;
                (!findings.is_empty()).then(|| ScanEntry {
                    asset: asset.clone(),
                    findings,
                })
            })
            .collect()
    }

    /// Copy, edit, sort and publish the result list, then notify listeners.
    fn update_results(&self, edit: impl FnOnce(&mut Vec<ScanEntry>)) {
        {
            let _guard = self.write_lock.lock();
            let mut next = Vec::clone(&self.results.load());
            edit(&mut next);
            next.sort_by(|a, b| a.asset.path.cmp(&b.asset.path));
            self.results.store(Arc::new(next));
        }
        self.listeners.broadcast();
    }
}

fn check_id(idx: usize) -> CheckId {
    // Registration caps the list at u16::MAX entries.
    CheckId(u16::try_from(idx).unwrap_or(u16::MAX))
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("checks", &self.checks.len())
            .field("results", &self.results.load().len())
            .field("started", &self.is_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::inventory::AssetInventory;
    use crate::assets::types::TypeRef;
    use crate::core::config::RulesConfig;
    use crate::core::store::{ConfigStore, MemoryConfigStore};
    use crate::scanner::actions::PlanRecorder;
    use std::sync::atomic::AtomicUsize;

    fn material(path: &str) -> Asset {
        Asset::new(path, TypeRef::new("/Script/Engine.Material"))
    }

    fn world(path: &str) -> Asset {
        Asset::new(path, TypeRef::new("/Script/Engine.World"))
    }

    struct Fixture {
        store: Arc<MemoryConfigStore>,
        inventory: Arc<AssetInventory>,
        orchestrator: Arc<ScanOrchestrator>,
    }

    fn fixture(assets: Vec<Asset>, config: ScanConfig) -> Fixture {
        let store = Arc::new(MemoryConfigStore::new());
        let inventory = Arc::new(AssetInventory::new(assets));
        let engine = NamingRuleEngine::new(
            store.clone(),
            inventory.types(),
            &RulesConfig::default(),
            ActivityLog::disabled(),
        );
        let orchestrator =
            ScanOrchestrator::new(inventory.clone(), engine, &config, ActivityLog::disabled())
                .unwrap();
        Fixture {
            store,
            inventory,
            orchestrator,
        }
    }

    fn result_paths(orchestrator: &ScanOrchestrator) -> Vec<String> {
        orchestrator
            .scan_results()
            .iter()
            .map(|entry| entry.path().to_string())
            .collect()
    }

    #[test]
    fn checks_register_in_fixed_order() {
        let f = fixture(Vec::new(), ScanConfig::default());
        let keys: Vec<(CheckId, &str)> =
            f.orchestrator.checks().map(|(id, info)| (id, info.key)).collect();
        assert_eq!(
            keys,
            vec![
                (UNUSED_CHECK, "unused"),
                (NAMING_CHECK, "naming"),
                (REDIRECTOR_CHECK, "redirector")
            ]
        );
        assert_eq!(f.orchestrator.find_check("Naming"), Some(NAMING_CHECK));
        assert_eq!(f.orchestrator.find_check("2"), Some(REDIRECTOR_CHECK));
        assert_eq!(f.orchestrator.find_check("bogus"), None);
    }

    #[test]
    fn second_start_is_rejected() {
        let f = fixture(Vec::new(), ScanConfig::default());
        f.orchestrator.start().unwrap();
        assert!(matches!(f.orchestrator.start(), Err(AhcError::AlreadyStarted)));
    }

    #[test]
    fn scan_filters_namespace_alias_names_and_clean_assets() {
        let assets = vec![
            world("/Game/Levels/L1").with_dependency("/Game/Mats/M_Good"),
            material("/Game/Mats/M_Good"),
            material("/Other/Thing"),
            material("/Game/Mats/Aliased").with_name("SomethingElse"),
        ];
        let f = fixture(assets, ScanConfig::default());
        f.orchestrator.start().unwrap();
        // L1 and M_Good are clean, /Other is out of namespace, the alias is skipped.
        assert!(f.orchestrator.scan_results().is_empty());
        assert_eq!(f.orchestrator.assets_scanned(), 2);
    }

    #[test]
    fn results_are_sorted_and_carry_every_check() {
        let assets = vec![
            world("/Game/Levels/L1"),
            material("/Game/Mats/Zeta"),
            material("/Game/Mats/Alpha"),
        ];
        let f = fixture(assets, ScanConfig::default());
        f.orchestrator.start().unwrap();
        assert_eq!(
            result_paths(&f.orchestrator),
            vec!["/Game/Mats/Alpha", "/Game/Mats/Zeta"]
        );
        let alpha = &f.orchestrator.scan_results()[0];
        assert_eq!(alpha.finding(UNUSED_CHECK), Some(""));
        assert_eq!(alpha.finding(NAMING_CHECK), Some("M_Alpha"));
    }

    #[test]
    fn excluded_paths_are_not_reported() {
        let config = ScanConfig {
            excluded_paths: vec!["/Game/Developers/**".to_string()],
            ..ScanConfig::default()
        };
        let f = fixture(
            vec![material("/Game/Developers/bob/Scratch"), material("/Game/Mats/M_A")],
            config,
        );
        f.orchestrator.start().unwrap();
        assert_eq!(result_paths(&f.orchestrator), vec!["/Game/Mats/M_A"]);
    }

    #[test]
    fn rule_change_triggers_rescan() {
        let f = fixture(
            vec![world("/Game/Levels/L1").with_dependency("/Game/Mats/M_A"), material("/Game/Mats/M_A")],
            ScanConfig::default(),
        );
        f.orchestrator.start().unwrap();
        assert!(f.orchestrator.scan_results().is_empty());

        f.store
            .set_string(
                "Actions",
                "NamingPatterns",
                r#"{"Patterns":[{"Class":"Material","Prefix":"Mat_","Suffix":"","Properties":[]}]}"#,
            )
            .unwrap();
        let results = f.orchestrator.scan_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].finding(NAMING_CHECK), Some("Mat_M_A"));
    }

    #[test]
    fn listener_rescan_requests_are_coalesced() {
        let f = fixture(vec![material("/Game/Mats/A")], ScanConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&f.orchestrator);
        let hook = Arc::clone(&calls);
        let _sub = f.orchestrator.subscribe_results(Arc::new(move || {
            // Only the first notification asks for another scan.
            if hook.fetch_add(1, Ordering::SeqCst) == 0
                && let Some(orchestrator) = weak.upgrade()
            {
                orchestrator.request_rescan();
            }
        }));

        f.orchestrator.request_rescan();
        assert_eq!(f.orchestrator.scans_completed(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn incremental_add_rename_and_remove() {
        let f = fixture(
            vec![world("/Game/Levels/L1").with_dependency("/Game/Mats/New")],
            ScanConfig::default(),
        );
        f.orchestrator.start().unwrap();
        assert!(f.orchestrator.scan_results().is_empty());

        // Referenced by L1, so only the naming check fires.
        let added = material("/Game/Mats/New");
        f.inventory.upsert(added.clone());
        f.orchestrator.on_asset_added(&added);
        let results = f.orchestrator.scan_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].findings.len(), 1);
        assert_eq!(results[0].finding(NAMING_CHECK), Some("M_New"));

        let renamed = material("/Game/Mats/M_New");
        f.orchestrator.on_asset_renamed(&added.path, &renamed);
        // Nothing references the new path, so it is unused now.
        let results = f.orchestrator.scan_results();
        assert_eq!(result_paths(&f.orchestrator), vec!["/Game/Mats/M_New"]);
        assert_eq!(results[0].finding(UNUSED_CHECK), Some(""));

        f.orchestrator.on_asset_removed(&renamed.path);
        assert!(f.orchestrator.scan_results().is_empty());
    }

    #[test]
    fn incremental_add_outside_namespace_is_ignored() {
        let f = fixture(Vec::new(), ScanConfig::default());
        f.orchestrator.on_asset_added(&material("/Other/Stuff"));
        assert!(f.orchestrator.scan_results().is_empty());
    }

    #[test]
    fn execution_plans_fixes_and_reports_unknown_paths() {
        let f = fixture(
            vec![world("/Game/Levels/L1").with_dependency("/Game/Mats/MyMat"), material("/Game/Mats/MyMat")],
            ScanConfig::default(),
        );
        f.orchestrator.start().unwrap();

        let recorder = PlanRecorder::new();
        let report = f
            .orchestrator
            .request_check_execution(
                NAMING_CHECK,
                &[AssetPath::new("/Game/Mats/MyMat"), AssetPath::new("/Game/Nope")],
                &recorder,
            )
            .unwrap();
        assert_eq!(report.check, "naming");
        assert_eq!(report.succeeded, vec![AssetPath::new("/Game/Mats/MyMat")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].error_code, "AHC-2002");
        assert_eq!(recorder.actions().len(), 2);
    }

    #[test]
    fn execution_against_inventory_applies_and_rescans() {
        let f = fixture(
            vec![
                world("/Game/Levels/L1").with_dependency("/Game/Mats/MyMat"),
                material("/Game/Mats/MyMat"),
            ],
            ScanConfig::default(),
        );
        f.orchestrator.start().unwrap();
        let inventory = Arc::clone(&f.inventory);
        let report = f
            .orchestrator
            .request_check_execution(NAMING_CHECK, &[], inventory.as_ref())
            .unwrap();
        assert!(report.is_clean());
        assert!(f.orchestrator.scan_results().is_empty());
        let level = f.inventory.asset(&AssetPath::new("/Game/Levels/L1")).unwrap();
        assert_eq!(level.dependencies, vec![AssetPath::new("/Game/Mats/M_MyMat")]);
    }

    #[test]
    fn unknown_check_is_an_error() {
        let f = fixture(Vec::new(), ScanConfig::default());
        let err = f
            .orchestrator
            .request_check_execution(CheckId(9), &[], &PlanRecorder::new())
            .unwrap_err();
        assert_eq!(err.code(), "AHC-2003");
    }
}
