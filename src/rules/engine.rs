//! Live naming rule set backed by the configuration store.
//!
//! The engine loads the rule text from the store on construction and again on
//! every store change notification. An empty stored value means "not
//! configured": the baseline table is used and written back, so the stored
//! configuration is explicit from then on. The written value differs from the
//! empty one, so the store broadcasts once more and the nested reload decodes
//! the same rules; after that the value is stable and the chain stops.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::assets::model::Asset;
use crate::assets::types::TypeSystem;
use crate::core::config::RulesConfig;
use crate::core::errors::Result;
use crate::core::store::{ConfigStore, Observer, Subscription};
use crate::logger::jsonl::{ActivityLog, EventType};
use crate::rules::codec;
use crate::rules::naming::RuleSet;

/// Where the current rules came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Stored,
    Baseline,
}

impl RuleSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Baseline => "baseline",
        }
    }
}

pub struct NamingRuleEngine {
    store: Arc<dyn ConfigStore>,
    types: Arc<dyn TypeSystem>,
    section: String,
    key: String,
    rules: ArcSwap<RuleSet>,
    generation: AtomicU64,
    log: ActivityLog,
    subscription: Mutex<Option<Subscription>>,
}

impl NamingRuleEngine {
    /// Load the rules and start following store changes.
    ///
    /// The subscription holds only a weak reference; dropping the last `Arc`
    /// drops the subscription with it.
    pub fn new(
        store: Arc<dyn ConfigStore>,
        types: Arc<dyn TypeSystem>,
        config: &RulesConfig,
        log: ActivityLog,
    ) -> Arc<Self> {
        let engine = Arc::new(Self {
            store: Arc::clone(&store),
            types,
            section: config.section.clone(),
            key: config.key.clone(),
            rules: ArcSwap::from_pointee(RuleSet::default()),
            generation: AtomicU64::new(0),
            log,
            subscription: Mutex::new(None),
        });
        engine.reload();

        let weak = Arc::downgrade(&engine);
        let subscription = store.subscribe(Arc::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.reload();
            }
        }));
        *engine.subscription.lock() = Some(subscription);
        engine
    }

    /// Current rule snapshot, sorted by specialization.
    #[must_use]
    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Incremented on every reload.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn types(&self) -> &Arc<dyn TypeSystem> {
        &self.types
    }

    /// Re-read the stored rules. Falls back to (and persists) the baseline
    /// when nothing is stored.
    pub fn reload(&self) -> RuleSource {
        let text = self.store.get_string(&self.section, &self.key, "");

        let (mut rules, source) = if text.trim().is_empty() {
            (RuleSet::baseline(self.types.as_ref()), RuleSource::Baseline)
        } else {
            let decoded = codec::decode(&text, self.types.as_ref());
            for dropped in &decoded.dropped {
                self.log.warn(EventType::RuleDropped, |e| {
                    let e = e.with_details(dropped.reason.to_string());
                    match dropped.index {
                        Some(index) => e.with_path(format!("{}#{index}", self.key)),
                        None => e,
                    }
                });
            }
            (decoded.rules, RuleSource::Stored)
        };
        rules.sort_by_specialization(self.types.as_ref());
        let count = rules.len();
        self.publish(rules.clone());

        self.log.info(EventType::RulesLoaded, |mut e| {
            e.rule_count = Some(count);
            e.with_details(source.as_str())
        });

        if source == RuleSource::Baseline {
            // Published before persisting: the write re-enters reload().
            if let Err(err) = self.persist(&rules) {
                self.log.warn(EventType::Error, |e| {
                    e.with_details("persisting baseline rules").with_error(&err)
                });
            }
        }
        source
    }

    /// Store a new rule set; observers (including this engine) are notified
    /// if the stored text changed. An empty set reverts to the baseline on
    /// the next load.
    pub fn replace_rules(&self, mut rules: RuleSet) -> Result<()> {
        rules.sort_by_specialization(self.types.as_ref());
        self.persist(&rules)?;
        if !rules.is_empty() {
            self.publish(rules);
        }
        Ok(())
    }

    pub fn reset_to_baseline(&self) -> Result<()> {
        self.replace_rules(RuleSet::baseline(self.types.as_ref()))
    }

    /// Expected name for `asset`, or `None` when it already complies.
    #[must_use]
    pub fn suggest_name(&self, asset: &Asset) -> Option<String> {
        let rules = self.rules.load();
        let expected = rules.match_name(
            &asset.name,
            &asset.asset_type,
            asset,
            self.types.as_ref(),
        );
        (expected != asset.name).then_some(expected)
    }

    /// Subscribe an observer to the same store this engine follows.
    pub fn subscribe_store(&self, observer: Observer) -> Subscription {
        self.store.subscribe(observer)
    }

    fn persist(&self, rules: &RuleSet) -> Result<()> {
        let text = codec::encode(rules)?;
        self.store.set_string(&self.section, &self.key, &text)
    }

    fn publish(&self, rules: RuleSet) {
        self.rules.store(Arc::new(rules));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for NamingRuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingRuleEngine")
            .field("section", &self.section)
            .field("key", &self.key)
            .field("rules", &self.rules.load().len())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::model::PropertyValue;
    use crate::assets::types::{TypeRef, TypeRegistry};
    use crate::core::store::MemoryConfigStore;
    use crate::rules::naming::NamingRule;

    fn setup() -> (Arc<MemoryConfigStore>, Arc<NamingRuleEngine>) {
        let store = Arc::new(MemoryConfigStore::new());
        let engine = NamingRuleEngine::new(
            store.clone(),
            Arc::new(TypeRegistry::with_engine_types()),
            &RulesConfig::default(),
            ActivityLog::disabled(),
        );
        (store, engine)
    }

    #[test]
    fn empty_store_seeds_and_persists_baseline() {
        let (store, engine) = setup();
        let stored = store.get_string("Actions", "NamingPatterns", "");
        assert!(stored.starts_with("{\"Patterns\""));

        let types = TypeRegistry::with_engine_types();
        let mut expected = RuleSet::baseline(&types);
        expected.sort_by_specialization(&types);
        assert_eq!(*engine.rules(), expected);
    }

    #[test]
    fn reload_is_stable_once_seeded() {
        let (store, engine) = setup();
        let stored = store.get_string("Actions", "NamingPatterns", "");
        assert_eq!(engine.reload(), RuleSource::Stored);
        assert_eq!(store.get_string("Actions", "NamingPatterns", ""), stored);
    }

    #[test]
    fn store_edit_triggers_reload() {
        let (store, engine) = setup();
        let before = engine.generation();
        store
            .set_string(
                "Actions",
                "NamingPatterns",
                r#"{"Patterns":[{"Class":"Material","Prefix":"Mat_","Suffix":"","Properties":[]}]}"#,
            )
            .unwrap();
        assert!(engine.generation() > before);
        let asset = Asset::new("/Game/Mats/Wood", TypeRef::new("/Script/Engine.Material"));
        assert_eq!(engine.suggest_name(&asset).as_deref(), Some("Mat_Wood"));
    }

    #[test]
    fn clearing_the_store_restores_baseline() {
        let (store, engine) = setup();
        store.set_string("Actions", "NamingPatterns", "").unwrap();
        assert!(!store.get_string("Actions", "NamingPatterns", "").is_empty());
        let asset = Asset::new("/Game/Mats/Wood", TypeRef::new("/Script/Engine.Material"));
        assert_eq!(engine.suggest_name(&asset).as_deref(), Some("M_Wood"));
    }

    #[test]
    fn replace_rules_sorts_and_persists() {
        let (store, engine) = setup();
        engine
            .replace_rules(RuleSet::new(vec![
                NamingRule::new(TypeRef::new("/Script/Engine.Blueprint"), "BP_"),
                NamingRule::new(TypeRef::new("/Script/Engine.AnimBlueprint"), "ABP_"),
            ]))
            .unwrap();
        let prefixes: Vec<String> = engine.rules().iter().map(|r| r.prefix.clone()).collect();
        assert_eq!(prefixes, vec!["ABP_", "BP_"]);
        assert!(
            store
                .get_string("Actions", "NamingPatterns", "")
                .contains("ABP_")
        );
    }

    #[test]
    fn suggest_name_is_none_for_compliant_assets() {
        let (_store, engine) = setup();
        let ok = Asset::new("/Game/BP/BPFL_Tools", TypeRef::new("/Script/Engine.Blueprint"))
            .with_property("BlueprintType", PropertyValue::Byte(5));
        assert_eq!(engine.suggest_name(&ok), None);
    }

    #[test]
    fn dropping_engine_unsubscribes() {
        let store = Arc::new(MemoryConfigStore::new());
        let engine = NamingRuleEngine::new(
            store.clone(),
            Arc::new(TypeRegistry::with_engine_types()),
            &RulesConfig::default(),
            ActivityLog::disabled(),
        );
        drop(engine);
        // No live observer left to re-seed the baseline.
        store.set_string("Actions", "NamingPatterns", "").unwrap();
        assert_eq!(store.get_string("Actions", "NamingPatterns", "x"), "");
    }
}
