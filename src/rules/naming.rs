//! Naming rules: type + property predicates → required prefix/suffix.
//!
//! Rules are evaluated in order and the first one whose target type is the
//! asset's type or one of its ancestors, and whose predicates all match,
//! decides the expected name. More specific rules therefore have to come
//! first; [`RuleSet::sort_by_specialization`] reorders so that a rule for a
//! derived type always precedes rules for its ancestors. Rules for the same
//! type keep their relative order, so predicate-bearing overrides must be
//! listed before the unconditional rule for that type.

#![allow(missing_docs)]

use crate::assets::model::{PropertyKind, PropertySource};
use crate::assets::types::{TypeRef, TypeSystem};

/// A `property == value` test evaluated against the asset instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPredicate {
    pub property: String,
    pub kind: PropertyKind,
    /// Expected value in normalized string form.
    pub value: String,
}

impl PropertyPredicate {
    #[must_use]
    pub fn new(property: impl Into<String>, kind: PropertyKind, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            kind,
            value: value.into(),
        }
    }

    /// Literal comparison against the normalized property value.
    #[must_use]
    pub fn matches(&self, source: &dyn PropertySource) -> bool {
        source.read_property(&self.property, self.kind) == self.value
    }
}

/// One naming convention entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRule {
    pub target: TypeRef,
    pub predicates: Vec<PropertyPredicate>,
    pub prefix: String,
    pub suffix: String,
}

impl NamingRule {
    #[must_use]
    pub fn new(target: TypeRef, prefix: impl Into<String>) -> Self {
        Self {
            target,
            predicates: Vec::new(),
            prefix: prefix.into(),
            suffix: String::new(),
        }
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: PropertyPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Type is the target or derives from it, and every predicate holds.
    #[must_use]
    pub fn applies_to(
        &self,
        asset_type: &TypeRef,
        source: &dyn PropertySource,
        types: &dyn TypeSystem,
    ) -> bool {
        types.is_subtype_of(asset_type, &self.target)
            && self.predicates.iter().all(|p| p.matches(source))
    }

    /// Add the prefix and suffix unless already literally present.
    ///
    /// A different, wrong prefix is left in place and the right one is
    /// prepended in front of it.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + name.len() + self.suffix.len());
        if !self.prefix.is_empty() && !name.starts_with(&self.prefix) {
            out.push_str(&self.prefix);
        }
        out.push_str(name);
        if !self.suffix.is_empty() && !name.ends_with(&self.suffix) {
            out.push_str(&self.suffix);
        }
        out
    }
}

/// Ordered sequence of naming rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<NamingRule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<NamingRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[NamingRule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamingRule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn push(&mut self, rule: NamingRule) {
        self.rules.push(rule);
    }

    /// First rule that applies, in list order.
    #[must_use]
    pub fn match_rule(
        &self,
        asset_type: &TypeRef,
        source: &dyn PropertySource,
        types: &dyn TypeSystem,
    ) -> Option<&NamingRule> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(asset_type, source, types))
    }

    /// Expected name for `name`; unchanged when no rule applies.
    #[must_use]
    pub fn match_name(
        &self,
        name: &str,
        asset_type: &TypeRef,
        source: &dyn PropertySource,
        types: &dyn TypeSystem,
    ) -> String {
        self.match_rule(asset_type, source, types)
            .map_or_else(|| name.to_string(), |rule| rule.apply(name))
    }

    /// Reorder so a rule precedes every rule whose target is a strict
    /// ancestor of its own target.
    ///
    /// Each rule is inserted right before the first already placed rule for
    /// one of its ancestors, or appended. Rules for the same type, and rules
    /// with no ancestry between them, keep their relative order.
    pub fn sort_by_specialization(&mut self, types: &dyn TypeSystem) {
        let mut sorted: Vec<NamingRule> = Vec::with_capacity(self.rules.len());
        for rule in std::mem::take(&mut self.rules) {
            let slot = sorted
                .iter()
                .position(|placed| types.is_strict_subtype_of(&rule.target, &placed.target));
            match slot {
                Some(idx) => sorted.insert(idx, rule),
                None => sorted.push(rule),
            }
        }
        self.rules = sorted;
    }

    /// Default conventions, restricted to the types `types` knows about.
    #[must_use]
    pub fn baseline(types: &dyn TypeSystem) -> Self {
        let rules = BASELINE
            .iter()
            .filter_map(|entry| {
                let target = types.resolve_type(entry.class)?;
                let mut rule = NamingRule::new(target, entry.prefix).with_suffix(entry.suffix);
                if let Some((property, kind, value)) = entry.predicate {
                    rule = rule.with_predicate(PropertyPredicate::new(property, kind, value));
                }
                Some(rule)
            })
            .collect();
        Self::new(rules)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a NamingRule;
    type IntoIter = std::slice::Iter<'a, NamingRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

// ──────────────────── baseline table ────────────────────

struct BaselineEntry {
    class: &'static str,
    prefix: &'static str,
    suffix: &'static str,
    predicate: Option<(&'static str, PropertyKind, &'static str)>,
}

const fn entry(class: &'static str, prefix: &'static str) -> BaselineEntry {
    BaselineEntry {
        class,
        prefix,
        suffix: "",
        predicate: None,
    }
}

const fn suffixed(class: &'static str, suffix: &'static str) -> BaselineEntry {
    BaselineEntry {
        class,
        prefix: "",
        suffix,
        predicate: None,
    }
}

const fn blueprint_kind(value: &'static str, prefix: &'static str) -> BaselineEntry {
    BaselineEntry {
        class: "/Script/Engine.Blueprint",
        prefix,
        suffix: "",
        predicate: Some(("BlueprintType", PropertyKind::Byte, value)),
    }
}

/// `BlueprintType` byte values: 2 macro library, 3 interface, 5 function library.
const BASELINE: &[BaselineEntry] = &[
    blueprint_kind("5", "BPFL_"),
    blueprint_kind("3", "BPI_"),
    blueprint_kind("2", "BPML_"),
    entry("/Script/Engine.Blueprint", "BP_"),
    suffixed("/Script/Engine.AnimBlueprint", "_AnimBP"),
    entry("/Script/UMGEditor.WidgetBlueprint", "WBP_"),
    entry("/Script/Engine.UserDefinedStruct", "F"),
    entry("/Script/Engine.UserDefinedEnum", "E"),
    entry("/Script/Engine.MaterialInstanceConstant", "MI_"),
    entry("/Script/Engine.Material", "M_"),
    entry("/Script/Engine.StaticMesh", "SM_"),
    entry("/Script/Engine.SkeletalMesh", "SK_"),
    entry("/Script/Engine.Texture", "T_"),
    entry("/Script/Engine.TextureRenderTarget2D", "RT_"),
    entry("/Script/Engine.TextureRenderTargetCube", "RTC_"),
    entry("/Script/MediaAssets.MediaTexture", "MT_"),
    entry("/Script/MediaAssets.MediaPlayer", "MP_"),
    entry("/Script/Engine.ParticleSystem", "PS_"),
    entry("/Script/Engine.AimOffsetBlendSpace", "AO_"),
    entry("/Script/Engine.AimOffsetBlendSpace1D", "AO_"),
    entry("/Script/Engine.AnimComposite", "AC_"),
    entry("/Script/Engine.AnimMontage", "AM_"),
    entry("/Script/Engine.AnimSequence", "A_"),
    entry("/Script/Engine.BlendSpace", "BS_"),
    entry("/Script/Engine.BlendSpace1D", "BS_"),
    entry("/Script/Engine.Rig", "Rig_"),
    entry("/Script/Engine.Skeleton", "Skel_"),
    entry("/Script/Engine.Font", "Font_"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::model::{Asset, PropertyValue};
    use crate::assets::types::TypeRegistry;

    fn ty(name: &str) -> TypeRef {
        TypeRef::new(name)
    }

    fn sorted_baseline(types: &TypeRegistry) -> RuleSet {
        let mut rules = RuleSet::baseline(types);
        rules.sort_by_specialization(types);
        rules
    }

    fn suggest(rules: &RuleSet, types: &TypeRegistry, asset: &Asset) -> String {
        rules.match_name(&asset.name, &asset.asset_type, asset, types)
    }

    #[test]
    fn apply_adds_prefix_and_suffix_once() {
        let rule = NamingRule::new(ty("/Script/Engine.Material"), "M_").with_suffix("_Inst");
        assert_eq!(rule.apply("Wood"), "M_Wood_Inst");
        assert_eq!(rule.apply("M_Wood_Inst"), "M_Wood_Inst");
    }

    #[test]
    fn wrong_prefix_is_not_stripped() {
        let rule = NamingRule::new(ty("/Script/Engine.Blueprint"), "BP_");
        assert_eq!(rule.apply("SM_Door"), "BP_SM_Door");
        // Prefix presence is case-sensitive.
        assert_eq!(rule.apply("bp_Door"), "BP_bp_Door");
    }

    #[test]
    fn no_matching_rule_returns_name_unchanged() {
        let types = TypeRegistry::with_engine_types();
        let rules = sorted_baseline(&types);
        let level = Asset::new("/Game/Levels/L1", ty("/Script/Engine.World"));
        assert_eq!(suggest(&rules, &types, &level), "L1");
    }

    #[test]
    fn function_library_override_wins_over_plain_blueprint() {
        let types = TypeRegistry::with_engine_types();
        let rules = RuleSet::new(vec![
            NamingRule::new(ty("/Script/Engine.Blueprint"), "BPFL_").with_predicate(
                PropertyPredicate::new("BlueprintType", PropertyKind::Byte, "5"),
            ),
            NamingRule::new(ty("/Script/Engine.Blueprint"), "BP_"),
        ]);
        let library = Asset::new("/Game/BP/Foo", ty("/Script/Engine.Blueprint"))
            .with_property("BlueprintType", PropertyValue::Byte(5));
        let plain = Asset::new("/Game/BP/Bar", ty("/Script/Engine.Blueprint"));

        assert_eq!(suggest(&rules, &types, &library), "BPFL_Foo");
        assert_eq!(suggest(&rules, &types, &plain), "BP_Bar");
    }

    #[test]
    fn derived_rule_applies_to_subtypes() {
        let types = TypeRegistry::with_engine_types();
        let rules = RuleSet::new(vec![NamingRule::new(ty("/Script/Engine.Texture"), "T_")]);
        let target = Asset::new(
            "/Game/Tex/Mirror",
            ty("/Script/Engine.TextureRenderTarget2D"),
        );
        assert_eq!(suggest(&rules, &types, &target), "T_Mirror");
    }

    #[test]
    fn sort_moves_descendants_ahead_of_ancestors() {
        let types = TypeRegistry::with_engine_types();
        let mut rules = RuleSet::new(vec![
            NamingRule::new(ty("/Script/Engine.Texture"), "T_"),
            NamingRule::new(ty("/Script/Engine.Material"), "M_"),
            NamingRule::new(ty("/Script/Engine.TextureRenderTarget"), "RTX_"),
            NamingRule::new(ty("/Script/Engine.TextureRenderTarget2D"), "RT_"),
        ]);
        rules.sort_by_specialization(&types);
        let prefixes: Vec<&str> = rules.iter().map(|r| r.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["RT_", "RTX_", "T_", "M_"]);
    }

    #[test]
    fn sort_keeps_same_type_rules_in_insertion_order() {
        let types = TypeRegistry::with_engine_types();
        let mut rules = RuleSet::baseline(&types);
        rules.sort_by_specialization(&types);
        let blueprint: Vec<&str> = rules
            .iter()
            .filter(|r| r.target.as_str() == "/Script/Engine.Blueprint")
            .map(|r| r.prefix.as_str())
            .collect();
        assert_eq!(blueprint, vec!["BPFL_", "BPI_", "BPML_", "BP_"]);
    }

    #[test]
    fn sorted_order_respects_ancestry_for_every_pair() {
        let types = TypeRegistry::with_engine_types();
        let rules = sorted_baseline(&types);
        for (i, earlier) in rules.iter().enumerate() {
            for later in rules.rules().iter().skip(i + 1) {
                assert!(
                    !types.is_strict_subtype_of(&later.target, &earlier.target),
                    "{} must precede {}",
                    later.target,
                    earlier.target
                );
            }
        }
    }

    #[test]
    fn baseline_covers_common_asset_kinds() {
        let types = TypeRegistry::with_engine_types();
        let rules = sorted_baseline(&types);
        let cases = [
            ("/Script/Engine.Material", "MyMat", "M_MyMat"),
            ("/Script/Engine.MaterialInstanceConstant", "Wood", "MI_Wood"),
            ("/Script/Engine.StaticMesh", "Door", "SM_Door"),
            ("/Script/Engine.AnimBlueprint", "Hero", "Hero_AnimBP"),
            ("/Script/Engine.AnimBlueprint", "Hero_AnimBP", "Hero_AnimBP"),
            ("/Script/UMGEditor.WidgetBlueprint", "Hud", "WBP_Hud"),
            ("/Script/Engine.AimOffsetBlendSpace1D", "Look", "AO_Look"),
            ("/Script/Engine.BlendSpace1D", "Walk", "BS_Walk"),
            ("/Script/Engine.AnimMontage", "Punch", "AM_Punch"),
            ("/Script/Engine.TextureRenderTargetCube", "Probe", "RTC_Probe"),
            ("/Script/Engine.Texture2D", "Grass", "T_Grass"),
            ("/Script/Engine.UserDefinedStruct", "Stats", "FStats"),
        ];
        for (class, name, expected) in cases {
            let asset = Asset::new(format!("/Game/X/{name}"), ty(class));
            assert_eq!(suggest(&rules, &types, &asset), expected, "{class}");
        }
    }

    #[test]
    fn baseline_blueprint_variants() {
        let types = TypeRegistry::with_engine_types();
        let rules = sorted_baseline(&types);
        let bp = |name: &str, kind: u8| {
            Asset::new(format!("/Game/BP/{name}"), ty("/Script/Engine.Blueprint"))
                .with_property("BlueprintType", PropertyValue::Byte(kind))
        };
        assert_eq!(suggest(&rules, &types, &bp("Tools", 5)), "BPFL_Tools");
        assert_eq!(suggest(&rules, &types, &bp("Usable", 3)), "BPI_Usable");
        assert_eq!(suggest(&rules, &types, &bp("Macros", 2)), "BPML_Macros");
        assert_eq!(suggest(&rules, &types, &bp("Door", 0)), "BP_Door");
    }

    #[test]
    fn baseline_skips_types_the_registry_does_not_know() {
        let types = TypeRegistry::new();
        assert!(RuleSet::baseline(&types).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn match_name_is_idempotent(
                name in "[A-Za-z0-9_]{0,16}",
                prefix in "[A-Z]{0,3}_?",
                suffix in "(_[A-Z]{1,3})?",
            ) {
                let types = TypeRegistry::with_engine_types();
                let rules = RuleSet::new(vec![
                    NamingRule::new(ty("/Script/Engine.Material"), prefix).with_suffix(suffix),
                ]);
                let asset = Asset::new("/Game/X/Any", ty("/Script/Engine.Material"));
                let once = rules.match_name(&name, &asset.asset_type, &asset, &types);
                let twice = rules.match_name(&once, &asset.asset_type, &asset, &types);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
