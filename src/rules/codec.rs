//! Text encoding of a [`RuleSet`].
//!
//! Wire form (JSON):
//!
//! ```json
//! {"Patterns": [
//!   {"Class": "/Script/Engine.Blueprint", "Prefix": "BPFL_", "Suffix": "",
//!    "Properties": [{"Property": "BlueprintType", "Type": 1, "Value": "5"}]}
//! ]}
//! ```
//!
//! `Type` is the property kind: 0 string, 1 byte, 2 int32, 3 float. An empty
//! rule set encodes to the empty string, which the engine reads as "not
//! configured".
//!
//! Decoding is lenient. Entries are read one by one from a loose JSON value so
//! that a single bad entry only drops that entry:
//! - an unresolvable `Class` drops the rule;
//! - a `Type` outside 0-3 drops the rule;
//! - a predicate with an empty `Property` is dropped, the rule kept. An empty
//!   `Value` is kept: it is what an absent string property reads as.
//!
//! A bare top-level array of entries is accepted as well.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::assets::model::PropertyKind;
use crate::assets::types::TypeSystem;
use crate::core::errors::Result;
use crate::rules::naming::{NamingRule, PropertyPredicate, RuleSet};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireDocument<'a> {
    patterns: Vec<WireRule<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireRule<'a> {
    class: &'a str,
    prefix: &'a str,
    suffix: &'a str,
    properties: Vec<WirePredicate<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WirePredicate<'a> {
    property: &'a str,
    #[serde(rename = "Type")]
    kind: u8,
    value: &'a str,
}

/// Serialize rules in order; `""` for an empty set.
pub fn encode(rules: &RuleSet) -> Result<String> {
    if rules.is_empty() {
        return Ok(String::new());
    }
    let document = WireDocument {
        patterns: rules
            .iter()
            .map(|rule| WireRule {
                class: rule.target.as_str(),
                prefix: &rule.prefix,
                suffix: &rule.suffix,
                properties: rule
                    .predicates
                    .iter()
                    .map(|p| WirePredicate {
                        property: &p.property,
                        kind: p.kind.code(),
                        value: &p.value,
                    })
                    .collect(),
            })
            .collect(),
    };
    Ok(serde_json::to_string(&document)?)
}

/// Why an entry was left out of the decoded rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The text is not a JSON rule document at all.
    Malformed(String),
    /// The entry is not an object.
    NotAnObject,
    UnknownClass(String),
    InvalidPropertyKind(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(details) => write!(f, "malformed rule document: {details}"),
            Self::NotAnObject => f.write_str("rule entry is not an object"),
            Self::UnknownClass(class) => write!(f, "unknown class {class:?}"),
            Self::InvalidPropertyKind(kind) => write!(f, "invalid property type {kind}"),
        }
    }
}

/// An entry that was skipped during decode. `index` is `None` for
/// document-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRule {
    pub index: Option<usize>,
    pub reason: DropReason,
}

/// Decode outcome: the rules that survived and what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRules {
    pub rules: RuleSet,
    pub dropped: Vec<DroppedRule>,
}

/// Parse rule text. Never fails; problems are reported in `dropped`.
#[must_use]
pub fn decode(text: &str, types: &dyn TypeSystem) -> DecodedRules {
    let mut decoded = DecodedRules::default();
    if text.trim().is_empty() {
        return decoded;
    }

    let document: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            decoded.dropped.push(DroppedRule {
                index: None,
                reason: DropReason::Malformed(err.to_string()),
            });
            return decoded;
        }
    };

    let entries = match &document {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("Patterns") {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => return decoded,
            Some(_) => {
                decoded.dropped.push(DroppedRule {
                    index: None,
                    reason: DropReason::Malformed("\"Patterns\" is not an array".to_string()),
                });
                return decoded;
            }
        },
        _ => {
            decoded.dropped.push(DroppedRule {
                index: None,
                reason: DropReason::Malformed("expected an object or array".to_string()),
            });
            return decoded;
        }
    };

    for (index, entry) in entries.iter().enumerate() {
        match decode_rule(entry, types) {
            Ok(rule) => decoded.rules.push(rule),
            Err(reason) => decoded.dropped.push(DroppedRule {
                index: Some(index),
                reason,
            }),
        }
    }
    decoded
}

fn decode_rule(entry: &Value, types: &dyn TypeSystem) -> std::result::Result<NamingRule, DropReason> {
    let Value::Object(fields) = entry else {
        return Err(DropReason::NotAnObject);
    };

    let class = text_field(fields.get("Class"));
    let Some(target) = types.resolve_type(&class) else {
        return Err(DropReason::UnknownClass(class));
    };

    let mut rule = NamingRule::new(target, text_field(fields.get("Prefix")))
        .with_suffix(text_field(fields.get("Suffix")));

    if let Some(Value::Array(properties)) = fields.get("Properties") {
        for property in properties {
            let Value::Object(p) = property else {
                continue;
            };
            let kind_value = p.get("Type").cloned().unwrap_or(Value::Null);
            let kind = kind_value
                .as_i64()
                .and_then(PropertyKind::from_code)
                .ok_or_else(|| DropReason::InvalidPropertyKind(kind_value.to_string()))?;
            let name = text_field(p.get("Property"));
            let value = text_field(p.get("Value"));
            if name.is_empty() {
                continue;
            }
            rule = rule.with_predicate(PropertyPredicate::new(name, kind, value));
        }
    }
    Ok(rule)
}

/// String content of a field; numbers and booleans are taken in text form.
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::types::{TypeRef, TypeRegistry};

    fn ty(name: &str) -> TypeRef {
        TypeRef::new(name)
    }

    fn sample() -> RuleSet {
        RuleSet::new(vec![
            NamingRule::new(ty("/Script/Engine.Blueprint"), "BPFL_").with_predicate(
                PropertyPredicate::new("BlueprintType", PropertyKind::Byte, "5"),
            ),
            NamingRule::new(ty("/Script/Engine.Blueprint"), "BP_"),
            NamingRule::new(ty("/Script/Engine.Material"), "M_").with_suffix("_Base"),
        ])
    }

    #[test]
    fn empty_rule_set_encodes_to_empty_string() {
        assert_eq!(encode(&RuleSet::default()).unwrap(), "");
        let types = TypeRegistry::with_engine_types();
        assert_eq!(decode("", &types), DecodedRules::default());
        assert_eq!(decode("   \n", &types), DecodedRules::default());
    }

    #[test]
    fn encode_uses_pattern_document_and_keeps_empty_predicate_lists() {
        let text = encode(&sample()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let patterns = value["Patterns"].as_array().unwrap();
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns[0]["Class"], "/Script/Engine.Blueprint");
        assert_eq!(patterns[0]["Properties"][0]["Type"], 1);
        assert_eq!(patterns[0]["Properties"][0]["Value"], "5");
        assert_eq!(patterns[1]["Properties"], Value::Array(Vec::new()));
        assert_eq!(patterns[2]["Suffix"], "_Base");
    }

    #[test]
    fn decode_inverts_encode() {
        let types = TypeRegistry::with_engine_types();
        let rules = sample();
        let decoded = decode(&encode(&rules).unwrap(), &types);
        assert!(decoded.dropped.is_empty());
        assert_eq!(decoded.rules, rules);
    }

    #[test]
    fn unknown_class_drops_only_that_rule() {
        let types = TypeRegistry::with_engine_types();
        let text = r#"{"Patterns":[
            {"Class":"/Script/Nope.Missing","Prefix":"X_","Suffix":"","Properties":[]},
            {"Class":"StaticMesh","Prefix":"SM_","Suffix":"","Properties":[]}
        ]}"#;
        let decoded = decode(text, &types);
        assert_eq!(decoded.rules.len(), 1);
        assert_eq!(decoded.rules.rules()[0].target, ty("/Script/Engine.StaticMesh"));
        assert_eq!(
            decoded.dropped,
            vec![DroppedRule {
                index: Some(0),
                reason: DropReason::UnknownClass("/Script/Nope.Missing".to_string()),
            }]
        );
    }

    #[test]
    fn invalid_property_kind_drops_rule() {
        let types = TypeRegistry::with_engine_types();
        let text = r#"[{"Class":"Blueprint","Prefix":"BPX_",
            "Properties":[{"Property":"BlueprintType","Type":7,"Value":"1"}]}]"#;
        let decoded = decode(text, &types);
        assert!(decoded.rules.is_empty());
        assert!(matches!(
            decoded.dropped[0].reason,
            DropReason::InvalidPropertyKind(_)
        ));
    }

    #[test]
    fn empty_property_name_drops_the_predicate_only() {
        let types = TypeRegistry::with_engine_types();
        let text = r#"{"Patterns":[{"Class":"Blueprint","Prefix":"BP_","Suffix":"",
            "Properties":[
                {"Property":"","Type":1,"Value":"5"},
                {"Property":"BlueprintType","Type":1,"Value":3}
            ]}]}"#;
        let decoded = decode(text, &types);
        assert!(decoded.dropped.is_empty());
        let rule = &decoded.rules.rules()[0];
        assert_eq!(
            rule.predicates,
            vec![PropertyPredicate::new("BlueprintType", PropertyKind::Byte, "3")]
        );
    }

    #[test]
    fn empty_expected_value_survives_round_trip() {
        let types = TypeRegistry::with_engine_types();
        let rules = RuleSet::new(vec![
            NamingRule::new(ty("/Script/Engine.Blueprint"), "BPX_").with_predicate(
                PropertyPredicate::new("Category", PropertyKind::String, ""),
            ),
        ]);
        let text = encode(&rules).unwrap();
        assert!(text.contains(r#""Value":"""#));
        let decoded = decode(&text, &types);
        assert!(decoded.dropped.is_empty());
        assert_eq!(decoded.rules, rules);
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let types = TypeRegistry::with_engine_types();
        let decoded = decode(r#"{"Patterns":[{"Class":"Font"}]}"#, &types);
        let rule = &decoded.rules.rules()[0];
        assert_eq!(rule.prefix, "");
        assert_eq!(rule.suffix, "");
        assert!(rule.predicates.is_empty());
    }

    #[test]
    fn malformed_document_yields_empty_rules_and_a_report() {
        let types = TypeRegistry::with_engine_types();
        for text in ["{not json", "42", r#"{"Patterns": 3}"#] {
            let decoded = decode(text, &types);
            assert!(decoded.rules.is_empty(), "{text}");
            assert_eq!(decoded.dropped.len(), 1, "{text}");
            assert_eq!(decoded.dropped[0].index, None);
        }
        let decoded = decode(r#"{"Patterns":[1, {"Class":"Font","Prefix":"Font_"}]}"#, &types);
        assert_eq!(decoded.rules.len(), 1);
        assert_eq!(decoded.dropped[0].reason, DropReason::NotAnObject);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const CLASSES: &[&str] = &[
            "/Script/Engine.Blueprint",
            "/Script/Engine.Material",
            "/Script/Engine.Texture",
            "/Script/Engine.AnimMontage",
        ];

        fn arb_predicate() -> impl Strategy<Value = PropertyPredicate> {
            ("[A-Za-z]{1,10}", 0i64..4, "[A-Za-z0-9.]{0,6}").prop_map(|(name, code, value)| {
                let kind = PropertyKind::from_code(code).unwrap_or(PropertyKind::String);
                PropertyPredicate::new(name, kind, value)
            })
        }

        fn arb_rule() -> impl Strategy<Value = NamingRule> {
            (
                0..CLASSES.len(),
                "[A-Za-z_]{0,5}",
                "[A-Za-z_]{0,5}",
                prop::collection::vec(arb_predicate(), 0..3),
            )
                .prop_map(|(class, prefix, suffix, predicates)| {
                    let mut rule =
                        NamingRule::new(TypeRef::new(CLASSES[class]), prefix).with_suffix(suffix);
                    rule.predicates = predicates;
                    rule
                })
        }

        proptest! {
            #[test]
            fn round_trip_preserves_rules_and_order(
                rules in prop::collection::vec(arb_rule(), 1..8),
            ) {
                let types = TypeRegistry::with_engine_types();
                let rules = RuleSet::new(rules);
                let decoded = decode(&encode(&rules).unwrap(), &types);
                prop_assert!(decoded.dropped.is_empty());
                prop_assert_eq!(decoded.rules, rules);
            }
        }
    }
}
