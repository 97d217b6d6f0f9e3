use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Rollout weights are expressed in thousandths of a percent.
pub const ROLLOUT_WEIGHT_SCALE: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ClauseOperator {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "matches")]
    Matches,
    // Any operator this service does not evaluate never matches
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub attribute: String,
    pub op: ClauseOperator,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub negate: bool,
    // Compiled on first use; lives as long as the snapshot holding the clause
    #[serde(skip)]
    patterns: OnceLock<Vec<Regex>>,
}

impl Clause {
    /// The clause values compiled as regular expressions. Values that are not
    /// strings or not valid patterns are left out.
    pub fn patterns(&self) -> &[Regex] {
        self.patterns.get_or_init(|| {
            self.values
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|pattern| match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!("invalid regex in flag clause: {}", e);
                        None
                    }
                })
                .collect()
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeightedVariation {
    pub variation: usize,
    pub weight: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollout {
    pub variations: Vec<WeightedVariation>,
    pub bucket_by: Option<String>,
}

/// Either a fixed variation index or a weighted rollout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariationOrRollout {
    pub variation: Option<usize>,
    pub rollout: Option<Rollout>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Target {
    #[serde(default)]
    pub values: Vec<String>,
    pub variation: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlagRule {
    pub id: Option<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(flatten)]
    pub serve: VariationOrRollout,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Prerequisite {
    pub key: String,
    pub variation: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
    pub key: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub on: bool,
    #[serde(default)]
    pub salt: String,
    #[serde(default)]
    pub variations: Vec<Value>,
    pub off_variation: Option<usize>,
    #[serde(default)]
    pub fallthrough: VariationOrRollout,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub rules: Vec<FlagRule>,
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    #[serde(default)]
    pub deleted: bool,
}

/// Every flag known to the flag service at the time of the last fetch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlagSnapshot {
    #[serde(default)]
    pub flags: HashMap<String, FlagDefinition>,
}

impl FlagSnapshot {
    pub fn get(&self, key: &str) -> Option<&FlagDefinition> {
        self.flags.get(key).filter(|flag| !flag.deleted)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parses_flag_payload() {
        let payload = json!({
            "flags": {
                "image": {
                    "key": "image",
                    "version": 4,
                    "on": true,
                    "salt": "f00d",
                    "variations": ["control", "large"],
                    "offVariation": 0,
                    "fallthrough": {
                        "rollout": {
                            "variations": [
                                {"variation": 0, "weight": 50000},
                                {"variation": 1, "weight": 50000}
                            ]
                        }
                    },
                    "targets": [{"values": ["visitor-1"], "variation": 1}],
                    "rules": [{
                        "id": "rule-1",
                        "clauses": [{"attribute": "key", "op": "startsWith", "values": ["qa-"]}],
                        "variation": 1
                    }],
                    "clientSide": true
                },
                "old": {"key": "old", "deleted": true}
            },
            "segments": {}
        });

        let snapshot: FlagSnapshot = serde_json::from_value(payload).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get("old").is_none());

        let flag = snapshot.get("image").unwrap();
        assert!(flag.on);
        assert_eq!(flag.off_variation, Some(0));
        assert_eq!(flag.fallthrough.rollout.as_ref().unwrap().variations.len(), 2);
        assert_eq!(flag.rules[0].serve.variation, Some(1));
        assert_eq!(flag.rules[0].clauses[0].op, ClauseOperator::StartsWith);
        assert!(!flag.rules[0].clauses[0].negate);
    }

    #[test]
    fn test_unknown_operator_is_tolerated() {
        let clause: Clause = serde_json::from_value(json!({
            "attribute": "key",
            "op": "semVerEqual",
            "values": ["1.0.0"]
        }))
        .unwrap();
        assert_eq!(clause.op, ClauseOperator::Unsupported);
    }

    #[test]
    fn test_clause_patterns_compile_once() {
        let clause: Clause = serde_json::from_value(json!({
            "attribute": "key", "op": "matches", "values": ["^qa-", "([", 42]
        }))
        .unwrap();

        let first = clause.patterns();
        assert_eq!(first.len(), 1);
        assert!(first[0].is_match("qa-visitor"));
        assert!(std::ptr::eq(first, clause.patterns()));
    }
}
