use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::flags::flag_definitions::{
    Clause, ClauseOperator, FlagDefinition, FlagSnapshot, VariationOrRollout, ROLLOUT_WEIGHT_SCALE,
};
use crate::flags::EvaluationContext;

const LONG_SCALE: u64 = 0xfffffffffffffff;

// Prerequisite chains longer than this are treated as unsatisfied
const MAX_PREREQUISITE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationReason {
    Off,
    PrerequisiteFailed,
    TargetMatch,
    RuleMatch(usize),
    Fallthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagMatch {
    /// Index into the flag's variations; `None` means the caller default applies.
    pub variation_index: Option<usize>,
    pub value: Option<Value>,
    pub reason: EvaluationReason,
}

/// Evaluates flags from a snapshot for a single context.
#[derive(Debug)]
pub struct FlagMatcher<'a> {
    snapshot: &'a FlagSnapshot,
    context: &'a EvaluationContext,
}

impl<'a> FlagMatcher<'a> {
    pub fn new(snapshot: &'a FlagSnapshot, context: &'a EvaluationContext) -> Self {
        FlagMatcher { snapshot, context }
    }

    /// Returns `None` when the flag is unknown or the context cannot be
    /// evaluated; both mean the caller default is served.
    pub fn get_match(&self, flag_key: &str) -> Option<FlagMatch> {
        let context_key = self.context.key.as_deref()?;
        let flag = self.snapshot.get(flag_key)?;
        Some(self.evaluate(flag, context_key, 0))
    }

    fn evaluate(&self, flag: &FlagDefinition, context_key: &str, depth: usize) -> FlagMatch {
        if !flag.on {
            return self.variation_match(flag, flag.off_variation, EvaluationReason::Off);
        }

        if !self.prerequisites_met(flag, context_key, depth) {
            return self.variation_match(
                flag,
                flag.off_variation,
                EvaluationReason::PrerequisiteFailed,
            );
        }

        for target in &flag.targets {
            if target.values.iter().any(|value| value == context_key) {
                return self.variation_match(
                    flag,
                    Some(target.variation),
                    EvaluationReason::TargetMatch,
                );
            }
        }

        for (index, rule) in flag.rules.iter().enumerate() {
            if rule.clauses.iter().all(|clause| self.clause_matches(clause)) {
                let variation = self.variation_for(flag, &rule.serve, context_key);
                return self.variation_match(flag, variation, EvaluationReason::RuleMatch(index));
            }
        }

        let variation = self.variation_for(flag, &flag.fallthrough, context_key);
        self.variation_match(flag, variation, EvaluationReason::Fallthrough)
    }

    fn prerequisites_met(&self, flag: &FlagDefinition, context_key: &str, depth: usize) -> bool {
        if flag.prerequisites.is_empty() {
            return true;
        }
        if depth >= MAX_PREREQUISITE_DEPTH {
            tracing::warn!(flag = %flag.key, "prerequisite chain too deep");
            return false;
        }

        flag.prerequisites.iter().all(|prerequisite| {
            match self.snapshot.get(&prerequisite.key) {
                Some(parent) if parent.on => {
                    let parent_match = self.evaluate(parent, context_key, depth + 1);
                    parent_match.reason != EvaluationReason::PrerequisiteFailed
                        && parent_match.variation_index == Some(prerequisite.variation)
                }
                _ => false,
            }
        })
    }

    fn clause_matches(&self, clause: &Clause) -> bool {
        let matched = match self.context.attribute(&clause.attribute) {
            Some(actual) if clause.op == ClauseOperator::Matches => {
                clause.patterns().iter().any(|re| re.is_match(actual))
            }
            Some(actual) => clause
                .values
                .iter()
                .filter_map(Value::as_str)
                .any(|expected| operator_matches(clause.op, actual, expected)),
            None => false,
        };
        matched != clause.negate
    }

    fn variation_for(
        &self,
        flag: &FlagDefinition,
        serve: &VariationOrRollout,
        context_key: &str,
    ) -> Option<usize> {
        if let Some(variation) = serve.variation {
            return Some(variation);
        }

        let rollout = serve.rollout.as_ref()?;
        let bucket_value = match rollout.bucket_by.as_deref() {
            None => context_key,
            Some(attribute) => self.context.attribute(attribute)?,
        };
        let bucket = get_hash(&flag.key, &flag.salt, bucket_value);

        let mut total = 0.0;
        for weighted in &rollout.variations {
            total += f64::from(weighted.weight) / ROLLOUT_WEIGHT_SCALE;
            if bucket < total {
                return Some(weighted.variation);
            }
        }
        // Weights that don't add up to the full scale leave the top of the
        // range on the last variation.
        rollout.variations.last().map(|weighted| weighted.variation)
    }

    fn variation_match(
        &self,
        flag: &FlagDefinition,
        variation_index: Option<usize>,
        reason: EvaluationReason,
    ) -> FlagMatch {
        let value = variation_index.and_then(|index| flag.variations.get(index).cloned());
        if variation_index.is_some() && value.is_none() {
            tracing::warn!(
                flag = %flag.key,
                variation = ?variation_index,
                "flag references a variation that does not exist"
            );
            return FlagMatch {
                variation_index: None,
                value: None,
                reason,
            };
        }
        FlagMatch {
            variation_index,
            value,
            reason,
        }
    }
}

fn operator_matches(op: ClauseOperator, actual: &str, expected: &str) -> bool {
    match op {
        ClauseOperator::In => actual == expected,
        ClauseOperator::StartsWith => actual.starts_with(expected),
        ClauseOperator::EndsWith => actual.ends_with(expected),
        ClauseOperator::Contains => actual.contains(expected),
        // Patterns are matched through the clause's compiled cache
        ClauseOperator::Matches | ClauseOperator::Unsupported => false,
    }
}

/// Maps a flag key, salt and identifier to a float in [0, 1).
/// The same inputs always produce the same value, and values are uniformly
/// distributed, so `get_hash(..) < 0.2` selects 20% of identifiers.
pub fn get_hash(flag_key: &str, salt: &str, identifier: &str) -> f64 {
    let hash_key = format!("{}.{}.{}", flag_key, salt, identifier);
    let digest = Sha1::digest(hash_key.as_bytes());
    // The first 8 bytes shifted right by 4 bits are the first 15 hex digits
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let hash_val = u64::from_be_bytes(head) >> 4;
    hash_val as f64 / LONG_SCALE as f64
}
