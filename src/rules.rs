//! The editable list of find/replace rules for manual mode.
//!
//! Display order is kept exactly as the user built it, but it carries no
//! meaning for the service: [`RuleSet::to_mapping`] collapses the list into a
//! `from → to` map where a later rule with the same trimmed `from` overwrites
//! an earlier one.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One `(from, to)` pair. An empty `to` means "replace with blank".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub from: String,
    pub to: String,
}

impl ReplacementRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Parse a `FROM=TO` argument. `TO` may be empty; `FROM` may not.
    pub fn parse(arg: &str) -> Option<Self> {
        let (from, to) = arg.split_once('=')?;
        if from.trim().is_empty() {
            return None;
        }
        Some(Self::new(from, to))
    }
}

/// Which half of a rule [`RuleSet::update`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleField {
    From,
    To,
}

/// Ordered rule list. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRules")]
pub struct RuleSet {
    rules: Vec<ReplacementRule>,
}

/// Serialized shape of [`RuleSet`]; restored through [`RuleSet::from_rules`].
#[derive(Deserialize)]
struct StoredRules {
    rules: Vec<ReplacementRule>,
}

impl From<StoredRules> for RuleSet {
    fn from(stored: StoredRules) -> Self {
        Self::from_rules(stored.rules)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: vec![ReplacementRule::default()],
        }
    }
}

impl RuleSet {
    /// Build a set from existing rules; an empty input yields one blank row.
    pub fn from_rules(rules: Vec<ReplacementRule>) -> Self {
        if rules.is_empty() {
            Self::default()
        } else {
            Self { rules }
        }
    }

    /// Load a JSON object of `{"from": "to"}` pairs, keeping the file's order.
    pub fn from_json_file(path: &Path) -> Result<Self, WorkflowError> {
        let text = std::fs::read_to_string(path).map_err(|e| WorkflowError::InvalidRulesFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text)
            .map_err(|e| WorkflowError::InvalidRulesFile {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let mut rules = Vec::with_capacity(map.len());
        for (from, to) in map {
            let to = match to {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Null => String::new(),
                other => {
                    return Err(WorkflowError::InvalidRulesFile {
                        path: path.to_path_buf(),
                        detail: format!("value for '{from}' must be a string, got {other}"),
                    })
                }
            };
            rules.push(ReplacementRule::new(from, to));
        }
        Ok(Self::from_rules(rules))
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a blank rule.
    pub fn add(&mut self) {
        self.rules.push(ReplacementRule::default());
    }

    /// Overwrite one field of the rule at `index`.
    pub fn update(
        &mut self,
        index: usize,
        field: RuleField,
        value: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let len = self.rules.len();
        let rule = self
            .rules
            .get_mut(index)
            .ok_or(WorkflowError::RuleIndexOutOfRange { index, len })?;
        match field {
            RuleField::From => rule.from = value.into(),
            RuleField::To => rule.to = value.into(),
        }
        Ok(())
    }

    /// Remove the rule at `index`. No-op when it is the last remaining rule
    /// or the index does not exist.
    pub fn remove(&mut self, index: usize) {
        if self.rules.len() > 1 && index < self.rules.len() {
            self.rules.remove(index);
        }
    }

    /// Every rule must name a non-blank token to replace.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        match self.rules.iter().position(|r| r.from.trim().is_empty()) {
            Some(index) => Err(WorkflowError::MissingReplacementTarget { index }),
            None => Ok(()),
        }
    }

    /// Trimmed `from → to` map as submitted to the service.
    pub fn to_mapping(&self) -> BTreeMap<String, String> {
        let mut mapping = BTreeMap::new();
        for rule in &self.rules {
            let from = rule.from.trim();
            if !from.is_empty() {
                mapping.insert(from.to_string(), rule.to.trim().to_string());
            }
        }
        mapping
    }
}
