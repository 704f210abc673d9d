//! Tier configuration types
//!
//! Tiers are loaded once at startup (from `RELAY_TIERS` or the built-in
//! defaults) and never reordered afterwards.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default budget for each built-in tier
pub const DEFAULT_TIER_BUDGET: Duration = Duration::from_millis(7000);

/// Opaque identifier of a backend model on the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A group of candidate models raced together under one budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub name: String,
    pub budget: Duration,
    pub models: Vec<ModelId>,
}

impl Tier {
    pub fn new<I, M>(name: impl Into<String>, budget: Duration, models: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModelId>,
    {
        Self {
            name: name.into(),
            budget,
            models: models.into_iter().map(Into::into).collect(),
        }
    }
}

/// Errors raised while loading or validating tier configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierConfigError {
    #[error("at least one tier must be configured")]
    NoTiers,

    #[error("tier '{0}' has no models")]
    EmptyTier(String),

    #[error("tier '{0}' must have a budget greater than zero")]
    ZeroBudget(String),

    #[error("model '{model}' appears more than once in tier '{tier}'")]
    DuplicateModel { tier: String, model: String },

    #[error("tier name '{0}' is used more than once")]
    DuplicateTier(String),

    #[error("invalid tier JSON: {0}")]
    Parse(String),
}

/// Wire shape of one tier inside `RELAY_TIERS`
#[derive(Debug, Deserialize)]
struct TierEntry {
    name: String,
    budget_ms: u64,
    models: Vec<String>,
}

/// Validated, ordered list of tiers (fast first)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSet {
    tiers: Vec<Tier>,
}

impl TierSet {
    /// Validate and wrap an ordered list of tiers
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierConfigError> {
        if tiers.is_empty() {
            return Err(TierConfigError::NoTiers);
        }

        let mut names = HashSet::new();
        for tier in &tiers {
            if !names.insert(tier.name.as_str()) {
                return Err(TierConfigError::DuplicateTier(tier.name.clone()));
            }
            if tier.models.is_empty() {
                return Err(TierConfigError::EmptyTier(tier.name.clone()));
            }
            if tier.budget.is_zero() {
                return Err(TierConfigError::ZeroBudget(tier.name.clone()));
            }

            let mut seen = HashSet::new();
            for model in &tier.models {
                if !seen.insert(model) {
                    return Err(TierConfigError::DuplicateModel {
                        tier: tier.name.clone(),
                        model: model.to_string(),
                    });
                }
            }
        }

        Ok(Self { tiers })
    }

    /// Parse the `RELAY_TIERS` JSON format
    ///
    /// ```json
    /// [{"name": "fast", "budget_ms": 7000, "models": ["a", "b"]}]
    /// ```
    pub fn from_json(raw: &str) -> Result<Self, TierConfigError> {
        let entries: Vec<TierEntry> =
            serde_json::from_str(raw).map_err(|e| TierConfigError::Parse(e.to_string()))?;

        let tiers = entries
            .into_iter()
            .map(|entry| {
                Tier::new(
                    entry.name,
                    Duration::from_millis(entry.budget_ms),
                    entry.models,
                )
            })
            .collect();

        Self::new(tiers)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Total number of candidate models across every tier
    pub fn model_count(&self) -> usize {
        self.tiers.iter().map(|t| t.models.len()).sum()
    }
}

impl Default for TierSet {
    /// Free gateway models in fast, balanced and heavy tiers
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier::new(
                    "fast",
                    DEFAULT_TIER_BUDGET,
                    [
                        "stepfun/step-3.5-flash:free",
                        "nvidia/nemotron-nano-9b-v2:free",
                        "google/gemma-3-4b-it:free",
                    ],
                ),
                Tier::new(
                    "balanced",
                    DEFAULT_TIER_BUDGET,
                    [
                        "google/gemma-3-12b-it:free",
                        "mistralai/mistral-small-3.1-24b-instruct:free",
                        "z-ai/glm-4.5-air:free",
                    ],
                ),
                Tier::new(
                    "heavy",
                    DEFAULT_TIER_BUDGET,
                    [
                        "deepseek/deepseek-r1-0528:free",
                        "meta-llama/llama-3.3-70b-instruct:free",
                    ],
                ),
            ],
        }
    }
}

impl<'a> IntoIterator for &'a TierSet {
    type Item = &'a Tier;
    type IntoIter = std::slice::Iter<'a, Tier>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiers.iter()
    }
}
