//! Tier configuration module
//!
//! Ordered groups of interchangeable models and the budget each group gets.

pub mod config;

pub use config::{ModelId, Tier, TierConfigError, TierSet};
