//! Engine configuration
//!
//! Every threshold the engine uses lives here so it can be tuned from a TOML
//! file without touching the decision logic.

use crate::error::{NegotiationError, Result};
use crate::types::{Approach, Timeline};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub anchor: AnchorConfig,
    pub concession: ConcessionConfig,
    pub deadlines: DeadlineConfig,
    pub evaluator: EvaluatorConfig,
    pub tactics: TacticConfig,
}

/// How far below the target each approach opens
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub assertive: f64,
    pub diplomatic: f64,
    pub considerate: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            assertive: 0.15,
            diplomatic: 0.10,
            considerate: 0.05,
        }
    }
}

impl AnchorConfig {
    pub fn factor(&self, approach: Approach) -> f64 {
        match approach {
            Approach::Assertive => self.assertive,
            Approach::Diplomatic => self.diplomatic,
            Approach::Considerate => self.considerate,
        }
    }
}

/// Concession schedule: base rate growing per turn, scaled by timeline and approach
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcessionConfig {
    pub base_rate: f64,
    pub per_turn_increment: f64,
    pub max_rate: f64,
    pub assertive_multiplier: f64,
    pub diplomatic_multiplier: f64,
    pub considerate_multiplier: f64,
    pub urgent_factor: f64,
    pub week_factor: f64,
    pub flexible_factor: f64,
}

impl Default for ConcessionConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.25,
            per_turn_increment: 0.05,
            max_rate: 0.9,
            assertive_multiplier: 0.5,
            diplomatic_multiplier: 1.0,
            considerate_multiplier: 1.5,
            urgent_factor: 1.3,
            week_factor: 1.0,
            flexible_factor: 0.8,
        }
    }
}

impl ConcessionConfig {
    pub fn approach_multiplier(&self, approach: Approach) -> f64 {
        match approach {
            Approach::Assertive => self.assertive_multiplier,
            Approach::Diplomatic => self.diplomatic_multiplier,
            Approach::Considerate => self.considerate_multiplier,
        }
    }

    pub fn timeline_factor(&self, timeline: Timeline) -> f64 {
        match timeline {
            Timeline::Urgent => self.urgent_factor,
            Timeline::Week => self.week_factor,
            Timeline::Flexible => self.flexible_factor,
        }
    }
}

/// Maximum completed exchanges per timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    pub urgent: u32,
    pub week: u32,
    pub flexible: u32,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            urgent: 5,
            week: 8,
            flexible: 12,
        }
    }
}

impl DeadlineConfig {
    pub fn deadline_turn(&self, timeline: Timeline) -> u32 {
        match timeline {
            Timeline::Urgent => self.urgent,
            Timeline::Week => self.week,
            Timeline::Flexible => self.flexible,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Seller improvement below this share of the listed price counts as exhausted
    pub diminishing_returns_ratio: f64,
    /// Identical consecutive seller quotes that count as a stall
    pub stall_turns: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            diminishing_returns_ratio: 0.02,
            stall_turns: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticConfig {
    /// Listing premium over the market average that triggers social proof
    pub social_proof_premium: f64,
    /// Offer/quote gap, as a share of the listed price, that signals closing
    pub closing_gap_ratio: f64,
}

impl Default for TacticConfig {
    fn default() -> Self {
        Self {
            social_proof_premium: 0.05,
            closing_gap_ratio: 0.05,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NegotiationError::Configuration(format!("could not read `{}`: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| NegotiationError::Configuration(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("anchor.assertive", self.anchor.assertive),
            ("anchor.diplomatic", self.anchor.diplomatic),
            ("anchor.considerate", self.anchor.considerate),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(invalid(name, value, "must be in [0, 1)"));
            }
        }

        let c = &self.concession;
        if !(c.base_rate > 0.0 && c.base_rate <= 1.0) {
            return Err(invalid("concession.base_rate", c.base_rate, "must be in (0, 1]"));
        }
        if !(c.per_turn_increment >= 0.0 && c.per_turn_increment.is_finite()) {
            return Err(invalid(
                "concession.per_turn_increment",
                c.per_turn_increment,
                "must be non-negative",
            ));
        }
        if !(c.max_rate > 0.0 && c.max_rate <= 1.0) {
            return Err(invalid("concession.max_rate", c.max_rate, "must be in (0, 1]"));
        }
        for (name, value) in [
            ("concession.assertive_multiplier", c.assertive_multiplier),
            ("concession.diplomatic_multiplier", c.diplomatic_multiplier),
            ("concession.considerate_multiplier", c.considerate_multiplier),
            ("concession.urgent_factor", c.urgent_factor),
            ("concession.week_factor", c.week_factor),
            ("concession.flexible_factor", c.flexible_factor),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(name, value, "must be positive"));
            }
        }

        let d = &self.deadlines;
        if d.urgent == 0 || d.week == 0 || d.flexible == 0 {
            return Err(NegotiationError::InvalidConfig(
                "deadlines must allow at least one exchange".to_string(),
            ));
        }

        let e = &self.evaluator;
        if !(e.diminishing_returns_ratio >= 0.0 && e.diminishing_returns_ratio < 1.0) {
            return Err(invalid(
                "evaluator.diminishing_returns_ratio",
                e.diminishing_returns_ratio,
                "must be in [0, 1)",
            ));
        }
        if e.stall_turns < 2 {
            return Err(NegotiationError::InvalidConfig(format!(
                "evaluator.stall_turns = {} (a stall needs at least 2 quotes)",
                e.stall_turns
            )));
        }

        let t = &self.tactics;
        if !(t.social_proof_premium >= 0.0 && t.social_proof_premium.is_finite()) {
            return Err(invalid(
                "tactics.social_proof_premium",
                t.social_proof_premium,
                "must be non-negative",
            ));
        }
        if !(t.closing_gap_ratio >= 0.0 && t.closing_gap_ratio < 1.0) {
            return Err(invalid(
                "tactics.closing_gap_ratio",
                t.closing_gap_ratio,
                "must be in [0, 1)",
            ));
        }

        Ok(())
    }
}

fn invalid(name: &str, value: f64, rule: &str) -> NegotiationError {
    NegotiationError::InvalidConfig(format!("{name} = {value} {rule}"))
}
