//! Core types used throughout haggler

use crate::error::{NegotiationError, Result};
use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Price in whole currency units
pub type Price = u64;

/// Unique identifier for negotiation sessions
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new session ID from the current time and a random nonce
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let nonce: u64 = rand::random();

        let mut hasher = Blake2b512::new();
        hasher.update(nanos.to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        let result = hasher.finalize();

        Self(format!("neg_{}", hex::encode(&result[..8])))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Buyer's negotiation posture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    Assertive,
    Diplomatic,
    Considerate,
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Approach::Assertive => "assertive",
            Approach::Diplomatic => "diplomatic",
            Approach::Considerate => "considerate",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Approach {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assertive" => Ok(Approach::Assertive),
            "diplomatic" => Ok(Approach::Diplomatic),
            "considerate" => Ok(Approach::Considerate),
            other => Err(NegotiationError::InvalidParameters(format!(
                "unknown approach `{other}` (expected assertive, diplomatic or considerate)"
            ))),
        }
    }
}

/// Buyer's urgency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    Urgent,
    Week,
    Flexible,
}

impl Timeline {
    /// Whether the buyer is under time pressure
    pub fn is_pressed(&self) -> bool {
        matches!(self, Timeline::Urgent | Timeline::Week)
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeline::Urgent => "urgent",
            Timeline::Week => "week",
            Timeline::Flexible => "flexible",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Timeline {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Timeline::Urgent),
            "week" => Ok(Timeline::Week),
            "flexible" => Ok(Timeline::Flexible),
            other => Err(NegotiationError::InvalidParameters(format!(
                "unknown timeline `{other}` (expected urgent, week or flexible)"
            ))),
        }
    }
}

/// Buyer's limits and preferences for one negotiation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuyerParams {
    pub target_price: Price,
    pub max_budget: Price,
    pub approach: Approach,
    pub timeline: Timeline,
    /// Free-form requirements passed through to the message composer
    #[serde(default)]
    pub special_requirements: Option<String>,
}

impl BuyerParams {
    pub fn new(target_price: Price, max_budget: Price, approach: Approach, timeline: Timeline) -> Self {
        Self {
            target_price,
            max_budget,
            approach,
            timeline,
            special_requirements: None,
        }
    }

    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.special_requirements = Some(requirements.into());
        self
    }

    /// Check the target/budget invariant
    pub fn validate(&self) -> Result<()> {
        if self.target_price == 0 || self.max_budget == 0 {
            return Err(NegotiationError::InvalidParameters(
                "target price and max budget must both be positive".to_string(),
            ));
        }
        if self.target_price >= self.max_budget {
            return Err(NegotiationError::InvalidParameters(format!(
                "target price {} must be below max budget {}",
                self.target_price, self.max_budget
            )));
        }
        // An integer anchor strictly between 0 and the target needs room
        if self.target_price < 2 {
            return Err(NegotiationError::InvalidParameters(format!(
                "target price {} leaves no room for an opening offer",
                self.target_price
            )));
        }
        Ok(())
    }
}

/// Direction the market for the item is moving
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Stable,
    Falling,
}

impl FromStr for Trend {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rising" => Ok(Trend::Rising),
            "stable" => Ok(Trend::Stable),
            "falling" => Ok(Trend::Falling),
            other => Err(NegotiationError::InvalidParameters(format!(
                "unknown market trend `{other}`"
            ))),
        }
    }
}

/// Observed price range for comparable listings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Price,
    pub max: Price,
}

/// Immutable market snapshot supplied by the market-analysis collaborator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub average_price: Price,
    pub price_range: PriceRange,
    pub trend: Trend,
}

impl MarketContext {
    pub fn new(average_price: Price, min: Price, max: Price, trend: Trend) -> Self {
        Self {
            average_price,
            price_range: PriceRange { min, max },
            trend,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.average_price == 0 {
            return Err(NegotiationError::InvalidParameters(
                "market average price must be positive".to_string(),
            ));
        }
        if self.price_range.min > self.price_range.max {
            return Err(NegotiationError::InvalidParameters(format!(
                "market price range is inverted ({} > {})",
                self.price_range.min, self.price_range.max
            )));
        }
        Ok(())
    }

    /// Whether `listed_price` sits more than `premium` above the market average
    pub fn is_overpriced(&self, listed_price: Price, premium: f64) -> bool {
        listed_price as f64 > self.average_price as f64 * (1.0 + premium)
    }
}
