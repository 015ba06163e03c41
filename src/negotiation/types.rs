//! Negotiation types and state machine

use crate::types::{Price, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;

/// Session lifecycle state
///
/// ```text
/// Init → Opening → Countering ⟲
///           ↓          ↓
///           ├──────────┴→ Accepted
///           ├──────────┴→ Failed
///           └──────────┴→ Expired
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Parameters accepted, no offer made yet
    Init,
    /// Opening offer sent, waiting for the first seller quote
    Opening,
    /// At least one counter offer sent
    Countering,
    /// Deal agreed (terminal)
    Accepted,
    /// Buyer walked away or cancelled (terminal)
    Failed,
    /// Deadline reached without agreement (terminal)
    Expired,
}

impl SessionState {
    /// Check if negotiation is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Accepted | SessionState::Failed | SessionState::Expired
        )
    }

    /// Check if negotiation can still receive quotes
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Init, Opening)
                | (Opening, Countering)
                | (Countering, Countering)
                | (Init | Opening | Countering, Failed)
                | (Opening | Countering, Accepted)
                | (Opening | Countering, Expired)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Init => "INIT",
            SessionState::Opening => "OPENING",
            SessionState::Countering => "COUNTERING",
            SessionState::Accepted => "ACCEPTED",
            SessionState::Failed => "FAILED",
            SessionState::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// Party that quoted a price
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Buyer,
    Seller,
}

/// Persuasion frame attached to a buyer offer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tactic {
    Anchoring,
    Reciprocity,
    Scarcity,
    SocialProof,
    Commitment,
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tactic::Anchoring => "anchoring",
            Tactic::Reciprocity => "reciprocity",
            Tactic::Scarcity => "scarcity",
            Tactic::SocialProof => "social_proof",
            Tactic::Commitment => "commitment",
        };
        write!(f, "{s}")
    }
}

/// One recorded price exchange
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub index: usize,
    pub actor: Actor,
    pub quoted_price: Price,
    pub tactics_used: BTreeSet<Tactic>,
    pub timestamp: SystemTime,
}

/// Why the evaluator accepted a seller quote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptReason {
    WithinTarget,
    MetStandingOffer,
    DeadlineApproaching,
    DiminishingReturns,
}

/// Why the evaluator walked away
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    OverBudget,
    Stalled,
}

/// How a terminal session ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Agreed { reason: AcceptReason },
    OverBudget,
    Stalled,
    Expired,
    Cancelled { reason: String },
}

impl From<AbandonReason> for Outcome {
    fn from(reason: AbandonReason) -> Self {
        match reason {
            AbandonReason::OverBudget => Outcome::OverBudget,
            AbandonReason::Stalled => Outcome::Stalled,
        }
    }
}

/// Action the buyer takes in response to a quote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Counter,
    Accept,
    Abandon,
}

/// Decision payload handed to the message composer and transport
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub session_id: SessionId,
    pub action: Action,
    pub price: Option<Price>,
    pub tactics: BTreeSet<Tactic>,
    pub state: SessionState,
    pub outcome: Option<Outcome>,
}

impl Decision {
    pub fn counter(session_id: SessionId, price: Price, tactics: BTreeSet<Tactic>, state: SessionState) -> Self {
        Self {
            session_id,
            action: Action::Counter,
            price: Some(price),
            tactics,
            state,
            outcome: None,
        }
    }

    pub fn accept(session_id: SessionId, price: Price, reason: AcceptReason) -> Self {
        Self {
            session_id,
            action: Action::Accept,
            price: Some(price),
            tactics: BTreeSet::new(),
            state: SessionState::Accepted,
            outcome: Some(Outcome::Agreed { reason }),
        }
    }

    pub fn abandon(session_id: SessionId, state: SessionState, outcome: Outcome) -> Self {
        Self {
            session_id,
            action: Action::Abandon,
            price: None,
            tactics: BTreeSet::new(),
            state,
            outcome: Some(outcome),
        }
    }

    pub fn is_final(&self) -> bool {
        self.state.is_terminal()
    }
}
