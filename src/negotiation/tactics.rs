//! Persuasion framing for outgoing offers

use crate::config::{EngineConfig, TacticConfig};
use crate::types::{MarketContext, Price, Timeline};
use std::collections::BTreeSet;

use super::types::Tactic;

/// Context for choosing the tactics attached to one buyer offer
#[derive(Clone, Copy, Debug)]
pub struct TacticInput<'a> {
    /// True for the opening offer (turn 0)
    pub opening: bool,
    pub offer: Price,
    pub seller_price: Option<Price>,
    pub previous_seller_price: Option<Price>,
    pub listed_price: Price,
    pub timeline: Timeline,
    pub turn_count: u32,
    pub deadline_turn: u32,
    pub market: Option<&'a MarketContext>,
}

/// Advisory only: never alters the price it annotates
#[derive(Clone, Debug)]
pub struct TacticSelector {
    config: TacticConfig,
}

impl TacticSelector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.tactics,
        }
    }

    pub fn select(&self, input: &TacticInput<'_>) -> BTreeSet<Tactic> {
        let mut tactics = BTreeSet::new();

        if input.opening {
            tactics.insert(Tactic::Anchoring);
        }

        if let (Some(latest), Some(previous)) = (input.seller_price, input.previous_seller_price) {
            if latest < previous {
                tactics.insert(Tactic::Reciprocity);
            }
        }

        if input.timeline.is_pressed() && 2 * input.turn_count >= input.deadline_turn {
            tactics.insert(Tactic::Scarcity);
        }

        if let Some(market) = input.market {
            if market.is_overpriced(input.listed_price, self.config.social_proof_premium) {
                tactics.insert(Tactic::SocialProof);
            }
        }

        if let Some(seller) = input.seller_price {
            let gap = seller.saturating_sub(input.offer) as f64;
            if gap < self.config.closing_gap_ratio * input.listed_price as f64 {
                tactics.insert(Tactic::Commitment);
            }
        }

        if tactics.is_empty() {
            tactics.insert(Tactic::Anchoring);
        }
        tactics
    }
}
