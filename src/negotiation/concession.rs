//! Offer computation: opening anchor and per-turn concessions

use crate::config::{AnchorConfig, ConcessionConfig, EngineConfig};
use crate::types::{Approach, BuyerParams, Price, Timeline};

/// Inputs for one counter offer
#[derive(Clone, Copy, Debug)]
pub struct ConcessionInput {
    pub previous_offer: Price,
    pub seller_price: Price,
    pub max_budget: Price,
    pub approach: Approach,
    pub timeline: Timeline,
    /// Completed exchanges including the one being answered
    pub turn_count: u32,
}

/// Computes buyer offers
#[derive(Clone, Debug)]
pub struct ConcessionEngine {
    anchor: AnchorConfig,
    schedule: ConcessionConfig,
}

impl ConcessionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            anchor: config.anchor,
            schedule: config.concession,
        }
    }

    /// Opening offer, strictly between 0 and both the target and the listed price
    ///
    /// Callers must have validated `params` and require `listed_price >= 2`.
    pub fn opening_offer(&self, params: &BuyerParams, listed_price: Price) -> Price {
        let factor = self.anchor.factor(params.approach);
        let raw = (params.target_price as f64 * (1.0 - factor)).round() as Price;
        let ceiling = params.target_price.min(listed_price).saturating_sub(1).max(1);
        let anchor = raw.clamp(1, ceiling);

        assert!(
            anchor > 0 && anchor < params.target_price && anchor < listed_price,
            "opening offer {anchor} escaped (0, min(target {}, listed {}))",
            params.target_price,
            listed_price
        );

        tracing::debug!(
            "Opening anchor {} ({} approach, factor {:.2}, target {})",
            anchor,
            params.approach,
            factor,
            params.target_price
        );
        anchor
    }

    /// Share of the remaining gap conceded this turn
    pub fn concession_rate(&self, approach: Approach, timeline: Timeline, turn_count: u32) -> f64 {
        let s = &self.schedule;
        let base = s.base_rate + s.per_turn_increment * turn_count as f64;
        let rate = base * s.timeline_factor(timeline) * s.approach_multiplier(approach);
        rate.min(s.max_rate)
    }

    /// Next buyer offer, never below the previous offer nor above the budget
    pub fn next_offer(&self, input: ConcessionInput) -> Price {
        let prev = input.previous_offer;
        let gap = input.seller_price.saturating_sub(prev);
        if gap == 0 || prev >= input.max_budget {
            return prev;
        }

        let rate = self.concession_rate(input.approach, input.timeline, input.turn_count);
        let step = ((gap as f64 * rate).round() as Price).max(1);

        // Stay short of the seller's quote; meeting it is the evaluator's call
        let ceiling = input.max_budget.min(input.seller_price - 1);
        let next = prev.saturating_add(step).min(ceiling).max(prev);

        assert!(
            next >= prev && next <= input.max_budget,
            "counter offer {next} escaped [{prev}, {}]",
            input.max_budget
        );

        tracing::debug!(
            "Concession: gap {} rate {:.3} step {} -> offer {}",
            gap,
            rate,
            step,
            next
        );
        next
    }
}
