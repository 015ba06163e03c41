//! Classifies seller quotes into accept, counter or abandon

use crate::config::{EngineConfig, EvaluatorConfig};
use crate::types::Price;

use super::types::{AbandonReason, AcceptReason};

/// Everything the evaluator needs about one incoming quote
#[derive(Clone, Copy, Debug)]
pub struct EvaluationInput<'a> {
    pub seller_price: Price,
    pub target_price: Price,
    pub max_budget: Price,
    pub listed_price: Price,
    pub current_offer: Price,
    /// Completed exchanges before this quote
    pub turn_count: u32,
    pub deadline_turn: u32,
    /// Earlier seller quotes in this session, oldest first
    pub seller_history: &'a [Price],
}

/// Evaluator verdict
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    Accept(AcceptReason),
    Counter,
    Abandon(AbandonReason),
}

impl Evaluation {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Evaluation::Counter)
    }
}

/// Pure function of session history plus the new quote
#[derive(Clone, Debug)]
pub struct OfferEvaluator {
    config: EvaluatorConfig,
}

impl OfferEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.evaluator,
        }
    }

    pub fn evaluate(&self, input: &EvaluationInput<'_>) -> Evaluation {
        let price = input.seller_price;
        let near_deadline = input.turn_count + 1 >= input.deadline_turn;

        if price <= input.target_price {
            return Evaluation::Accept(AcceptReason::WithinTarget);
        }
        if price <= input.current_offer {
            return Evaluation::Accept(AcceptReason::MetStandingOffer);
        }

        if price <= input.max_budget {
            if near_deadline {
                return Evaluation::Accept(AcceptReason::DeadlineApproaching);
            }
            if let Some(&previous) = input.seller_history.last() {
                let improvement = previous.saturating_sub(price) as f64;
                let threshold = self.config.diminishing_returns_ratio * input.listed_price as f64;
                if improvement < threshold {
                    return Evaluation::Accept(AcceptReason::DiminishingReturns);
                }
            }
        } else if input.turn_count >= input.deadline_turn {
            return Evaluation::Abandon(AbandonReason::OverBudget);
        }

        if near_deadline && self.stalled(input) {
            return Evaluation::Abandon(AbandonReason::Stalled);
        }

        Evaluation::Counter
    }

    /// Whether the last `stall_turns` seller quotes, this one included, are identical
    fn stalled(&self, input: &EvaluationInput<'_>) -> bool {
        let repeats = input
            .seller_history
            .iter()
            .rev()
            .take_while(|&&p| p == input.seller_price)
            .count();
        repeats + 1 >= self.config.stall_turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> OfferEvaluator {
        OfferEvaluator::new(&EngineConfig::default())
    }

    fn input(seller_price: Price, turn_count: u32, history: &[Price]) -> EvaluationInput<'_> {
        EvaluationInput {
            seller_price,
            target_price: 45000,
            max_budget: 55000,
            listed_price: 60000,
            current_offer: 40500,
            turn_count,
            deadline_turn: 12,
            seller_history: history,
        }
    }

    #[test]
    fn test_first_quote_above_target_counters() {
        assert_eq!(evaluator().evaluate(&input(50000, 0, &[])), Evaluation::Counter);
    }

    #[test]
    fn test_quote_within_target_accepts() {
        assert_eq!(
            evaluator().evaluate(&input(44000, 0, &[])),
            Evaluation::Accept(AcceptReason::WithinTarget)
        );
        assert_eq!(
            evaluator().evaluate(&input(45000, 7, &[60000, 52000])),
            Evaluation::Accept(AcceptReason::WithinTarget)
        );
    }

    #[test]
    fn test_quote_meeting_standing_offer_accepts() {
        let mut i = input(47000, 2, &[52000]);
        i.current_offer = 48000;
        assert_eq!(
            evaluator().evaluate(&i),
            Evaluation::Accept(AcceptReason::MetStandingOffer)
        );
    }

    #[test]
    fn test_in_budget_near_deadline_accepts() {
        assert_eq!(
            evaluator().evaluate(&input(54000, 11, &[56000])),
            Evaluation::Accept(AcceptReason::DeadlineApproaching)
        );
    }

    #[test]
    fn test_diminishing_returns_accepts() {
        // 1000 < 2% of 60000
        assert_eq!(
            evaluator().evaluate(&input(51000, 3, &[52000])),
            Evaluation::Accept(AcceptReason::DiminishingReturns)
        );
        // 1200 is not below the threshold
        assert_eq!(evaluator().evaluate(&input(50800, 3, &[52000])), Evaluation::Counter);
    }

    #[test]
    fn test_seller_retreat_within_budget_counts_as_no_improvement() {
        assert_eq!(
            evaluator().evaluate(&input(53000, 3, &[52000])),
            Evaluation::Accept(AcceptReason::DiminishingReturns)
        );
    }

    #[test]
    fn test_over_budget_at_deadline_abandons() {
        assert_eq!(
            evaluator().evaluate(&input(58000, 12, &[59000])),
            Evaluation::Abandon(AbandonReason::OverBudget)
        );
    }

    #[test]
    fn test_over_budget_before_deadline_counters() {
        assert_eq!(evaluator().evaluate(&input(58000, 4, &[62000])), Evaluation::Counter);
    }

    #[test]
    fn test_stall_near_deadline_abandons() {
        assert_eq!(
            evaluator().evaluate(&input(58000, 11, &[60000, 58000, 58000])),
            Evaluation::Abandon(AbandonReason::Stalled)
        );
    }

    #[test]
    fn test_stall_far_from_deadline_counters() {
        assert_eq!(
            evaluator().evaluate(&input(58000, 5, &[58000, 58000])),
            Evaluation::Counter
        );
    }

    #[test]
    fn test_short_repeat_is_not_a_stall() {
        assert_eq!(
            evaluator().evaluate(&input(58000, 11, &[60000, 58000])),
            Evaluation::Counter
        );
    }

    #[test]
    fn test_evaluation_terminality() {
        assert!(Evaluation::Accept(AcceptReason::WithinTarget).is_terminal());
        assert!(Evaluation::Abandon(AbandonReason::Stalled).is_terminal());
        assert!(!Evaluation::Counter.is_terminal());
    }
}
