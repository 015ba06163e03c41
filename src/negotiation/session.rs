//! Negotiation session: the aggregate the state machine mutates

use crate::error::{NegotiationError, Result};
use crate::types::{BuyerParams, MarketContext, Price, SessionId};
use std::collections::BTreeSet;
use std::time::SystemTime;

use super::concession::ConcessionInput;
use super::evaluator::{Evaluation, EvaluationInput};
use super::strategy::Strategy;
use super::tactics::TacticInput;
use super::types::{Actor, Decision, Outcome, SessionState, Tactic, Turn};

/// A buyer-side negotiation against one seller for one listing
#[derive(Clone, Debug)]
pub struct NegotiationSession {
    id: SessionId,
    buyer_params: BuyerParams,
    listed_price: Price,
    market_context: Option<MarketContext>,
    state: SessionState,
    turns: Vec<Turn>,
    current_offer: Option<Price>,
    last_counterparty_price: Option<Price>,
    turn_count: u32,
    deadline_turn: u32,
    final_price: Option<Price>,
    outcome: Option<Outcome>,
    created_at: SystemTime,
    closed_at: Option<SystemTime>,
}

impl NegotiationSession {
    /// Create a session in `Init` after validating the buyer's parameters
    pub fn new(
        id: SessionId,
        buyer_params: BuyerParams,
        listed_price: Price,
        market_context: Option<MarketContext>,
        deadline_turn: u32,
    ) -> Result<Self> {
        buyer_params.validate()?;
        if listed_price < 2 {
            return Err(NegotiationError::InvalidParameters(format!(
                "listed price {listed_price} leaves no room for an opening offer"
            )));
        }
        if deadline_turn == 0 {
            return Err(NegotiationError::InvalidParameters(
                "deadline must allow at least one exchange".to_string(),
            ));
        }
        if let Some(ctx) = &market_context {
            ctx.validate()?;
        }

        Ok(Self {
            id,
            buyer_params,
            listed_price,
            market_context,
            state: SessionState::Init,
            turns: Vec::new(),
            current_offer: None,
            last_counterparty_price: None,
            turn_count: 0,
            deadline_turn,
            final_price: None,
            outcome: None,
            created_at: SystemTime::now(),
            closed_at: None,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn buyer_params(&self) -> &BuyerParams {
        &self.buyer_params
    }

    pub fn listed_price(&self) -> Price {
        self.listed_price
    }

    pub fn market_context(&self) -> Option<&MarketContext> {
        self.market_context.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn current_offer(&self) -> Option<Price> {
        self.current_offer
    }

    pub fn last_counterparty_price(&self) -> Option<Price> {
        self.last_counterparty_price
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn deadline_turn(&self) -> u32 {
        self.deadline_turn
    }

    pub fn final_price(&self) -> Option<Price> {
        self.final_price
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn closed_at(&self) -> Option<SystemTime> {
        self.closed_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Seller quotes in the order they arrived
    pub fn seller_quotes(&self) -> Vec<Price> {
        self.turns
            .iter()
            .filter(|t| t.actor == Actor::Seller)
            .map(|t| t.quoted_price)
            .collect()
    }

    /// Compute the anchor and move `Init → Opening`
    pub fn open(&mut self, strategy: &Strategy) -> Result<Decision> {
        if self.state != SessionState::Init {
            return Err(NegotiationError::InvalidStateTransition(format!(
                "session {} already opened ({})",
                self.id, self.state
            )));
        }

        let anchor = strategy
            .concession
            .opening_offer(&self.buyer_params, self.listed_price);
        let tactics = strategy.tactics.select(&TacticInput {
            opening: true,
            offer: anchor,
            seller_price: None,
            previous_seller_price: None,
            listed_price: self.listed_price,
            timeline: self.buyer_params.timeline,
            turn_count: self.turn_count,
            deadline_turn: self.deadline_turn,
            market: self.market_context.as_ref(),
        });

        self.push_turn(Actor::Buyer, anchor, tactics.clone());
        self.current_offer = Some(anchor);
        self.transition(SessionState::Opening);

        tracing::info!(
            "Session {} opened at {} against listing {} (deadline {} turns)",
            self.id,
            anchor,
            self.listed_price,
            self.deadline_turn
        );

        Ok(Decision::counter(self.id.clone(), anchor, tactics, self.state))
    }

    /// Process one seller quote
    ///
    /// Terminal sessions are rejected before anything is touched.
    pub fn receive_quote(&mut self, price: Price, strategy: &Strategy) -> Result<Decision> {
        self.ensure_active()?;
        if self.state == SessionState::Init {
            return Err(NegotiationError::InvalidStateTransition(format!(
                "session {} has not made an opening offer",
                self.id
            )));
        }
        if price == 0 {
            return Err(NegotiationError::InvalidParameters(
                "quoted price must be positive".to_string(),
            ));
        }
        let previous_offer = self.current_offer.ok_or_else(|| {
            NegotiationError::StateCorruption(format!("session {} has no standing offer", self.id))
        })?;

        if self.turn_count >= self.deadline_turn {
            self.push_turn(Actor::Seller, price, BTreeSet::new());
            self.record_seller_price(price);
            self.close(SessionState::Expired, Outcome::Expired);
            tracing::info!(
                "Session {} expired after {} turns (last quote {})",
                self.id,
                self.turn_count,
                price
            );
            return Ok(Decision::abandon(self.id.clone(), self.state, Outcome::Expired));
        }

        let history = self.seller_quotes();
        let evaluation = strategy.evaluator.evaluate(&EvaluationInput {
            seller_price: price,
            target_price: self.buyer_params.target_price,
            max_budget: self.buyer_params.max_budget,
            listed_price: self.listed_price,
            current_offer: previous_offer,
            turn_count: self.turn_count,
            deadline_turn: self.deadline_turn,
            seller_history: &history,
        });
        tracing::debug!(
            "Session {} turn {}: seller quoted {} -> {:?}",
            self.id,
            self.turn_count,
            price,
            evaluation
        );

        self.push_turn(Actor::Seller, price, BTreeSet::new());
        self.record_seller_price(price);

        match evaluation {
            Evaluation::Accept(reason) => {
                self.final_price = Some(price);
                self.close(SessionState::Accepted, Outcome::Agreed { reason });
                tracing::info!("Session {} accepted at {} ({:?})", self.id, price, reason);
                Ok(Decision::accept(self.id.clone(), price, reason))
            }
            Evaluation::Abandon(reason) => {
                let outcome = Outcome::from(reason);
                self.close(SessionState::Failed, outcome.clone());
                tracing::info!("Session {} abandoned at quote {} ({:?})", self.id, price, reason);
                Ok(Decision::abandon(self.id.clone(), self.state, outcome))
            }
            Evaluation::Counter => {
                self.turn_count += 1;

                let params = &self.buyer_params;
                let next = strategy.concession.next_offer(ConcessionInput {
                    previous_offer,
                    seller_price: price,
                    max_budget: params.max_budget,
                    approach: params.approach,
                    timeline: params.timeline,
                    turn_count: self.turn_count,
                });
                let tactics = strategy.tactics.select(&TacticInput {
                    opening: false,
                    offer: next,
                    seller_price: Some(price),
                    previous_seller_price: history.last().copied().or(Some(self.listed_price)),
                    listed_price: self.listed_price,
                    timeline: params.timeline,
                    turn_count: self.turn_count,
                    deadline_turn: self.deadline_turn,
                    market: self.market_context.as_ref(),
                });

                assert!(
                    next >= previous_offer && next <= self.buyer_params.max_budget,
                    "session {}: offer {} breaks [{}, {}]",
                    self.id,
                    next,
                    previous_offer,
                    self.buyer_params.max_budget
                );

                self.push_turn(Actor::Buyer, next, tactics.clone());
                self.current_offer = Some(next);
                self.transition(SessionState::Countering);

                tracing::debug!(
                    "Session {} countered {} with {} ({} of {} turns)",
                    self.id,
                    price,
                    next,
                    self.turn_count,
                    self.deadline_turn
                );
                Ok(Decision::counter(self.id.clone(), next, tactics, self.state))
            }
        }
    }

    /// Set the market snapshot once, if the creator did not have it
    pub fn attach_market_context(&mut self, context: MarketContext) -> Result<()> {
        self.ensure_active()?;
        if self.market_context.is_some() {
            return Err(NegotiationError::MarketContextAlreadySet(self.id.0.clone()));
        }
        context.validate()?;
        self.market_context = Some(context);
        tracing::debug!("Session {} received market context", self.id);
        Ok(())
    }

    /// Buyer walks away on their own initiative
    pub fn cancel(&mut self, reason: String) -> Result<Decision> {
        self.ensure_active()?;
        let outcome = Outcome::Cancelled { reason };
        self.close(SessionState::Failed, outcome.clone());
        tracing::info!("Session {} cancelled", self.id);
        Ok(Decision::abandon(self.id.clone(), self.state, outcome))
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(NegotiationError::SessionClosed {
                id: self.id.0.clone(),
                state: self.state,
            });
        }
        Ok(())
    }

    fn push_turn(&mut self, actor: Actor, quoted_price: Price, tactics_used: BTreeSet<Tactic>) {
        self.turns.push(Turn {
            index: self.turns.len(),
            actor,
            quoted_price,
            tactics_used,
            timestamp: SystemTime::now(),
        });
    }

    fn record_seller_price(&mut self, price: Price) {
        self.last_counterparty_price = match self.last_counterparty_price {
            Some(standing) if price > standing => {
                tracing::warn!(
                    "Session {}: seller retreated from {} to {}",
                    self.id,
                    standing,
                    price
                );
                Some(standing)
            }
            _ => Some(price),
        };
    }

    fn transition(&mut self, target: SessionState) {
        assert!(
            self.state.can_transition_to(target),
            "session {}: illegal transition {} -> {}",
            self.id,
            self.state,
            target
        );
        self.state = target;
    }

    fn close(&mut self, state: SessionState, outcome: Outcome) {
        self.transition(state);
        self.outcome = Some(outcome);
        self.closed_at = Some(SystemTime::now());
    }
}
