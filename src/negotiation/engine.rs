//! Negotiation engine manages all negotiation sessions

use crate::config::EngineConfig;
use crate::error::{NegotiationError, Result};
use crate::store::{lock, InMemorySessionStore, SessionStore};
use crate::types::{BuyerParams, MarketContext, Price, SessionId};

use super::report::SessionSnapshot;
use super::session::NegotiationSession;
use super::strategy::Strategy;
use super::types::Decision;

/// Result of opening a session: its id and the anchor offer
#[derive(Clone, Debug, PartialEq)]
pub struct SessionStart {
    pub session_id: SessionId,
    pub decision: Decision,
}

/// Negotiation engine over an injected session store
///
/// Calls for one session are serialized by that session's lock; calls for
/// different sessions run in parallel.
pub struct NegotiationEngine<S: SessionStore = InMemorySessionStore> {
    store: S,
    strategy: Strategy,
    config: EngineConfig,
}

impl NegotiationEngine<InMemorySessionStore> {
    /// In-memory engine with the default thresholds
    pub fn with_defaults() -> Self {
        Self {
            store: InMemorySessionStore::new(),
            strategy: Strategy::default(),
            config: EngineConfig::default(),
        }
    }
}

impl Default for NegotiationEngine<InMemorySessionStore> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<S: SessionStore> NegotiationEngine<S> {
    /// Create an engine, rejecting out-of-range configuration
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            strategy: Strategy::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a session, compute its anchor and register it
    pub fn start_session(
        &self,
        buyer_params: BuyerParams,
        listed_price: Price,
        market_context: Option<MarketContext>,
    ) -> Result<SessionStart> {
        let deadline = self.config.deadlines.deadline_turn(buyer_params.timeline);
        let mut session = NegotiationSession::new(
            SessionId::generate(),
            buyer_params,
            listed_price,
            market_context,
            deadline,
        )?;
        let decision = session.open(&self.strategy)?;
        let session_id = session.id().clone();

        self.store.insert(session)?;
        tracing::info!("Started negotiation session {}", session_id);

        Ok(SessionStart {
            session_id,
            decision,
        })
    }

    /// Apply one seller quote to a session
    pub fn receive_counterparty_quote(&self, session_id: &SessionId, price: Price) -> Result<Decision> {
        let handle = self.store.get(session_id)?;
        let mut session = lock(&handle)?;
        session.receive_quote(price, &self.strategy)
    }

    pub fn get_session_snapshot(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let handle = self.store.get(session_id)?;
        let session = lock(&handle)?;
        Ok(SessionSnapshot::from_session(&session))
    }

    /// Supply market data after the session was started
    pub fn attach_market_context(&self, session_id: &SessionId, context: MarketContext) -> Result<()> {
        let handle = self.store.get(session_id)?;
        let mut session = lock(&handle)?;
        session.attach_market_context(context)
    }

    /// Close a live session at the buyer's request
    pub fn cancel_session(&self, session_id: &SessionId, reason: impl Into<String>) -> Result<Decision> {
        let handle = self.store.get(session_id)?;
        let mut session = lock(&handle)?;
        session.cancel(reason.into())
    }

    /// Ids of sessions that are still negotiating
    pub fn active_sessions(&self) -> Result<Vec<SessionId>> {
        let mut active = Vec::new();
        for id in self.store.ids()? {
            let handle = match self.store.get(&id) {
                Ok(handle) => handle,
                // Archived between listing and lookup
                Err(NegotiationError::SessionNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if !lock(&handle)?.is_terminal() {
                active.push(id);
            }
        }
        Ok(active)
    }

    /// Remove a finished session and hand back its final snapshot
    pub fn archive_session(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let handle = self.store.get(session_id)?;
        let snapshot = {
            let session = lock(&handle)?;
            if !session.is_terminal() {
                return Err(NegotiationError::InvalidStateTransition(format!(
                    "cannot archive live session {} ({})",
                    session_id,
                    session.state()
                )));
            }
            SessionSnapshot::from_session(&session)
        };

        self.store.remove(session_id)?;
        tracing::info!("Archived negotiation session {} ({})", session_id, snapshot.state);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::types::{Action, Actor, SessionState};
    use crate::types::{Approach, Timeline, Trend};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    const APPROACHES: [Approach; 3] = [Approach::Assertive, Approach::Diplomatic, Approach::Considerate];
    const TIMELINES: [Timeline; 3] = [Timeline::Urgent, Timeline::Week, Timeline::Flexible];

    fn scenario_params() -> BuyerParams {
        BuyerParams::new(45000, 55000, Approach::Diplomatic, Timeline::Flexible)
    }

    #[test]
    fn test_engine_creation() {
        let engine = NegotiationEngine::with_defaults();
        assert!(engine.active_sessions().unwrap().is_empty());
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.concession.max_rate = 1.5;
        let result = NegotiationEngine::new(InMemorySessionStore::new(), config);
        assert!(matches!(result, Err(NegotiationError::InvalidConfig(_))));
    }

    #[test]
    fn test_scenario_opening_offer() {
        let engine = NegotiationEngine::with_defaults();
        let start = engine.start_session(scenario_params(), 60000, None).unwrap();

        assert_eq!(start.decision.action, Action::Counter);
        assert_eq!(start.decision.price, Some(40500));
        assert_eq!(start.decision.state, SessionState::Opening);

        let snapshot = engine.get_session_snapshot(&start.session_id).unwrap();
        assert_eq!(snapshot.deadline_turn, 12);
        assert_eq!(snapshot.current_offer, Some(40500));
    }

    #[test]
    fn test_scenario_counter() {
        let engine = NegotiationEngine::with_defaults();
        let id = engine.start_session(scenario_params(), 60000, None).unwrap().session_id;

        let decision = engine.receive_counterparty_quote(&id, 50000).unwrap();
        assert_eq!(decision.action, Action::Counter);
        let price = decision.price.unwrap();
        assert!(price > 40500 && price < 50000);
    }

    #[test]
    fn test_scenario_accept_within_target() {
        let engine = NegotiationEngine::with_defaults();
        let id = engine.start_session(scenario_params(), 60000, None).unwrap().session_id;

        let decision = engine.receive_counterparty_quote(&id, 44000).unwrap();
        assert_eq!(decision.action, Action::Accept);

        let snapshot = engine.get_session_snapshot(&id).unwrap();
        assert_eq!(snapshot.final_price, Some(44000));
        assert_eq!(snapshot.state, SessionState::Accepted);
    }

    #[test]
    fn test_scenario_stall_abandons() {
        let engine = NegotiationEngine::with_defaults();
        let params = BuyerParams::new(45000, 55000, Approach::Diplomatic, Timeline::Urgent);
        let id = engine.start_session(params, 62000, None).unwrap().session_id;

        for quote in [60000, 58000, 58000, 58000] {
            engine.receive_counterparty_quote(&id, quote).unwrap();
        }
        let snapshot = engine.get_session_snapshot(&id).unwrap();
        assert_eq!(snapshot.turn_count, snapshot.deadline_turn - 1);

        let decision = engine.receive_counterparty_quote(&id, 58000).unwrap();
        assert_eq!(decision.action, Action::Abandon);
        assert_eq!(decision.state, SessionState::Failed);
    }

    #[test]
    fn test_scenario_narrow_budget() {
        let engine = NegotiationEngine::with_defaults();
        for approach in APPROACHES {
            let params = BuyerParams::new(54999, 55000, approach, Timeline::Week);
            let start = engine.start_session(params, 60000, None).unwrap();
            let anchor = start.decision.price.unwrap();
            assert!(anchor > 0 && anchor < 54999);
        }
    }

    #[test]
    fn test_invalid_parameters_are_not_stored() {
        let engine = NegotiationEngine::with_defaults();
        let params = BuyerParams::new(55000, 45000, Approach::Diplomatic, Timeline::Week);
        let result = engine.start_session(params, 60000, None);

        assert!(matches!(result, Err(NegotiationError::InvalidParameters(_))));
        assert!(engine.store().is_empty().unwrap());
    }

    #[test]
    fn test_unknown_session() {
        let engine = NegotiationEngine::with_defaults();
        let id = SessionId::from("neg_unknown");

        assert!(matches!(
            engine.receive_counterparty_quote(&id, 50000),
            Err(NegotiationError::SessionNotFound(_))
        ));
        assert!(matches!(
            engine.get_session_snapshot(&id),
            Err(NegotiationError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_terminal_session_is_closed_for_good() {
        let engine = NegotiationEngine::with_defaults();
        let id = engine.start_session(scenario_params(), 60000, None).unwrap().session_id;
        engine.receive_counterparty_quote(&id, 44000).unwrap();
        let before = engine.get_session_snapshot(&id).unwrap();

        for quote in [1, 44000, 100000] {
            let err = engine.receive_counterparty_quote(&id, quote).unwrap_err();
            assert!(matches!(err, NegotiationError::SessionClosed { .. }));
            assert!(err.is_caller_misuse());
        }
        assert_eq!(engine.get_session_snapshot(&id).unwrap().turns, before.turns);
    }

    #[test]
    fn test_quote_at_or_below_target_always_accepts() {
        let engine = NegotiationEngine::with_defaults();
        let mut rng = StdRng::seed_from_u64(7);

        for approach in APPROACHES {
            for timeline in TIMELINES {
                let params = BuyerParams::new(45000, 55000, approach, timeline);
                let id = engine.start_session(params, 60000, None).unwrap().session_id;

                let warmup = rng.gen_range(0..3);
                for _ in 0..warmup {
                    engine
                        .receive_counterparty_quote(&id, rng.gen_range(56000..60000))
                        .unwrap();
                }
                let decision = engine
                    .receive_counterparty_quote(&id, rng.gen_range(1..=45000))
                    .unwrap();
                assert_eq!(decision.action, Action::Accept);
            }
        }
    }

    #[test]
    fn test_offer_history_properties() {
        let engine = NegotiationEngine::with_defaults();
        let mut rng = StdRng::seed_from_u64(42);

        for approach in APPROACHES {
            for timeline in TIMELINES {
                for _ in 0..20 {
                    let target = rng.gen_range(2..100_000);
                    let max_budget = target + rng.gen_range(1..50_000);
                    let listed = rng.gen_range(2..200_000);
                    let params = BuyerParams::new(target, max_budget, approach, timeline);
                    let start = engine.start_session(params, listed, None).unwrap();
                    let id = start.session_id;

                    let anchor = start.decision.price.unwrap();
                    assert!(anchor > 0 && anchor < target && anchor < listed);

                    let mut quote = listed.max(max_budget) + rng.gen_range(0..10_000);
                    let mut last_offer = anchor;
                    for _ in 0..40 {
                        let decision = engine.receive_counterparty_quote(&id, quote).unwrap();
                        let snapshot = engine.get_session_snapshot(&id).unwrap();

                        let offer = snapshot.current_offer.unwrap();
                        assert!(offer >= last_offer, "offer went down");
                        assert!(offer <= max_budget, "offer above budget");
                        last_offer = offer;

                        assert!(
                            snapshot.turn_count <= snapshot.deadline_turn,
                            "turn count ran past the deadline"
                        );
                        if decision.is_final() {
                            break;
                        }
                        quote = quote.saturating_sub(rng.gen_range(0..3_000)).max(1);
                    }

                    let snapshot = engine.get_session_snapshot(&id).unwrap();
                    assert!(snapshot.state.is_terminal(), "session never closed");
                }
            }
        }
    }

    #[test]
    fn test_attach_market_context() {
        let engine = NegotiationEngine::with_defaults();
        let id = engine.start_session(scenario_params(), 60000, None).unwrap().session_id;
        let ctx = MarketContext::new(52000, 45000, 58000, Trend::Stable);

        engine.attach_market_context(&id, ctx.clone()).unwrap();
        assert!(matches!(
            engine.attach_market_context(&id, ctx),
            Err(NegotiationError::MarketContextAlreadySet(_))
        ));
    }

    #[test]
    fn test_cancel_and_archive() {
        let engine = NegotiationEngine::with_defaults();
        let live = engine.start_session(scenario_params(), 60000, None).unwrap().session_id;
        let done = engine.start_session(scenario_params(), 60000, None).unwrap().session_id;

        assert!(matches!(
            engine.archive_session(&done),
            Err(NegotiationError::InvalidStateTransition(_))
        ));

        let decision = engine.cancel_session(&done, "bought elsewhere").unwrap();
        assert_eq!(decision.action, Action::Abandon);
        assert_eq!(engine.active_sessions().unwrap(), vec![live.clone()]);

        let snapshot = engine.archive_session(&done).unwrap();
        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(matches!(
            engine.get_session_snapshot(&done),
            Err(NegotiationError::SessionNotFound(_))
        ));
        assert!(engine.get_session_snapshot(&live).is_ok());
    }

    #[test]
    fn test_concurrent_sessions() {
        let engine = Arc::new(NegotiationEngine::with_defaults());
        let ids: Vec<SessionId> = (0..8)
            .map(|_| engine.start_session(scenario_params(), 60000, None).unwrap().session_id)
            .collect();

        std::thread::scope(|scope| {
            for id in &ids {
                // Two writers per session
                for _ in 0..2 {
                    let engine = Arc::clone(&engine);
                    scope.spawn(move || {
                        for quote in [59000, 58000, 57000] {
                            match engine.receive_counterparty_quote(id, quote) {
                                Ok(_) | Err(NegotiationError::SessionClosed { .. }) => {}
                                Err(e) => panic!("unexpected error: {e}"),
                            }
                        }
                    });
                }
            }
        });

        for id in &ids {
            let snapshot = engine.get_session_snapshot(id).unwrap();
            assert!(snapshot.report.seller_turns >= 1);
            let offers: Vec<Price> = snapshot
                .turns
                .iter()
                .filter(|t| t.actor == Actor::Buyer)
                .map(|t| t.quoted_price)
                .collect();
            assert!(offers.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
