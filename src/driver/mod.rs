//! Async driver connecting collaborators to the engine
//!
//! Inbound events arrive on a channel. Extraction runs before the engine is
//! touched, so no session lock is held while parsing text. Decisions go to a
//! [`DecisionSink`].

pub mod extract;

pub use extract::{LastNumberExtractor, QuoteExtractor};

use crate::error::{NegotiationError, Result};
use crate::negotiation::{Decision, NegotiationEngine};
use crate::store::SessionStore;
use crate::types::{Price, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Inbound signal for one session
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// Raw counterparty text, run through the extractor
    Message { session_id: SessionId, text: String },
    /// Already-extracted quote; `None` means no price was found
    Quote {
        session_id: SessionId,
        price: Option<Price>,
    },
}

impl InboundEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            InboundEvent::Message { session_id, .. } | InboundEvent::Quote { session_id, .. } => {
                session_id
            }
        }
    }
}

/// Delivers decisions to the message composer or transport
pub trait DecisionSink: Send + Sync {
    fn deliver(&self, decision: Decision) -> Result<()>;
}

impl DecisionSink for mpsc::UnboundedSender<Decision> {
    fn deliver(&self, decision: Decision) -> Result<()> {
        self.send(decision)
            .map_err(|e| NegotiationError::Delivery(format!("receiver dropped: {}", e.0.session_id)))
    }
}

impl DecisionSink for mpsc::Sender<Decision> {
    fn deliver(&self, decision: Decision) -> Result<()> {
        self.try_send(decision)
            .map_err(|e| NegotiationError::Delivery(e.to_string()))
    }
}

/// Counters for one driver run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub events: usize,
    pub decisions: usize,
    pub no_price: usize,
    pub rejected: usize,
}

/// Feeds inbound events through the engine one at a time
pub struct SessionDriver<S, X, K>
where
    S: SessionStore,
    X: QuoteExtractor,
    K: DecisionSink,
{
    engine: Arc<NegotiationEngine<S>>,
    extractor: X,
    sink: K,
}

impl<S, X, K> SessionDriver<S, X, K>
where
    S: SessionStore,
    X: QuoteExtractor,
    K: DecisionSink,
{
    pub fn new(engine: Arc<NegotiationEngine<S>>, extractor: X, sink: K) -> Self {
        Self {
            engine,
            extractor,
            sink,
        }
    }

    pub fn engine(&self) -> &Arc<NegotiationEngine<S>> {
        &self.engine
    }

    /// Process one event; `Ok(None)` when the event carried no price
    pub fn handle_event(&self, event: InboundEvent) -> Result<Option<Decision>> {
        let (session_id, price) = match event {
            InboundEvent::Message { session_id, text } => {
                let price = self.extractor.extract(&text);
                (session_id, price)
            }
            InboundEvent::Quote { session_id, price } => (session_id, price),
        };

        let Some(price) = price else {
            tracing::warn!("No price found in message for session {}", session_id);
            return Ok(None);
        };

        let decision = self.engine.receive_counterparty_quote(&session_id, price)?;
        self.sink.deliver(decision.clone())?;
        Ok(Some(decision))
    }

    /// Drain the channel until every sender is dropped
    ///
    /// Rejected quotes (unknown or closed sessions, bad prices) are logged and
    /// skipped. Delivery failures and corrupted state stop the loop.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<InboundEvent>) -> Result<DriverStats> {
        let mut stats = DriverStats::default();

        while let Some(event) = events.recv().await {
            stats.events += 1;
            let session_id = event.session_id().clone();

            match self.handle_event(event) {
                Ok(Some(_)) => stats.decisions += 1,
                Ok(None) => stats.no_price += 1,
                Err(e) if e.is_rejected_quote() => {
                    tracing::warn!("Rejected quote for session {}: {}", session_id, e);
                    stats.rejected += 1;
                }
                Err(e) => {
                    tracing::error!("Driver stopped on session {}: {}", session_id, e);
                    return Err(e);
                }
            }
        }

        tracing::debug!("Driver finished: {:?}", stats);
        Ok(stats)
    }
}
