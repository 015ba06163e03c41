//! Haggler application wiring the engine to the command line

use crate::config::EngineConfig;
use crate::driver::{InboundEvent, LastNumberExtractor, SessionDriver};
use crate::error::Result;
use crate::negotiation::{Decision, NegotiationEngine, SessionSnapshot};
use crate::store::InMemorySessionStore;
use crate::types::Price;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};

use super::commands::NegotiationArgs;

/// Longest accepted input line on the `run` protocol
const MAX_LINE_LENGTH: usize = 4096;

/// One inbound line on the `run` protocol; a null price means none was found
#[derive(Debug, Deserialize)]
struct QuoteLine {
    price: Option<Price>,
}

/// Everything `simulate` prints
#[derive(Debug, Serialize)]
pub struct SimulationOutput {
    pub decisions: Vec<Decision>,
    /// Quotes left over after the session closed
    pub unused_quotes: Vec<Price>,
    pub snapshot: SessionSnapshot,
    pub digest: String,
}

/// Main Haggler application
#[derive(Clone)]
pub struct HagglerApp {
    engine: Arc<NegotiationEngine<InMemorySessionStore>>,
}

impl HagglerApp {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let engine = NegotiationEngine::new(InMemorySessionStore::new(), config)?;
        Ok(Self {
            engine: Arc::new(engine),
        })
    }

    pub fn engine(&self) -> Arc<NegotiationEngine<InMemorySessionStore>> {
        self.engine.clone()
    }

    /// Open a session and return the anchor decision
    pub fn open(&self, args: &NegotiationArgs) -> Result<Decision> {
        let start = self
            .engine
            .start_session(args.buyer_params(), args.listed, args.market_context())?;
        Ok(start.decision)
    }

    /// Play a fixed quote script until the session closes or the script ends
    pub fn simulate(&self, args: &NegotiationArgs, quotes: &[Price]) -> Result<SimulationOutput> {
        let start = self
            .engine
            .start_session(args.buyer_params(), args.listed, args.market_context())?;
        let id = start.session_id;
        let mut decisions = vec![start.decision];

        let mut remaining = quotes.iter();
        for &quote in remaining.by_ref() {
            let decision = self.engine.receive_counterparty_quote(&id, quote)?;
            let done = decision.is_final();
            decisions.push(decision);
            if done {
                break;
            }
        }
        let unused_quotes: Vec<Price> = remaining.copied().collect();
        if !unused_quotes.is_empty() {
            tracing::warn!("Session {} closed with {} quotes unused", id, unused_quotes.len());
        }

        let mut snapshot = self.engine.get_session_snapshot(&id)?;
        if snapshot.state.is_terminal() {
            snapshot = self.engine.archive_session(&id)?;
        }
        let digest = snapshot.digest()?;

        Ok(SimulationOutput {
            decisions,
            unused_quotes,
            snapshot,
            digest,
        })
    }

    /// Drive one session from JSON lines until input ends or the session closes
    ///
    /// Every decision, the opening one included, is written to `output` as a
    /// JSON line. Malformed lines and quotes the engine refuses are logged and
    /// skipped.
    pub async fn run<R, W>(&self, args: &NegotiationArgs, input: R, mut output: W) -> Result<SessionSnapshot>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let start = self
            .engine
            .start_session(args.buyer_params(), args.listed, args.market_context())?;
        let id = start.session_id;
        write_json_line(&mut output, &start.decision).await?;

        let (decision_tx, mut decision_rx) = mpsc::unbounded_channel();
        let driver = SessionDriver::new(self.engine.clone(), LastNumberExtractor, decision_tx);
        let mut lines = FramedRead::new(input, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

        'session: while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Skipping unreadable input line: {}", e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let quote: QuoteLine = match serde_json::from_str(&line) {
                Ok(quote) => quote,
                Err(e) => {
                    tracing::warn!("Skipping malformed quote line: {}", e);
                    continue;
                }
            };

            let event = InboundEvent::Quote {
                session_id: id.clone(),
                price: quote.price,
            };
            match driver.handle_event(event) {
                Ok(_) => {}
                Err(e) if e.is_rejected_quote() => {
                    tracing::warn!("Skipping rejected quote line: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            }

            while let Ok(decision) = decision_rx.try_recv() {
                write_json_line(&mut output, &decision).await?;
                if decision.is_final() {
                    break 'session;
                }
            }
        }

        let snapshot = self.engine.get_session_snapshot(&id)?;
        tracing::info!(
            "Session {} ended in {} after {} turns",
            id,
            snapshot.state,
            snapshot.turns.len()
        );
        Ok(snapshot)
    }

    pub fn config_toml(&self) -> Result<String> {
        self.engine.config().to_toml_string()
    }
}

async fn write_json_line<W, T>(output: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
