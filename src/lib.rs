//! Haggler: buyer-side negotiation decision engine
//!
//! Given a buyer's target price, budget ceiling, negotiation approach and
//! timeline, the engine opens with an anchor offer and answers each seller
//! quote with a counter offer, an acceptance or a walk-away.
//!
//! - [`negotiation`]: session state machine, concession schedule, quote
//!   evaluation and tactic selection
//! - [`store`]: session storage behind a trait
//! - [`driver`]: async glue to quote extraction and decision delivery
//! - [`cli`]: the `haggler` command line

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod negotiation;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{NegotiationError, Result};
pub use negotiation::{Decision, NegotiationEngine, SessionSnapshot, SessionStart};
pub use types::{Approach, BuyerParams, MarketContext, Price, SessionId, Timeline, Trend};
