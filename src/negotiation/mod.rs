//! Buyer-side negotiation: state machine, offer computation and evaluation

pub mod concession;
pub mod engine;
pub mod evaluator;
pub mod report;
pub mod session;
pub mod strategy;
pub mod tactics;
pub mod types;

pub use engine::{NegotiationEngine, SessionStart};
pub use report::{SessionReport, SessionSnapshot};
pub use session::NegotiationSession;
pub use strategy::Strategy;
pub use types::{
    AbandonReason, AcceptReason, Action, Actor, Decision, Outcome, SessionState, Tactic, Turn,
};
