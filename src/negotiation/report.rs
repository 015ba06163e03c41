//! Read-only session views and outcome analytics

use crate::error::Result;
use crate::types::{BuyerParams, MarketContext, Price, SessionId};
use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

use super::session::NegotiationSession;
use super::types::{Actor, Outcome, SessionState, Tactic, Turn};

/// Serializable copy of a session at one point in time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub buyer_params: BuyerParams,
    pub listed_price: Price,
    pub market_context: Option<MarketContext>,
    pub state: SessionState,
    pub turns: Vec<Turn>,
    pub current_offer: Option<Price>,
    pub last_counterparty_price: Option<Price>,
    pub turn_count: u32,
    pub deadline_turn: u32,
    pub final_price: Option<Price>,
    pub outcome: Option<Outcome>,
    pub created_at: SystemTime,
    pub closed_at: Option<SystemTime>,
    pub report: SessionReport,
}

/// Analytics derived from a session's history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub buyer_turns: usize,
    pub seller_turns: usize,
    pub tactic_usage: BTreeMap<Tactic, usize>,
    /// Listed minus agreed price; negative if the deal closed above the listing
    pub savings: Option<i64>,
    pub savings_percent: Option<f64>,
    /// How much of the listed-to-target gap the deal closed, 0 to 100
    pub target_achievement_percent: Option<f64>,
    /// Same measure applied to the standing offer
    pub progress_percent: Option<f64>,
}

impl SessionReport {
    pub fn from_session(session: &NegotiationSession) -> Self {
        let turns = session.turns();
        let buyer_turns = turns.iter().filter(|t| t.actor == Actor::Buyer).count();

        let mut tactic_usage = BTreeMap::new();
        for tactic in turns.iter().flat_map(|t| t.tactics_used.iter()) {
            *tactic_usage.entry(*tactic).or_insert(0) += 1;
        }

        let listed = session.listed_price();
        let target = session.buyer_params().target_price;
        let final_price = session.final_price();
        let savings = final_price.map(|p| listed as i64 - p as i64);

        Self {
            buyer_turns,
            seller_turns: turns.len() - buyer_turns,
            tactic_usage,
            savings,
            savings_percent: savings.map(|s| s as f64 / listed as f64 * 100.0),
            target_achievement_percent: final_price.map(|p| gap_closed(listed, target, p)),
            progress_percent: session.current_offer().map(|p| gap_closed(listed, target, p)),
        }
    }
}

/// Share of the distance from `listed` down to `target` that `price` covers
fn gap_closed(listed: Price, target: Price, price: Price) -> f64 {
    if listed <= target {
        return if price <= target { 100.0 } else { 0.0 };
    }
    let covered = listed as f64 - price as f64;
    (covered / (listed - target) as f64 * 100.0).clamp(0.0, 100.0)
}

impl SessionSnapshot {
    pub fn from_session(session: &NegotiationSession) -> Self {
        Self {
            id: session.id().clone(),
            buyer_params: session.buyer_params().clone(),
            listed_price: session.listed_price(),
            market_context: session.market_context().cloned(),
            state: session.state(),
            turns: session.turns().to_vec(),
            current_offer: session.current_offer(),
            last_counterparty_price: session.last_counterparty_price(),
            turn_count: session.turn_count(),
            deadline_turn: session.deadline_turn(),
            final_price: session.final_price(),
            outcome: session.outcome().cloned(),
            created_at: session.created_at(),
            closed_at: session.closed_at(),
            report: SessionReport::from_session(session),
        }
    }

    /// Blake2b-512 digest of the JSON encoding, hex encoded
    pub fn digest(&self) -> Result<String> {
        let encoded = serde_json::to_vec(self)?;
        let mut hasher = Blake2b512::new();
        hasher.update(&encoded);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::strategy::Strategy;
    use crate::types::{Approach, Timeline};

    fn session() -> NegotiationSession {
        let params = BuyerParams::new(45000, 55000, Approach::Diplomatic, Timeline::Flexible);
        let mut session =
            NegotiationSession::new(SessionId::from("neg_report"), params, 60000, None, 12).unwrap();
        session.open(&Strategy::default()).unwrap();
        session
    }

    #[test]
    fn test_report_for_open_session() {
        let mut session = session();
        session.receive_quote(50000, &Strategy::default()).unwrap();
        let report = SessionReport::from_session(&session);

        assert_eq!(report.buyer_turns, 2);
        assert_eq!(report.seller_turns, 1);
        assert_eq!(report.tactic_usage.get(&Tactic::Anchoring), Some(&1));
        assert_eq!(report.savings, None);
        assert_eq!(report.target_achievement_percent, None);
        // Standing offer is below target
        assert_eq!(report.progress_percent, Some(100.0));
    }

    #[test]
    fn test_report_for_agreed_session() {
        let mut session = session();
        session.receive_quote(44000, &Strategy::default()).unwrap();
        let report = SessionReport::from_session(&session);

        assert_eq!(report.savings, Some(16000));
        let pct = report.savings_percent.unwrap();
        assert!((pct - 26.666).abs() < 0.01);
        assert_eq!(report.target_achievement_percent, Some(100.0));
    }

    #[test]
    fn test_gap_closed() {
        assert_eq!(gap_closed(60000, 45000, 52500), 50.0);
        assert_eq!(gap_closed(60000, 45000, 61000), 0.0);
        assert_eq!(gap_closed(60000, 45000, 40000), 100.0);
        assert_eq!(gap_closed(40000, 45000, 39000), 100.0);
        assert_eq!(gap_closed(40000, 45000, 46000), 0.0);
    }

    #[test]
    fn test_snapshot_matches_session() {
        let session = session();
        let snapshot = SessionSnapshot::from_session(&session);

        assert_eq!(snapshot.id, SessionId::from("neg_report"));
        assert_eq!(snapshot.state, SessionState::Opening);
        assert_eq!(snapshot.current_offer, Some(40500));
        assert_eq!(snapshot.turns.len(), 1);
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let mut session = session();
        let before = SessionSnapshot::from_session(&session);
        assert_eq!(before.digest().unwrap(), before.clone().digest().unwrap());
        assert_eq!(before.digest().unwrap().len(), 128);

        session.receive_quote(50000, &Strategy::default()).unwrap();
        let after = SessionSnapshot::from_session(&session);
        assert_ne!(before.digest().unwrap(), after.digest().unwrap());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = SessionSnapshot::from_session(&session());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"state\":\"OPENING\""));

        let decoded: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
