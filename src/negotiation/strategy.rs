//! The three decision components, built once from the engine config

use crate::config::EngineConfig;

use super::concession::ConcessionEngine;
use super::evaluator::OfferEvaluator;
use super::tactics::TacticSelector;

#[derive(Clone, Debug)]
pub struct Strategy {
    pub concession: ConcessionEngine,
    pub evaluator: OfferEvaluator,
    pub tactics: TacticSelector,
}

impl Strategy {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            concession: ConcessionEngine::new(config),
            evaluator: OfferEvaluator::new(config),
            tactics: TacticSelector::new(config),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
