//! CLI command definitions

use crate::types::{Approach, BuyerParams, MarketContext, Price, Timeline, Trend};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "haggler")]
#[command(about = "Haggler - buyer-side negotiation decision engine", long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "HAGGLER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the opening offer for a listing
    Open {
        #[command(flatten)]
        negotiation: NegotiationArgs,
    },

    /// Run a scripted session against a list of seller quotes
    Simulate {
        #[command(flatten)]
        negotiation: NegotiationArgs,

        /// Seller quotes in order, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        quotes: Vec<Price>,
    },

    /// Drive one session from JSON lines on stdin
    Run {
        #[command(flatten)]
        negotiation: NegotiationArgs,
    },

    /// Inspect the engine configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

/// Buyer parameters and listing shared by the session commands
#[derive(Args, Debug, Clone)]
pub struct NegotiationArgs {
    /// Price the buyer hopes to pay
    #[arg(short, long)]
    pub target: Price,

    /// Hard ceiling the buyer will pay
    #[arg(short, long)]
    pub max_budget: Price,

    /// Seller's listed price
    #[arg(short, long)]
    pub listed: Price,

    /// assertive, diplomatic or considerate
    #[arg(short, long, default_value = "diplomatic")]
    pub approach: Approach,

    /// urgent, week or flexible
    #[arg(long, default_value = "week")]
    pub timeline: Timeline,

    /// Free-form requirements recorded with the buyer parameters
    #[arg(long)]
    pub requirements: Option<String>,

    /// Average price of comparable listings
    #[arg(long, requires_all = ["market_min", "market_max"])]
    pub market_average: Option<Price>,

    #[arg(long, requires = "market_average")]
    pub market_min: Option<Price>,

    #[arg(long, requires = "market_average")]
    pub market_max: Option<Price>,

    /// rising, stable or falling
    #[arg(long, default_value = "stable")]
    pub market_trend: Trend,
}

impl NegotiationArgs {
    pub fn buyer_params(&self) -> BuyerParams {
        let params = BuyerParams::new(self.target, self.max_budget, self.approach, self.timeline);
        match &self.requirements {
            Some(req) => params.with_requirements(req.clone()),
            None => params,
        }
    }

    pub fn market_context(&self) -> Option<MarketContext> {
        match (self.market_average, self.market_min, self.market_max) {
            (Some(avg), Some(min), Some(max)) => {
                Some(MarketContext::new(avg, min, max, self.market_trend))
            }
            _ => None,
        }
    }
}
