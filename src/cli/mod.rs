//! CLI module for haggler

pub mod app;
pub mod commands;

pub use app::{HagglerApp, SimulationOutput};
pub use commands::{Cli, Commands, ConfigAction, NegotiationArgs};
