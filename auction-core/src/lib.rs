//! Strongly budget-balanced ascending auctions for markets with recipes.
//!
//! A market is a list of agent categories; a recipe says how many agents of
//! each category make one procurement set (a deal). The auctions raise
//! category prices until the weighted price sum of the recipes reaches zero,
//! so the auctioneer neither pays nor keeps money.

mod agents;
mod config;
mod error;
mod market;
mod mcafee;
mod observer;
mod recipe_tree;
mod recipes;
mod trade;
mod types;

pub mod auction;
pub mod experiment;
pub mod prices;

pub use agents::*;
pub use config::*;
pub use error::*;
pub use market::*;
pub use mcafee::*;
pub use observer::*;
pub use recipe_tree::*;
pub use recipes::*;
pub use trade::*;
pub use types::*;

pub use auction::{
    ascending_auction, ascending_auction_multi, ascending_auction_multi_with, ascending_auction_tree,
    ascending_auction_tree_with, ascending_auction_two_levels, ascending_auction_two_levels_with,
    ascending_auction_with,
};
pub use experiment::{ExperimentConfig, ExperimentRow, Mechanism, run_experiment};

#[cfg(feature = "instrument")]
pub use experiment::write_experiment_csv;
#[cfg(feature = "instrument")]
pub use instrument;
