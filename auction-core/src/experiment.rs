//! Simulation experiments: the efficiency of a mechanism against the optimal
//! trade on random markets, in the manner of McAfee (1992), Table I.
//!
//! Each row of results is also emitted as a `tracing` event under target
//! `experiment`, so an `instrument::DataFrameSubscriber` can collect the
//! rows into a table.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::agents::AgentCategory;
use crate::auction::ascending_auction;
use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::mcafee::mcafee_trade_reduction;
use crate::recipes::check_recipe;
use crate::trade::{Trade, TradeWithSinglePrice};
use crate::types::{Recipe, Value};

// === CONFIG ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub recipe: Recipe,
    /// `(low, high)` per category; agent values are uniform in that range.
    pub value_ranges: Vec<(Value, Value)>,
    /// Agents per unit of recipe: category `c` gets `n * recipe[c]` agents.
    pub nums_of_agents: Vec<usize>,
    pub num_of_iterations: usize,
    pub seed: u64,
    /// Cap on procurement sets taken by the optimal-trade benchmark.
    pub max_optimal_iterations: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            recipe: vec![1, 1],
            value_ranges: vec![(1.0, 1000.0), (-1000.0, -1.0)],
            nums_of_agents: vec![100, 1000],
            num_of_iterations: 50,
            seed: 42,
            max_optimal_iterations: 1_000_000,
        }
    }
}

impl ExperimentConfig {
    /// Parse a JSON config; missing fields take their default values.
    pub fn from_json(text: &str) -> AuctionResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| AuctionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AuctionResult<()> {
        check_recipe(self.recipe.len(), &self.recipe)?;
        if self.value_ranges.len() != self.recipe.len() {
            return Err(AuctionError::Config(format!(
                "{} value ranges for a recipe of {} categories",
                self.value_ranges.len(),
                self.recipe.len()
            )));
        }
        if self.num_of_iterations == 0 {
            return Err(AuctionError::Config("num_of_iterations must be positive".to_string()));
        }
        Ok(())
    }

    /// The recipe as shown in result tables, e.g. `1:1:1`.
    pub fn recipe_label(&self) -> String {
        let parts: Vec<String> = self.recipe.iter().map(|r| r.to_string()).collect();
        parts.join(":")
    }
}

/// Mechanisms that can be compared in an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mechanism", rename_all = "snake_case")]
pub enum Mechanism {
    AscendingAuction,
    McAfee { price_heuristic: bool },
}

impl Mechanism {
    pub fn name(self) -> &'static str {
        match self {
            Mechanism::AscendingAuction => "SBB Ascending Prices",
            Mechanism::McAfee { .. } => "McAfee",
        }
    }

    pub fn run(self, market: &Market, recipe: &[usize]) -> AuctionResult<TradeWithSinglePrice> {
        match self {
            Mechanism::AscendingAuction => ascending_auction(market, recipe),
            Mechanism::McAfee { price_heuristic } => mcafee_trade_reduction(market, recipe, price_heuristic),
        }
    }
}

// === RESULTS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRow {
    pub auction_name: String,
    pub recipe: String,
    pub num_of_agents: usize,
    pub mean_optimal_count: f64,
    pub mean_auction_count: f64,
    /// Percentage of optimal deals done, truncated to two decimals.
    pub count_ratio: f64,
    pub mean_optimal_gft: f64,
    pub mean_auction_gft: f64,
    /// Percentage of optimal GFT achieved, rounded to two decimals.
    pub gft_ratio: f64,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Run `mechanism` on `num_of_iterations` random markets for every entry of
/// `nums_of_agents`, returning one row per agent count.
pub fn run_experiment(config: &ExperimentConfig, mechanism: Mechanism) -> AuctionResult<Vec<ExperimentRow>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let iterations = config.num_of_iterations as f64;
    let recipe_label = config.recipe_label();

    let mut rows = Vec::with_capacity(config.nums_of_agents.len());
    for &num_of_agents in &config.nums_of_agents {
        let (mut optimal_count, mut auction_count) = (0usize, 0usize);
        let (mut optimal_gft, mut auction_gft) = (0.0, 0.0);

        for _ in 0..config.num_of_iterations {
            let categories = config
                .recipe
                .iter()
                .zip(&config.value_ranges)
                .map(|(&count, &(low, high))| {
                    AgentCategory::uniformly_random("agent", num_of_agents * count, low, high, &mut rng)
                })
                .collect();
            let market = Market::new(categories);

            let (optimal, _) = market.optimal_trade(&config.recipe, config.max_optimal_iterations)?;
            let trade = mechanism.run(&market, &config.recipe)?;

            optimal_count += optimal.num_of_deals();
            auction_count += trade.num_of_deals();
            optimal_gft += optimal.gain_from_trade(true);
            auction_gft += trade.gain_from_trade(true);
        }

        let row = ExperimentRow {
            auction_name: mechanism.name().to_string(),
            recipe: recipe_label.clone(),
            num_of_agents,
            mean_optimal_count: round2(optimal_count as f64 / iterations),
            mean_auction_count: round2(auction_count as f64 / iterations),
            count_ratio: if optimal_count == 0 {
                0.0
            } else {
                (auction_count as f64 / optimal_count as f64 * 10000.0).trunc() / 100.0
            },
            mean_optimal_gft: round2(optimal_gft / iterations),
            mean_auction_gft: round2(auction_gft / iterations),
            gft_ratio: if optimal_gft == 0.0 {
                0.0
            } else {
                round2(auction_gft / optimal_gft * 100.0)
            },
        };

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "experiment",
            auction_name = row.auction_name.as_str(),
            recipe = row.recipe.as_str(),
            num_of_agents = row.num_of_agents as u64,
            mean_optimal_count = row.mean_optimal_count,
            mean_auction_count = row.mean_auction_count,
            count_ratio = row.count_ratio,
            mean_optimal_gft = row.mean_optimal_gft,
            mean_auction_gft = row.mean_auction_gft,
            gft_ratio = row.gft_ratio,
        );

        rows.push(row);
    }
    Ok(rows)
}

/// Run every mechanism and write the collected rows to `{dir}/experiment.csv`.
#[cfg(feature = "instrument")]
pub fn write_experiment_csv(
    config: &ExperimentConfig,
    mechanisms: &[Mechanism],
    dir: &std::path::Path,
) -> AuctionResult<Vec<ExperimentRow>> {
    let (rows, recorder) = tracing::subscriber::with_default(instrument::DataFrameSubscriber, || {
        instrument::clear();
        let rows = mechanisms
            .iter()
            .map(|&mechanism| run_experiment(config, mechanism))
            .collect::<AuctionResult<Vec<_>>>();
        (rows, instrument::drain())
    });
    let rows: Vec<ExperimentRow> = rows?.into_iter().flatten().collect();

    let table = recorder
        .table("experiment")
        .ok_or_else(|| AuctionError::Report("no experiment rows were recorded".to_string()))?;
    let df = table.to_dataframe().map_err(|e| AuctionError::Report(e.to_string()))?;
    let mut dfs = std::collections::HashMap::from([("experiment".to_string(), df)]);
    instrument::save_csv(&mut dfs, dir).map_err(|e| AuctionError::Report(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recipe_label(), "1:1");
    }

    #[test]
    fn json_overrides_defaults() {
        let config = ExperimentConfig::from_json(
            r#"{"recipe": [1, 1, 1], "value_ranges": [[1, 2000], [-1000, -1], [-1000, -1]], "num_of_iterations": 3}"#,
        )
        .unwrap();
        assert_eq!(config.recipe_label(), "1:1:1");
        assert_eq!(config.num_of_iterations, 3);
        assert_eq!(config.nums_of_agents, vec![100, 1000]);
    }

    #[test]
    fn mismatched_value_ranges_are_rejected() {
        let result = ExperimentConfig::from_json(r#"{"recipe": [1, 1, 1]}"#);
        assert!(matches!(result, Err(AuctionError::Config(_))));
        assert!(matches!(
            ExperimentConfig::from_json("not json"),
            Err(AuctionError::Config(_))
        ));
    }

    #[test]
    fn mechanism_serializes_with_tag() {
        let json = serde_json::to_string(&Mechanism::McAfee { price_heuristic: true }).unwrap();
        assert_eq!(json, r#"{"mechanism":"mc_afee","price_heuristic":true}"#);
        let back: Mechanism = serde_json::from_str(r#"{"mechanism":"ascending_auction"}"#).unwrap();
        assert_eq!(back, Mechanism::AscendingAuction);
    }

    #[test]
    fn ratios_are_rounded() {
        assert_eq!(round2(87.456), 87.46);
        assert_eq!(round2(-0.004), -0.0);
    }
}
