//! Efficiency experiments on random markets, collected through the
//! DataFrame subscriber.

#![cfg(feature = "instrument")]

use auction_core::instrument::{self, DataFrameSubscriber};
use auction_core::{ExperimentConfig, ExperimentRow, Mechanism, run_experiment, write_experiment_csv};
use polars::prelude::DataFrame;
use tracing::subscriber::with_default;

// === TEST FIXTURES ===

fn small_config() -> ExperimentConfig {
    ExperimentConfig {
        nums_of_agents: vec![10, 40],
        num_of_iterations: 8,
        seed: 7,
        ..ExperimentConfig::default()
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().into_iter().map(|n| n.to_string()).collect()
}

/// Each run loses at most one deal, so the means differ by at most one
/// (plus rounding).
fn assert_near_optimal(row: &ExperimentRow) {
    assert!(row.mean_auction_count <= row.mean_optimal_count + 0.01, "{row:?}");
    assert!(row.mean_auction_count >= row.mean_optimal_count - 1.01, "{row:?}");
    assert!(row.count_ratio <= 100.0, "{row:?}");
    assert!(row.gft_ratio <= 100.0 + 1e-9, "{row:?}");
    assert!(row.mean_auction_gft >= 0.0, "{row:?}");
}

// === MECHANISMS ===

#[test]
fn ascending_auction_is_near_optimal() {
    let rows = run_experiment(&small_config(), Mechanism::AscendingAuction).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.auction_name, "SBB Ascending Prices");
        assert_eq!(row.recipe, "1:1");
        assert_near_optimal(row);
    }
    assert_eq!(rows[0].num_of_agents, 10);
    assert_eq!(rows[1].num_of_agents, 40);
    // More agents, more deals
    assert!(rows[1].mean_optimal_count > rows[0].mean_optimal_count);
}

#[test]
fn mcafee_is_near_optimal() {
    for price_heuristic in [false, true] {
        let rows = run_experiment(&small_config(), Mechanism::McAfee { price_heuristic }).unwrap();
        for row in &rows {
            assert_eq!(row.auction_name, "McAfee");
            assert_near_optimal(row);
        }
    }
}

#[test]
fn three_category_recipe() {
    let config = ExperimentConfig {
        recipe: vec![1, 1, 1],
        value_ranges: vec![(1.0, 2000.0), (-1000.0, -1.0), (-1000.0, -1.0)],
        nums_of_agents: vec![20],
        num_of_iterations: 5,
        ..ExperimentConfig::default()
    };
    let rows = run_experiment(&config, Mechanism::AscendingAuction).unwrap();
    assert_eq!(rows[0].recipe, "1:1:1");
    assert_near_optimal(&rows[0]);
}

#[test]
fn same_seed_same_rows() {
    let a = run_experiment(&small_config(), Mechanism::AscendingAuction).unwrap();
    let b = run_experiment(&small_config(), Mechanism::AscendingAuction).unwrap();
    assert_eq!(a, b);
}

// === REPORTING ===

#[test]
fn rows_are_recorded_as_a_dataframe() {
    instrument::clear();
    let rows = with_default(DataFrameSubscriber, || {
        run_experiment(&small_config(), Mechanism::AscendingAuction).unwrap()
    });
    let dfs = instrument::drain_to_dataframes().unwrap();
    let df = &dfs["experiment"];

    assert_eq!(df.height(), rows.len());
    assert_eq!(
        column_names(df),
        vec![
            "auction_name",
            "recipe",
            "num_of_agents",
            "mean_optimal_count",
            "mean_auction_count",
            "count_ratio",
            "mean_optimal_gft",
            "mean_auction_gft",
            "gft_ratio",
        ]
    );
}

#[test]
fn csv_has_one_line_per_row() {
    let dir = std::env::temp_dir().join(format!("auction_experiment_{}", std::process::id()));
    let mechanisms = [Mechanism::AscendingAuction, Mechanism::McAfee { price_heuristic: true }];
    let rows = write_experiment_csv(&small_config(), &mechanisms, &dir).unwrap();
    assert_eq!(rows.len(), 4);

    let text = std::fs::read_to_string(dir.join("experiment.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("auction_name,recipe,num_of_agents"), "{text}");
    assert_eq!(lines.len(), 1 + rows.len());
    assert!(lines[1].starts_with("SBB Ascending Prices,1:1,10,"), "{text}");
    let _ = std::fs::remove_dir_all(&dir);
}
