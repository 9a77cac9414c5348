//! Auction runs logged through `tracing` and collected as tables.

#![cfg(feature = "instrument")]

use auction_core::instrument::{self, DataFrameSubscriber, TypedColumn};
use auction_core::{
    AgentCategory, AuctionConfig, Market, StepEvent, TracingObserver, ascending_auction_with,
    ascending_auction_multi_with,
};
use tracing::subscriber::with_default;

// === TEST FIXTURES ===

fn buyer_seller() -> Market {
    Market::new(vec![
        AgentCategory::new("buyer", vec![9.0, 8.0]),
        AgentCategory::new("seller", vec![-4.0, -3.0]),
    ])
}

fn observed_kinds(market: &Market) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    let mut on_step = |event: &StepEvent| kinds.push(event.kind());
    let mut config = AuctionConfig::default().with_observer(&mut on_step);
    ascending_auction_with(market, &[1, 1], &mut config).unwrap();
    drop(config);
    kinds
}

// === STEP TABLE ===

#[test]
fn every_step_becomes_a_row() {
    let market = buyer_seller();
    let expected = observed_kinds(&market);

    instrument::clear();
    let recorder = with_default(DataFrameSubscriber, || {
        let mut observer = TracingObserver;
        let mut config = AuctionConfig::default().with_observer(&mut observer);
        ascending_auction_with(&market, &[1, 1], &mut config).unwrap();
        instrument::drain()
    });

    let table = recorder.table("auction_step").unwrap();
    assert_eq!(table.row_count, expected.len());
    match table.column("kind") {
        Some(TypedColumn::Str(kinds)) => assert_eq!(kinds, &expected),
        other => panic!("kind should be a string column, got {other:?}"),
    }
    match table.column("price") {
        Some(TypedColumn::F64(prices)) => assert!(prices.iter().any(|&p| p == -8.0), "{prices:?}"),
        other => panic!("price should be a float column, got {other:?}"),
    }
}

#[test]
fn multi_recipe_run_converts_to_a_dataframe() {
    let market = Market::new(vec![
        AgentCategory::new("buyer", vec![9.0, 8.0]),
        AgentCategory::new("sellerA", vec![-4.0]),
        AgentCategory::new("sellerB", vec![-3.0]),
    ]);
    instrument::clear();
    let dfs = with_default(DataFrameSubscriber, || {
        let mut observer = TracingObserver;
        let mut config = AuctionConfig::default().with_observer(&mut observer);
        ascending_auction_multi_with(&market, &[vec![1, 1, 0], vec![1, 0, 1]], &mut config).unwrap();
        instrument::drain_to_dataframes().unwrap()
    });

    let df = &dfs["auction_step"];
    assert!(df.height() > 2);
    let names: Vec<String> = df.get_column_names().into_iter().map(|n| n.to_string()).collect();
    assert_eq!(&names[..2], &["step", "kind"]);
}
