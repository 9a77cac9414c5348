//! Randomized checks of the guarantees every auction gives.

use auction_core::{
    AgentCategory, Market, RecipeTree, Trade, ascending_auction, ascending_auction_tree, mcafee_trade_reduction,
};
use proptest::prelude::*;

// === TEST FIXTURES ===

const EPS: f64 = 1e-6;

/// Buyer values are 1 modulo 8 and seller values multiples of 8, so a
/// procurement set with one to three buyers never has a gain-from-trade of
/// exactly zero.
fn buyers() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::btree_set(0i32..100, 0..8).prop_map(|s| s.into_iter().map(|v| f64::from(8 * v + 1)).collect())
}

fn sellers() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::btree_set(1i32..100, 0..8).prop_map(|s| s.into_iter().map(|v| f64::from(-8 * v)).collect())
}

/// Counts of 0 to 3 for 2 to 4 categories, at least one of them positive.
fn recipes() -> impl Strategy<Value = Vec<usize>> {
    (2usize..=4).prop_flat_map(|n| {
        prop::collection::vec(0usize..=3, n).prop_filter("recipe requires nobody", |r| r.iter().any(|&c| c > 0))
    })
}

/// A buyer category followed by seller categories, one per recipe entry.
fn market_for(recipe: Vec<usize>) -> impl Strategy<Value = (Market, Vec<usize>)> {
    let sellers = prop::collection::vec(sellers(), recipe.len() - 1);
    (buyers(), sellers).prop_map(move |(b, s)| {
        let mut categories = vec![AgentCategory::new("buyer", b)];
        categories.extend(s.into_iter().enumerate().map(|(i, values)| AgentCategory::new(format!("seller{i}"), values)));
        (Market::new(categories), recipe.clone())
    })
}

fn market(categories: Vec<(&str, Vec<f64>)>) -> Market {
    Market::new(
        categories
            .into_iter()
            .map(|(name, values)| AgentCategory::new(name, values))
            .collect(),
    )
}

fn optimal_deals(market: &Market, recipe: &[usize]) -> usize {
    let (optimal, _) = market.optimal_trade(recipe, usize::MAX).unwrap();
    optimal.num_of_deals()
}

proptest! {
    // === SINGLE RECIPE ===

    #[test]
    fn loses_at_most_one_deal((market, recipe) in recipes().prop_flat_map(market_for)) {
        let optimal = optimal_deals(&market, &recipe);
        let trade = ascending_auction(&market, &recipe).unwrap();
        let deals = trade.num_of_deals();
        prop_assert!(deals <= optimal, "{market}: {deals} > {optimal}");
        prop_assert!(deals + 1 >= optimal, "{market}: {deals} vs {optimal}");
    }

    #[test]
    fn trade_prices_sum_to_zero(b in buyers(), s in sellers()) {
        let market = market(vec![("buyer", b), ("seller", s)]);
        let recipe = [1, 2];
        let trade = ascending_auction(&market, &recipe).unwrap();
        if trade.termination().is_trade() {
            let sum: f64 = recipe
                .iter()
                .zip(trade.prices())
                .map(|(&count, price)| count as f64 * price.unwrap_or(0.0))
                .sum();
            prop_assert!(sum.abs() < EPS, "{market}: {:?}", trade.prices());
            prop_assert!((trade.gain_from_trade(true) - trade.gain_from_trade(false)).abs() < EPS);
        }
    }

    #[test]
    fn remaining_agents_accept_their_price(b in buyers(), m in sellers(), s in sellers()) {
        let market = market(vec![("buyer", b), ("mediator", m), ("seller", s)]);
        let trade = ascending_auction(&market, &[1, 1, 1]).unwrap();
        for (category, price) in trade.categories().iter().zip(trade.prices()) {
            let Some(price) = price else { continue };
            for &value in category.values() {
                prop_assert!(value >= price - EPS, "{} at {price}", category);
            }
        }
    }

    #[test]
    fn input_market_is_not_mutated(b in buyers(), s in sellers()) {
        let market = market(vec![("buyer", b), ("seller", s)]);
        let before = market.clone();
        ascending_auction(&market, &[1, 1]).unwrap();
        mcafee_trade_reduction(&market, &[1, 1], true).unwrap();
        prop_assert_eq!(market, before);
    }

    // === CATEGORIES ===

    #[test]
    fn values_stay_sorted(initial in prop::collection::vec(-50i32..50, 0..10), added in prop::collection::vec(-50i32..50, 0..10)) {
        let mut category = AgentCategory::new("agent", initial.iter().map(|&v| f64::from(v)).collect::<Vec<_>>());
        let (first, rest) = added.split_at(added.len() / 2);
        for &v in first {
            category.append(f64::from(v));
        }
        category.extend(rest.iter().map(|&v| f64::from(v)));
        prop_assert_eq!(category.size(), initial.len() + added.len());
        prop_assert!(category.values().windows(2).all(|w| w[0] >= w[1]), "{}", category);
    }

    // === RECIPE TREES ===

    #[test]
    fn tree_never_beats_the_optimum(b in buyers(), sa in sellers(), sb in sellers()) {
        let market = market(vec![("buyer", b), ("sellerA", sa), ("sellerB", sb)]);
        let tree = RecipeTree::from_json("[0, [1, null, 2, null]]", 3).unwrap();
        let (optimal, _) = tree.optimal_trade(&market).unwrap();
        let trade = ascending_auction_tree(&market, &tree).unwrap();
        prop_assert!(trade.num_of_deals() <= optimal.len(), "{market}");
    }

    // === MCAFEE ===

    #[test]
    fn mcafee_loses_at_most_one_deal(b in buyers(), s in sellers(), heuristic in any::<bool>()) {
        let market = market(vec![("buyer", b), ("seller", s)]);
        let optimal = optimal_deals(&market, &[1, 1]);
        let trade = mcafee_trade_reduction(&market, &[1, 1], heuristic).unwrap();
        prop_assert!(trade.num_of_deals() <= optimal);
        prop_assert!(trade.num_of_deals() + 1 >= optimal);
        // The auctioneer never loses money
        prop_assert!(trade.gain_from_trade(true) >= trade.gain_from_trade(false) - EPS);
    }
}
