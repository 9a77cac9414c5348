//! McAfee's trade-reduction mechanism, the classic baseline for the
//! ascending auctions. It may leave the auctioneer with a surplus.

use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::recipes::check_recipe;
use crate::trade::{Termination, Trade, TradeWithSinglePrice};
use crate::types::{Price, Value};

/// Whether every agent of `ps` accepts `price`: buyers (non-negative values)
/// pay at most their value, sellers receive at least their cost.
pub fn is_price_good_for_ps(price: Price, ps: &[Value]) -> bool {
    ps.iter().all(|&value| {
        let buyer_accepts = value < 0.0 || price <= value;
        let seller_accepts = value > 0.0 || -price <= value;
        buyer_accepts && seller_accepts
    })
}

/// Trade reduction for a recipe of ones.
///
/// Takes the optimal trade and, when `price_heuristic` is set, tries the
/// mean absolute value of the first excluded procurement set as a common
/// price. If every agent of the weakest optimal set accepts it, all optimal
/// sets trade at that price. Otherwise the weakest set is dropped and its
/// values become the prices of the others.
///
/// ```
/// use auction_core::{AgentCategory, Market, Trade, mcafee_trade_reduction};
///
/// let market = Market::new(vec![
///     AgentCategory::new("buyer", vec![9.0, 8.0]),
///     AgentCategory::new("seller", vec![-4.0, -3.0]),
/// ]);
/// let trade = mcafee_trade_reduction(&market, &[1, 1], true).unwrap();
/// assert_eq!(trade.num_of_deals(), 1);
/// assert_eq!(trade.prices(), &[Some(8.0), Some(-4.0)]);
/// ```
pub fn mcafee_trade_reduction(
    market: &Market,
    recipe: &[usize],
    price_heuristic: bool,
) -> AuctionResult<TradeWithSinglePrice> {
    check_recipe(market.num_categories(), recipe)?;
    if recipe.iter().any(|&count| count != 1) {
        return Err(AuctionError::NonUnitRecipe {
            recipe: recipe.to_vec(),
        });
    }

    let (optimal, remaining) = market.optimal_trade(recipe, usize::MAX)?;
    let mut traders = market.empty_like();

    let Some((last_positive, others)) = optimal.procurement_sets().split_first() else {
        return Ok(TradeWithSinglePrice::new(
            traders.into_categories(),
            recipe.to_vec(),
            vec![None; recipe.len()],
            Termination::TradeReduction,
        ));
    };

    // A drained category leaves no first negative set, and no candidate price.
    let candidate = if price_heuristic {
        remaining
            .get_highest_agents(recipe)?
            .map(|first_negative| {
                first_negative.iter().map(|v| v.abs()).sum::<f64>() / first_negative.len() as f64
            })
            .filter(|&price| is_price_good_for_ps(price, last_positive))
    } else {
        None
    };

    let (prices, trading_sets): (Vec<Option<Price>>, &[Vec<Value>]) = match candidate {
        Some(price) => (
            last_positive
                .iter()
                .map(|&v| Some(if v < 0.0 { -price } else { price }))
                .collect(),
            optimal.procurement_sets(),
        ),
        None => (last_positive.iter().map(|&v| Some(v)).collect(), others),
    };

    for ps in trading_sets {
        for (category, &value) in ps.iter().enumerate() {
            traders.category_mut(category)?.append(value);
        }
    }
    let trade = TradeWithSinglePrice::new(
        traders.into_categories(),
        recipe.to_vec(),
        prices,
        Termination::TradeReduction,
    );
    Ok(if trade.num_of_deals() == 0 {
        TradeWithSinglePrice::new(
            trade.categories().to_vec(),
            recipe.to_vec(),
            vec![None; recipe.len()],
            Termination::TradeReduction,
        )
    } else {
        trade
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentCategory;

    #[test]
    fn price_goodness() {
        assert!(is_price_good_for_ps(5.0, &[9.0, -3.0]));
        assert!(!is_price_good_for_ps(10.0, &[9.0, -3.0]));
        assert!(!is_price_good_for_ps(2.0, &[9.0, -3.0]));
    }

    #[test]
    fn heuristic_price_keeps_all_optimal_sets() {
        let market = Market::new(vec![
            AgentCategory::new("seller", vec![-8.0, -3.0]),
            AgentCategory::new("buyer", vec![9.0, 4.0]),
        ]);
        let trade = mcafee_trade_reduction(&market, &[1, 1], true).unwrap();
        assert_eq!(trade.num_of_deals(), 1);
        assert_eq!(trade.prices(), &[Some(-6.0), Some(6.0)]);
        assert_eq!(
            trade.to_string(),
            "seller: [-3]: all 1 agents trade and pay -6\nbuyer: [9]: all 1 agents trade and pay 6"
        );
    }

    #[test]
    fn without_heuristic_the_weakest_set_is_dropped() {
        let market = Market::new(vec![
            AgentCategory::new("seller", vec![-8.0, -3.0]),
            AgentCategory::new("buyer", vec![9.0, 4.0]),
        ]);
        let trade = mcafee_trade_reduction(&market, &[1, 1], false).unwrap();
        assert_eq!(trade.num_of_deals(), 0);
        assert_eq!(trade.to_string(), "No trade");
    }

    #[test]
    fn no_positive_set_means_no_trade() {
        let market = Market::new(vec![
            AgentCategory::new("buyer", vec![3.0]),
            AgentCategory::new("seller", vec![-4.0]),
        ]);
        let trade = mcafee_trade_reduction(&market, &[1, 1], true).unwrap();
        assert_eq!(trade.num_of_deals(), 0);
        assert_eq!(trade.prices(), &[None, None]);
        assert_eq!(trade.gain_from_trade(true), 0.0);
    }

    #[test]
    fn only_recipes_of_ones() {
        let market = Market::new(vec![
            AgentCategory::new("buyer", vec![9.0]),
            AgentCategory::new("seller", vec![-4.0, -3.0]),
        ]);
        assert!(matches!(
            mcafee_trade_reduction(&market, &[1, 2], true),
            Err(AuctionError::NonUnitRecipe { .. })
        ));
    }
}
