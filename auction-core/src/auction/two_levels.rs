use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::observer::StepEvent;
use crate::prices::{PlannedIncrease, PriceStatus, SimultaneousAscendingPriceVectors};
use crate::trade::{Termination, TradeWithMaterialBalance};
use crate::types::{CategoryIndex, MAX_VALUE, Recipe};

use super::remove_priced_out;

// === TWO-LEVEL RECIPE TREE ===

/// Ascending auction for a root category with several alternative children,
/// each with its own integer count per deal.
///
/// `counts[0]` agents of category 0 trade with `counts[j]` agents of any one
/// child category `j`. The root price rises only while the root supports
/// strictly more deals than all children together
/// (`size_0 / counts[0] > Σ floor(size_j / counts[j])`); otherwise every child
/// price rises at once, and an empty child bids its price straight to
/// `MAX_VALUE` so the other children decide the bound.
///
/// ```
/// use auction_core::{AgentCategory, Market, Trade, ascending_auction_two_levels};
///
/// let market = Market::new(vec![
///     AgentCategory::new("buyer", vec![9.0, 8.0]),
///     AgentCategory::new("seller", vec![-4.0, -3.0]),
/// ]);
/// let trade = ascending_auction_two_levels(&market, &[1, 1]).unwrap();
/// assert_eq!(trade.num_of_deals(), 1);
/// assert_eq!(trade.to_string(), "seller: 1 potential deals, price=-4\n\
///     buyer: 1 out of 2 traders selected, price=4\n\
///     seller: all 1 traders selected\n\
///     1 deals overall");
/// ```
pub fn ascending_auction_two_levels(
    market: &Market,
    counts: &[usize],
) -> AuctionResult<TradeWithMaterialBalance> {
    ascending_auction_two_levels_with(market, counts, &mut AuctionConfig::default())
}

pub fn ascending_auction_two_levels_with(
    market: &Market,
    counts: &[usize],
    config: &mut AuctionConfig<'_>,
) -> AuctionResult<TradeWithMaterialBalance> {
    let num_categories = market.num_categories();
    if counts.len() != num_categories {
        return Err(AuctionError::RecipeLength {
            categories: num_categories,
            recipe: counts.len(),
        });
    }
    if num_categories < 2 || counts.contains(&0) {
        return Err(AuctionError::RecipeWithoutAgents {
            recipe: counts.to_vec(),
        });
    }

    let recipes = two_level_recipes(counts);
    config.emit(StepEvent::Start {
        mechanism: "ascending_auction_two_levels",
        market: market.to_string(),
        recipes: recipes.clone(),
    });

    let root_count = counts[0];
    let children: Vec<CategoryIndex> = (1..num_categories).collect();
    let mut remaining = market.clone();
    let mut prices = SimultaneousAscendingPriceVectors::new(&recipes, -MAX_VALUE, config.initializer())?;

    let mut step = 0;
    loop {
        step += 1;
        let root_size = remaining.categories()[0].size();
        let children_supported: usize = children
            .iter()
            .map(|&j| remaining.categories()[j].size() / counts[j])
            .sum();

        // root_size / root_count > children_supported, in integers
        let raise_root = root_size > children_supported * root_count;
        let raised: Vec<CategoryIndex> = if raise_root { vec![0] } else { children.clone() };
        config.emit(StepEvent::Selected {
            step,
            categories: raised.clone(),
            size: root_size / root_count,
            compared_size: children_supported,
        });

        let planned: Vec<PlannedIncrease> = if raise_root {
            let root = &remaining.categories()[0];
            let target = root.lowest_agent_value().unwrap_or(MAX_VALUE);
            vec![PlannedIncrease::new(0, target, root.name()); recipes.len()]
        } else {
            children
                .iter()
                .map(|&j| {
                    let child = &remaining.categories()[j];
                    let target = child.lowest_agent_value().unwrap_or(MAX_VALUE);
                    PlannedIncrease::new(j, target, child.name())
                })
                .collect()
        };

        for increase in prices.increase_prices(&planned)? {
            config.emit(StepEvent::PriceIncreased { step, increase });
        }
        let current = prices.map_category_index_to_price()?;

        if prices.status() == Some(PriceStatus::StoppedAtZeroSum) {
            config.emit(StepEvent::ZeroSum {
                step,
                prices: current.clone(),
            });
            return Ok(TradeWithMaterialBalance::new(
                remaining.into_categories(),
                counts.to_vec(),
                current,
                Termination::ZeroSum,
            ));
        }

        // Only the raised categories can have agents priced out
        remove_priced_out(&mut remaining, &current, raised, step, config)?;
    }
}

/// One recipe per child: `[counts[0], 0, .., counts[j], .., 0]`.
fn two_level_recipes(counts: &[usize]) -> Vec<Recipe> {
    (1..counts.len())
        .map(|j| {
            let mut recipe = vec![0; counts.len()];
            recipe[0] = counts[0];
            recipe[j] = counts[j];
            recipe
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentCategory;
    use crate::trade::Trade;

    fn market(categories: &[(&str, &[f64])]) -> Market {
        Market::new(
            categories
                .iter()
                .map(|(name, values)| AgentCategory::new(*name, values.to_vec()))
                .collect(),
        )
    }

    #[test]
    fn recipes_pair_root_with_each_child() {
        assert_eq!(
            two_level_recipes(&[2, 1, 3]),
            vec![vec![2, 1, 0], vec![2, 0, 3]]
        );
    }

    #[test]
    fn single_buyer_single_seller_is_no_trade() {
        let m = market(&[("buyer", &[9.0]), ("seller", &[-4.0])]);
        let trade = ascending_auction_two_levels(&m, &[1, 1]).unwrap();
        assert_eq!(trade.num_of_deals(), 0);
        assert_eq!(trade.to_string(), "No trade");
    }

    #[test]
    fn extra_buyer_lets_one_deal_through() {
        let m = market(&[("buyer", &[9.0, 8.0]), ("seller", &[-4.0])]);
        let trade = ascending_auction_two_levels(&m, &[1, 1]).unwrap();
        assert_eq!(trade.num_of_deals(), 1);
        assert!((trade.price(0).unwrap() - 8.0).abs() < 1e-6);
        assert!((trade.price(1).unwrap() + 8.0).abs() < 1e-6);
    }

    #[test]
    fn zero_counts_are_rejected() {
        let m = market(&[("buyer", &[9.0]), ("seller", &[-4.0])]);
        assert!(matches!(
            ascending_auction_two_levels(&m, &[1, 0]),
            Err(AuctionError::RecipeWithoutAgents { .. })
        ));
        assert!(matches!(
            ascending_auction_two_levels(&m, &[1]),
            Err(AuctionError::RecipeLength { .. })
        ));
    }
}
