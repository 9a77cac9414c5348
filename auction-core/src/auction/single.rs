use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::observer::StepEvent;
use crate::prices::{AscendingPriceVector, PriceStatus};
use crate::recipes::check_recipe;
use crate::trade::{Termination, TradeWithSinglePrice};
use crate::types::{CategoryIndex, MAX_VALUE};

// === SINGLE RECIPE ===

/// Budget-balanced ascending auction for one recipe.
///
/// Each step raises the price of the category with the most potential
/// procurement sets (`size / recipe[i]`) to the value of its lowest agent,
/// who then leaves; ties go to the category declared first. The run ends
/// when the weighted price sum reaches zero (trade at the final prices) or
/// when the category to raise is empty. A relevant category that is empty
/// from the start ends the run before any price moves.
///
/// The result has either the optimal number of deals or one less.
///
/// ```
/// use auction_core::{AgentCategory, Market, Trade, ascending_auction};
///
/// let market = Market::new(vec![
///     AgentCategory::new("buyer", vec![9.0, 8.0]),
///     AgentCategory::new("seller", vec![-4.0, -3.0]),
/// ]);
/// let trade = ascending_auction(&market, &[1, 1]).unwrap();
/// assert_eq!(trade.num_of_deals(), 1);
/// assert_eq!(trade.prices(), &[Some(8.0), Some(-8.0)]);
/// ```
pub fn ascending_auction(market: &Market, recipe: &[usize]) -> AuctionResult<TradeWithSinglePrice> {
    ascending_auction_with(market, recipe, &mut AuctionConfig::default())
}

pub fn ascending_auction_with(
    market: &Market,
    recipe: &[usize],
    config: &mut AuctionConfig<'_>,
) -> AuctionResult<TradeWithSinglePrice> {
    check_recipe(market.num_categories(), recipe)?;
    config.emit(StepEvent::Start {
        mechanism: "ascending_auction",
        market: market.to_string(),
        recipes: vec![recipe.to_vec()],
    });

    let mut remaining = market.clone();
    let mut prices = AscendingPriceVector::new(recipe, -MAX_VALUE);
    let order = scan_order(recipe);

    if let Some(&index) = order.iter().find(|&&i| remaining.categories()[i].is_empty()) {
        config.emit(StepEvent::NoTrade {
            step: 0,
            reason: format!("{} is empty", remaining.categories()[index].name()),
        });
        return Ok(finish(remaining, recipe, &prices, Termination::EmptyCategory));
    }

    let mut step = 0;
    loop {
        step += 1;
        let Some(index) = most_potential_sets(&remaining, recipe, &order) else {
            return Err(AuctionError::RecipeWithoutAgents {
                recipe: recipe.to_vec(),
            });
        };
        let category = &remaining.categories()[index];
        config.emit(StepEvent::Selected {
            step,
            categories: vec![index],
            size: category.size() / recipe[index],
            compared_size: deals_supported(&remaining, recipe),
        });

        let Some(target) = category.lowest_agent_value() else {
            config.emit(StepEvent::NoTrade {
                step,
                reason: format!("{} is empty", category.name()),
            });
            return Ok(finish(remaining, recipe, &prices, Termination::EmptyCategory));
        };
        let description = category.name().to_string();
        let increase = prices.increase_price_up_to_balance(index, target, &description, 0.0)?;
        let status = increase.status;
        config.emit(StepEvent::PriceIncreased { step, increase });

        if status == PriceStatus::StoppedAtZeroSum {
            let trade = finish(remaining, recipe, &prices, Termination::ZeroSum);
            config.emit(StepEvent::ZeroSum {
                step,
                prices: trade.prices().to_vec(),
            });
            return Ok(trade);
        }

        let value = remaining.category_mut(index)?.remove_lowest_agent()?;
        config.emit(StepEvent::AgentRemoved {
            step,
            category: index,
            name: description,
            value,
        });
    }
}

/// Relevant categories in declaration order; ties go to the earliest.
fn scan_order(recipe: &[usize]) -> Vec<CategoryIndex> {
    (0..recipe.len()).filter(|&i| recipe[i] > 0).collect()
}

/// First category in `order` with the largest `size / recipe[i]`.
fn most_potential_sets(market: &Market, recipe: &[usize], order: &[CategoryIndex]) -> Option<CategoryIndex> {
    let mut best: Option<(CategoryIndex, usize)> = None;
    for &index in order {
        let size = market.categories()[index].size();
        // size_i / r_i > size_b / r_b, without leaving the integers
        let better = match best {
            None => true,
            Some((b, best_size)) => size * recipe[b] > best_size * recipe[index],
        };
        if better {
            best = Some((index, size));
        }
    }
    best.map(|(index, _)| index)
}

fn deals_supported(market: &Market, recipe: &[usize]) -> usize {
    market
        .categories()
        .iter()
        .zip(recipe)
        .filter(|&(_, &count)| count > 0)
        .map(|(category, &count)| category.size() / count)
        .min()
        .unwrap_or(0)
}

fn finish(
    remaining: Market,
    recipe: &[usize],
    prices: &AscendingPriceVector,
    termination: Termination,
) -> TradeWithSinglePrice {
    let prices = recipe
        .iter()
        .zip(prices.prices())
        .map(|(&count, &price)| (count > 0).then_some(price))
        .collect();
    TradeWithSinglePrice::new(remaining.into_categories(), recipe.to_vec(), prices, termination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentCategory;

    #[test]
    fn scan_follows_declaration_order() {
        assert_eq!(scan_order(&[1, 1, 1]), vec![0, 1, 2]);
        assert_eq!(scan_order(&[0, 2, 1, 0, 1]), vec![1, 2, 4]);
        assert!(scan_order(&[0, 0]).is_empty());
    }

    #[test]
    fn potential_sets_are_normalized_by_recipe() {
        let market = Market::new(vec![
            AgentCategory::new("buyer", vec![9.0, 8.0]),
            AgentCategory::new("seller", vec![-1.0, -2.0, -3.0]),
        ]);
        // 2/1 > 3/2
        assert_eq!(most_potential_sets(&market, &[1, 2], &[0, 1]), Some(0));
        // 2/1 < 3/1
        assert_eq!(most_potential_sets(&market, &[1, 1], &[0, 1]), Some(1));
    }

    #[test]
    fn observer_sees_every_step() {
        let market = Market::new(vec![
            AgentCategory::new("buyer", vec![9.0, 8.0]),
            AgentCategory::new("seller", vec![-4.0, -3.0]),
        ]);
        let mut kinds = Vec::new();
        let mut on_step = |event: &StepEvent| kinds.push(event.kind());
        let mut config = AuctionConfig::default().with_observer(&mut on_step);
        ascending_auction_with(&market, &[1, 1], &mut config).unwrap();
        drop(config);
        assert_eq!(kinds.first(), Some(&"start"));
        assert_eq!(kinds.last(), Some(&"zero_sum"));
        // Only the buyer at 8 leaves before the seller's price closes the gap.
        assert_eq!(kinds.iter().filter(|k| **k == "removed").count(), 1);
    }

    #[test]
    fn input_market_is_untouched() {
        let market = Market::new(vec![
            AgentCategory::new("buyer", vec![9.0, 8.0]),
            AgentCategory::new("seller", vec![-4.0, -3.0]),
        ]);
        let before = market.clone();
        ascending_auction(&market, &[1, 1]).unwrap();
        assert_eq!(market, before);
    }
}
