use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::observer::StepEvent;
use crate::prices::{PlannedIncrease, PriceStatus, SimultaneousAscendingPriceVectors};
use crate::recipes::{RecipeAnalysis, check_binary_recipes};
use crate::trade::{Termination, TradeWithMultipleRecipes};
use crate::types::{CategoryIndex, MAX_VALUE, Recipe};

use super::{largest_category, remove_priced_out};

// === MULTIPLE BINARY RECIPES ===

/// Budget-balanced ascending auction for several 0/1 recipes.
///
/// Every category must be either *common* (in all recipes) or *unique* (in
/// exactly one). Each step compares the largest common category with the
/// sum of each recipe's largest unique category:
///
/// - if the common side is at least as large, its price rises in every recipe;
/// - otherwise every recipe raises its largest unique category at once, and
///   the recipe whose increase binds first limits all the others.
///
/// A recipe whose largest unique category is empty is dropped and the auction
/// restarts on the original market with the remaining recipes.
pub fn ascending_auction_multi(
    market: &Market,
    recipes: &[Recipe],
) -> AuctionResult<TradeWithMultipleRecipes> {
    ascending_auction_multi_with(market, recipes, &mut AuctionConfig::default())
}

pub fn ascending_auction_multi_with(
    market: &Market,
    recipes: &[Recipe],
    config: &mut AuctionConfig<'_>,
) -> AuctionResult<TradeWithMultipleRecipes> {
    let num_categories = market.num_categories();
    check_binary_recipes(num_categories, recipes)?;
    // Classification errors surface before any run starts
    RecipeAnalysis::new(num_categories, recipes)?;
    config.emit(StepEvent::Start {
        mechanism: "ascending_auction_multi",
        market: market.to_string(),
        recipes: recipes.to_vec(),
    });

    let mut active: Vec<Recipe> = recipes.to_vec();
    loop {
        match run_recipes(market, &active, config)? {
            RunOutcome::Finished(trade) => return Ok(trade),
            RunOutcome::Dropped {
                recipe_index,
                step,
                empty_category,
            } => {
                let dropped = active.remove(recipe_index);
                config.emit(StepEvent::RecipeDropped {
                    step,
                    recipe: dropped,
                    empty_category,
                });
                if active.is_empty() {
                    config.emit(StepEvent::NoTrade {
                        step,
                        reason: "no recipes left".to_string(),
                    });
                    return Ok(TradeWithMultipleRecipes::new(
                        market.categories().to_vec(),
                        Vec::new(),
                        vec![None; num_categories],
                        Termination::NoRecipesLeft,
                        0,
                        Vec::new(),
                    ));
                }
            }
        }
    }
}

enum RunOutcome {
    Finished(TradeWithMultipleRecipes),
    Dropped {
        recipe_index: usize,
        step: usize,
        empty_category: String,
    },
}

/// One auction over `recipes`, from a fresh clone of `market`.
fn run_recipes(
    market: &Market,
    recipes: &[Recipe],
    config: &mut AuctionConfig<'_>,
) -> AuctionResult<RunOutcome> {
    let num_categories = market.num_categories();
    let analysis = RecipeAnalysis::new(num_categories, recipes)?;
    let mut remaining = market.clone();
    let mut prices = SimultaneousAscendingPriceVectors::new(recipes, -MAX_VALUE, config.initializer())?;

    let mut step = 0;
    loop {
        step += 1;
        let common = largest_category(&remaining, &analysis.common);
        let common_size = common.map_or(0, |(_, size)| size);
        let uniques = analysis
            .unique
            .iter()
            .enumerate()
            .map(|(recipe_index, unique)| {
                largest_category(&remaining, unique)
                    .ok_or(AuctionError::RecipeWithoutUniqueCategory { recipe_index })
            })
            .collect::<AuctionResult<Vec<_>>>()?;
        let unique_size: usize = uniques.iter().map(|&(_, size)| size).sum();

        if unique_size == 0 {
            config.emit(StepEvent::NoTrade {
                step,
                reason: "every unique category is empty".to_string(),
            });
            let final_prices = prices.map_category_index_to_price()?;
            return Ok(RunOutcome::Finished(TradeWithMultipleRecipes::new(
                remaining.into_categories(),
                recipes.to_vec(),
                final_prices,
                Termination::EmptyCategory,
                0,
                Vec::new(),
            )));
        }

        let targets: Vec<CategoryIndex> = match common {
            Some((index, size)) if size >= unique_size => vec![index; recipes.len()],
            _ => uniques.iter().map(|&(index, _)| index).collect(),
        };
        config.emit(StepEvent::Selected {
            step,
            categories: targets.clone(),
            size: common_size.max(unique_size),
            compared_size: common_size.min(unique_size),
        });

        let mut planned = Vec::with_capacity(targets.len());
        for (recipe_index, &index) in targets.iter().enumerate() {
            let category = &remaining.categories()[index];
            let Some(target) = category.lowest_agent_value() else {
                return Ok(RunOutcome::Dropped {
                    recipe_index,
                    step,
                    empty_category: category.name().to_string(),
                });
            };
            planned.push(PlannedIncrease::new(index, target, category.name()));
        }

        for increase in prices.increase_prices(&planned)? {
            config.emit(StepEvent::PriceIncreased { step, increase });
        }
        let current = prices.map_category_index_to_price()?;

        if prices.status() == Some(PriceStatus::StoppedAtZeroSum) {
            config.emit(StepEvent::ZeroSum {
                step,
                prices: current.clone(),
            });
            let (deals, traders) = deals_and_traders(&remaining, &analysis);
            return Ok(RunOutcome::Finished(TradeWithMultipleRecipes::new(
                remaining.into_categories(),
                recipes.to_vec(),
                current,
                Termination::ZeroSum,
                deals,
                traders,
            )));
        }

        remove_priced_out(&mut remaining, &current, 0..num_categories, step, config)?;
    }
}

/// Deals are limited by the smallest common category and by the total of
/// each recipe's smallest unique category. Common agents all trade; recipes
/// share the deals in proportion to what they support.
fn deals_and_traders(market: &Market, analysis: &RecipeAnalysis) -> (usize, Vec<f64>) {
    let sizes: Vec<usize> = market.categories().iter().map(|c| c.size()).collect();
    let common_limit = analysis.common.iter().map(|&i| sizes[i]).min().unwrap_or(usize::MAX);
    let supported: Vec<usize> = analysis
        .unique
        .iter()
        .map(|unique| unique.iter().map(|&i| sizes[i]).min().unwrap_or(0))
        .collect();
    let total: usize = supported.iter().sum();
    let deals = common_limit.min(total);

    let mut traders = vec![0.0; sizes.len()];
    for &i in &analysis.common {
        traders[i] = deals as f64;
    }
    if total > 0 {
        for (unique, &support) in analysis.unique.iter().zip(&supported) {
            for &i in unique {
                traders[i] = deals as f64 * support as f64 / total as f64;
            }
        }
    }
    (deals, traders)
}
