use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::observer::StepEvent;
use crate::prices::{PlannedIncrease, PriceStatus, SimultaneousAscendingPriceVectors};
use crate::recipe_tree::RecipeTree;
use crate::trade::{Termination, TradeWithMultipleRecipes};
use crate::types::{CategoryIndex, MAX_VALUE};

use super::remove_priced_out;

// === RECIPE TREE ===

/// Budget-balanced ascending auction over a tree of recipes.
///
/// Each step asks the tree for its largest categories: on every root-to-leaf
/// path, either a parent category or the subtrees below it, whichever
/// supports more procurement sets (ties go to the parent). All chosen prices
/// rise together, limited by the path whose sum binds first.
///
/// If the chosen category of some path is empty, that path's leaf branch is
/// pruned and the auction restarts on the original market.
///
/// ```
/// use auction_core::{AgentCategory, Market, RecipeTree, Trade, ascending_auction_tree};
///
/// let market = Market::new(vec![
///     AgentCategory::new("buyer", vec![9.0, 8.0]),
///     AgentCategory::new("sellerA", vec![-4.0]),
///     AgentCategory::new("sellerB", vec![-3.0]),
/// ]);
/// let tree = RecipeTree::from_json("[0, [1, null, 2, null]]", 3).unwrap();
/// let trade = ascending_auction_tree(&market, &tree).unwrap();
/// assert_eq!(trade.num_of_deals(), 1);
/// ```
pub fn ascending_auction_tree(
    market: &Market,
    tree: &RecipeTree,
) -> AuctionResult<TradeWithMultipleRecipes> {
    ascending_auction_tree_with(market, tree, &mut AuctionConfig::default())
}

pub fn ascending_auction_tree_with(
    market: &Market,
    tree: &RecipeTree,
    config: &mut AuctionConfig<'_>,
) -> AuctionResult<TradeWithMultipleRecipes> {
    if tree.num_categories() != market.num_categories() {
        return Err(AuctionError::RecipeLength {
            categories: market.num_categories(),
            recipe: tree.num_categories(),
        });
    }
    config.emit(StepEvent::Start {
        mechanism: "ascending_auction_tree",
        market: market.to_string(),
        recipes: tree.recipes(),
    });

    let mut current_tree = tree.clone();
    loop {
        match run_tree(market, &current_tree, config)? {
            TreeRun::Finished(trade) => return Ok(trade),
            TreeRun::Pruned { path, step, empty_category } => {
                config.emit(StepEvent::RecipeDropped {
                    step,
                    recipe: RecipeTree::recipe_from_path(&path, market.num_categories()),
                    empty_category,
                });
                match current_tree.without_path(&path) {
                    Some(pruned) => current_tree = pruned,
                    None => {
                        config.emit(StepEvent::NoTrade {
                            step,
                            reason: "no recipes left".to_string(),
                        });
                        return Ok(TradeWithMultipleRecipes::new(
                            market.categories().to_vec(),
                            Vec::new(),
                            vec![None; market.num_categories()],
                            Termination::NoRecipesLeft,
                            0,
                            Vec::new(),
                        ));
                    }
                }
            }
        }
    }
}

enum TreeRun {
    Finished(TradeWithMultipleRecipes),
    Pruned {
        path: Vec<CategoryIndex>,
        step: usize,
        empty_category: String,
    },
}

fn run_tree(market: &Market, tree: &RecipeTree, config: &mut AuctionConfig<'_>) -> AuctionResult<TreeRun> {
    let paths = tree.paths_to_leaf();
    let recipes = tree.recipes();
    let mut remaining = market.clone();
    let mut prices = SimultaneousAscendingPriceVectors::new(&recipes, -MAX_VALUE, config.initializer())?;

    let mut step = 0;
    loop {
        step += 1;
        let largest = tree.largest_categories(&remaining)?;
        config.emit(StepEvent::Selected {
            step,
            categories: largest.categories.clone(),
            size: largest.size,
            compared_size: largest.compared_size,
        });

        if largest.size == 0 {
            config.emit(StepEvent::NoTrade {
                step,
                reason: "the largest categories are empty".to_string(),
            });
            let final_prices = prices.map_category_index_to_price()?;
            return Ok(TreeRun::Finished(TradeWithMultipleRecipes::new(
                remaining.into_categories(),
                recipes,
                final_prices,
                Termination::EmptyCategory,
                0,
                Vec::new(),
            )));
        }

        let mut planned = Vec::with_capacity(paths.len());
        for path in &paths {
            // Exactly one chosen category lies on each path
            let Some(&index) = largest.categories.iter().find(|&&c| path.contains(&c)) else {
                return Err(AuctionError::InvalidRecipeTree(format!(
                    "no category of {:?} lies on the path {:?}",
                    largest.categories, path
                )));
            };
            let category = &remaining.categories()[index];
            let Some(target) = category.lowest_agent_value() else {
                return Ok(TreeRun::Pruned {
                    path: path.clone(),
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
            let (deals, explanation) = tree.num_of_deals_explained(&remaining, &current)?;
            let traders = tree.expected_traders(&remaining, deals)?;
            let trade = TradeWithMultipleRecipes::new(
                remaining.into_categories(),
                recipes,
                current,
                Termination::ZeroSum,
                deals,
                traders,
            );
            return Ok(TreeRun::Finished(trade.with_explanation(explanation)));
        }

        remove_priced_out(&mut remaining, &current, 0..market.num_categories(), step, config)?;
    }
}
