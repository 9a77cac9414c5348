//! Budget-balanced ascending auctions.
//!
//! All variants share one loop: pick the categories that currently support
//! the most procurement sets, raise their prices to the next agent's value,
//! drop the agents priced out, and stop when the weighted price sum reaches
//! zero (trade) or a category to be raised is already empty (no trade).
//! Every run works on a clone of the input market.

pub mod multi_recipe;
pub mod recipe_tree;
pub mod single;
pub mod two_levels;

pub use multi_recipe::*;
pub use recipe_tree::*;
pub use single::*;
pub use two_levels::*;

use crate::config::AuctionConfig;
use crate::error::AuctionResult;
use crate::market::Market;
use crate::observer::StepEvent;
use crate::types::{CategoryIndex, EPSILON, Price};

/// Remove the lowest agent of every listed category whose value is at or
/// below the category's new price. Categories without a price are skipped.
pub(crate) fn remove_priced_out(
    remaining: &mut Market,
    prices: &[Option<Price>],
    categories: impl IntoIterator<Item = CategoryIndex>,
    step: usize,
    config: &mut AuctionConfig<'_>,
) -> AuctionResult<()> {
    for index in categories {
        let Some(price) = prices.get(index).copied().flatten() else {
            continue;
        };
        let category = remaining.category_mut(index)?;
        let Some(lowest) = category.lowest_agent_value() else {
            continue;
        };
        if lowest <= price + EPSILON {
            let value = category.remove_lowest_agent()?;
            let name = category.name().to_string();
            config.emit(StepEvent::AgentRemoved {
                step,
                category: index,
                name,
                value,
            });
        }
    }
    Ok(())
}

/// Among `candidates`, the first category with the most agents.
pub(crate) fn largest_category(
    market: &Market,
    candidates: &[CategoryIndex],
) -> Option<(CategoryIndex, usize)> {
    let mut best: Option<(CategoryIndex, usize)> = None;
    for &index in candidates {
        let size = market.categories()[index].size();
        if best.is_none_or(|(_, best_size)| size > best_size) {
            best = Some((index, size));
        }
    }
    best
}
