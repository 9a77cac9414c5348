//! A market: an ordered collection of agent categories.
//!
//! Category order is meaningful: recipes index into it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agents::AgentCategory;
use crate::error::{AuctionError, AuctionResult};
use crate::recipes::check_recipe;
use crate::trade::TradeWithoutPrice;
use crate::types::{CategoryIndex, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    categories: Vec<AgentCategory>,
}

impl Market {
    pub fn new(categories: Vec<AgentCategory>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[AgentCategory] {
        &self.categories
    }

    pub fn into_categories(self) -> Vec<AgentCategory> {
        self.categories
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn category(&self, index: CategoryIndex) -> AuctionResult<&AgentCategory> {
        let categories = self.categories.len();
        self.categories
            .get(index)
            .ok_or(AuctionError::CategoryOutOfRange { index, categories })
    }

    pub fn category_mut(&mut self, index: CategoryIndex) -> AuctionResult<&mut AgentCategory> {
        let categories = self.categories.len();
        self.categories
            .get_mut(index)
            .ok_or(AuctionError::CategoryOutOfRange { index, categories })
    }

    pub fn push_category(&mut self, category: AgentCategory) {
        self.categories.push(category);
    }

    /// A market with the same category names and no agents.
    pub fn empty_like(&self) -> Self {
        Self::new(self.categories.iter().map(AgentCategory::empty_like).collect())
    }

    /// The top `recipe[i]` values of each category `i`, concatenated in category order.
    ///
    /// Returns `Ok(None)` when some category has fewer agents than the recipe requires.
    pub fn get_highest_agents(&self, recipe: &[usize]) -> AuctionResult<Option<Vec<Value>>> {
        check_recipe(self.num_categories(), recipe)?;
        let mut ps = Vec::with_capacity(recipe.iter().sum());
        for (category, &count) in self.categories.iter().zip(recipe) {
            if category.size() < count {
                return Ok(None);
            }
            ps.extend_from_slice(&category.values()[..count]);
        }
        Ok(Some(ps))
    }

    /// Remove the top `recipe[i]` agents of each category `i`.
    /// Nothing is removed if some category is short of agents.
    pub fn remove_highest_agents(&mut self, recipe: &[usize]) -> AuctionResult<Vec<Value>> {
        check_recipe(self.num_categories(), recipe)?;
        if let Some((category, _)) = self
            .categories
            .iter()
            .zip(recipe)
            .find(|(category, count)| category.size() < **count)
        {
            return Err(AuctionError::EmptyCategory {
                name: category.name().to_string(),
            });
        }
        let mut ps = Vec::with_capacity(recipe.iter().sum());
        for (category, &count) in self.categories.iter_mut().zip(recipe) {
            ps.extend(category.remove_highest_agents(count)?);
        }
        Ok(ps)
    }

    /// Greedy optimal trade for a single recipe.
    ///
    /// Repeatedly takes the highest-valued procurement set (the top `recipe[i]`
    /// agents of every category) while its gain-from-trade is positive, at most
    /// `max_iterations` times.
    ///
    /// Returns the procurement sets sorted by increasing GFT, and the market of
    /// agents that were left out.
    pub fn optimal_trade(
        &self,
        recipe: &[usize],
        max_iterations: usize,
    ) -> AuctionResult<(TradeWithoutPrice, Market)> {
        check_recipe(self.num_categories(), recipe)?;
        let mut remaining = self.clone();
        let mut procurement_sets = Vec::new();
        for _ in 0..max_iterations {
            let Some(ps) = remaining.get_highest_agents(recipe)? else {
                break;
            };
            let gft: f64 = ps.iter().sum();
            if gft <= 0.0 {
                break;
            }
            remaining.remove_highest_agents(recipe)?;
            procurement_sets.push(ps);
        }
        procurement_sets.reverse();
        Ok((TradeWithoutPrice::new(procurement_sets), remaining))
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.categories.iter().map(|c| c.to_string()).collect();
        write!(f, "Traders: [{}]", parts.join(", "))
    }
}
