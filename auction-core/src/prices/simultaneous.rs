use serde::{Deserialize, Serialize};

use super::{AscendingPriceVector, PriceIncrease, PriceInitializer, PriceStatus};
use crate::error::{AuctionError, AuctionResult};
use crate::types::{CategoryIndex, EPSILON, Price, Recipe};

/// One proposed increase: raise `category` towards `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedIncrease {
    pub category: CategoryIndex,
    pub target: Price,
    pub description: String,
}

impl PlannedIncrease {
    pub fn new(category: CategoryIndex, target: Price, description: impl Into<String>) -> Self {
        Self {
            category,
            target,
            description: description.into(),
        }
    }
}

/// One ascending price vector per recipe, moved together so that all
/// weighted sums stay equal.
///
/// Each call to [`increase_prices`](Self::increase_prices) takes one proposed
/// increase per recipe. The tightest resulting sum (capped at 0) becomes the
/// common bound for every vector, so an increase can stop short of its target
/// when another recipe binds first.
#[derive(Debug, Clone, PartialEq)]
pub struct SimultaneousAscendingPriceVectors {
    vectors: Vec<AscendingPriceVector>,
    status: Option<PriceStatus>,
}

impl SimultaneousAscendingPriceVectors {
    /// Start every recipe's weighted sum at `initial_sum`, using `initializer`
    /// to find a single price vector shared by all recipes.
    pub fn new(
        recipes: &[Recipe],
        initial_sum: f64,
        initializer: &dyn PriceInitializer,
    ) -> AuctionResult<Self> {
        if recipes.is_empty() {
            return Err(AuctionError::EmptyRecipeList);
        }
        let initial_prices = initializer.initial_prices(recipes, initial_sum)?;
        let vectors = recipes
            .iter()
            .map(|recipe| AscendingPriceVector::with_prices(recipe, initial_prices.clone()))
            .collect::<AuctionResult<Vec<_>>>()?;
        Ok(Self {
            vectors,
            status: None,
        })
    }

    pub fn vectors(&self) -> &[AscendingPriceVector] {
        &self.vectors
    }

    pub fn num_recipes(&self) -> usize {
        self.vectors.len()
    }

    pub fn status(&self) -> Option<PriceStatus> {
        self.status
    }

    /// Apply one planned increase per recipe, in recipe order.
    pub fn increase_prices(
        &mut self,
        increases: &[PlannedIncrease],
    ) -> AuctionResult<Vec<PriceIncrease>> {
        if increases.len() != self.vectors.len() {
            return Err(AuctionError::IncreaseCount {
                expected: self.vectors.len(),
                got: increases.len(),
            });
        }

        let mut sum_upper_bound: f64 = 0.0;
        for (vector, increase) in self.vectors.iter().zip(increases) {
            let new_sum = vector.sum_after_increase(increase.category, increase.target)?;
            sum_upper_bound = sum_upper_bound.min(new_sum);
        }

        let mut applied = Vec::with_capacity(increases.len());
        for (vector, increase) in self.vectors.iter_mut().zip(increases) {
            applied.push(vector.increase_price_up_to_balance(
                increase.category,
                increase.target,
                &increase.description,
                sum_upper_bound,
            )?);
        }

        self.status = Some(if sum_upper_bound >= 0.0 {
            PriceStatus::StoppedAtZeroSum
        } else {
            PriceStatus::StoppedAtAgentValue
        });
        Ok(applied)
    }

    /// One price per category; `None` for categories no recipe uses.
    ///
    /// Fails if two recipes disagree on a shared category's price.
    pub fn map_category_index_to_price(&self) -> AuctionResult<Vec<Option<Price>>> {
        let num_categories = self.vectors.first().map_or(0, |v| v.prices().len());
        let mut prices: Vec<Option<Price>> = vec![None; num_categories];
        for vector in &self.vectors {
            for (category, (&price, &count)) in vector.prices().iter().zip(vector.recipe()).enumerate() {
                if count == 0 {
                    continue;
                }
                match prices[category] {
                    None => prices[category] = Some(price),
                    Some(first) if (first - price).abs() > EPSILON => {
                        return Err(AuctionError::InconsistentPrices {
                            category,
                            first,
                            second: price,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(prices)
    }
}
