//! Price vectors for ascending-price auctions.
//!
//! A price vector holds one price per category, tied to a recipe by the
//! weighted sum `Σ prices[i] * recipe[i]`. The sum starts far below zero and
//! only grows; an increase that would push it past its upper bound is clamped
//! exactly at the bound.

mod initializer;
mod simultaneous;

pub use initializer::{LpPriceInitializer, PriceInitializer};
pub use simultaneous::{PlannedIncrease, SimultaneousAscendingPriceVectors};

use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, AuctionResult};
use crate::types::{CategoryIndex, Price, Recipe, weighted_sum};

/// Where the last price increase stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceStatus {
    /// The price reached the target agent value; that agent is priced out.
    StoppedAtAgentValue,
    /// The weighted sum reached its bound; the auction must stop.
    StoppedAtZeroSum,
}

/// Record of one price increase, as reported to auction observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceIncrease {
    pub category: CategoryIndex,
    pub description: String,
    /// Price that was asked for.
    pub target: Price,
    /// Price that was actually set.
    pub price: Price,
    pub status: PriceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AscendingPriceVector {
    prices: Vec<Price>,
    recipe: Recipe,
    status: Option<PriceStatus>,
}

impl AscendingPriceVector {
    /// Every category starts at `initial_price`.
    pub fn new(recipe: &[usize], initial_price: Price) -> Self {
        Self {
            prices: vec![initial_price; recipe.len()],
            recipe: recipe.to_vec(),
            status: None,
        }
    }

    pub fn with_prices(recipe: &[usize], prices: Vec<Price>) -> AuctionResult<Self> {
        if prices.len() != recipe.len() {
            return Err(AuctionError::RecipeLength {
                categories: prices.len(),
                recipe: recipe.len(),
            });
        }
        Ok(Self {
            prices,
            recipe: recipe.to_vec(),
            status: None,
        })
    }

    pub fn prices(&self) -> &[Price] {
        &self.prices
    }

    pub fn price(&self, category: CategoryIndex) -> Option<Price> {
        self.prices.get(category).copied()
    }

    pub fn recipe(&self) -> &[usize] {
        &self.recipe
    }

    /// `None` until the first increase.
    pub fn status(&self) -> Option<PriceStatus> {
        self.status
    }

    pub fn weighted_sum(&self) -> f64 {
        weighted_sum(&self.prices, &self.recipe)
    }

    /// Weighted sum if `category` were raised to `new_price` with no clamping.
    pub fn sum_after_increase(&self, category: CategoryIndex, new_price: Price) -> AuctionResult<f64> {
        let (old_price, count) = self.entry(category)?;
        Ok(self.weighted_sum() + count as f64 * (new_price - old_price))
    }

    /// Raise the price of `category` towards `new_price`.
    ///
    /// If the weighted sum would reach `sum_upper_bound`, the price is set so
    /// the sum equals the bound exactly and the status becomes
    /// `StoppedAtZeroSum`. Otherwise the price becomes `new_price` and the
    /// status is `StoppedAtAgentValue`.
    pub fn increase_price_up_to_balance(
        &mut self,
        category: CategoryIndex,
        new_price: Price,
        description: &str,
        sum_upper_bound: f64,
    ) -> AuctionResult<PriceIncrease> {
        let (old_price, count) = self.entry(category)?;
        if count == 0 {
            return Err(AuctionError::RecipeWithoutAgents {
                recipe: self.recipe.clone(),
            });
        }
        let old_sum = self.weighted_sum();
        let new_sum = old_sum + count as f64 * (new_price - old_price);
        let (price, status) = if new_sum >= sum_upper_bound {
            let clamped = old_price + (sum_upper_bound - old_sum) / count as f64;
            (clamped, PriceStatus::StoppedAtZeroSum)
        } else {
            (new_price, PriceStatus::StoppedAtAgentValue)
        };
        self.prices[category] = price;
        self.status = Some(status);
        Ok(PriceIncrease {
            category,
            description: description.to_string(),
            target: new_price,
            price,
            status,
        })
    }

    fn entry(&self, category: CategoryIndex) -> AuctionResult<(Price, usize)> {
        match (self.prices.get(category), self.recipe.get(category)) {
            (Some(&price), Some(&count)) => Ok((price, count)),
            _ => Err(AuctionError::CategoryOutOfRange {
                index: category,
                categories: self.prices.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_exactly_at_zero_sum() {
        let mut p = AscendingPriceVector::new(&[1, 1], -1000.0);
        let steps = [(0, 10.0), (1, -100.0), (0, 90.0)];
        for (category, price) in steps {
            let inc = p.increase_price_up_to_balance(category, price, "step", 0.0).unwrap();
            assert_eq!(inc.status, PriceStatus::StoppedAtAgentValue);
            assert_eq!(inc.price, price);
        }
        let last = p.increase_price_up_to_balance(1, -80.0, "seller", 0.0).unwrap();
        assert_eq!(last.status, PriceStatus::StoppedAtZeroSum);
        assert_eq!(last.target, -80.0);
        assert_eq!(p.prices(), &[90.0, -90.0]);
        assert_eq!(p.weighted_sum(), 0.0);
    }

    #[test]
    fn clamp_divides_by_recipe_weight() {
        let mut p = AscendingPriceVector::with_prices(&[1, 2], vec![9.0, -100.0]).unwrap();
        let inc = p.increase_price_up_to_balance(1, -3.0, "seller", 0.0).unwrap();
        assert_eq!(inc.status, PriceStatus::StoppedAtZeroSum);
        assert_eq!(p.price(1), Some(-4.5));
        assert_eq!(p.weighted_sum(), 0.0);
    }

    #[test]
    fn negative_bound_clamps_below_zero() {
        let mut p = AscendingPriceVector::new(&[1, 1, 0], -10.0);
        assert_eq!(p.status(), None);
        let inc = p.increase_price_up_to_balance(0, 5.0, "buyer", -8.0).unwrap();
        assert_eq!(inc.status, PriceStatus::StoppedAtZeroSum);
        assert_eq!(inc.price, 2.0);
        assert_eq!(p.weighted_sum(), -8.0);
        assert_eq!(p.sum_after_increase(1, 0.0).unwrap(), 2.0);
    }

    #[test]
    fn irrelevant_category_cannot_be_raised() {
        let mut p = AscendingPriceVector::new(&[1, 0], -10.0);
        assert!(p.increase_price_up_to_balance(1, 0.0, "x", 0.0).is_err());
        assert!(p.increase_price_up_to_balance(2, 0.0, "x", 0.0).is_err());
    }
}
