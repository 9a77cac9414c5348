//! Initial price vectors for several recipes.
//!
//! Each recipe's weighted sum must start at the same (very negative) value,
//! and every price must lie below every agent value. Finding such a vector is
//! a small linear program; the solver is injected through [`PriceInitializer`].

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    variable,
};

use crate::error::{AuctionError, AuctionResult};
use crate::types::{EPSILON, Price, Recipe, weighted_sum};

/// Finds a price vector with `recipe · prices == target_sum` for every recipe.
pub trait PriceInitializer {
    fn initial_prices(&self, recipes: &[Recipe], target_sum: f64) -> AuctionResult<Vec<Price>>;
}

impl<F> PriceInitializer for F
where
    F: Fn(&[Recipe], f64) -> AuctionResult<Vec<Price>>,
{
    fn initial_prices(&self, recipes: &[Recipe], target_sum: f64) -> AuctionResult<Vec<Price>> {
        self(recipes, target_sum)
    }
}

/// Solves the initialization LP with `good_lp`:
///
/// maximize `Σ p_i` subject to `recipe_k · p == target_sum` for all `k`
/// and `p_i <= target_sum / m` for all `i`, where `m` is the larger of the
/// number of categories and the largest recipe total. With counts above one
/// a bound of `target_sum / n` would make the equalities unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct LpPriceInitializer;

impl PriceInitializer for LpPriceInitializer {
    fn initial_prices(&self, recipes: &[Recipe], target_sum: f64) -> AuctionResult<Vec<Price>> {
        let Some(first) = recipes.first() else {
            return Err(AuctionError::EmptyRecipeList);
        };
        let num_categories = first.len();
        if num_categories == 0 {
            return Err(AuctionError::InfeasiblePrices("no categories".to_string()));
        }
        if let Some(bad) = recipes.iter().find(|r| r.len() != num_categories) {
            return Err(AuctionError::RecipeLength {
                categories: num_categories,
                recipe: bad.len(),
            });
        }

        let largest_total = recipes
            .iter()
            .map(|r| r.iter().sum::<usize>())
            .max()
            .unwrap_or(0);
        let upper_bound = target_sum / num_categories.max(largest_total) as f64;
        let mut vars = ProblemVariables::new();
        let prices: Vec<Variable> = (0..num_categories)
            .map(|_| vars.add(variable().max(upper_bound)))
            .collect();

        let objective: Expression = prices.iter().map(|&p| Expression::from(p)).sum();
        let mut model = vars.maximise(objective).using(good_lp::solvers::minilp::minilp);
        for recipe in recipes {
            let lhs: Expression = recipe
                .iter()
                .zip(&prices)
                .map(|(&count, &p)| count as f64 * p)
                .sum();
            model = model.with(constraint!(lhs == target_sum));
        }

        let solution = model.solve().map_err(|err| match err {
            ResolutionError::Infeasible => {
                AuctionError::InfeasiblePrices(format!("recipes {recipes:?} admit no common price sum"))
            }
            other => AuctionError::InfeasiblePrices(other.to_string()),
        })?;
        let values: Vec<Price> = prices.iter().map(|&p| solution.value(p)).collect();

        // The simplex works in floating point; reject anything visibly off.
        let tolerance = EPSILON * target_sum.abs().max(1.0);
        for recipe in recipes {
            let sum = weighted_sum(&values, recipe);
            if (sum - target_sum).abs() > tolerance {
                return Err(AuctionError::InfeasiblePrices(format!(
                    "solver returned sum {sum} instead of {target_sum} for recipe {recipe:?}"
                )));
            }
        }
        Ok(values)
    }
}
