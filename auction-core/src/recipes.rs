//! Recipe validation and classification of categories across several recipes.

use crate::error::{AuctionError, AuctionResult};
use crate::types::CategoryIndex;

/// Check that `recipe` has one entry per category and requires at least one agent.
pub fn check_recipe(num_categories: usize, recipe: &[usize]) -> AuctionResult<()> {
    if recipe.len() != num_categories {
        return Err(AuctionError::RecipeLength {
            categories: num_categories,
            recipe: recipe.len(),
        });
    }
    if recipe.iter().all(|&r| r == 0) {
        return Err(AuctionError::RecipeWithoutAgents {
            recipe: recipe.to_vec(),
        });
    }
    Ok(())
}

/// Check a list of 0/1 recipes over `num_categories` categories.
pub fn check_binary_recipes(num_categories: usize, recipes: &[Vec<usize>]) -> AuctionResult<()> {
    if recipes.is_empty() {
        return Err(AuctionError::EmptyRecipeList);
    }
    for (recipe_index, recipe) in recipes.iter().enumerate() {
        check_recipe(num_categories, recipe)?;
        if let Some((category, &count)) = recipe.iter().enumerate().find(|&(_, &r)| r > 1) {
            return Err(AuctionError::NonBinaryRecipe {
                recipe_index,
                category,
                count,
            });
        }
    }
    Ok(())
}

/// How each category relates to a set of binary recipes.
///
/// - *common*: contained in every recipe (with two or more recipes)
/// - *unique*: contained in exactly one recipe
/// - *irrelevant*: contained in none
///
/// With a single recipe every relevant category is unique to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeAnalysis {
    /// For each category, the indices of the recipes containing it.
    pub category_recipes: Vec<Vec<usize>>,
    /// Common categories in declaration order.
    pub common: Vec<CategoryIndex>,
    /// For each recipe, its unique categories in declaration order.
    pub unique: Vec<Vec<CategoryIndex>>,
}

impl RecipeAnalysis {
    pub fn new(num_categories: usize, recipes: &[Vec<usize>]) -> AuctionResult<Self> {
        let num_recipes = recipes.len();
        let mut category_recipes = Vec::with_capacity(num_categories);
        let mut common = Vec::new();
        let mut unique = vec![Vec::new(); num_recipes];

        for category in 0..num_categories {
            let containing: Vec<usize> = (0..num_recipes)
                .filter(|&k| recipes[k].get(category).copied().unwrap_or(0) > 0)
                .collect();
            match containing.len() {
                0 => {}
                1 => unique[containing[0]].push(category),
                n if n == num_recipes => common.push(category),
                _ => {
                    return Err(AuctionError::UnclassifiedCategory {
                        category,
                        recipes: containing,
                    });
                }
            }
            category_recipes.push(containing);
        }

        Ok(Self {
            category_recipes,
            common,
            unique,
        })
    }

    pub fn is_relevant(&self, category: CategoryIndex) -> bool {
        self.category_recipes
            .get(category)
            .is_some_and(|recipes| !recipes.is_empty())
    }

    pub fn num_recipes(&self) -> usize {
        self.unique.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_recipe_has_only_unique_categories() {
        let a = RecipeAnalysis::new(3, &[vec![1, 1, 0]]).unwrap();
        assert_eq!(a.category_recipes, vec![vec![0], vec![0], vec![]]);
        assert!(a.common.is_empty());
        assert_eq!(a.unique, vec![vec![0, 1]]);
    }

    #[test]
    fn shared_root_is_common() {
        let a = RecipeAnalysis::new(5, &[vec![1, 1, 0, 0, 0], vec![1, 0, 1, 1, 0]]).unwrap();
        assert_eq!(a.common, vec![0]);
        assert_eq!(a.unique, vec![vec![1], vec![2, 3]]);
        assert!(!a.is_relevant(4));
    }

    #[test]
    fn partially_shared_category_is_rejected() {
        let recipes = vec![vec![1, 1, 0], vec![1, 1, 1], vec![1, 0, 1]];
        assert_eq!(
            RecipeAnalysis::new(3, &recipes),
            Err(AuctionError::UnclassifiedCategory {
                category: 1,
                recipes: vec![0, 1],
            })
        );
    }

    #[test]
    fn binary_check_reports_offending_entry() {
        assert_eq!(check_binary_recipes(2, &[]), Err(AuctionError::EmptyRecipeList));
        assert_eq!(
            check_binary_recipes(3, &[vec![1, 1, 0], vec![1, 0, 2]]),
            Err(AuctionError::NonBinaryRecipe {
                recipe_index: 1,
                category: 2,
                count: 2,
            })
        );
        assert!(matches!(
            check_binary_recipes(3, &[vec![1, 1]]),
            Err(AuctionError::RecipeLength { .. })
        ));
    }
}
