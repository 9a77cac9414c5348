use thiserror::Error;

/// Errors raised by the auction core.
///
/// Validation errors are raised before any working copy of a market is
/// mutated. `InconsistentPrices` signals a broken internal invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuctionError {
    #[error("There are {categories} categories but {recipe} elements in the PS recipe")]
    RecipeLength { categories: usize, recipe: usize },

    #[error("The PS recipe {recipe:?} does not require any agent")]
    RecipeWithoutAgents { recipe: Vec<usize> },

    #[error("Recipe #{recipe_index} has count {count} for category #{category}; only zeros and ones are supported")]
    NonBinaryRecipe {
        recipe_index: usize,
        category: usize,
        count: usize,
    },

    #[error("Recipe {recipe:?} has a count other than 1; only recipes of ones are supported")]
    NonUnitRecipe { recipe: Vec<usize> },

    #[error("Empty list of recipes")]
    EmptyRecipeList,

    #[error("Category #{category} is not common nor unique; it appears in recipes {recipes:?}")]
    UnclassifiedCategory { category: usize, recipes: Vec<usize> },

    #[error("Recipe #{recipe_index} has no unique category")]
    RecipeWithoutUniqueCategory { recipe_index: usize },

    #[error("Category '{name}' is empty")]
    EmptyCategory { name: String },

    #[error("Category index {index} is out of range for a market with {categories} categories")]
    CategoryOutOfRange { index: usize, categories: usize },

    #[error("Invalid recipe tree: {0}")]
    InvalidRecipeTree(String),

    #[error("Expected one price increase per recipe ({expected}), got {got}")]
    IncreaseCount { expected: usize, got: usize },

    #[error("No feasible initial price vector: {0}")]
    InfeasiblePrices(String),

    #[error("Recipes disagree on the price of category #{category}: {first} vs {second}")]
    InconsistentPrices {
        category: usize,
        first: f64,
        second: f64,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to write results: {0}")]
    Report(String),
}

pub type AuctionResult<T> = std::result::Result<T, AuctionError>;
