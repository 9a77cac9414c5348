//! Shared scalar types and numeric constants.

/// Valuation of a single agent. Buyers are positive, sellers and mediators negative.
pub type Value = f64;
pub type Price = f64;

/// Index of a category inside a [`Market`](crate::Market).
pub type CategoryIndex = usize;

/// Number of agents of each category in one procurement set.
/// A zero entry means the category is irrelevant to this recipe.
pub type Recipe = Vec<usize>;

/// Upper bound (not necessarily tight) on the absolute value of any agent.
pub const MAX_VALUE: f64 = 1_000_000.0;

/// Tolerance for comparing prices and price sums.
pub const EPSILON: f64 = 0.00001;

/// Format a number the way the describe/Display output shows it:
/// integers without a fraction, everything else rounded to six digits.
pub(crate) fn fmt_num(x: f64) -> String {
    let rounded = (x * 1e6).round() / 1e6;
    if rounded == 0.0 {
        // Avoid printing "-0"
        return "0".to_string();
    }
    format!("{}", rounded)
}

pub(crate) fn fmt_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|&v| fmt_num(v)).collect();
    format!("[{}]", parts.join(", "))
}

pub(crate) fn fmt_price(price: Option<Price>) -> String {
    match price {
        Some(p) => fmt_num(p),
        None => "None".to_string(),
    }
}

/// Dot product of a price vector with a recipe.
pub fn weighted_sum(prices: &[Price], recipe: &[usize]) -> f64 {
    prices
        .iter()
        .zip(recipe)
        .map(|(&p, &r)| p * r as f64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_integers_without_fraction() {
        assert_eq!(fmt_values(&[7.0, 4.0, -2.5]), "[7, 4, -2.5]");
        assert_eq!(fmt_num(-0.0), "0");
        assert_eq!(fmt_num(7.999999999941), "8");
    }

    #[test]
    fn weighted_sum_ignores_zero_entries() {
        assert_eq!(weighted_sum(&[10.0, -3.0, -1000.0], &[1, 2, 0]), 4.0);
    }
}
