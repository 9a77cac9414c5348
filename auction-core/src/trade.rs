//! Trade outcomes produced by the mechanisms.
//!
//! Every outcome can report its number of deals and its gain-from-trade (GFT).
//! When a category holds more agents than the trade needs, a uniform lottery
//! picks the traders; the GFT is then the expected value over that lottery.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agents::AgentCategory;
use crate::types::{Price, Recipe, Value, fmt_num, fmt_price};

/// Common contract of all trade outcomes.
///
/// `Display` gives the human-readable settlement explanation.
pub trait Trade: fmt::Display {
    fn num_of_deals(&self) -> usize;

    /// Total GFT. With `including_auctioneer == false` the auctioneer's
    /// net income (sum of all payments) is excluded; for a strongly
    /// budget-balanced trade both variants agree.
    fn gain_from_trade(&self, including_auctioneer: bool) -> f64;

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// Why an ascending auction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The weighted price sum reached zero: trade at the final prices.
    ZeroSum,
    /// The category to be raised next was empty: no trade.
    EmptyCategory,
    /// Every recipe was dropped because one of its categories emptied: no trade.
    NoRecipesLeft,
    /// A trade-reduction mechanism finished (no price clock involved).
    TradeReduction,
}

impl Termination {
    pub fn is_trade(self) -> bool {
        matches!(self, Termination::ZeroSum | Termination::TradeReduction)
    }
}

/// Expected total value of `traders` agents drawn uniformly from `category`.
fn expected_value(category: &AgentCategory, traders: f64) -> f64 {
    if category.is_empty() {
        0.0
    } else {
        category.total_value() * traders / category.size() as f64
    }
}

fn gft_from_traders(
    categories: &[AgentCategory],
    prices: &[Option<Price>],
    traders: &[f64],
    including_auctioneer: bool,
) -> f64 {
    let mut gft = 0.0;
    for (i, category) in categories.iter().enumerate() {
        let n = traders.get(i).copied().unwrap_or(0.0);
        if n <= 0.0 {
            continue;
        }
        gft += expected_value(category, n);
        if !including_auctioneer {
            gft -= prices.get(i).copied().flatten().unwrap_or(0.0) * n;
        }
    }
    gft
}

fn settlement_line(category: &AgentCategory, traders: f64, price: Option<Price>) -> String {
    let existing = category.size();
    let price = fmt_price(price);
    if (traders - existing as f64).abs() < 1e-9 {
        format!("{category}: all {existing} agents trade and pay {price}")
    } else if (traders - traders.round()).abs() < 1e-9 {
        format!(
            "{category}: random {} out of {existing} agents trade and pay {price}",
            traders.round() as usize
        )
    } else {
        format!("{category}: some of the {existing} agents trade and pay {price}")
    }
}

// === TRADE WITHOUT PRICE ===

/// A list of procurement sets with no prices, e.g. the optimal benchmark trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeWithoutPrice {
    procurement_sets: Vec<Vec<Value>>,
}

impl TradeWithoutPrice {
    pub fn new(procurement_sets: Vec<Vec<Value>>) -> Self {
        Self { procurement_sets }
    }

    pub fn procurement_sets(&self) -> &[Vec<Value>] {
        &self.procurement_sets
    }
}

impl Trade for TradeWithoutPrice {
    fn num_of_deals(&self) -> usize {
        self.procurement_sets.len()
    }

    fn gain_from_trade(&self, _including_auctioneer: bool) -> f64 {
        self.procurement_sets.iter().flatten().sum()
    }
}

impl fmt::Display for TradeWithoutPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sets: Vec<String> = self
            .procurement_sets
            .iter()
            .map(|ps| {
                let values: Vec<String> = ps.iter().map(|&v| fmt_num(v)).collect();
                format!("({})", values.join(", "))
            })
            .collect();
        write!(f, "{} deals: [{}]", self.num_of_deals(), sets.join(", "))
    }
}

// === TRADE WITH SINGLE PRICE ===

/// Outcome of a single-recipe mechanism: one price per category.
///
/// `categories` are the agents that remain at the end; when a category holds
/// more agents than `recipe[i] * num_of_deals`, a lottery selects the traders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeWithSinglePrice {
    categories: Vec<AgentCategory>,
    recipe: Recipe,
    prices: Vec<Option<Price>>,
    termination: Termination,
    num_of_deals: usize,
}

impl TradeWithSinglePrice {
    pub fn new(
        categories: Vec<AgentCategory>,
        recipe: Recipe,
        prices: Vec<Option<Price>>,
        termination: Termination,
    ) -> Self {
        let num_of_deals = if termination.is_trade() {
            categories
                .iter()
                .zip(&recipe)
                .filter(|&(_, &count)| count > 0)
                .map(|(category, &count)| category.size() / count)
                .min()
                .unwrap_or(0)
        } else {
            0
        };
        Self {
            categories,
            recipe,
            prices,
            termination,
            num_of_deals,
        }
    }

    pub fn categories(&self) -> &[AgentCategory] {
        &self.categories
    }

    pub fn recipe(&self) -> &[usize] {
        &self.recipe
    }

    pub fn prices(&self) -> &[Option<Price>] {
        &self.prices
    }

    pub fn price(&self, category: usize) -> Option<Price> {
        self.prices.get(category).copied().flatten()
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Number of agents of each category that actually trade.
    pub fn required_agents(&self) -> Vec<usize> {
        self.recipe.iter().map(|&r| r * self.num_of_deals).collect()
    }

    fn traders(&self) -> Vec<f64> {
        self.required_agents().into_iter().map(|n| n as f64).collect()
    }
}

impl Trade for TradeWithSinglePrice {
    fn num_of_deals(&self) -> usize {
        self.num_of_deals
    }

    fn gain_from_trade(&self, including_auctioneer: bool) -> f64 {
        if self.num_of_deals == 0 {
            return 0.0;
        }
        gft_from_traders(&self.categories, &self.prices, &self.traders(), including_auctioneer)
    }
}

impl fmt::Display for TradeWithSinglePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num_of_deals == 0 {
            return write!(f, "No trade");
        }
        let lines: Vec<String> = self
            .categories
            .iter()
            .zip(self.traders())
            .enumerate()
            .filter(|(i, _)| self.recipe[*i] > 0)
            .map(|(i, (category, traders))| settlement_line(category, traders, self.price(i)))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

// === TRADE WITH MULTIPLE RECIPES ===

/// Outcome of a multi-recipe or recipe-tree auction.
///
/// Categories shared by several recipes trade in every deal; categories on
/// alternative branches share the deals through a lottery, so their trader
/// counts are expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeWithMultipleRecipes {
    categories: Vec<AgentCategory>,
    recipes: Vec<Recipe>,
    prices: Vec<Option<Price>>,
    termination: Termination,
    num_of_deals: usize,
    expected_traders: Vec<f64>,
    explanation: Option<String>,
}

impl TradeWithMultipleRecipes {
    /// `expected_traders[i]` is the expected number of agents of category `i`
    /// that trade; it is ignored when the auction did not end in a trade.
    pub fn new(
        categories: Vec<AgentCategory>,
        recipes: Vec<Recipe>,
        prices: Vec<Option<Price>>,
        termination: Termination,
        num_of_deals: usize,
        expected_traders: Vec<f64>,
    ) -> Self {
        let traded = termination.is_trade() && num_of_deals > 0;
        Self {
            expected_traders: if traded {
                expected_traders
            } else {
                vec![0.0; categories.len()]
            },
            categories,
            recipes,
            prices,
            termination,
            num_of_deals: if traded { num_of_deals } else { 0 },
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: String) -> Self {
        self.explanation = Some(explanation);
        self
    }

    pub fn categories(&self) -> &[AgentCategory] {
        &self.categories
    }

    /// The recipes still active when the auction stopped.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn prices(&self) -> &[Option<Price>] {
        &self.prices
    }

    pub fn price(&self, category: usize) -> Option<Price> {
        self.prices.get(category).copied().flatten()
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn expected_traders(&self) -> &[f64] {
        &self.expected_traders
    }

    /// Deal-by-deal explanation, when the auction produced one.
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    fn is_relevant(&self, category: usize) -> bool {
        self.recipes
            .iter()
            .any(|r| r.get(category).copied().unwrap_or(0) > 0)
    }
}

impl Trade for TradeWithMultipleRecipes {
    fn num_of_deals(&self) -> usize {
        self.num_of_deals
    }

    fn gain_from_trade(&self, including_auctioneer: bool) -> f64 {
        if self.num_of_deals == 0 {
            return 0.0;
        }
        gft_from_traders(
            &self.categories,
            &self.prices,
            &self.expected_traders,
            including_auctioneer,
        )
    }
}

impl fmt::Display for TradeWithMultipleRecipes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num_of_deals == 0 {
            return write!(f, "No trade");
        }
        let lines: Vec<String> = self
            .categories
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_relevant(*i))
            .map(|(i, category)| {
                settlement_line(category, self.expected_traders[i], self.price(i))
            })
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

// === TRADE WITH MATERIAL BALANCE ===

/// Outcome of the two-level auction: a root category that needs `counts[0]`
/// agents per deal and alternative child categories that need `counts[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeWithMaterialBalance {
    categories: Vec<AgentCategory>,
    counts: Vec<usize>,
    prices: Vec<Option<Price>>,
    termination: Termination,
    supported: Vec<usize>,
    num_of_deals: usize,
}

impl TradeWithMaterialBalance {
    pub fn new(
        categories: Vec<AgentCategory>,
        counts: Vec<usize>,
        prices: Vec<Option<Price>>,
        termination: Termination,
    ) -> Self {
        let supported: Vec<usize> = categories
            .iter()
            .zip(&counts)
            .map(|(category, &count)| if count == 0 { 0 } else { category.size() / count })
            .collect();
        let num_of_deals = match supported.split_first() {
            Some((root, children)) if termination.is_trade() => {
                (*root).min(children.iter().sum())
            }
            _ => 0,
        };
        Self {
            categories,
            counts,
            prices,
            termination,
            supported,
            num_of_deals,
        }
    }

    pub fn categories(&self) -> &[AgentCategory] {
        &self.categories
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn prices(&self) -> &[Option<Price>] {
        &self.prices
    }

    pub fn price(&self, category: usize) -> Option<Price> {
        self.prices.get(category).copied().flatten()
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Procurement sets each category can support on its own.
    pub fn supported(&self) -> &[usize] {
        &self.supported
    }

    fn children_supply(&self) -> usize {
        self.supported.iter().skip(1).sum()
    }

    /// Expected traders per category: the root always trades `deals * counts[0]`;
    /// the deals are shared among children in proportion to what they support.
    pub fn expected_traders(&self) -> Vec<f64> {
        let deals = self.num_of_deals as f64;
        let supply = self.children_supply() as f64;
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                if i == 0 {
                    deals * count as f64
                } else if supply > 0.0 {
                    deals * count as f64 * self.supported[i] as f64 / supply
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl Trade for TradeWithMaterialBalance {
    fn num_of_deals(&self) -> usize {
        self.num_of_deals
    }

    fn gain_from_trade(&self, including_auctioneer: bool) -> f64 {
        if self.num_of_deals == 0 {
            return 0.0;
        }
        gft_from_traders(
            &self.categories,
            &self.prices,
            &self.expected_traders(),
            including_auctioneer,
        )
    }
}

impl fmt::Display for TradeWithMaterialBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num_of_deals == 0 {
            return write!(f, "No trade");
        }
        let deals = self.num_of_deals;
        let mut lines = Vec::new();
        for i in 1..self.categories.len() {
            lines.push(format!(
                "{}: {} potential deals, price={}",
                self.categories[i].name(),
                self.supported[i],
                fmt_price(self.price(i))
            ));
        }
        let root = &self.categories[0];
        let root_traders = deals * self.counts[0];
        if root_traders == root.size() {
            lines.push(format!(
                "{}: all {} traders selected, price={}",
                root.name(),
                root_traders,
                fmt_price(self.price(0))
            ));
        } else {
            lines.push(format!(
                "{}: {} out of {} traders selected, price={}",
                root.name(),
                root_traders,
                root.size(),
                fmt_price(self.price(0))
            ));
        }
        let supply = self.children_supply();
        for i in 1..self.categories.len() {
            let child = &self.categories[i];
            if supply == deals {
                lines.push(format!(
                    "{}: all {} traders selected",
                    child.name(),
                    self.supported[i] * self.counts[i]
                ));
            } else if self.supported[i] > 0 {
                lines.push(format!(
                    "{}: lottery over {} of {} potential deals",
                    child.name(),
                    self.supported[i],
                    supply
                ));
            }
        }
        lines.push(format!("{} deals overall", deals));
        write!(f, "{}", lines.join("\n"))
    }
}

// === AUCTION OUTCOME ===

/// Any of the priced trade outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionOutcome {
    SinglePrice(TradeWithSinglePrice),
    MultipleRecipes(TradeWithMultipleRecipes),
    MaterialBalance(TradeWithMaterialBalance),
}

impl AuctionOutcome {
    pub fn prices(&self) -> &[Option<Price>] {
        match self {
            AuctionOutcome::SinglePrice(t) => t.prices(),
            AuctionOutcome::MultipleRecipes(t) => t.prices(),
            AuctionOutcome::MaterialBalance(t) => t.prices(),
        }
    }

    pub fn termination(&self) -> Termination {
        match self {
            AuctionOutcome::SinglePrice(t) => t.termination(),
            AuctionOutcome::MultipleRecipes(t) => t.termination(),
            AuctionOutcome::MaterialBalance(t) => t.termination(),
        }
    }
}

impl Trade for AuctionOutcome {
    fn num_of_deals(&self) -> usize {
        match self {
            AuctionOutcome::SinglePrice(t) => t.num_of_deals(),
            AuctionOutcome::MultipleRecipes(t) => t.num_of_deals(),
            AuctionOutcome::MaterialBalance(t) => t.num_of_deals(),
        }
    }

    fn gain_from_trade(&self, including_auctioneer: bool) -> f64 {
        match self {
            AuctionOutcome::SinglePrice(t) => t.gain_from_trade(including_auctioneer),
            AuctionOutcome::MultipleRecipes(t) => t.gain_from_trade(including_auctioneer),
            AuctionOutcome::MaterialBalance(t) => t.gain_from_trade(including_auctioneer),
        }
    }
}

impl fmt::Display for AuctionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionOutcome::SinglePrice(t) => t.fmt(f),
            AuctionOutcome::MultipleRecipes(t) => t.fmt(f),
            AuctionOutcome::MaterialBalance(t) => t.fmt(f),
        }
    }
}

impl From<TradeWithSinglePrice> for AuctionOutcome {
    fn from(trade: TradeWithSinglePrice) -> Self {
        AuctionOutcome::SinglePrice(trade)
    }
}

impl From<TradeWithMultipleRecipes> for AuctionOutcome {
    fn from(trade: TradeWithMultipleRecipes) -> Self {
        AuctionOutcome::MultipleRecipes(trade)
    }
}

impl From<TradeWithMaterialBalance> for AuctionOutcome {
    fn from(trade: TradeWithMaterialBalance) -> Self {
        AuctionOutcome::MaterialBalance(trade)
    }
}
