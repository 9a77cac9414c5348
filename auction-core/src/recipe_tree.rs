//! Recipe trees: several recipes that share a common prefix of categories.
//!
//! Each node holds a category index. Every root-to-leaf path is one binary
//! recipe, and sibling subtrees are alternative ways to complete a deal,
//! e.g. a buyer who can be served by a seller *or* by a chain of producers.
//!
//! The compact text encoding is a nested list of `(index, children)` pairs,
//! where `children` is `null` for a leaf:
//!
//! ```text
//! [0, [1, null, 2, [3, null]]]      buyer -> seller
//!                                   buyer -> producerA -> producerB
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{AuctionError, AuctionResult};
use crate::market::Market;
use crate::types::{CategoryIndex, Price, Recipe, Value, fmt_price};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeNode {
    pub category: CategoryIndex,
    pub children: Vec<RecipeNode>,
}

impl RecipeNode {
    pub fn leaf(category: CategoryIndex) -> Self {
        Self {
            category,
            children: Vec::new(),
        }
    }

    pub fn new(category: CategoryIndex, children: Vec<RecipeNode>) -> Self {
        Self { category, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Result of [`RecipeTree::largest_categories`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargestCategories {
    /// Potential procurement sets supported by the chosen categories.
    pub size: usize,
    /// Potential procurement sets of the side that lost the comparison at the root.
    pub compared_size: usize,
    /// Exactly one category per root-to-leaf path, in path order.
    pub categories: Vec<CategoryIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeTree {
    root: RecipeNode,
    num_categories: usize,
}

impl RecipeTree {
    /// Validates that every index is in range and that no category repeats
    /// along a path.
    pub fn new(root: RecipeNode, num_categories: usize) -> AuctionResult<Self> {
        validate_node(&root, num_categories, &mut Vec::new())?;
        Ok(Self {
            root,
            num_categories,
        })
    }

    /// A single flat path `path[0] -> path[1] -> ...`.
    pub fn chain(path: &[CategoryIndex], num_categories: usize) -> AuctionResult<Self> {
        let Some((&last, rest)) = path.split_last() else {
            return Err(AuctionError::InvalidRecipeTree("empty path".to_string()));
        };
        let root = rest
            .iter()
            .rev()
            .fold(RecipeNode::leaf(last), |child, &category| {
                RecipeNode::new(category, vec![child])
            });
        Self::new(root, num_categories)
    }

    /// Build from the nested-list encoding (already parsed as JSON).
    pub fn from_nested(encoding: &Json, num_categories: usize) -> AuctionResult<Self> {
        let mut roots = parse_siblings(encoding)?;
        if roots.len() != 1 {
            return Err(AuctionError::InvalidRecipeTree(format!(
                "expected exactly one root, found {}",
                roots.len()
            )));
        }
        Self::new(roots.remove(0), num_categories)
    }

    /// Build from the nested-list encoding as text, e.g. `"[0, [1, null, 2, null]]"`.
    pub fn from_json(text: &str, num_categories: usize) -> AuctionResult<Self> {
        let encoding: Json = serde_json::from_str(text)
            .map_err(|e| AuctionError::InvalidRecipeTree(e.to_string()))?;
        Self::from_nested(&encoding, num_categories)
    }

    pub fn root(&self) -> &RecipeNode {
        &self.root
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    /// Every root-to-leaf path as a list of category indices.
    pub fn paths_to_leaf(&self) -> Vec<Vec<CategoryIndex>> {
        let mut paths = Vec::new();
        collect_paths(&self.root, &mut Vec::new(), &mut paths);
        paths
    }

    /// Every root-to-leaf path as a list of category names.
    pub fn path_names(&self, market: &Market) -> AuctionResult<Vec<Vec<String>>> {
        self.paths_to_leaf()
            .into_iter()
            .map(|path| {
                path.into_iter()
                    .map(|i| Ok(market.category(i)?.name().to_string()))
                    .collect()
            })
            .collect()
    }

    /// The 0/1 recipe containing exactly the categories on `path`.
    pub fn recipe_from_path(path: &[CategoryIndex], num_categories: usize) -> Recipe {
        let mut recipe = vec![0; num_categories];
        for &index in path {
            if let Some(slot) = recipe.get_mut(index) {
                *slot = 1;
            }
        }
        recipe
    }

    /// One binary recipe per root-to-leaf path.
    pub fn recipes(&self) -> Vec<Recipe> {
        self.paths_to_leaf()
            .iter()
            .map(|path| Self::recipe_from_path(path, self.num_categories))
            .collect()
    }

    /// Sums of matched values, best first.
    ///
    /// Siblings are pooled and re-sorted; a parent is zipped elementwise with
    /// its pooled children, pairing its best agent with the best child combination.
    pub fn combined_values(&self, market: &Market) -> AuctionResult<Vec<Value>> {
        Ok(self
            .combined_values_detailed(market)?
            .iter()
            .map(|ps| ps.iter().sum())
            .collect())
    }

    /// Like [`combined_values`](Self::combined_values) but keeps the values of
    /// the individual agents in each combination.
    pub fn combined_values_detailed(&self, market: &Market) -> AuctionResult<Vec<Vec<Value>>> {
        self.check_market(market)?;
        combine_detailed(&self.root, market)
    }

    /// Procurement sets with positive GFT and their total GFT.
    pub fn optimal_trade(&self, market: &Market) -> AuctionResult<(Vec<Vec<Value>>, f64)> {
        let trade: Vec<Vec<Value>> = self
            .combined_values_detailed(market)?
            .into_iter()
            .filter(|ps| ps.iter().sum::<f64>() > 0.0)
            .collect();
        let gft = trade.iter().flatten().sum();
        Ok((trade, gft))
    }

    pub fn maximum_gft(&self, market: &Market) -> AuctionResult<f64> {
        Ok(self
            .combined_values(market)?
            .into_iter()
            .filter(|&v| v > 0.0)
            .sum())
    }

    /// Which categories to raise next.
    ///
    /// Each subtree compares its own category size with the sum of what its
    /// children support, and keeps the larger side. Ties go to the parent.
    pub fn largest_categories(&self, market: &Market) -> AuctionResult<LargestCategories> {
        self.check_market(market)?;
        let (size, compared_size, categories) = largest_in(&self.root, market);
        Ok(LargestCategories {
            size,
            compared_size,
            categories,
        })
    }

    /// Deals supported by the current category sizes: a node supports
    /// `min(own size, sum over children)`.
    pub fn num_of_deals(&self, market: &Market) -> AuctionResult<usize> {
        self.check_market(market)?;
        Ok(potential_deals(&self.root, market))
    }

    /// Deal count plus a line-by-line account of who trades at `prices`,
    /// marking where a lottery is needed to pick the traders.
    pub fn num_of_deals_explained(
        &self,
        market: &Market,
        prices: &[Option<Price>],
    ) -> AuctionResult<(usize, String)> {
        self.check_market(market)?;
        let deals = potential_deals(&self.root, market);
        let mut lines = Vec::new();
        explain_potential(&self.root, market, prices, true, &mut lines);
        explain_selection(&self.root, market, prices, deals, &mut lines);
        lines.push(format!("{deals} deals overall"));
        Ok((deals, lines.join("\n")))
    }

    /// Expected number of traders per category when `deals` deals are done:
    /// each node trades every deal that reaches it; children share the deals
    /// of their parent in proportion to what they support.
    pub fn expected_traders(&self, market: &Market, deals: usize) -> AuctionResult<Vec<f64>> {
        self.check_market(market)?;
        let mut traders = vec![0.0; self.num_categories];
        distribute(&self.root, market, deals as f64, &mut traders);
        Ok(traders)
    }

    /// The tree without the leaf end of `path`: the leaf is removed, and so is
    /// every ancestor left without children. `None` if nothing remains.
    pub fn without_path(&self, path: &[CategoryIndex]) -> Option<RecipeTree> {
        prune(&self.root, path).map(|root| RecipeTree {
            root,
            num_categories: self.num_categories,
        })
    }

    fn check_market(&self, market: &Market) -> AuctionResult<()> {
        if market.num_categories() != self.num_categories {
            return Err(AuctionError::RecipeLength {
                categories: market.num_categories(),
                recipe: self.num_categories,
            });
        }
        Ok(())
    }
}

// === CONSTRUCTION ===

fn parse_siblings(encoding: &Json) -> AuctionResult<Vec<RecipeNode>> {
    let Json::Array(items) = encoding else {
        return Err(AuctionError::InvalidRecipeTree(format!(
            "expected a list, found {encoding}"
        )));
    };
    if items.len() % 2 != 0 {
        return Err(AuctionError::InvalidRecipeTree(
            "a recipe tree must be an even-length list of indices and their children".to_string(),
        ));
    }
    items
        .chunks(2)
        .map(|pair| {
            let category = pair[0].as_u64().ok_or_else(|| {
                AuctionError::InvalidRecipeTree(format!("{} is not a category index", pair[0]))
            })? as usize;
            let children = match &pair[1] {
                Json::Null => Vec::new(),
                nested => parse_siblings(nested)?,
            };
            Ok(RecipeNode::new(category, children))
        })
        .collect()
}

fn validate_node(
    node: &RecipeNode,
    num_categories: usize,
    path: &mut Vec<CategoryIndex>,
) -> AuctionResult<()> {
    if node.category >= num_categories {
        return Err(AuctionError::CategoryOutOfRange {
            index: node.category,
            categories: num_categories,
        });
    }
    if path.contains(&node.category) {
        return Err(AuctionError::InvalidRecipeTree(format!(
            "category {} repeats along the path {:?}",
            node.category, path
        )));
    }
    path.push(node.category);
    for child in &node.children {
        validate_node(child, num_categories, path)?;
    }
    path.pop();
    Ok(())
}

fn collect_paths(node: &RecipeNode, prefix: &mut Vec<CategoryIndex>, out: &mut Vec<Vec<CategoryIndex>>) {
    prefix.push(node.category);
    if node.is_leaf() {
        out.push(prefix.clone());
    } else {
        for child in &node.children {
            collect_paths(child, prefix, out);
        }
    }
    prefix.pop();
}

fn prune(node: &RecipeNode, path: &[CategoryIndex]) -> Option<RecipeNode> {
    match path {
        [first] if *first == node.category && node.is_leaf() => None,
        [first, rest @ ..] if *first == node.category => {
            let children: Vec<RecipeNode> = node
                .children
                .iter()
                .filter_map(|child| {
                    if rest.first() == Some(&child.category) {
                        prune(child, rest)
                    } else {
                        Some(child.clone())
                    }
                })
                .collect();
            if children.is_empty() {
                None
            } else {
                Some(RecipeNode::new(node.category, children))
            }
        }
        _ => Some(node.clone()),
    }
}

// === VALUES ===

fn combine_detailed(node: &RecipeNode, market: &Market) -> AuctionResult<Vec<Vec<Value>>> {
    let own = market.category(node.category)?.values();
    if node.is_leaf() {
        return Ok(own.iter().map(|&v| vec![v]).collect());
    }
    let mut pooled = Vec::new();
    for child in &node.children {
        pooled.extend(combine_detailed(child, market)?);
    }
    pooled.sort_by(|a, b| {
        let (sa, sb): (f64, f64) = (a.iter().sum(), b.iter().sum());
        sb.total_cmp(&sa)
    });
    Ok(own
        .iter()
        .zip(pooled)
        .map(|(&v, mut rest)| {
            rest.insert(0, v);
            rest
        })
        .collect())
}

// === DEAL COUNTING ===

fn largest_in(node: &RecipeNode, market: &Market) -> (usize, usize, Vec<CategoryIndex>) {
    let own_size = market.categories()[node.category].size();
    let mut children_size = 0;
    let mut children_categories = Vec::new();
    for child in &node.children {
        let (size, _, categories) = largest_in(child, market);
        children_size += size;
        children_categories.extend(categories);
    }
    if own_size >= children_size {
        (own_size, children_size, vec![node.category])
    } else {
        (children_size, own_size, children_categories)
    }
}

fn potential_deals(node: &RecipeNode, market: &Market) -> usize {
    let own_size = market.categories()[node.category].size();
    if node.is_leaf() {
        return own_size;
    }
    let children: usize = node.children.iter().map(|c| potential_deals(c, market)).sum();
    own_size.min(children)
}

fn distribute(node: &RecipeNode, market: &Market, deals: f64, traders: &mut [f64]) {
    traders[node.category] += deals;
    let potentials: Vec<usize> = node.children.iter().map(|c| potential_deals(c, market)).collect();
    let total: usize = potentials.iter().sum();
    if total == 0 {
        return;
    }
    for (child, potential) in node.children.iter().zip(potentials) {
        distribute(child, market, deals * potential as f64 / total as f64, traders);
    }
}

fn explain_potential(
    node: &RecipeNode,
    market: &Market,
    prices: &[Option<Price>],
    is_root: bool,
    lines: &mut Vec<String>,
) {
    for child in &node.children {
        explain_potential(child, market, prices, false, lines);
    }
    if !is_root {
        lines.push(format!(
            "{}: {} potential deals, price={}",
            market.categories()[node.category].name(),
            potential_deals(node, market),
            fmt_price(prices.get(node.category).copied().flatten())
        ));
    }
}

fn explain_selection(
    node: &RecipeNode,
    market: &Market,
    prices: &[Option<Price>],
    deals: usize,
    lines: &mut Vec<String>,
) {
    let category = &market.categories()[node.category];
    let price = fmt_price(prices.get(node.category).copied().flatten());
    if deals == category.size() {
        lines.push(format!(
            "{}: all {} traders selected, price={}",
            category.name(),
            deals,
            price
        ));
    } else {
        lines.push(format!(
            "{}: {} out of {} traders selected, price={}",
            category.name(),
            deals,
            category.size(),
            price
        ));
    }
    if node.is_leaf() {
        return;
    }
    let potentials: Vec<usize> = node.children.iter().map(|c| potential_deals(c, market)).collect();
    let total: usize = potentials.iter().sum();
    if total == deals {
        for (child, potential) in node.children.iter().zip(potentials) {
            explain_selection(child, market, prices, potential, lines);
        }
    } else {
        let names: Vec<&str> = node
            .children
            .iter()
            .map(|c| market.categories()[c.category].name())
            .collect();
        lines.push(format!(
            "{}: lottery selects {} out of {} potential deals",
            names.join(", "),
            deals,
            total
        ));
    }
}
