//! Agent categories: named multisets of valuations.
//!
//! A category holds every agent of one type (e.g. all buyers). Values are
//! kept sorted descending, so the highest agent is at the front and the
//! lowest agent (the next one to be priced out) is at the back.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, AuctionResult};
use crate::types::{Value, fmt_values};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCategory {
    name: String,
    values: Vec<Value>,
}

impl AgentCategory {
    /// Build a category from raw values; the values are sorted descending.
    pub fn new(name: impl Into<String>, values: impl Into<Vec<Value>>) -> Self {
        let mut values = values.into();
        sort_descending(&mut values);
        Self {
            name: name.into(),
            values,
        }
    }

    /// A category with `n` agents whose values are drawn independently and
    /// uniformly from `[low, high]`.
    pub fn uniformly_random<R: Rng + ?Sized>(
        name: impl Into<String>,
        n: usize,
        low: Value,
        high: Value,
        rng: &mut R,
    ) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let values: Vec<Value> = (0..n).map(|_| rng.random_range(low..=high)).collect();
        Self::new(name, values)
    }

    /// An empty category with the same name.
    pub fn empty_like(&self) -> Self {
        Self::new(self.name.clone(), Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values sorted descending.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all values in the category.
    pub fn total_value(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Insert one value at its sorted position.
    pub fn append(&mut self, value: Value) {
        let pos = self.values.partition_point(|&v| v > value);
        self.values.insert(pos, value);
    }

    /// Insert several values and re-sort.
    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.extend(values);
        sort_descending(&mut self.values);
    }

    pub fn highest_agent_value(&self) -> Option<Value> {
        self.values.first().copied()
    }

    pub fn lowest_agent_value(&self) -> Option<Value> {
        self.values.last().copied()
    }

    pub fn remove_lowest_agent(&mut self) -> AuctionResult<Value> {
        self.values.pop().ok_or_else(|| self.empty_error())
    }

    pub fn remove_highest_agent(&mut self) -> AuctionResult<Value> {
        if self.values.is_empty() {
            return Err(self.empty_error());
        }
        Ok(self.values.remove(0))
    }

    /// Remove the `n` highest agents, returned highest first.
    /// Fails without removing anything if fewer than `n` agents remain.
    pub fn remove_highest_agents(&mut self, n: usize) -> AuctionResult<Vec<Value>> {
        if self.values.len() < n {
            return Err(self.empty_error());
        }
        Ok(self.values.drain(..n).collect())
    }

    fn empty_error(&self) -> AuctionError {
        AuctionError::EmptyCategory {
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, fmt_values(&self.values))
    }
}

fn sort_descending(values: &mut [Value]) {
    values.sort_by(|a, b| b.total_cmp(a));
}
