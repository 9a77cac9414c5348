//! Step-by-step observation of auction runs.
//!
//! Mechanisms report every decision as a [`StepEvent`]. Observers are passed
//! in through [`AuctionConfig`](crate::AuctionConfig); there is no global logger.

use std::fmt;

use crate::prices::PriceIncrease;
use crate::types::{CategoryIndex, Price, Recipe, Value, fmt_num, fmt_price};

#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    Start {
        mechanism: &'static str,
        market: String,
        recipes: Vec<Recipe>,
    },
    /// Which categories the mechanism compared and which it will raise.
    Selected {
        step: usize,
        categories: Vec<CategoryIndex>,
        size: usize,
        compared_size: usize,
    },
    PriceIncreased {
        step: usize,
        increase: PriceIncrease,
    },
    AgentRemoved {
        step: usize,
        category: CategoryIndex,
        name: String,
        value: Value,
    },
    RecipeDropped {
        step: usize,
        recipe: Recipe,
        empty_category: String,
    },
    NoTrade {
        step: usize,
        reason: String,
    },
    ZeroSum {
        step: usize,
        prices: Vec<Option<Price>>,
    },
}

impl StepEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StepEvent::Start { .. } => "start",
            StepEvent::Selected { .. } => "selected",
            StepEvent::PriceIncreased { .. } => "price",
            StepEvent::AgentRemoved { .. } => "removed",
            StepEvent::RecipeDropped { .. } => "recipe_dropped",
            StepEvent::NoTrade { .. } => "no_trade",
            StepEvent::ZeroSum { .. } => "zero_sum",
        }
    }

    pub fn step(&self) -> usize {
        match self {
            StepEvent::Start { .. } => 0,
            StepEvent::Selected { step, .. }
            | StepEvent::PriceIncreased { step, .. }
            | StepEvent::AgentRemoved { step, .. }
            | StepEvent::RecipeDropped { step, .. }
            | StepEvent::NoTrade { step, .. }
            | StepEvent::ZeroSum { step, .. } => *step,
        }
    }
}

impl fmt::Display for StepEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepEvent::Start {
                mechanism,
                market,
                recipes,
            } => write!(f, "{mechanism} with recipes {recipes:?}\n{market}"),
            StepEvent::Selected {
                categories,
                size,
                compared_size,
                ..
            } => write!(
                f,
                "raising categories {categories:?}: {size} potential deals vs {compared_size}"
            ),
            StepEvent::PriceIncreased { increase, .. } => write!(
                f,
                "{}: price {} (target {}, {:?})",
                increase.description,
                fmt_num(increase.price),
                fmt_num(increase.target),
                increase.status
            ),
            StepEvent::AgentRemoved { name, value, .. } => {
                write!(f, "{name}: removed agent with value {}", fmt_num(*value))
            }
            StepEvent::RecipeDropped {
                recipe,
                empty_category,
                ..
            } => write!(f, "recipe {recipe:?} dropped: {empty_category} is empty"),
            StepEvent::NoTrade { reason, .. } => write!(f, "no trade: {reason}"),
            StepEvent::ZeroSum { prices, .. } => {
                let prices: Vec<String> = prices.iter().map(|&p| fmt_price(p)).collect();
                write!(f, "price sum reached zero; final prices [{}]", prices.join(", "))
            }
        }
    }
}

/// Receives every step of an auction run.
pub trait AuctionObserver {
    fn on_step(&mut self, event: &StepEvent);
}

impl<F> AuctionObserver for F
where
    F: FnMut(&StepEvent),
{
    fn on_step(&mut self, event: &StepEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AuctionObserver for NoopObserver {
    fn on_step(&mut self, _event: &StepEvent) {}
}

/// Forwards each event to `tracing` under target `auction_step`, one flat
/// row per event, so a `DataFrameSubscriber` can tabulate a run.
#[cfg(feature = "instrument")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

#[cfg(feature = "instrument")]
impl AuctionObserver for TracingObserver {
    fn on_step(&mut self, event: &StepEvent) {
        let step = event.step() as u64;
        let kind = event.kind();
        match event {
            StepEvent::PriceIncreased { increase, .. } => tracing::info!(
                target: "auction_step",
                step = step,
                kind = kind,
                category = increase.category as u64,
                price = increase.price,
                target_price = increase.target,
                zero_sum = matches!(increase.status, crate::prices::PriceStatus::StoppedAtZeroSum),
            ),
            StepEvent::AgentRemoved {
                category, value, ..
            } => tracing::info!(
                target: "auction_step",
                step = step,
                kind = kind,
                category = *category as u64,
                value = *value,
            ),
            other => tracing::info!(
                target: "auction_step",
                step = step,
                kind = kind,
                detail = %other,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceStatus;

    #[test]
    fn closures_are_observers() {
        let mut kinds = Vec::new();
        {
            let mut observer = |event: &StepEvent| kinds.push(event.kind());
            observer.on_step(&StepEvent::NoTrade {
                step: 3,
                reason: "seller is empty".to_string(),
            });
        }
        assert_eq!(kinds, vec!["no_trade"]);
    }

    #[test]
    fn events_render_as_log_lines() {
        let event = StepEvent::PriceIncreased {
            step: 1,
            increase: PriceIncrease {
                category: 1,
                description: "seller".to_string(),
                target: -3.0,
                price: -4.5,
                status: PriceStatus::StoppedAtZeroSum,
            },
        };
        assert_eq!(event.step(), 1);
        assert_eq!(event.to_string(), "seller: price -4.5 (target -3, StoppedAtZeroSum)");
        let removed = StepEvent::AgentRemoved {
            step: 2,
            category: 0,
            name: "buyer".to_string(),
            value: 7.0,
        };
        assert_eq!(removed.to_string(), "buyer: removed agent with value 7");
    }
}
