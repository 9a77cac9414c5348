//! Per-run configuration of the auction mechanisms.

use crate::observer::{AuctionObserver, StepEvent};
use crate::prices::{LpPriceInitializer, PriceInitializer};

/// Injected collaborators of one auction run.
///
/// `Default` observes nothing and initializes multi-recipe prices with the LP
/// solver.
///
/// ```ignore
/// let mut log = Vec::new();
/// let mut on_step = |e: &StepEvent| log.push(e.to_string());
/// let mut config = AuctionConfig::default().with_observer(&mut on_step);
/// let trade = ascending_auction_with(&market, &recipe, &mut config)?;
/// ```
#[derive(Default)]
pub struct AuctionConfig<'a> {
    observer: Option<&'a mut dyn AuctionObserver>,
    initializer: Option<&'a dyn PriceInitializer>,
}

impl<'a> AuctionConfig<'a> {
    pub fn with_observer(mut self, observer: &'a mut dyn AuctionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_initializer(mut self, initializer: &'a dyn PriceInitializer) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub(crate) fn emit(&mut self, event: StepEvent) {
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_step(&event);
        }
    }

    pub(crate) fn initializer(&self) -> &dyn PriceInitializer {
        match self.initializer {
            Some(initializer) => initializer,
            None => &LpPriceInitializer,
        }
    }
}
