use std::collections::BTreeMap;

use crate::goods::GoodFactory;
use crate::types::{Good, Quantity};

/// Per-tick desired consumption for one agent.
///
/// Unconfigured goods have zero demand. Profiles are set up before a run and
/// shared read-only with the roles that use them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerProfile {
    demand: BTreeMap<Good, Quantity>,
}

impl ConsumerProfile {
    /// A profile with a zero entry for every good the factory knows.
    pub fn new(factory: &GoodFactory) -> Self {
        Self {
            demand: factory.all().map(|good| (good, 0)).collect(),
        }
    }

    pub fn with_consumption(mut self, good: Good, quantity: Quantity) -> Self {
        self.set_consumption_for_good(good, quantity);
        self
    }

    pub fn set_consumption_for_good(&mut self, good: Good, quantity: Quantity) {
        self.demand.insert(good, quantity);
    }

    pub fn get_consumption_for_good(&self, good: Good) -> Quantity {
        self.demand.get(&good).copied().unwrap_or(0)
    }

    /// Zero every entry, keeping the set of known goods.
    pub fn reset(&mut self) {
        self.demand.values_mut().for_each(|q| *q = 0);
    }

    /// Goods with positive demand, in stable good order.
    pub fn demanded(&self) -> impl Iterator<Item = (Good, Quantity)> + '_ {
        self.demand
            .iter()
            .filter(|&(_, &qty)| qty > 0)
            .map(|(&good, &qty)| (good, qty))
    }
}
