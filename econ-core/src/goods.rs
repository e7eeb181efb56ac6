use std::collections::HashMap;

use crate::error::{SimError, SimResult};
use crate::types::Good;

// === GOODS COLLECTIONS ===

/// Source of the symbolic names a `GoodFactory` interns at construction.
pub trait GoodsCollection {
    fn names(&self) -> Vec<String>;
}

/// The stock goods every simulation starts with.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGoodsCollection;

impl GoodsCollection for DefaultGoodsCollection {
    fn names(&self) -> Vec<String> {
        ["A", "B", "C", "D", "E"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

/// An explicit list of names, mostly for tests and config-driven setups.
#[derive(Debug, Clone, Default)]
pub struct NamedGoods(pub Vec<String>);

impl GoodsCollection for NamedGoods {
    fn names(&self) -> Vec<String> {
        self.0.clone()
    }
}

// === FACTORY ===

/// Registry of canonical `Good` tokens.
///
/// Interning the same name twice returns the same token, so identity equality
/// on `Good` is name equality within one factory.
#[derive(Debug, Clone, Default)]
pub struct GoodFactory {
    names: Vec<String>,
    by_name: HashMap<String, Good>,
}

impl GoodFactory {
    pub fn new(collection: impl GoodsCollection) -> Self {
        let mut factory = Self::default();
        for name in collection.names() {
            factory.register(name);
        }
        factory
    }

    /// Intern a name, returning the existing token if already known.
    pub fn register(&mut self, name: impl Into<String>) -> Good {
        let name = name.into();
        if let Some(&good) = self.by_name.get(&name) {
            return good;
        }
        let good = Good(self.names.len() as u32);
        self.names.push(name.clone());
        self.by_name.insert(name, good);
        good
    }

    pub fn get_good(&self, name: &str) -> SimResult<Good> {
        self.find(name)
            .ok_or_else(|| SimError::UnknownGood(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<Good> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, good: Good) -> Option<&str> {
        self.names.get(good.0 as usize).map(String::as_str)
    }

    /// All goods in registration order.
    pub fn all(&self) -> impl Iterator<Item = Good> + '_ {
        (0..self.names.len() as u32).map(Good)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
