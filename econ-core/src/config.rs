use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::types::{Price, Quantity};

/// Smallest initial stock that keeps a few consumption cycles observable.
pub const MIN_VIABLE_STOCK: Quantity = 5;

/// How the market turns stock levels into prices.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingConfig {
    /// Constant unit price regardless of stock.
    Fixed { unit_price: Price },
    /// Unit price rises as stock falls below `reference_stock`.
    Scarcity {
        base_unit_price: Price,
        reference_stock: Quantity,
        elasticity: f64,
    },
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig::Scarcity {
            base_unit_price: 2.5,
            reference_stock: 100,
            elasticity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Units seeded for every good at initialization.
    pub initial_stock: Quantity,
    /// Per-good initial stock, keyed by good name.
    pub stock_overrides: HashMap<String, Quantity>,
    pub pricing: PricingConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            initial_stock: 100,
            stock_overrides: HashMap::new(),
            pricing: PricingConfig::default(),
        }
    }
}

impl MarketConfig {
    /// Initial stock for the named good.
    pub fn stock_for(&self, name: &str) -> Quantity {
        self.stock_overrides
            .get(name)
            .copied()
            .unwrap_or(self.initial_stock)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.initial_stock < MIN_VIABLE_STOCK {
            return Err(SimError::InvalidConfig(format!(
                "initial_stock {} is below the minimum of {MIN_VIABLE_STOCK}",
                self.initial_stock
            )));
        }
        for (name, &qty) in &self.stock_overrides {
            if qty < MIN_VIABLE_STOCK {
                return Err(SimError::InvalidConfig(format!(
                    "stock override for {name} ({qty}) is below the minimum of {MIN_VIABLE_STOCK}"
                )));
            }
        }
        match self.pricing {
            PricingConfig::Fixed { unit_price } if !(unit_price >= 0.0) => Err(
                SimError::InvalidConfig(format!("unit_price must be non-negative, got {unit_price}")),
            ),
            PricingConfig::Scarcity {
                base_unit_price,
                reference_stock,
                elasticity,
            } if !(base_unit_price >= 0.0) || reference_stock == 0 || !(elasticity >= 0.0) => {
                Err(SimError::InvalidConfig(
                    "scarcity pricing needs a non-negative base price and elasticity and a positive reference stock"
                        .to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Top-level configuration for a `World`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub market: MarketConfig,
    /// Seed for the activation-order RNG.
    pub seed: u64,
    /// Shuffle the order persons act in each tick. Off means insertion order.
    pub shuffle_activation: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            seed: 42,
            shuffle_activation: false,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.market.validate()?;
        Ok(config)
    }
}
