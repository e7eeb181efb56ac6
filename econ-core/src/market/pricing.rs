use crate::config::PricingConfig;
use crate::types::{Good, Price, Quantity};

/// Prices a purchase from the market's current state.
///
/// Implementations must be pure: the same `(good, quantity, stock)` always
/// yields the same non-negative lump-sum price.
pub trait PricingRule: Send + Sync + std::fmt::Debug {
    fn price(&self, good: Good, quantity: Quantity, stock: Quantity) -> Price;
}

/// Same unit price no matter how much is left.
#[derive(Debug, Clone, Copy)]
pub struct FixedPricing {
    pub unit_price: Price,
}

impl PricingRule for FixedPricing {
    fn price(&self, _good: Good, quantity: Quantity, _stock: Quantity) -> Price {
        self.unit_price.max(0.0) * quantity as f64
    }
}

/// Unit price scales with `(reference_stock / stock)^elasticity`.
///
/// At `stock == reference_stock` the unit price equals `base_unit_price`.
/// An empty market is priced as if one unit remained.
#[derive(Debug, Clone, Copy)]
pub struct ScarcityPricing {
    pub base_unit_price: Price,
    pub reference_stock: Quantity,
    pub elasticity: f64,
}

impl ScarcityPricing {
    pub fn unit_price(&self, stock: Quantity) -> Price {
        let scarcity = self.reference_stock.max(1) as f64 / stock.max(1) as f64;
        self.base_unit_price.max(0.0) * scarcity.powf(self.elasticity.max(0.0))
    }
}

impl PricingRule for ScarcityPricing {
    fn price(&self, _good: Good, quantity: Quantity, stock: Quantity) -> Price {
        self.unit_price(stock) * quantity as f64
    }
}

impl PricingConfig {
    pub fn build(&self) -> Box<dyn PricingRule> {
        match *self {
            PricingConfig::Fixed { unit_price } => Box::new(FixedPricing { unit_price }),
            PricingConfig::Scarcity {
                base_unit_price,
                reference_stock,
                elasticity,
            } => Box::new(ScarcityPricing {
                base_unit_price,
                reference_stock,
                elasticity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: Good = Good(0);

    #[test]
    fn fixed_price_is_linear_in_quantity() {
        let rule = FixedPricing { unit_price: 2.0 };
        assert_eq!(rule.price(G, 4, 100), 8.0);
        assert_eq!(rule.price(G, 4, 1), 8.0);
        assert_eq!(rule.price(G, 0, 100), 0.0);
    }

    #[test]
    fn scarcity_price_rises_as_stock_falls() {
        let rule = ScarcityPricing {
            base_unit_price: 2.5,
            reference_stock: 100,
            elasticity: 1.0,
        };
        assert!((rule.price(G, 4, 100) - 10.0).abs() < 1e-12);
        assert!(rule.price(G, 4, 50) > rule.price(G, 4, 100));
        assert!(rule.price(G, 4, 0).is_finite());
    }

    #[test]
    fn zero_elasticity_is_flat() {
        let rule = ScarcityPricing {
            base_unit_price: 3.0,
            reference_stock: 10,
            elasticity: 0.0,
        };
        assert_eq!(rule.unit_price(1), rule.unit_price(1000));
    }
}
