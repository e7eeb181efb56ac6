pub mod pricing;

pub use pricing::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::MarketConfig;
use crate::error::{SaleRejected, SimError, SimResult};
use crate::goods::GoodFactory;
use crate::types::{Good, Money, Price, Quantity};

// ============================================================================
// Per-good market state
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GoodMarket {
    pub stock: Quantity,
    pub units_sold: u64,
    pub revenue: Money,
}

/// A completed sale. `change` is what the buyer gets back from `payment`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub good: Good,
    pub quantity: Quantity,
    pub price: Price,
    pub change: Money,
}

// ============================================================================
// Market
// ============================================================================

/// Central market holding stock for every good and a pricing rule.
///
/// Queries are side-effect free. `sell_good` is the only mutator and either
/// applies a whole sale or leaves the market exactly as it was.
#[derive(Debug)]
pub struct Market {
    goods: BTreeMap<Good, GoodMarket>,
    pricing: Box<dyn PricingRule>,
}

impl Market {
    /// Seed stock straight from `config`. No validation happens here, so a
    /// config below `MIN_VIABLE_STOCK` is accepted; `MarketSlot::initialize`
    /// is the checked path.
    pub fn new(factory: &GoodFactory, config: &MarketConfig) -> Self {
        Self::with_pricing(factory, config, config.pricing.build())
    }

    pub fn with_pricing(
        factory: &GoodFactory,
        config: &MarketConfig,
        pricing: Box<dyn PricingRule>,
    ) -> Self {
        let goods = factory
            .all()
            .map(|good| {
                let stock = factory
                    .name(good)
                    .map(|name| config.stock_for(name))
                    .unwrap_or(config.initial_stock);
                (
                    good,
                    GoodMarket {
                        stock,
                        ..Default::default()
                    },
                )
            })
            .collect();

        Self { goods, pricing }
    }

    /// Current stock. Goods this market doesn't trade report zero.
    pub fn get_quantity_good(&self, good: Good) -> Quantity {
        self.goods.get(&good).map(|g| g.stock).unwrap_or(0)
    }

    /// Lump-sum price for `quantity` units at the current stock level.
    pub fn request_price_good(&self, good: Good, quantity: Quantity) -> Price {
        self.pricing
            .price(good, quantity, self.get_quantity_good(good))
    }

    /// Sell `quantity` units of `good` against `payment`.
    ///
    /// The price is recomputed here, so a quote taken earlier is only honored
    /// if stock hasn't moved since.
    pub fn sell_good(
        &mut self,
        good: Good,
        quantity: Quantity,
        payment: Money,
    ) -> Result<Sale, SaleRejected> {
        let price = self.request_price_good(good, quantity);
        let entry = self
            .goods
            .get_mut(&good)
            .ok_or(SaleRejected::UnknownGood(good))?;

        if quantity > entry.stock {
            return Err(SaleRejected::InsufficientStock {
                requested: quantity,
                available: entry.stock,
            });
        }
        if payment < price {
            return Err(SaleRejected::InsufficientFunds {
                offered: payment,
                price,
            });
        }

        entry.stock -= quantity;
        entry.units_sold += quantity as u64;
        entry.revenue += price;

        Ok(Sale {
            good,
            quantity,
            price,
            change: payment - price,
        })
    }

    /// Goods traded here, in stable order.
    pub fn goods(&self) -> impl Iterator<Item = (Good, &GoodMarket)> {
        self.goods.iter().map(|(&good, state)| (good, state))
    }

    pub fn good_market(&self, good: Good) -> Option<&GoodMarket> {
        self.goods.get(&good)
    }

    pub fn snapshot(&self, factory: &GoodFactory) -> MarketSnapshot {
        MarketSnapshot {
            goods: self
                .goods()
                .map(|(good, state)| GoodSnapshot {
                    name: factory.name(good).unwrap_or_default().to_string(),
                    stock: state.stock,
                    unit_price: self.request_price_good(good, 1),
                    units_sold: state.units_sold,
                    revenue: state.revenue,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Lifecycle - explicit initialize / get_instance
// ============================================================================

/// Holder for the simulation's one market.
///
/// Starts empty; `initialize` (re)seeds it from a factory. Re-initializing
/// discards all previous stock and sales.
#[derive(Debug, Default)]
pub struct MarketSlot {
    market: Option<Market>,
    generation: u64,
}

impl MarketSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(
        &mut self,
        factory: &GoodFactory,
        config: &MarketConfig,
    ) -> SimResult<&mut Market> {
        config.validate()?;
        self.generation += 1;

        #[cfg(feature = "instrument")]
        for good in factory.all() {
            tracing::info!(
                target: "market_init",
                generation = self.generation,
                good_id = good.index(),
                good = factory.name(good).unwrap_or_default(),
                stock = config.stock_for(factory.name(good).unwrap_or_default()),
            );
        }

        Ok(self.market.insert(Market::new(factory, config)))
    }

    pub fn get_instance(&self) -> SimResult<&Market> {
        self.market.as_ref().ok_or(SimError::UninitializedState)
    }

    pub fn get_instance_mut(&mut self) -> SimResult<&mut Market> {
        self.market.as_mut().ok_or(SimError::UninitializedState)
    }

    pub fn is_initialized(&self) -> bool {
        self.market.is_some()
    }

    /// How many times `initialize` has run.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ============================================================================
// Serializable snapshot for JS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct GoodSnapshot {
    pub name: String,
    pub stock: Quantity,
    pub unit_price: Price,
    pub units_sold: u64,
    pub revenue: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketSnapshot {
    pub goods: Vec<GoodSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_VIABLE_STOCK;
    use crate::goods::DefaultGoodsCollection;

    fn fixed_market(unit_price: Price, stock: Quantity) -> (GoodFactory, Market) {
        let factory = GoodFactory::new(DefaultGoodsCollection);
        let config = MarketConfig {
            initial_stock: stock,
            ..Default::default()
        };
        let market = Market::with_pricing(&factory, &config, Box::new(FixedPricing { unit_price }));
        (factory, market)
    }

    #[test]
    fn seeds_every_good() {
        let (factory, market) = fixed_market(1.0, 12);
        for good in factory.all() {
            assert_eq!(market.get_quantity_good(good), 12);
        }
    }

    #[test]
    fn price_query_is_pure() {
        let factory = GoodFactory::new(DefaultGoodsCollection);
        let market = Market::new(&factory, &MarketConfig::default());
        let a = factory.get_good("A").unwrap();
        let first = market.request_price_good(a, 4);
        let second = market.request_price_good(a, 4);
        assert_eq!(first, second);
        assert_eq!(market.get_quantity_good(a), 100);
    }

    #[test]
    fn sale_returns_change_and_decrements_stock() {
        let (factory, mut market) = fixed_market(2.0, 10);
        let a = factory.get_good("A").unwrap();
        let sale = market.sell_good(a, 4, 10.0).unwrap();
        assert_eq!(sale.price, 8.0);
        assert_eq!(sale.change, 2.0);
        assert_eq!(market.get_quantity_good(a), 6);
        let stats = market.good_market(a).unwrap();
        assert_eq!(stats.units_sold, 4);
        assert_eq!(stats.revenue, 8.0);
    }

    #[test]
    fn underpayment_changes_nothing() {
        let (factory, mut market) = fixed_market(2.0, 10);
        let a = factory.get_good("A").unwrap();
        let err = market.sell_good(a, 4, 7.99).unwrap_err();
        assert!(matches!(err, SaleRejected::InsufficientFunds { .. }));
        assert_eq!(market.get_quantity_good(a), 10);
        assert_eq!(market.good_market(a).unwrap().units_sold, 0);
    }

    #[test]
    fn overdraw_of_stock_changes_nothing() {
        let (factory, mut market) = fixed_market(2.0, 3);
        let a = factory.get_good("A").unwrap();
        let err = market.sell_good(a, 4, 100.0).unwrap_err();
        assert_eq!(
            err,
            SaleRejected::InsufficientStock {
                requested: 4,
                available: 3
            }
        );
        assert_eq!(market.get_quantity_good(a), 3);
    }

    #[test]
    fn unknown_good_is_rejected() {
        let (_, mut market) = fixed_market(2.0, 10);
        let mut other = GoodFactory::new(DefaultGoodsCollection);
        let stray = other.register("not-traded");
        assert_eq!(market.get_quantity_good(stray), 0);
        assert_eq!(
            market.sell_good(stray, 1, 100.0),
            Err(SaleRejected::UnknownGood(stray))
        );
    }

    #[test]
    fn slot_fails_before_initialize() {
        let slot = MarketSlot::new();
        assert_eq!(slot.get_instance().unwrap_err(), SimError::UninitializedState);
        assert!(!slot.is_initialized());
    }

    #[test]
    fn slot_rejects_stock_below_floor_and_keeps_market() {
        let factory = GoodFactory::new(DefaultGoodsCollection);
        let a = factory.get_good("A").unwrap();
        let mut slot = MarketSlot::new();
        slot.initialize(&factory, &MarketConfig::default()).unwrap();

        let thin = MarketConfig {
            initial_stock: MIN_VIABLE_STOCK - 1,
            ..Default::default()
        };
        assert!(matches!(
            slot.initialize(&factory, &thin),
            Err(SimError::InvalidConfig(_))
        ));
        assert_eq!(slot.generation(), 1);
        assert_eq!(slot.get_instance().unwrap().get_quantity_good(a), 100);

        // The unchecked constructor takes the same config as given.
        let raw = Market::new(&factory, &thin);
        assert_eq!(raw.get_quantity_good(a), MIN_VIABLE_STOCK - 1);
    }

    #[test]
    fn reinitialize_resets_stock() {
        let factory = GoodFactory::new(DefaultGoodsCollection);
        let config = MarketConfig::default();
        let a = factory.get_good("A").unwrap();

        let mut slot = MarketSlot::new();
        let market = slot.initialize(&factory, &config).unwrap();
        let price = market.request_price_good(a, 4);
        market.sell_good(a, 4, price).unwrap();
        assert_eq!(slot.get_instance().unwrap().get_quantity_good(a), 96);

        slot.initialize(&factory, &config).unwrap();
        assert_eq!(slot.get_instance().unwrap().get_quantity_good(a), 100);
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn snapshot_reports_names_and_unit_price() {
        let (factory, market) = fixed_market(1.5, 10);
        let snapshot = market.snapshot(&factory);
        assert_eq!(snapshot.goods.len(), 5);
        assert_eq!(snapshot.goods[0].name, "A");
        assert_eq!(snapshot.goods[0].unit_price, 1.5);
    }
}
