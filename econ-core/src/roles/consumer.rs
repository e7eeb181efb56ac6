use std::sync::Arc;

use crate::error::SaleRejected;
use crate::market::{Market, Sale};
use crate::person::Wallet;
use crate::profile::ConsumerProfile;
use crate::roles::{Role, RoleContext};
use crate::types::{Good, Quantity};
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Result of one buy attempt for one good.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Bought(Sale),
    /// Nothing changed on either side; the next tick tries again.
    Skipped { good: Good, reason: SaleRejected },
}

impl PurchaseOutcome {
    pub fn good(&self) -> Good {
        match self {
            PurchaseOutcome::Bought(sale) => sale.good,
            PurchaseOutcome::Skipped { good, .. } => *good,
        }
    }

    pub fn is_bought(&self) -> bool {
        matches!(self, PurchaseOutcome::Bought(_))
    }

    #[cfg(feature = "instrument")]
    fn label(&self) -> &'static str {
        match self {
            PurchaseOutcome::Bought(_) => "bought",
            PurchaseOutcome::Skipped {
                reason: SaleRejected::InsufficientStock { .. },
                ..
            } => "insufficient_stock",
            PurchaseOutcome::Skipped {
                reason: SaleRejected::InsufficientFunds { .. },
                ..
            } => "insufficient_funds",
            PurchaseOutcome::Skipped {
                reason: SaleRejected::UnknownGood(_),
                ..
            } => "unknown_good",
        }
    }
}

/// Buys the whole desired quantity of each good in its profile, or nothing.
///
/// Every tick starts fresh from the current market and wallet; failed attempts
/// leave no trace.
#[derive(Debug, Clone)]
pub struct Consumer {
    profile: Arc<ConsumerProfile>,
}

impl Consumer {
    pub fn new(profile: Arc<ConsumerProfile>) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ConsumerProfile {
        &self.profile
    }

    /// Attempt one purchase per demanded good.
    pub fn consume(&self, wallet: &mut Wallet, market: &mut Market) -> Vec<PurchaseOutcome> {
        self.profile
            .demanded()
            .map(|(good, demand)| buy(good, demand, wallet, market))
            .collect()
    }
}

fn buy(good: Good, demand: Quantity, wallet: &mut Wallet, market: &mut Market) -> PurchaseOutcome {
    let price = market.request_price_good(good, demand);
    let available = market.get_quantity_good(good);

    if available < demand {
        return PurchaseOutcome::Skipped {
            good,
            reason: SaleRejected::InsufficientStock {
                requested: demand,
                available,
            },
        };
    }
    if !wallet.can_afford(price) {
        return PurchaseOutcome::Skipped {
            good,
            reason: SaleRejected::InsufficientFunds {
                offered: wallet.balance(),
                price,
            },
        };
    }

    // Pay exactly the quote; the market hands back any difference as change.
    match market.sell_good(good, demand, price) {
        Ok(sale) => {
            wallet.money_changed(sale.change - price);
            PurchaseOutcome::Bought(sale)
        }
        Err(reason) => PurchaseOutcome::Skipped { good, reason },
    }
}

impl Role for Consumer {
    fn name(&self) -> &'static str {
        "consumer"
    }

    fn perform_role(&mut self, ctx: &mut RoleContext<'_>) {
        #[cfg(feature = "instrument")]
        for outcome in self.consume(ctx.wallet, ctx.market) {
            let (quantity, price) = match &outcome {
                PurchaseOutcome::Bought(sale) => (sale.quantity, sale.price),
                PurchaseOutcome::Skipped { .. } => (0, 0.0),
            };
            tracing::info!(
                target: "purchase",
                tick = ctx.tick,
                person_id = ctx.person.to_u64(),
                good_id = outcome.good().index(),
                outcome = outcome.label(),
                quantity = quantity,
                price = price,
                stock_after = ctx.market.get_quantity_good(outcome.good()),
                wallet_after = ctx.wallet.balance(),
            );
        }

        #[cfg(not(feature = "instrument"))]
        self.consume(ctx.wallet, ctx.market);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketConfig;
    use crate::goods::{DefaultGoodsCollection, GoodFactory};
    use crate::market::FixedPricing;

    fn setup(stock: Quantity) -> (Good, Market, Consumer) {
        let factory = GoodFactory::new(DefaultGoodsCollection);
        let a = factory.get_good("A").unwrap();
        let config = MarketConfig {
            initial_stock: stock,
            ..Default::default()
        };
        let market =
            Market::with_pricing(&factory, &config, Box::new(FixedPricing { unit_price: 2.0 }));
        let profile = ConsumerProfile::new(&factory).with_consumption(a, 4);
        (a, market, Consumer::new(Arc::new(profile)))
    }

    #[test]
    fn buys_whole_demand_and_keeps_surplus() {
        let (a, mut market, consumer) = setup(10);
        let mut wallet = Wallet::new(11.0);
        let outcomes = consumer.consume(&mut wallet, &mut market);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_bought());
        assert_eq!(market.get_quantity_good(a), 6);
        assert!((wallet.balance() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn skips_when_broke() {
        let (a, mut market, consumer) = setup(10);
        let mut wallet = Wallet::new(7.99);
        let outcomes = consumer.consume(&mut wallet, &mut market);
        assert!(matches!(
            outcomes[0],
            PurchaseOutcome::Skipped {
                reason: SaleRejected::InsufficientFunds { .. },
                ..
            }
        ));
        assert_eq!(market.get_quantity_good(a), 10);
        assert_eq!(wallet.balance(), 7.99);
    }

    #[test]
    fn skips_when_stock_short_even_with_money() {
        let (a, mut market, consumer) = setup(5);
        let mut wallet = Wallet::new(100.0);
        consumer.consume(&mut wallet, &mut market);
        assert_eq!(market.get_quantity_good(a), 1);

        let outcomes = consumer.consume(&mut wallet, &mut market);
        assert_eq!(
            outcomes[0],
            PurchaseOutcome::Skipped {
                good: a,
                reason: SaleRejected::InsufficientStock {
                    requested: 4,
                    available: 1
                }
            }
        );
        assert_eq!(market.get_quantity_good(a), 1);
        assert_eq!(wallet.balance(), 92.0);
    }

    #[test]
    fn zero_demand_profile_does_nothing() {
        let (a, mut market, _) = setup(10);
        let factory = GoodFactory::new(DefaultGoodsCollection);
        let idle = Consumer::new(Arc::new(ConsumerProfile::new(&factory)));
        let mut wallet = Wallet::new(50.0);
        assert!(idle.consume(&mut wallet, &mut market).is_empty());
        assert_eq!(market.get_quantity_good(a), 10);
        assert_eq!(wallet.balance(), 50.0);
    }
}
