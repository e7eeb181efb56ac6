use std::collections::HashMap;
use std::sync::Arc;

use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod goods;
pub mod market;
pub mod person;
pub mod profile;
pub mod roles;
pub mod types;
pub mod world;

pub use config::{MIN_VIABLE_STOCK, MarketConfig, PricingConfig, SimConfig};
pub use error::{SaleRejected, SimError, SimResult};
pub use goods::{DefaultGoodsCollection, GoodFactory, GoodsCollection, NamedGoods};
pub use market::{
    FixedPricing, GoodMarket, GoodSnapshot, Market, MarketSlot, MarketSnapshot, PricingRule,
    Sale, ScarcityPricing,
};
pub use person::{Person, Wallet};
pub use profile::ConsumerProfile;
pub use roles::{Consumer, PurchaseOutcome, Role, RoleContext, Stipend};
pub use types::{Good, KeyToU64, MONEY_EPSILON, Money, PersonId, Price, Quantity};
pub use world::World;

// ============================================================================
// WASM API - Simulation
// ============================================================================

#[wasm_bindgen]
pub struct Simulation {
    world: World,
}

#[wasm_bindgen]
impl Simulation {
    /// Default goods, default config.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let world = World::new(
            GoodFactory::new(DefaultGoodsCollection),
            SimConfig::default(),
        )
        .expect("default market config is valid");
        Self { world }
    }

    /// Default goods with a JSON `SimConfig`.
    #[wasm_bindgen]
    pub fn with_config(config_json: &str) -> Result<Simulation, String> {
        console_error_panic_hook::set_once();

        let config = SimConfig::from_json(config_json).map_err(|e| e.to_string())?;
        let world = World::new(GoodFactory::new(DefaultGoodsCollection), config)
            .map_err(|e| e.to_string())?;
        Ok(Self { world })
    }

    /// Add a person with a consumer role. `demand_json` maps good names to
    /// per-tick quantities, e.g. `{"A": 4}`.
    #[wasm_bindgen]
    pub fn add_consumer(&mut self, initial_money: f64, demand_json: &str) -> Result<u64, String> {
        let demand: HashMap<String, Quantity> =
            serde_json::from_str(demand_json).map_err(|e| e.to_string())?;

        let mut profile = ConsumerProfile::new(self.world.factory());
        for (name, qty) in demand {
            let good = self
                .world
                .factory()
                .get_good(&name)
                .map_err(|e| e.to_string())?;
            profile.set_consumption_for_good(good, qty);
        }

        let id = self.world.add_person(initial_money.max(0.0));
        self.world
            .add_consumer(id, Arc::new(profile))
            .map_err(|e| e.to_string())?;
        Ok(id.to_u64())
    }

    /// Give an existing person a fixed per-tick income.
    #[wasm_bindgen]
    pub fn add_stipend(&mut self, person_id: u64, amount: f64) -> bool {
        self.world
            .add_role(PersonId::from_u64(person_id), Stipend::new(amount.max(0.0)))
            .is_ok()
    }

    #[wasm_bindgen]
    pub fn deposit(&mut self, person_id: u64, amount: f64) -> bool {
        if !amount.is_finite() || amount < 0.0 {
            return false;
        }
        self.world
            .deposit(PersonId::from_u64(person_id), amount)
            .is_ok()
    }

    /// Advance the simulation by one tick
    #[wasm_bindgen]
    pub fn advance_tick(&mut self) -> Result<(), String> {
        self.world.run_tick().map_err(|e| e.to_string())
    }

    #[wasm_bindgen]
    pub fn reset_market(&mut self) -> Result<(), String> {
        self.world.reset_market().map_err(|e| e.to_string())
    }

    #[wasm_bindgen]
    pub fn get_tick(&self) -> u64 {
        self.world.tick
    }

    #[wasm_bindgen]
    pub fn wallet(&self, person_id: u64) -> Option<f64> {
        self.world
            .get_person(PersonId::from_u64(person_id))
            .map(|p| p.money_in_wallet())
    }

    /// Stock, unit price and sales per good, for rendering
    #[wasm_bindgen]
    pub fn get_market_snapshot(&self) -> MarketSnapshot {
        self.world
            .market()
            .map(|m| m.snapshot(self.world.factory()))
            .unwrap_or(MarketSnapshot { goods: Vec::new() })
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn world(&self) -> &World {
        &self.world
    }
}
