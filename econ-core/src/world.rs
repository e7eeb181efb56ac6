// World state and tick driver for the consumer market simulation

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use slotmap::SlotMap;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::goods::GoodFactory;
use crate::market::{Market, MarketSlot};
use crate::person::Person;
use crate::profile::ConsumerProfile;
use crate::roles::{Consumer, Role};
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;
use crate::types::{Money, PersonId};

/// Complete state of a simulation run
#[derive(Debug)]
pub struct World {
    pub tick: u64,
    pub persons: SlotMap<PersonId, Person>,
    factory: GoodFactory,
    config: SimConfig,
    market: MarketSlot,
    // Insertion order; slotmap iteration order is not stable across removals.
    order: Vec<PersonId>,
    rng: StdRng,
}

impl World {
    /// Build a world and seed its market from `factory`.
    pub fn new(factory: GoodFactory, config: SimConfig) -> SimResult<Self> {
        let mut market = MarketSlot::new();
        market.initialize(&factory, &config.market)?;

        Ok(Self {
            tick: 0,
            persons: SlotMap::with_key(),
            rng: StdRng::seed_from_u64(config.seed),
            factory,
            config,
            market,
            order: Vec::new(),
        })
    }

    pub fn factory(&self) -> &GoodFactory {
        &self.factory
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn market(&self) -> SimResult<&Market> {
        self.market.get_instance()
    }

    pub fn market_mut(&mut self) -> SimResult<&mut Market> {
        self.market.get_instance_mut()
    }

    /// Re-seed the market from the factory, discarding stock and sales.
    /// Persons and their wallets are left alone.
    pub fn reset_market(&mut self) -> SimResult<()> {
        self.market.initialize(&self.factory, &self.config.market)?;
        Ok(())
    }

    // === Person Management ===

    pub fn add_person(&mut self, initial_money: Money) -> PersonId {
        let id = self
            .persons
            .insert_with_key(|id| Person::new(id, initial_money));
        self.order.push(id);
        id
    }

    pub fn remove_person(&mut self, id: PersonId) -> Option<Person> {
        self.order.retain(|&p| p != id);
        self.persons.remove(id)
    }

    pub fn get_person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(id)
    }

    pub fn get_person_mut(&mut self, id: PersonId) -> Option<&mut Person> {
        self.persons.get_mut(id)
    }

    pub fn add_role(&mut self, id: PersonId, role: impl Role + 'static) -> SimResult<()> {
        self.persons
            .get_mut(id)
            .ok_or(SimError::UnknownPerson)?
            .add_role(role);
        Ok(())
    }

    pub fn add_consumer(&mut self, id: PersonId, profile: Arc<ConsumerProfile>) -> SimResult<()> {
        self.add_role(id, Consumer::new(profile))
    }

    /// External income event.
    pub fn deposit(&mut self, id: PersonId, amount: Money) -> SimResult<()> {
        let person = self.persons.get_mut(id).ok_or(SimError::UnknownPerson)?;
        person.money_changed(amount);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "deposit",
            tick = self.tick,
            person_id = id.to_u64(),
            source = "external",
            amount = amount,
            wallet_after = person.money_in_wallet(),
        );

        Ok(())
    }

    pub fn total_money(&self) -> Money {
        self.persons.values().map(|p| p.money_in_wallet()).sum()
    }

    // === Tick ===

    /// Order persons act in this tick.
    fn activation_order(&mut self) -> Vec<PersonId> {
        let mut order = self.order.clone();
        if self.config.shuffle_activation {
            order.shuffle(&mut self.rng);
        }
        order
    }

    /// Advance one tick: every person runs its roles to completion, one
    /// person at a time.
    pub fn run_tick(&mut self) -> SimResult<()> {
        let order = self.activation_order();
        let market = self.market.get_instance_mut()?;
        self.tick += 1;

        for id in order {
            if let Some(person) = self.persons.get_mut(id) {
                person.perform_roles(self.tick, market);
            }
        }

        #[cfg(feature = "instrument")]
        {
            let total_stock: u64 = market.goods().map(|(_, g)| g.stock as u64).sum();
            tracing::info!(
                target: "tick",
                tick = self.tick,
                persons = self.persons.len() as u64,
                total_stock = total_stock,
                total_money = self.total_money(),
            );
        }

        Ok(())
    }

    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.run_tick()?;
        }
        Ok(())
    }
}
