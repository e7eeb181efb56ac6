// Behavioral roles attached to a Person.
//
// - consumer  Buys the goods in a ConsumerProfile from the market each tick
// - stipend   Deposits a fixed income each tick

pub mod consumer;
pub mod stipend;

pub use consumer::*;
pub use stipend::*;

use crate::market::Market;
use crate::person::Wallet;
use crate::types::PersonId;

/// What a role gets to touch while it runs: its owner's wallet and the market.
pub struct RoleContext<'a> {
    pub tick: u64,
    pub person: PersonId,
    pub wallet: &'a mut Wallet,
    pub market: &'a mut Market,
}

/// A behavior a Person performs once per tick.
pub trait Role: std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn perform_role(&mut self, ctx: &mut RoleContext<'_>);
}
