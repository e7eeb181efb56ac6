use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

// === TYPE ALIASES ===

/// Money amounts. Wallet balances and lump-sum prices share this unit.
pub type Money = f64;
pub type Price = f64;
/// Whole units of a good.
pub type Quantity = u32;

/// Tolerance used when comparing money balances.
pub const MONEY_EPSILON: Money = 1e-9;

// === IDS ===

new_key_type! {
    pub struct PersonId;
}

/// Trait for converting SlotMap keys to u64 for the WASM boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for PersonId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl PersonId {
    pub fn from_u64(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Identity token for a tradeable commodity.
///
/// Only a `GoodFactory` hands these out, so two goods are equal exactly when
/// they were interned under the same name by the same factory.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Good(pub(crate) u32);

impl Good {
    pub fn index(self) -> u32 {
        self.0
    }
}
