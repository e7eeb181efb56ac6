use thiserror::Error;

use crate::types::{Good, Money, Quantity};

/// Errors surfaced to the driver of a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("market accessed before it was initialized")]
    UninitializedState,

    #[error("unknown good: {0}")]
    UnknownGood(String),

    #[error("unknown person")]
    UnknownPerson,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(String),
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::ConfigParse(err.to_string())
    }
}

pub type SimResult<T> = std::result::Result<T, SimError>;

/// Why the market refused a sale. A rejected sale leaves the market untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaleRejected {
    #[error("good {0:?} is not traded on this market")]
    UnknownGood(Good),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Quantity,
        available: Quantity,
    },

    #[error("insufficient payment: offered {offered:.4}, price {price:.4}")]
    InsufficientFunds { offered: Money, price: Money },
}
