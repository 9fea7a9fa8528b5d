//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`CardListInput`] thrown when one or more lines of a card list are not
//!   in the `<quantity> <card name>` format.
//! - [`CardNotFound`] thrown when a return asks for more copies than are on
//!   loan. The whole return is rolled back.
//!
//! - [`QuantityOverflow`] thrown when stored quantities no longer add up
//!   within `i64`.
//!
//!  [`CardListInput`]: EngineError::CardListInput
//!  [`CardNotFound`]: EngineError::CardNotFound
//!  [`QuantityOverflow`]: EngineError::QuantityOverflow
use std::fmt;

use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A card whose requested return quantity exceeds what is on loan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub card: String,
    pub requested: i64,
    pub available: i64,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.requested, self.card)
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(
        "error parsing card list, every line must be `<quantity> <card name>`; offending lines:\n{}",
        .0.join("\n")
    )]
    CardListInput(Vec<String>),
    #[error(
        "cards not found on loan in the requested quantity:\n{}",
        join_shortfalls(.0)
    )]
    CardNotFound(Vec<Shortfall>),
    #[error("quantity overflow: {0}")]
    QuantityOverflow(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

fn join_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::CardListInput(a), Self::CardListInput(b)) => a == b,
            (Self::CardNotFound(a), Self::CardNotFound(b)) => a == b,
            (Self::QuantityOverflow(a), Self::QuantityOverflow(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
