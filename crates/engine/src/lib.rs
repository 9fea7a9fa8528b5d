//! Card loan ledger.
//!
//! Keeps track of physical cards lent between members of a group. Loans are
//! recorded from free-text card lists ([`CardList`]), returned oldest first
//! and queried per lender/borrower/tag.
//!
//! Every write runs in exactly one database transaction: an operation either
//! commits completely or reports an [`EngineError`] with nothing persisted.

pub use card_list::{CardList, MAX_QUANTITY};
pub use card_loans::{LoanRecord, MemberId};
pub use commands::{InsertLoansCmd, ReturnLoansCmd};
pub use error::{EngineError, Shortfall};
pub use ops::{BulkReturn, Engine, EngineBuilder, LoanSummary};

mod card_list;
mod card_loans;
mod commands;
mod error;
mod ops;

type ResultEngine<T> = Result<T, EngineError>;
