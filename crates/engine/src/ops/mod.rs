use sea_orm::DatabaseConnection;

use crate::{EngineError, MemberId, ResultEngine};

mod loans;
mod returns;
mod store;

pub use loans::{BulkReturn, LoanSummary};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Lender/borrower/tag filter shared by selects and deletes.
#[derive(Clone, Debug)]
pub(crate) struct LoanScope {
    pub(crate) lender: MemberId,
    /// `None` spans every borrower of the lender.
    pub(crate) borrower: Option<MemberId>,
    /// `None` spans every tag, including untagged loans.
    pub(crate) tag: Option<String>,
}

impl LoanScope {
    pub(crate) fn new(lender: MemberId, borrower: MemberId, tag: Option<&str>) -> Self {
        Self {
            lender,
            borrower: Some(borrower),
            tag: normalize_tag_filter(tag),
        }
    }

    pub(crate) fn lender(lender: MemberId) -> Self {
        Self {
            lender,
            borrower: None,
            tag: None,
        }
    }
}

/// Adds up stored quantities, failing instead of wrapping.
fn sum_quantities(
    quantities: impl IntoIterator<Item = i64>,
    context: &str,
) -> ResultEngine<i64> {
    quantities.into_iter().try_fold(0i64, |acc, quantity| {
        acc.checked_add(quantity)
            .ok_or_else(|| EngineError::QuantityOverflow(context.to_string()))
    })
}

/// Tags are stored trimmed; an untagged loan has an empty tag.
fn normalize_tag(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

fn normalize_tag_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
