//! Command structs for engine operations.
//!
//! These types group parameters for the write operations (insert/return),
//! keeping call sites readable and avoiding long argument lists.

use crate::MemberId;

/// Record a batch of loans from `lender` to `borrower`.
#[derive(Clone, Debug)]
pub struct InsertLoansCmd {
    /// Raw card list lines, `<quantity> <card name>`.
    pub lines: Vec<String>,
    pub lender: MemberId,
    pub borrower: MemberId,
    pub borrower_name: String,
    pub tag: Option<String>,
}

impl InsertLoansCmd {
    #[must_use]
    pub fn new<I, S>(
        lines: I,
        lender: MemberId,
        borrower: MemberId,
        borrower_name: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            lender,
            borrower,
            borrower_name: borrower_name.into(),
            tag: None,
        }
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Give back cards `borrower` holds from `lender`, oldest loans first.
#[derive(Clone, Debug)]
pub struct ReturnLoansCmd {
    pub lines: Vec<String>,
    pub lender: MemberId,
    pub borrower: MemberId,
    /// Only consume loans with this tag. Empty or `None` matches every tag.
    pub tag: Option<String>,
}

impl ReturnLoansCmd {
    #[must_use]
    pub fn new<I, S>(lines: I, lender: MemberId, borrower: MemberId) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            lender,
            borrower,
            tag: None,
        }
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}
