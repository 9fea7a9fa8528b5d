//! Loan records.
//!
//! One row per card of an insert batch: `quantity` copies of `card` lent by
//! `lender` to `borrower`, optionally grouped under a `tag`. Rows are never
//! merged, so the same `(card, lender, borrower, tag)` key can appear in
//! several rows; returns consume them oldest first.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a group member (lender or borrower) on the chat platform.
pub type MemberId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: Uuid,
    pub card: String,
    pub lender: MemberId,
    pub borrower: MemberId,
    /// Borrower display name when the loan was recorded. Not kept in sync.
    pub borrower_name: String,
    pub quantity: i64,
    /// Empty when untagged.
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

impl LoanRecord {
    pub(crate) fn new(
        card: String,
        lender: MemberId,
        borrower: MemberId,
        borrower_name: String,
        quantity: i64,
        tag: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            card,
            lender,
            borrower,
            borrower_name,
            quantity,
            tag,
            created_at,
        }
    }

    pub fn is_tagged(&self) -> bool {
        !self.tag.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "card_loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub card: String,
    pub lender: i64,
    pub borrower: i64,
    pub borrower_name: String,
    pub quantity: i64,
    pub tag: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LoanRecord> for ActiveModel {
    fn from(record: &LoanRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id),
            card: ActiveValue::Set(record.card.clone()),
            lender: ActiveValue::Set(record.lender),
            borrower: ActiveValue::Set(record.borrower),
            borrower_name: ActiveValue::Set(record.borrower_name.clone()),
            quantity: ActiveValue::Set(record.quantity),
            tag: ActiveValue::Set(record.tag.clone()),
            created_at: ActiveValue::Set(record.created_at),
        }
    }
}

impl From<Model> for LoanRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            card: model.card,
            lender: model.lender,
            borrower: model.borrower,
            borrower_name: model.borrower_name,
            quantity: model.quantity,
            tag: model.tag,
            created_at: model.created_at,
        }
    }
}
