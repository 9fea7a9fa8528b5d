//! Persistence boundary for loan rows.
//!
//! Every function runs on a transaction opened by the caller and never
//! commits or rolls back on its own. No business rules live here.

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, Select, prelude::*,
};

use crate::{LoanRecord, ResultEngine, card_loans};

use super::LoanScope;

trait ApplyScope: QueryFilter + Sized {
    fn apply_scope(self, scope: &LoanScope) -> Self;
}

impl<T> ApplyScope for T
where
    T: QueryFilter + Sized,
{
    fn apply_scope(mut self, scope: &LoanScope) -> Self {
        self = self.filter(card_loans::Column::Lender.eq(scope.lender));
        if let Some(borrower) = scope.borrower {
            self = self.filter(card_loans::Column::Borrower.eq(borrower));
        }
        if let Some(tag) = &scope.tag {
            self = self.filter(card_loans::Column::Tag.eq(tag.as_str()));
        }
        self
    }
}

fn matching(scope: &LoanScope, card: Option<&str>) -> Select<card_loans::Entity> {
    let mut query = card_loans::Entity::find().apply_scope(scope);
    if let Some(card) = card {
        query = query.filter(card_loans::Column::Card.eq(card));
    }
    if scope.borrower.is_none() {
        query = query.order_by_asc(card_loans::Column::Borrower);
    }
    query
        .order_by_asc(card_loans::Column::CreatedAt)
        .order_by_asc(card_loans::Column::Id)
}

pub(super) async fn insert(db_tx: &DatabaseTransaction, records: &[LoanRecord]) -> ResultEngine<()> {
    for record in records {
        card_loans::ActiveModel::from(record).insert(db_tx).await?;
    }
    Ok(())
}

/// Matching rows, oldest first (grouped by borrower when the scope spans
/// several).
pub(super) async fn select_matching(
    db_tx: &DatabaseTransaction,
    scope: &LoanScope,
    card: Option<&str>,
) -> ResultEngine<Vec<card_loans::Model>> {
    Ok(matching(scope, card).all(db_tx).await?)
}

/// Like [`select_matching`], holding a write lock on the rows until the
/// transaction ends. SQLite has no row locks and serializes writers instead.
pub(super) async fn select_matching_for_update(
    db_tx: &DatabaseTransaction,
    scope: &LoanScope,
    card: Option<&str>,
) -> ResultEngine<Vec<card_loans::Model>> {
    Ok(matching(scope, card).lock_exclusive().all(db_tx).await?)
}

/// Consumes up to `amount` copies from `record` and returns how many were
/// taken. A row left with no copies is deleted.
pub(super) async fn decrement_or_delete(
    db_tx: &DatabaseTransaction,
    record: card_loans::Model,
    amount: i64,
) -> ResultEngine<i64> {
    let consumed = amount.min(record.quantity);
    let left = record.quantity - consumed;
    if left <= 0 {
        card_loans::Entity::delete_by_id(record.id)
            .exec(db_tx)
            .await?;
    } else {
        let active = card_loans::ActiveModel {
            id: ActiveValue::Set(record.id),
            quantity: ActiveValue::Set(left),
            ..Default::default()
        };
        active.update(db_tx).await?;
    }
    Ok(consumed)
}

/// Deletes every row in scope, returning the number of rows removed.
pub(super) async fn delete_matching(
    db_tx: &DatabaseTransaction,
    scope: &LoanScope,
) -> ResultEngine<u64> {
    let result = card_loans::Entity::delete_many()
        .apply_scope(scope)
        .exec(db_tx)
        .await?;
    Ok(result.rows_affected)
}

pub(super) async fn delete_all(db_tx: &DatabaseTransaction) -> ResultEngine<u64> {
    let result = card_loans::Entity::delete_many().exec(db_tx).await?;
    Ok(result.rows_affected)
}
