use sea_orm::{DatabaseTransaction, TransactionTrait};

use crate::{CardList, EngineError, ResultEngine, ReturnLoansCmd, Shortfall};

use super::{Engine, LoanScope, store, sum_quantities, with_tx};

impl Engine {
    /// Returns the listed cards, consuming the oldest matching loans first.
    ///
    /// All or nothing: when any card is short, nothing is committed for any
    /// card and every shortfall is reported in [`EngineError::CardNotFound`].
    /// Returns the number of cards given back.
    pub async fn return_loans(&self, cmd: ReturnLoansCmd) -> ResultEngine<i64> {
        let ReturnLoansCmd {
            lines,
            lender,
            borrower,
            tag,
        } = cmd;
        let requested = CardList::parse(&lines)?;
        let scope = LoanScope::new(lender, borrower, tag.as_deref());
        tracing::debug!(lender, borrower, tag = ?scope.tag, cards = requested.len(), "returning loans");

        with_tx!(self, |db_tx| {
            let returned = consume_fifo(&db_tx, &scope, &requested).await?;
            tracing::info!(lender, borrower, returned, "loans returned");
            Ok(returned)
        })
    }
}

async fn consume_fifo(
    db_tx: &DatabaseTransaction,
    scope: &LoanScope,
    requested: &CardList,
) -> ResultEngine<i64> {
    let mut shortfalls = Vec::new();
    let mut returned = 0;

    for (card, quantity) in requested.iter() {
        let records = store::select_matching_for_update(db_tx, scope, Some(card)).await?;
        let available = sum_quantities(records.iter().map(|record| record.quantity), card)?;
        if available < quantity {
            shortfalls.push(Shortfall {
                card: card.to_string(),
                requested: quantity,
                available,
            });
            continue;
        }

        let mut remaining = quantity;
        for record in records {
            if remaining == 0 {
                break;
            }
            let consumed = store::decrement_or_delete(db_tx, record, remaining).await?;
            returned += consumed;
            remaining -= consumed;
        }
    }

    if !shortfalls.is_empty() {
        tracing::warn!(
            lender = scope.lender,
            shortfalls = shortfalls.len(),
            "return rolled back"
        );
        return Err(EngineError::CardNotFound(shortfalls));
    }
    Ok(returned)
}
