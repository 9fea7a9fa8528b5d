use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use sea_orm::TransactionTrait;

use crate::{CardList, InsertLoansCmd, LoanRecord, MemberId, ResultEngine};

use super::{Engine, LoanScope, normalize_tag, store, sum_quantities, with_tx};

/// Outcome of a bulk return.
///
/// Both units are reported: `rows_deleted` counts loan rows, while
/// `cards_returned` counts copies like [`Engine::return_loans`] does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReturn {
    pub rows_deleted: u64,
    pub cards_returned: i64,
}

/// Copies outstanding with one borrower under one tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub borrower: MemberId,
    /// Name snapshot of the most recent loan in the group.
    pub borrower_name: String,
    pub tag: String,
    pub quantity: i64,
}

impl Engine {
    /// Records a batch of loans and returns the number of cards lent.
    ///
    /// One row is created per distinct card, even if the borrower already
    /// holds loans for the same card and tag.
    pub async fn insert_loans(&self, cmd: InsertLoansCmd) -> ResultEngine<i64> {
        let InsertLoansCmd {
            lines,
            lender,
            borrower,
            borrower_name,
            tag,
        } = cmd;
        let cards = CardList::parse(&lines)?;
        let tag = normalize_tag(tag.as_deref());
        let created_at = Utc::now();

        let records: Vec<LoanRecord> = cards
            .iter()
            .map(|(card, quantity)| {
                LoanRecord::new(
                    card.to_string(),
                    lender,
                    borrower,
                    borrower_name.clone(),
                    quantity,
                    tag.clone(),
                    created_at,
                )
            })
            .collect();
        let inserted = cards.total();

        with_tx!(self, |db_tx| {
            store::insert(&db_tx, &records).await?;
            tracing::info!(lender, borrower, rows = records.len(), inserted, "loans recorded");
            Ok(inserted)
        })
    }

    /// Deletes every loan from `lender` to `borrower`, restricted to `tag`
    /// when one is given. Quantities are not checked.
    pub async fn bulk_return_loans(
        &self,
        lender: MemberId,
        borrower: MemberId,
        tag: Option<&str>,
    ) -> ResultEngine<BulkReturn> {
        let scope = LoanScope::new(lender, borrower, tag);
        with_tx!(self, |db_tx| {
            let records = store::select_matching_for_update(&db_tx, &scope, None).await?;
            let cards_returned =
                sum_quantities(records.iter().map(|record| record.quantity), "bulk return")?;
            let rows_deleted = store::delete_matching(&db_tx, &scope).await?;
            tracing::info!(lender, borrower, rows_deleted, cards_returned, "loans bulk returned");
            Ok(BulkReturn {
                rows_deleted,
                cards_returned,
            })
        })
    }

    /// Loans from `lender` to `borrower`, oldest first. An empty or absent
    /// tag matches every tag.
    pub async fn loans(
        &self,
        lender: MemberId,
        borrower: MemberId,
        tag: Option<&str>,
    ) -> ResultEngine<Vec<LoanRecord>> {
        let scope = LoanScope::new(lender, borrower, tag);
        with_tx!(self, |db_tx| {
            let models = store::select_matching(&db_tx, &scope, None).await?;
            Ok(models.into_iter().map(LoanRecord::from).collect())
        })
    }

    /// Every loan of `lender`, grouped by borrower and oldest first.
    pub async fn all_loans(&self, lender: MemberId) -> ResultEngine<Vec<LoanRecord>> {
        let scope = LoanScope::lender(lender);
        with_tx!(self, |db_tx| {
            let models = store::select_matching(&db_tx, &scope, None).await?;
            Ok(models.into_iter().map(LoanRecord::from).collect())
        })
    }

    /// Number of copies still out with `borrower`.
    pub async fn total_outstanding(
        &self,
        lender: MemberId,
        borrower: MemberId,
        tag: Option<&str>,
    ) -> ResultEngine<i64> {
        let records = self.loans(lender, borrower, tag).await?;
        sum_quantities(records.iter().map(|record| record.quantity), "outstanding loans")
    }

    /// Outstanding copies of `lender` per borrower and tag, sorted by tag
    /// then borrower name.
    ///
    /// Groups by borrower id rather than by the stored name snapshot, so a
    /// borrower who was renamed between loans still gets a single row, shown
    /// under the latest name.
    pub async fn loan_summary(&self, lender: MemberId) -> ResultEngine<Vec<LoanSummary>> {
        let records = self.all_loans(lender).await?;

        let mut groups: BTreeMap<(MemberId, String), LoanSummary> = BTreeMap::new();
        for record in records {
            let entry = groups
                .entry((record.borrower, record.tag.clone()))
                .or_insert_with(|| LoanSummary {
                    borrower: record.borrower,
                    borrower_name: String::new(),
                    tag: record.tag.clone(),
                    quantity: 0,
                });
            entry.borrower_name = record.borrower_name;
            entry.quantity = sum_quantities([entry.quantity, record.quantity], &entry.tag)?;
        }

        let mut summary: Vec<LoanSummary> = groups.into_values().collect();
        summary.sort_by(|a, b| {
            (a.tag.as_str(), a.borrower_name.as_str(), a.borrower).cmp(&(
                b.tag.as_str(),
                b.borrower_name.as_str(),
                b.borrower,
            ))
        });
        Ok(summary)
    }

    /// Deletes every loan of every member. Returns the number of rows removed.
    pub async fn purge_loans(&self) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let rows = store::delete_all(&db_tx).await?;
            tracing::warn!(rows, "all loans purged");
            Ok(rows)
        })
    }
}
