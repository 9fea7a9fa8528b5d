use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, FromQueryResult, Statement};
use uuid::Uuid;

use engine::{BulkReturn, Engine, EngineError, InsertLoansCmd, ReturnLoansCmd, Shortfall};
use migration::MigratorTrait;

const LENDER: i64 = 1001;
const BORROWER: i64 = 2002;
const OTHER_BORROWER: i64 = 3003;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("card_loans_{}.db", Uuid::now_v7()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db, path)
}

async fn lend(engine: &Engine, lines: &[&str], tag: Option<&str>) -> i64 {
    let mut cmd = InsertLoansCmd::new(lines.iter().copied(), LENDER, BORROWER, "Bob");
    if let Some(tag) = tag {
        cmd = cmd.tag(tag);
    }
    engine.insert_loans(cmd).await.unwrap()
}

#[derive(Debug, FromQueryResult)]
struct RowCount {
    count: i64,
}

async fn row_count(db: &DatabaseConnection) -> i64 {
    let backend = db.get_database_backend();
    RowCount::find_by_statement(Statement::from_string(
        backend,
        "SELECT COUNT(*) AS count FROM card_loans",
    ))
    .one(db)
    .await
    .unwrap()
    .unwrap()
    .count
}

#[tokio::test]
async fn insert_returns_total_and_creates_one_row_per_card() {
    let (engine, db) = engine_with_db().await;

    let inserted = lend(&engine, &["2 Foo", "3 Bar"], Some("cube")).await;
    assert_eq!(inserted, 5);
    assert_eq!(row_count(&db).await, 2);

    let loans = engine.loans(LENDER, BORROWER, None).await.unwrap();
    let mut quantities: Vec<(String, i64)> = loans
        .iter()
        .map(|loan| (loan.card.clone(), loan.quantity))
        .collect();
    quantities.sort();
    assert_eq!(
        quantities,
        vec![("Bar".to_string(), 3), ("Foo".to_string(), 2)]
    );
    assert!(loans.iter().all(|loan| loan.tag == "cube"));
    assert!(loans.iter().all(|loan| loan.borrower_name == "Bob"));
}

#[tokio::test]
async fn insert_never_merges_existing_loans() {
    let (engine, db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], None).await;
    lend(&engine, &["1 Foo"], None).await;

    assert_eq!(row_count(&db).await, 2);
    assert_eq!(
        engine.total_outstanding(LENDER, BORROWER, None).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn insert_rejects_malformed_lines_without_writing() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .insert_loans(InsertLoansCmd::new(
            ["bad line", "2 Foo", "nope"],
            LENDER,
            BORROWER,
            "Bob",
        ))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::CardListInput(vec!["bad line".to_string(), "nope".to_string()])
    );
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn return_consumes_oldest_loans_first() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], None).await;
    lend(&engine, &["3 Foo"], None).await;
    let before = engine.loans(LENDER, BORROWER, None).await.unwrap();
    let newer_id = before[1].id;

    let returned = engine
        .return_loans(ReturnLoansCmd::new(["4 Foo"], LENDER, BORROWER))
        .await
        .unwrap();
    assert_eq!(returned, 4);

    let after = engine.loans(LENDER, BORROWER, None).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, newer_id);
    assert_eq!(after[0].quantity, 1);
}

#[tokio::test]
async fn return_is_all_or_nothing() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["4 Card A", "1 Card B"], None).await;
    let before = engine.loans(LENDER, BORROWER, None).await.unwrap();

    let err = engine
        .return_loans(ReturnLoansCmd::new(
            ["2 Card A", "3 Card B", "1 Card C"],
            LENDER,
            BORROWER,
        ))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::CardNotFound(vec![
            Shortfall {
                card: "Card B".to_string(),
                requested: 3,
                available: 1,
            },
            Shortfall {
                card: "Card C".to_string(),
                requested: 1,
                available: 0,
            },
        ])
    );
    let after = engine.loans(LENDER, BORROWER, None).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn returning_exact_quantity_deletes_the_row() {
    let (engine, db) = engine_with_db().await;

    lend(&engine, &["3 Foo", "1 Bar"], None).await;

    let returned = engine
        .return_loans(ReturnLoansCmd::new(["3 Foo"], LENDER, BORROWER))
        .await
        .unwrap();
    assert_eq!(returned, 3);
    assert_eq!(row_count(&db).await, 1);

    let loans = engine.loans(LENDER, BORROWER, None).await.unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].card, "Bar");
    assert!(loans.iter().all(|loan| loan.quantity > 0));
}

#[tokio::test]
async fn return_with_tag_only_touches_that_tag() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], Some("cube")).await;
    lend(&engine, &["2 Foo"], Some("legacy")).await;

    let err = engine
        .return_loans(ReturnLoansCmd::new(["3 Foo"], LENDER, BORROWER).tag("legacy"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CardNotFound(ref s) if s[0].available == 2));

    let returned = engine
        .return_loans(ReturnLoansCmd::new(["2 Foo"], LENDER, BORROWER).tag("legacy"))
        .await
        .unwrap();
    assert_eq!(returned, 2);

    let left = engine.loans(LENDER, BORROWER, None).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].tag, "cube");
}

#[tokio::test]
async fn return_without_tag_spans_every_tag() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], Some("cube")).await;
    lend(&engine, &["2 Foo"], None).await;

    let returned = engine
        .return_loans(ReturnLoansCmd::new(["3 Foo"], LENDER, BORROWER).tag(""))
        .await
        .unwrap();
    assert_eq!(returned, 3);

    let left = engine.loans(LENDER, BORROWER, None).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].tag, "");
    assert_eq!(left[0].quantity, 1);
}

#[tokio::test]
async fn return_is_scoped_to_the_borrower() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], None).await;
    engine
        .insert_loans(InsertLoansCmd::new(["5 Foo"], LENDER, OTHER_BORROWER, "Carol"))
        .await
        .unwrap();

    let err = engine
        .return_loans(ReturnLoansCmd::new(["3 Foo"], LENDER, BORROWER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CardNotFound(_)));
    assert_eq!(
        engine
            .total_outstanding(LENDER, OTHER_BORROWER, None)
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn bulk_return_respects_tag_filter() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo", "1 Bar"], Some("cube")).await;
    lend(&engine, &["4 Baz"], Some("legacy")).await;

    let result = engine
        .bulk_return_loans(LENDER, BORROWER, Some("cube"))
        .await
        .unwrap();
    assert_eq!(
        result,
        BulkReturn {
            rows_deleted: 2,
            cards_returned: 3,
        }
    );

    let left = engine.loans(LENDER, BORROWER, None).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].tag, "legacy");
}

#[tokio::test]
async fn bulk_return_without_tag_clears_the_borrower_only() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], Some("cube")).await;
    lend(&engine, &["1 Bar"], None).await;
    engine
        .insert_loans(InsertLoansCmd::new(["5 Foo"], LENDER, OTHER_BORROWER, "Carol"))
        .await
        .unwrap();

    let result = engine
        .bulk_return_loans(LENDER, BORROWER, None)
        .await
        .unwrap();
    assert_eq!(result.rows_deleted, 2);
    assert_eq!(result.cards_returned, 3);

    assert!(engine.loans(LENDER, BORROWER, None).await.unwrap().is_empty());
    assert_eq!(
        engine.loans(LENDER, OTHER_BORROWER, None).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn query_tag_semantics_and_idempotence() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["1 Foo"], Some("X")).await;
    lend(&engine, &["1 Bar"], Some("Y")).await;
    lend(&engine, &["1 Baz"], None).await;

    let all = engine.loans(LENDER, BORROWER, Some("")).await.unwrap();
    assert_eq!(all.len(), 3);

    let tagged = engine.loans(LENDER, BORROWER, Some("X")).await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].card, "Foo");

    let again = engine.loans(LENDER, BORROWER, Some("")).await.unwrap();
    assert_eq!(all, again);
}

#[tokio::test]
async fn all_loans_and_summary_span_borrowers() {
    let (engine, _db) = engine_with_db().await;

    lend(&engine, &["2 Foo"], Some("cube")).await;
    lend(&engine, &["1 Bar"], Some("cube")).await;
    lend(&engine, &["1 Baz"], None).await;
    engine
        .insert_loans(InsertLoansCmd::new(["5 Foo"], LENDER, OTHER_BORROWER, "Carol").tag("cube"))
        .await
        .unwrap();
    engine
        .insert_loans(InsertLoansCmd::new(["7 Foo"], 9999, BORROWER, "Bob"))
        .await
        .unwrap();

    let all = engine.all_loans(LENDER).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|loan| loan.lender == LENDER));

    let summary = engine.loan_summary(LENDER).await.unwrap();
    let rows: Vec<(String, String, i64)> = summary
        .into_iter()
        .map(|row| (row.tag, row.borrower_name, row.quantity))
        .collect();
    assert_eq!(
        rows,
        vec![
            (String::new(), "Bob".to_string(), 1),
            ("cube".to_string(), "Bob".to_string(), 3),
            ("cube".to_string(), "Carol".to_string(), 5),
        ]
    );
}

#[tokio::test]
async fn purge_removes_every_loan() {
    let (engine, db) = engine_with_db().await;

    lend(&engine, &["2 Foo", "1 Bar"], None).await;
    engine
        .insert_loans(InsertLoansCmd::new(["5 Foo"], 9999, OTHER_BORROWER, "Carol"))
        .await
        .unwrap();

    assert_eq!(engine.purge_loans().await.unwrap(), 3);
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn tags_are_trimmed_on_insert_and_filter() {
    let (engine, _db) = engine_with_db().await;
    lend(&engine, &["2 Foo"], Some(" cube ")).await;

    let loans = engine.loans(LENDER, BORROWER, Some("cube ")).await.unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].tag, "cube");
    assert!(loans[0].is_tagged());
}

#[tokio::test]
async fn insert_rejects_quantities_above_the_limit() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .insert_loans(InsertLoansCmd::new(
            ["9223372036854775807 A", "1 B"],
            LENDER,
            BORROWER,
            "Bob",
        ))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::CardListInput(vec!["9223372036854775807 A".to_string()])
    );
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn return_reports_overflowing_stored_quantities() {
    let (engine, db) = engine_with_db().await;

    // Rows written before the quantity limit existed.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO card_loans (id, card, lender, borrower, borrower_name, quantity, tag, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            Uuid::now_v7().into(),
            "A".into(),
            LENDER.into(),
            BORROWER.into(),
            "Bob".into(),
            i64::MAX.into(),
            "".into(),
            Utc::now().into(),
        ],
    ))
    .await
    .unwrap();
    lend(&engine, &["1 A"], None).await;

    let err = engine
        .return_loans(ReturnLoansCmd::new(["1 A"], LENDER, BORROWER))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuantityOverflow(_)));
    assert_eq!(row_count(&db).await, 2);

    let err = engine
        .total_outstanding(LENDER, BORROWER, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuantityOverflow(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_returns_never_return_more_than_lent() {
    let (engine, _db, path) = engine_with_file_db().await;
    let engine = Arc::new(engine);

    lend(&engine, &["3 Foo"], None).await;
    lend(&engine, &["2 Foo"], None).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .return_loans(ReturnLoansCmd::new(["2 Foo"], LENDER, BORROWER))
                .await
        });
    }

    let mut returned = 0;
    while let Some(result) = tasks.join_next().await {
        // Losers either see a shortfall or a busy database; both roll back.
        if let Ok(count) = result.unwrap() {
            assert_eq!(count, 2);
            returned += count;
        }
    }

    let left = engine.loans(LENDER, BORROWER, None).await.unwrap();
    let outstanding: i64 = left.iter().map(|loan| loan.quantity).sum();
    assert!(returned <= 5);
    assert_eq!(returned + outstanding, 5);
    assert!(left.iter().all(|loan| loan.quantity > 0));

    drop(engine);
    let _ = std::fs::remove_file(path);
}
