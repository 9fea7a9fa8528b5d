use std::{
    error::Error,
    io::{self, Read},
    path::Path,
    process::ExitCode,
};

use clap::Parser;
use engine::{Engine, InsertLoansCmd, LoanRecord, LoanSummary, ReturnLoansCmd};
use migration::{Migrator, MigratorTrait};

use cli::{Cli, Command, MigrateAction};

mod cli;
mod settings;

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "card_lender={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let database = sea_orm::Database::connect(&url).await?;

    if let Command::Migrate { action } = cli.command {
        return migrate(&database, action).await;
    }

    Migrator::up(&database, None).await?;
    tracing::debug!("database ready");
    let engine = Engine::builder().database(database).build().await?;

    match cli.command {
        Command::Loan(args) => {
            let lines = read_card_list(args.file.as_deref())?;
            let mut cmd = InsertLoansCmd::new(
                lines,
                args.scope.lender,
                args.scope.borrower,
                args.borrower_name.as_str(),
            );
            if let Some(tag) = args.scope.tag {
                cmd = cmd.tag(tag);
            }
            let inserted = engine.insert_loans(cmd).await?;
            println!(
                "{} loaned {inserted} card(s) to {}",
                args.scope.lender, args.scope.borrower
            );
        }
        Command::Return(args) => {
            let lines = read_card_list(args.file.as_deref())?;
            let mut cmd = ReturnLoansCmd::new(lines, args.scope.lender, args.scope.borrower);
            if let Some(tag) = args.scope.tag {
                cmd = cmd.tag(tag);
            }
            let returned = engine.return_loans(cmd).await?;
            println!(
                "{} returned {returned} card(s) to {}",
                args.scope.borrower, args.scope.lender
            );
        }
        Command::BulkReturn(scope) => {
            let result = engine
                .bulk_return_loans(scope.lender, scope.borrower, scope.tag.as_deref())
                .await?;
            println!(
                "{} returned {} card(s) to {} ({} loan(s) closed)",
                scope.borrower, result.cards_returned, scope.lender, result.rows_deleted
            );
        }
        Command::Loans(args) => {
            let scope = args.scope;
            let loans = engine
                .loans(scope.lender, scope.borrower, scope.tag.as_deref())
                .await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&loans)?);
            } else {
                let total = loans
                    .iter()
                    .try_fold(0i64, |acc, loan| acc.checked_add(loan.quantity))
                    .ok_or("quantity overflow: loans")?;
                println!(
                    "{} has loaned {total} card(s) to {}\n",
                    scope.lender, scope.borrower
                );
                print!("{}", loan_table(&loans));
            }
        }
        Command::AllLoans(args) => {
            let loans = engine.all_loans(args.lender).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&loans)?);
            } else {
                print!("{}", loan_table(&loans));
            }
        }
        Command::Summary(args) => {
            let summary = engine.loan_summary(args.lender).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary_table(&summary));
            }
        }
        Command::Purge => {
            let rows = engine.purge_loans().await?;
            println!("deleted {rows} loan(s)");
        }
        Command::Migrate { .. } => unreachable!("handled before the engine is built"),
    }

    Ok(())
}

async fn migrate(database: &sea_orm::DatabaseConnection, action: MigrateAction) -> AppResult<()> {
    match action {
        MigrateAction::Up => Migrator::up(database, None).await?,
        MigrateAction::Down => Migrator::down(database, None).await?,
        MigrateAction::Fresh => Migrator::fresh(database).await?,
        MigrateAction::Status => Migrator::status(database).await?,
    }
    tracing::info!(?action, "migration finished");
    Ok(())
}

/// Reads the card list from `file`, or stdin when absent. Blank lines are skipped.
fn read_card_list(file: Option<&Path>) -> AppResult<Vec<String>> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(non_blank_lines(&text))
}

fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(ToString::to_string)
        .collect()
}

fn loan_table(loans: &[LoanRecord]) -> String {
    let mut out = format!("{:<30} {:<10} {:<10} {:<12}\n", "Name", "Quantity", "Tag", "Date");
    for loan in loans {
        out.push_str(&format!(
            "{:<30} {:<10} {:<10} {:<12}\n",
            loan.card,
            loan.quantity,
            loan.tag,
            loan.created_at.format("%m/%d/%Y")
        ));
    }
    out
}

fn summary_table(summary: &[LoanSummary]) -> String {
    let mut out = format!("{:<25} {:<10} {:<10}\n", "Borrower", "Tag", "Count");
    for row in summary {
        let tag = if row.tag.is_empty() { "<empty>" } else { row.tag.as_str() };
        out.push_str(&format!(
            "{:<25} {:<10} {:<10}\n",
            row.borrower_name, tag, row.quantity
        ));
    }
    out
}
