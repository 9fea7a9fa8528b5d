use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::MemberId;

#[derive(Parser, Debug)]
#[command(name = "card_lender")]
#[command(about = "Track trading-card loans between group members")]
pub struct Cli {
    /// Settings file (TOML). Defaults to `settings.toml` when present.
    #[arg(long)]
    pub config: Option<String>,

    /// Database connection string, overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lend the cards listed in FILE (or stdin) to a borrower.
    Loan(LoanArgs),
    /// Return the cards listed in FILE (or stdin), oldest loans first.
    Return(ReturnArgs),
    /// Return every card a borrower holds, optionally only for one tag.
    BulkReturn(ScopeArgs),
    /// List loans to one borrower.
    Loans(LoansArgs),
    /// List every loan of a lender.
    AllLoans(LenderArgs),
    /// Outstanding cards per borrower and tag.
    Summary(LenderArgs),
    /// Delete every loan of every member.
    Purge,
    /// Manage the database schema. Other commands apply pending migrations
    /// on their own.
    Migrate {
        #[arg(value_enum, default_value_t = MigrateAction::Up)]
        action: MigrateAction,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MigrateAction {
    Up,
    Down,
    Fresh,
    Status,
}

#[derive(Args, Debug)]
pub struct ScopeArgs {
    #[arg(long)]
    pub lender: MemberId,
    #[arg(long)]
    pub borrower: MemberId,
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct LoanArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// Borrower display name, stored with the loan.
    #[arg(long)]
    pub borrower_name: String,
    /// Card list, one `<quantity> <card name>` per line.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReturnArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoansArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LenderArgs {
    #[arg(long)]
    pub lender: MemberId,
    #[arg(long)]
    pub json: bool,
}
