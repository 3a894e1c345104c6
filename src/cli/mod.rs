pub mod formats;
pub mod import;
pub mod init;
pub mod parse;
pub mod session;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;

use crate::error::{ExtratoError, Result};
use crate::fmt::brl;
use crate::models::DateRange;
use crate::normalize::parse_date;
use crate::session::ImportService;
use crate::settings::load_settings;
use crate::store::SqliteStore;

#[derive(Parser)]
#[command(name = "extrato", about = "Import Brazilian bank statements (CSV, Excel, PDF) into a budget.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for extrato data (default: ~/Documents/extrato)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Parse a statement and print its transactions without saving anything.
    Parse {
        /// Statement file (.csv, .txt, .xls, .xlsx, .pdf)
        file: String,
        /// Force a bank format key (see `extrato formats`)
        #[arg(long)]
        format: Option<String>,
        /// Only keep rows on or after this date (DD/MM/YYYY or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Only keep rows on or before this date
        #[arg(long)]
        to: Option<String>,
        /// Print the parse result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a statement into a new import session for review.
    Import {
        /// Statement file (.csv, .txt, .xls, .xlsx, .pdf)
        file: String,
        /// Account id (default from settings)
        #[arg(long)]
        account: Option<String>,
        /// Budget id (default from settings)
        #[arg(long)]
        budget: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Show an import session with its staged transactions.
    Show {
        session: String,
    },
    /// Assign a category to a staged transaction.
    Classify {
        /// Staged transaction id
        temp_id: String,
        #[arg(long)]
        category: String,
    },
    /// Write classified transactions to the ledger and complete the session.
    Confirm {
        session: String,
        /// Also import rows flagged as possible duplicates
        #[arg(long = "import-duplicates")]
        import_duplicates: bool,
    },
    /// Cancel an import session and discard its staged transactions.
    Cancel {
        session: String,
    },
    /// List import sessions, newest first.
    Sessions {
        #[arg(long)]
        budget: Option<String>,
    },
    /// List the supported bank formats.
    Formats,
}

pub(crate) fn parse_date_arg(raw: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| ExtratoError::Other(format!("Invalid --{flag} date: {s}"))),
    }
}

pub(crate) fn date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>> {
    let start = parse_date_arg(from, "from")?;
    let end = parse_date_arg(to, "to")?;
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    Ok(Some(DateRange::new(start, end)))
}

pub(crate) fn open_service() -> Result<ImportService<SqliteStore>> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(ExtratoError::Settings(format!(
            "no database at {}; run `extrato init` first",
            db_path.display()
        )));
    }
    let store = SqliteStore::open(&db_path)?;
    Ok(ImportService::new(store).with_duplicate_config(settings.duplicate_config()))
}

/// Signed amount, green for income and red for expenses.
pub(crate) fn colored_amount(signed: Decimal) -> String {
    if signed.is_sign_negative() {
        brl(signed).red().to_string()
    } else {
        brl(signed).green().to_string()
    }
}
