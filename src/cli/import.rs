use std::path::Path;

use colored::Colorize;

use crate::error::{ExtratoError, Result};
use crate::session::UploadedFile;
use crate::settings::load_settings;

use super::{date_range, open_service};

pub fn run(
    file: &str,
    account: Option<&str>,
    budget: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let account = account.unwrap_or(&settings.default_account);
    let budget = budget.unwrap_or(&settings.default_budget);
    let range = date_range(from, to)?;

    let service = open_service()?;
    let upload = UploadedFile::read(Path::new(file))?;
    let summary = match service.upload(&upload, account, budget, range) {
        Ok(summary) => summary,
        Err(ExtratoError::NoTransactions { session_id, errors }) => {
            for error in &errors {
                eprintln!("{}", error.yellow());
            }
            return Err(ExtratoError::NoTransactions { session_id, errors });
        }
        Err(e) => return Err(e),
    };

    println!(
        "Session {}: {} transactions staged from {}",
        summary.session_id.bold(),
        summary.total_transactions,
        summary.bank_name.as_deref().unwrap_or("generic parser"),
    );
    if summary.duplicates_found > 0 {
        println!(
            "{}",
            format!("{} possible duplicates flagged", summary.duplicates_found).yellow()
        );
    }
    for error in &summary.errors {
        println!("{}", error.yellow());
    }
    println!("Review with `extrato show {}`", summary.session_id);
    Ok(())
}
