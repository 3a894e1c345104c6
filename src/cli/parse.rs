use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::banks::BankParserRegistry;
use crate::error::{ExtratoError, Result};
use crate::models::{ParseOptions, ParseResult};
use crate::pipeline::parse_statement;

use super::{colored_amount, date_range};

pub fn run(file: &str, format: Option<&str>, from: Option<&str>, to: Option<&str>, json: bool) -> Result<()> {
    let path = Path::new(file);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExtratoError::UnsupportedFile(file.to_string()))?;
    let options = ParseOptions::default().with_range(date_range(from, to)?);
    let registry = BankParserRegistry::default_order();
    let result = parse_statement(&registry, path, file_name, &options, format)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print_result(&result);
    Ok(())
}

fn print_result(result: &ParseResult) {
    let bank = result.bank_name.as_deref().unwrap_or("generic");
    println!(
        "{} ({} transactions, {} rows processed)",
        bank.bold(),
        result.transactions.len(),
        result.total_processed
    );

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Type", "Amount"]);
    for tx in &result.transactions {
        table.add_row(vec![
            Cell::new(tx.date.format("%d/%m/%Y")),
            Cell::new(&tx.description),
            Cell::new(tx.kind),
            Cell::new(colored_amount(tx.signed_amount())),
        ]);
    }
    println!("{table}");

    for error in &result.errors {
        println!("{}", error.yellow());
    }
}
