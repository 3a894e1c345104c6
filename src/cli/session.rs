use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::brl;
use crate::models::{SessionStatus, TransactionType};

use super::{colored_amount, open_service};

fn status_label(status: SessionStatus) -> String {
    match status {
        SessionStatus::Pending => status.as_str().yellow().to_string(),
        SessionStatus::Completed => status.as_str().green().to_string(),
        SessionStatus::Error => status.as_str().red().to_string(),
        _ => status.as_str().to_string(),
    }
}

pub fn show(session_id: &str) -> Result<()> {
    let service = open_service()?;
    let details = service.get_session_details(session_id)?;
    let session = &details.session;

    println!(
        "{} {} [{}] {}",
        "Session".bold(),
        session.id,
        status_label(session.status),
        session.filename
    );
    if let Some(bank) = &session.bank_name {
        println!("Bank: {bank}");
    }
    if let Some(message) = &session.error_message {
        println!("{}", message.red());
    }

    let category_name = |id: &str| {
        details
            .available_categories
            .iter()
            .find(|c| c.id == id)
            .map_or_else(|| id.to_string(), |c| c.name.clone())
    };

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Duplicate", "Category"]);
    for tx in &details.transactions {
        let duplicate = if tx.is_duplicate {
            tx.duplicate_reason.clone().unwrap_or_default().yellow().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(&tx.id),
            Cell::new(tx.date.format("%d/%m/%Y")),
            Cell::new(&tx.description),
            Cell::new(colored_amount(tx.kind.apply_sign(tx.amount))),
            Cell::new(duplicate),
            Cell::new(tx.category_id.as_deref().map(|id| category_name(id)).unwrap_or_default()),
        ]);
    }
    println!("{table}");

    let s = &details.summary;
    println!(
        "{} total, {} classified, {} unclassified, {} duplicates",
        s.total, s.classified, s.unclassified, s.duplicates
    );
    println!("Income {}  Expenses {}", brl(s.income_total).green(), brl(s.expense_total).red());

    if session.status == SessionStatus::Pending && !details.available_categories.is_empty() {
        let mut categories = Table::new();
        categories.set_header(vec!["Category", "Name", "Type"]);
        for c in &details.available_categories {
            let kind = match c.kind {
                TransactionType::Income => "income",
                TransactionType::Expense => "expense",
            };
            categories.add_row(vec![Cell::new(&c.id), Cell::new(&c.name), Cell::new(kind)]);
        }
        println!("{categories}");
    }
    Ok(())
}

pub fn classify(temp_id: &str, category_id: &str) -> Result<()> {
    let service = open_service()?;
    let tx = service.classify_transaction(temp_id, category_id)?;
    println!("{} -> {category_id}", tx.description);
    Ok(())
}

pub fn confirm(session_id: &str, import_duplicates: bool) -> Result<()> {
    let service = open_service()?;
    let summary = service.confirm_import(session_id, import_duplicates)?;
    println!("{} transactions imported", summary.imported_count.to_string().green());
    if summary.discarded_unclassified > 0 {
        println!(
            "{} unclassified transactions discarded",
            summary.discarded_unclassified.to_string().yellow()
        );
    }
    Ok(())
}

pub fn cancel(session_id: &str) -> Result<()> {
    let service = open_service()?;
    service.cancel_session(session_id)?;
    println!("Session {session_id} cancelled");
    Ok(())
}

pub fn list(budget: Option<&str>) -> Result<()> {
    let service = open_service()?;
    let sessions = service.list_sessions(budget)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Created", "File", "Bank", "Status", "Rows"]);
    for s in sessions {
        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(s.created_at.format("%d/%m/%Y %H:%M")),
            Cell::new(&s.filename),
            Cell::new(s.bank_name.as_deref().unwrap_or("")),
            Cell::new(status_label(s.status)),
            Cell::new(s.total_transactions),
        ]);
    }
    println!("Import sessions\n{table}");
    Ok(())
}
