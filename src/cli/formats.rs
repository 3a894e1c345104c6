use comfy_table::{Cell, Table};

use crate::banks::BankParserRegistry;
use crate::error::Result;

pub fn run() -> Result<()> {
    let registry = BankParserRegistry::default_order();
    let mut table = Table::new();
    table.set_header(vec!["Key", "Bank", "Account", "Files"]);
    for parser in registry.parsers() {
        let files: Vec<&str> = parser.file_types().iter().map(|t| t.as_str()).collect();
        table.add_row(vec![
            Cell::new(parser.key()),
            Cell::new(parser.bank_name()),
            Cell::new(parser.account_type().as_str()),
            Cell::new(files.join(", ")),
        ]);
    }
    println!("Bank formats (detected in this order)\n{table}");
    println!("Unrecognized files fall back to the generic CSV, Excel and PDF parsers.");
    Ok(())
}
