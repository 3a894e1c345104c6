use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DEFAULT_BUDGET: &str = "default";
pub const DEFAULT_ACCOUNT: &str = "default";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS budgets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    budget_id TEXT NOT NULL,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL,
    institution TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (budget_id) REFERENCES budgets(id)
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    budget_id TEXT NOT NULL,
    name TEXT NOT NULL,
    category_type TEXT NOT NULL,
    FOREIGN KEY (budget_id) REFERENCES budgets(id)
);

CREATE TABLE IF NOT EXISTS import_sessions (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    file_type TEXT NOT NULL,
    account_id TEXT NOT NULL,
    budget_id TEXT NOT NULL,
    status TEXT NOT NULL,
    total_transactions INTEGER NOT NULL DEFAULT 0,
    bank_name TEXT,
    error_message TEXT,
    checksum TEXT,
    created_at TEXT NOT NULL,
    processed_at TEXT
);

CREATE TABLE IF NOT EXISTS temp_transactions (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    description TEXT NOT NULL,
    amount TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    date TEXT NOT NULL,
    original_data TEXT NOT NULL,
    is_duplicate INTEGER NOT NULL DEFAULT 0,
    duplicate_reason TEXT,
    existing_transaction_id TEXT,
    similarity REAL NOT NULL DEFAULT 0,
    is_classified INTEGER NOT NULL DEFAULT 0,
    category_id TEXT,
    FOREIGN KEY (session_id) REFERENCES import_sessions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    budget_id TEXT NOT NULL,
    category_id TEXT,
    description TEXT NOT NULL,
    amount TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    date TEXT NOT NULL,
    import_session_id TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (import_session_id) REFERENCES import_sessions(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, date);
CREATE INDEX IF NOT EXISTS idx_temp_session ON temp_transactions(session_id);
CREATE INDEX IF NOT EXISTS idx_sessions_checksum ON import_sessions(account_id, checksum);
";

// (id, name, category_type)
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    // Receitas
    ("salario", "Salário", "INCOME"),
    ("rendimentos", "Rendimentos", "INCOME"),
    ("reembolsos", "Reembolsos", "INCOME"),
    ("outras-receitas", "Outras Receitas", "INCOME"),
    // Despesas
    ("alimentacao", "Alimentação", "EXPENSE"),
    ("mercado", "Mercado", "EXPENSE"),
    ("transporte", "Transporte", "EXPENSE"),
    ("moradia", "Moradia", "EXPENSE"),
    ("contas", "Contas e Serviços", "EXPENSE"),
    ("saude", "Saúde", "EXPENSE"),
    ("educacao", "Educação", "EXPENSE"),
    ("lazer", "Lazer", "EXPENSE"),
    ("compras", "Compras", "EXPENSE"),
    ("assinaturas", "Assinaturas", "EXPENSE"),
    ("impostos", "Impostos e Taxas", "EXPENSE"),
    ("tarifas", "Tarifas Bancárias", "EXPENSE"),
    ("transferencias", "Transferências", "EXPENSE"),
    ("outros", "Outros", "EXPENSE"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let budgets: i64 = conn.query_row("SELECT count(*) FROM budgets", [], |row| row.get(0))?;
    if budgets == 0 {
        conn.execute(
            "INSERT INTO budgets (id, name) VALUES (?1, 'Orçamento')",
            [DEFAULT_BUDGET],
        )?;
        conn.execute(
            "INSERT INTO accounts (id, budget_id, name, account_type) VALUES (?1, ?2, 'Conta principal', 'checking')",
            [DEFAULT_ACCOUNT, DEFAULT_BUDGET],
        )?;
    }

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (id, budget_id, name, category_type) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![cat.0, DEFAULT_BUDGET, cat.1, cat.2],
            )?;
        }
    }
    Ok(())
}
