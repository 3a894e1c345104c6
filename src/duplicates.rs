//! Duplicate detection against transactions already in the ledger.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use strsim::levenshtein;
use tracing::debug;

use crate::error::Result;
use crate::models::{DuplicateResult, ParsedTransaction, Transaction};
use crate::store::ImportStore;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Days either side of the candidate date to load existing rows for.
    pub window_days: i64,
    /// Days either side within which a description match counts.
    pub fuzzy_window_days: i64,
    /// Similarity strictly above this marks a fuzzy duplicate.
    pub similarity_threshold: f64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            window_days: 15,
            fuzzy_window_days: 3,
            similarity_threshold: 0.8,
        }
    }
}

/// Normalized edit-distance similarity of two descriptions in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Compare one candidate against already-loaded transactions. Amounts are
/// compared by magnitude, whatever the transaction type.
pub fn match_against(
    candidate: &ParsedTransaction,
    existing: &[Transaction],
    config: &DuplicateConfig,
) -> DuplicateResult {
    let same_amount = existing.iter().filter(|t| t.amount.abs() == candidate.amount.abs());

    let mut best: Option<(&Transaction, f64)> = None;
    for tx in same_amount {
        if tx.date == candidate.date {
            return DuplicateResult {
                is_duplicate: true,
                reason: Some("identical transaction found".to_string()),
                existing_transaction_id: Some(tx.id.clone()),
                similarity: 1.0,
            };
        }
        if (tx.date - candidate.date).num_days().abs() > config.fuzzy_window_days {
            continue;
        }
        let score = similarity(&candidate.description, &tx.description);
        if score > config.similarity_threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((tx, score));
        }
    }

    match best {
        Some((tx, score)) => DuplicateResult {
            is_duplicate: true,
            reason: Some(format!("similar transaction found ({:.0}% similar)", score * 100.0)),
            existing_transaction_id: Some(tx.id.clone()),
            similarity: score,
        },
        None => DuplicateResult::unique(),
    }
}

pub struct DuplicateDetector<'a, S: ImportStore + ?Sized> {
    store: &'a S,
    config: DuplicateConfig,
}

impl<'a, S: ImportStore + ?Sized> DuplicateDetector<'a, S> {
    pub fn new(store: &'a S, config: DuplicateConfig) -> Self {
        Self { store, config }
    }

    pub fn check_duplicate(&self, candidate: &ParsedTransaction, account_id: &str) -> Result<DuplicateResult> {
        let window = Duration::days(self.config.window_days);
        let existing = self.store.find_existing_transactions(
            account_id,
            candidate.date - window,
            candidate.date + window,
        )?;
        Ok(match_against(candidate, &existing, &self.config))
    }

    /// Check each candidate independently; candidates never match each other.
    pub fn process_batch(
        &self,
        candidates: Vec<ParsedTransaction>,
        account_id: &str,
    ) -> Result<Vec<(ParsedTransaction, DuplicateResult)>> {
        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let result = self.check_duplicate(&candidate, account_id)?;
            out.push((candidate, result));
        }
        let flagged = out.iter().filter(|(_, d)| d.is_duplicate).count();
        debug!(account_id, checked = out.len(), flagged, "duplicate check finished");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OriginalData, TransactionType};
    use crate::store::memory::MemoryStore;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn candidate(description: &str, amount: &str, day: u32) -> ParsedTransaction {
        ParsedTransaction {
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            kind: TransactionType::Expense,
            date: ymd(day),
            original_data: OriginalData::new(),
        }
    }

    fn existing(id: &str, description: &str, amount: &str, day: u32) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "acc".to_string(),
            budget_id: "budget".to_string(),
            category_id: None,
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            kind: TransactionType::Expense,
            date: ymd(day),
            import_session_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_similarity_properties() {
        assert_eq!(similarity("Padaria", "Padaria"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("  UBER  ", "uber"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        let ab = similarity("PIX ENVIADO FULANO", "PIX ENVIADO FULANA");
        assert_eq!(ab, similarity("PIX ENVIADO FULANA", "PIX ENVIADO FULANO"));
        assert!(ab > 0.9 && ab < 1.0);
    }

    #[test]
    fn test_exact_match_same_day() {
        let config = DuplicateConfig::default();
        let result = match_against(
            &candidate("Totally different", "50.00", 10),
            &[existing("t1", "Mercado", "50.00", 10)],
            &config,
        );
        assert!(result.is_duplicate);
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.reason.as_deref(), Some("identical transaction found"));
        assert_eq!(result.existing_transaction_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_equal_amount_same_day_ignores_type() {
        let config = DuplicateConfig::default();
        let mut income = candidate("PIX RECEBIDO", "50.00", 10);
        income.kind = TransactionType::Income;
        let result = match_against(&income, &[existing("t1", "PIX ENVIADO", "50.00", 10)], &config);
        assert!(result.is_duplicate);
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.existing_transaction_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_fuzzy_match_within_window() {
        let config = DuplicateConfig::default();
        let rows = [
            existing("far", "PIX ENVIADO FULANO", "50.00", 20),
            existing("near", "PIX ENVIADO FULANA", "50.00", 12),
            existing("other-amount", "PIX ENVIADO FULANO", "51.00", 10),
        ];
        let result = match_against(&candidate("PIX ENVIADO FULANO", "50.00", 10), &rows, &config);
        assert!(result.is_duplicate);
        assert_eq!(result.existing_transaction_id.as_deref(), Some("near"));
        assert_eq!(result.reason.as_deref(), Some("similar transaction found (94% similar)"));
    }

    #[test]
    fn test_dissimilar_or_distant_is_unique() {
        let config = DuplicateConfig::default();
        let rows = [existing("t1", "Padaria Real", "50.00", 11)];
        assert!(!match_against(&candidate("Posto Shell", "50.00", 10), &rows, &config).is_duplicate);
        let rows = [existing("t1", "Padaria Real", "50.00", 5)];
        assert!(!match_against(&candidate("Padaria Real", "50.00", 10), &rows, &config).is_duplicate);
    }

    #[test]
    fn test_detector_uses_store_window() {
        let store = MemoryStore::new();
        store.add_transaction(existing("t1", "Mercado", "50.00", 10));
        let detector = DuplicateDetector::new(&store, DuplicateConfig::default());
        let batch = detector
            .process_batch(vec![candidate("Mercado", "50.00", 10), candidate("Mercado", "50.00", 10)], "acc")
            .unwrap();
        assert!(batch.iter().all(|(_, d)| d.is_duplicate));
        let other = detector.check_duplicate(&candidate("Mercado", "50.00", 10), "other-acc").unwrap();
        assert!(!other.is_duplicate);
    }
}
