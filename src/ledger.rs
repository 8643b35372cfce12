// 📒 Ledger - purchase/sale transactions and their analytical accounts

use crate::rules::RuleSet;
use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    #[serde(alias = "Purchase", alias = "PURCHASE")]
    Purchase,
    #[serde(alias = "Sale", alias = "SALE")]
    Sale,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sale => "sale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identity (UUID when the source has none)
    pub id: String,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub description: String,
    pub amount: f64,
    pub quantity: u32,

    /// Cost center chosen explicitly by the user, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
}

impl Transaction {
    /// Analytical account for this transaction.
    ///
    /// An explicit, non-blank cost center wins; otherwise the description is classified.
    pub fn account<'a>(&'a self, rules: &'a RuleSet) -> &'a str {
        match self.cost_center.as_deref().map(str::trim) {
            Some(cost_center) if !cost_center.is_empty() => cost_center,
            _ => rules.classify(Some(&self.description)),
        }
    }

    /// True when the account came from the classifier rather than the user
    pub fn is_auto_assigned(&self) -> bool {
        self.cost_center
            .as_deref()
            .map_or(true, |cc| cc.trim().is_empty())
    }
}

/// Row as it appears in `transactions.csv`; every column except date/kind/amount is optional
#[derive(Debug, Deserialize)]
struct TransactionRecord {
    #[serde(default)]
    id: Option<String>,
    date: NaiveDate,
    kind: TransactionKind,
    #[serde(default)]
    description: Option<String>,
    amount: f64,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    cost_center: Option<String>,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        Transaction {
            id: record
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(new_id),
            date: record.date,
            kind: record.kind,
            description: record.description.unwrap_or_default(),
            amount: record.amount,
            quantity: record.quantity.unwrap_or(1),
            cost_center: record.cost_center.filter(|cc| !cc.trim().is_empty()),
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Load transactions from CSV with header `id,date,kind,description,amount,quantity,cost_center`
pub fn load_transactions(csv_path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open transactions CSV: {:?}", csv_path))?;

    let mut transactions = Vec::new();

    for (row, result) in rdr.deserialize().enumerate() {
        // row 1 is the header
        let record: TransactionRecord = result
            .with_context(|| format!("Failed to deserialize transaction on line {}", row + 2))?;
        transactions.push(Transaction::from(record));
    }

    tracing::info!(
        path = %csv_path.display(),
        count = transactions.len(),
        "loaded transactions"
    );
    Ok(transactions)
}

// ============================================================================
// ENTRY FORM
// ============================================================================

/// Transaction being typed in the entry form (raw text fields)
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    /// None = today
    pub date: Option<NaiveDate>,
    pub kind: TransactionKind,
    pub description: String,
    pub amount: String,

    /// Explicit cost center; blank means "let the classifier decide"
    pub cost_center: Option<String>,
}

impl TransactionDraft {
    /// Live suggestion shown while the description is being typed
    pub fn suggested_account<'a>(&self, rules: &'a RuleSet) -> &'a str {
        rules.classify(Some(&self.description))
    }

    /// Validate the draft and turn it into a transaction.
    ///
    /// The cost center is always filled in: the user's choice when given,
    /// the classifier's suggestion otherwise.
    pub fn submit(&self, rules: &RuleSet) -> Result<Transaction> {
        let amount_text = self.amount.trim();
        let amount: f64 = amount_text
            .parse()
            .with_context(|| format!("Invalid amount: '{}'", amount_text))?;
        if !amount.is_finite() || amount <= 0.0 {
            bail!("Amount must be a positive number, got {}", amount_text);
        }

        let cost_center = match self.cost_center.as_deref().map(str::trim) {
            Some(cc) if !cc.is_empty() => cc.to_string(),
            _ => self.suggested_account(rules).to_string(),
        };

        let transaction = Transaction {
            id: new_id(),
            date: self.date.unwrap_or_else(|| Local::now().date_naive()),
            kind: self.kind,
            description: self.description.trim().to_string(),
            amount,
            quantity: 1,
            cost_center: Some(cost_center),
        };

        tracing::debug!(
            id = %transaction.id,
            account = transaction.cost_center.as_deref().unwrap_or_default(),
            "transaction submitted"
        );
        Ok(transaction)
    }
}

// ============================================================================
// AGGREGATES (dashboard)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTotal {
    pub account: String,
    pub count: usize,
    pub total: f64,
}

/// Count and total per analytical account, largest total first
pub fn account_breakdown(transactions: &[Transaction], rules: &RuleSet) -> Vec<AccountTotal> {
    let mut totals: HashMap<&str, (usize, f64)> = HashMap::new();

    for tx in transactions {
        let entry = totals.entry(tx.account(rules)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += tx.amount;
    }

    let mut result: Vec<AccountTotal> = totals
        .into_iter()
        .map(|(account, (count, total))| AccountTotal {
            account: account.to_string(),
            count,
            total,
        })
        .collect();

    result.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.account.cmp(&b.account))
    });
    result
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// "YYYY-MM"
    pub month: String,
    pub total: f64,
}

/// Totals per calendar month for one kind of transaction, oldest month first
pub fn monthly_totals(transactions: &[Transaction], kind: TransactionKind) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();

    for tx in transactions.iter().filter(|tx| tx.kind == kind) {
        *months.entry(tx.date.format("%Y-%m").to_string()).or_insert(0.0) += tx.amount;
    }

    months
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tx(description: &str, amount: f64, cost_center: Option<&str>) -> Transaction {
        Transaction {
            id: new_id(),
            date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            kind: TransactionKind::Purchase,
            description: description.to_string(),
            amount,
            quantity: 1,
            cost_center: cost_center.map(str::to_string),
        }
    }

    #[test]
    fn test_account_prefers_explicit_cost_center() {
        let rules = RuleSet::default();

        let auto = tx("Teak planks", 100.0, None);
        assert_eq!(auto.account(&rules), "Production");
        assert!(auto.is_auto_assigned());

        let manual = tx("Teak planks", 100.0, Some("Marketing"));
        assert_eq!(manual.account(&rules), "Marketing");
        assert!(!manual.is_auto_assigned());

        let blank = tx("Teak planks", 100.0, Some("  "));
        assert_eq!(blank.account(&rules), "Production");
    }

    #[test]
    fn test_draft_live_suggestion() {
        let rules = RuleSet::default();
        let mut draft = TransactionDraft::default();
        assert_eq!(draft.suggested_account(&rules), "General");

        for (typed, expected) in [("T", "Uncategorized"), ("Tru", "Uncategorized"), ("Truck", "Logistics")] {
            draft.description = typed.to_string();
            assert_eq!(draft.suggested_account(&rules), expected);
        }
    }

    #[test]
    fn test_draft_submit_assigns_cost_center() {
        let rules = RuleSet::default();
        let draft = TransactionDraft {
            date: NaiveDate::from_ymd_opt(2026, 2, 1),
            description: " Fuel for delivery van ".to_string(),
            amount: "2450.50".to_string(),
            ..Default::default()
        };

        let tx = draft.submit(&rules).unwrap();
        assert_eq!(tx.cost_center.as_deref(), Some("Logistics"));
        assert_eq!(tx.description, "Fuel for delivery van");
        assert_eq!(tx.amount, 2450.50);
        assert!(!tx.id.is_empty());

        let chosen = TransactionDraft {
            cost_center: Some("Administrative".to_string()),
            ..draft
        };
        assert_eq!(
            chosen.submit(&rules).unwrap().cost_center.as_deref(),
            Some("Administrative")
        );
    }

    #[test]
    fn test_draft_submit_rejects_bad_amount() {
        let rules = RuleSet::default();
        for amount in ["", "abc", "0", "-5", "NaN"] {
            let draft = TransactionDraft {
                description: "Oak".to_string(),
                amount: amount.to_string(),
                ..Default::default()
            };
            assert!(draft.submit(&rules).is_err(), "amount {:?}", amount);
        }
    }

    #[test]
    fn test_load_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(
            &path,
            "id,date,kind,description,amount,quantity,cost_center\n\
             t1,2026-01-05,purchase,Plywood sheets,12000,10,\n\
             ,2026-01-06,sale,Sofa set,45000,,\n\
             t3,2026-01-07,purchase,Expo stall,8000,1,Administrative\n",
        )
        .unwrap();

        let txs = load_transactions(&path).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].id, "t1");
        assert_eq!(txs[0].quantity, 10);
        assert_eq!(txs[0].cost_center, None);
        assert!(!txs[1].id.is_empty());
        assert_eq!(txs[1].kind, TransactionKind::Sale);
        assert_eq!(txs[1].quantity, 1);
        assert_eq!(txs[2].cost_center.as_deref(), Some("Administrative"));
    }

    #[test]
    fn test_load_transactions_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(
            &path,
            "id,date,kind,description,amount,quantity,cost_center\n\
             t1,2026-01-05,purchase,Oak,100,1,\n\
             t2,not-a-date,purchase,Oak,100,1,\n",
        )
        .unwrap();

        let err = load_transactions(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }

    #[test]
    fn test_account_breakdown() {
        let rules = RuleSet::default();
        let txs = vec![
            tx("Teak logs", 500.0, None),
            tx("Oak veneer", 300.0, None),
            tx("Truck hire", 1000.0, None),
            tx("Misc", 50.0, None),
        ];

        let breakdown = account_breakdown(&txs, &rules);
        assert_eq!(breakdown[0].account, "Logistics");
        assert_eq!(breakdown[1].account, "Production");
        assert_eq!(breakdown[1].count, 2);
        assert_eq!(breakdown[1].total, 800.0);
        assert_eq!(breakdown[2].account, "Uncategorized");
    }

    #[test]
    fn test_monthly_totals() {
        let mut feb = tx("Oak", 200.0, None);
        feb.date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let mut sale = tx("Sofa", 999.0, None);
        sale.kind = TransactionKind::Sale;

        let txs = vec![feb, tx("Teak", 100.0, None), tx("Fuel", 50.0, None), sale];
        let months = monthly_totals(&txs, TransactionKind::Purchase);

        assert_eq!(
            months,
            vec![
                MonthlyTotal { month: "2026-01".into(), total: 150.0 },
                MonthlyTotal { month: "2026-02".into(), total: 200.0 },
            ]
        );
    }
}
