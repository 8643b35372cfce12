// 📈 Dashboard Reports
//
// Financial summary, per-cost-center performance and dashboard stats. All of
// them resolve accounts through `Transaction::account`, so they agree with the
// budget report and the ledger on where each transaction belongs.

use crate::budget::{budget_vs_actual, round2, utilization, Budget, BudgetStatus};
use crate::ledger::{Transaction, TransactionKind};
use crate::reconciliation::{InvoiceReconciliation, InvoiceStatus, ReconciliationReport};
use crate::rules::RuleSet;
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default window of the financial summary, in days before the end date
pub const DEFAULT_SUMMARY_DAYS: i64 = 30;

/// Unpaid/partial invoices listed on the dashboard
pub const RECENT_UNPAID_LIMIT: usize = 5;

// ============================================================================
// PERIOD
// ============================================================================

/// Inclusive date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if end_date < start_date {
            bail!("Report period ends ({}) before it starts ({})", end_date, start_date);
        }
        Ok(ReportPeriod {
            start_date,
            end_date,
        })
    }

    /// The `days` days leading up to and including `end_date`
    pub fn last_days(end_date: NaiveDate, days: i64) -> Self {
        let start_date = end_date
            .checked_sub_signed(Duration::days(days.max(0)))
            .unwrap_or(NaiveDate::MIN);
        ReportPeriod {
            start_date,
            end_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

// ============================================================================
// FINANCIAL SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub period: ReportPeriod,
    pub total_sales: f64,
    pub total_purchases: f64,
    pub gross_profit: f64,
    pub transaction_count: usize,

    pub total_invoiced: f64,
    pub total_paid: f64,
    pub outstanding_balance: f64,
    pub invoices_issued: usize,
    pub invoices_paid: usize,
    pub payments_received: usize,
    pub payment_rate: f64,

    pub generated_at: DateTime<Utc>,
}

/// Sales vs purchases inside `period`, alongside the invoice position.
///
/// Invoices carry no issue date, so the invoice figures cover the whole
/// reconciliation report rather than the window.
pub fn financial_summary(
    transactions: &[Transaction],
    reconciliation: &ReconciliationReport,
    period: ReportPeriod,
) -> FinancialSummary {
    let mut total_sales = 0.0;
    let mut total_purchases = 0.0;
    let mut transaction_count = 0;

    for tx in transactions.iter().filter(|tx| period.contains(tx.date)) {
        match tx.kind {
            TransactionKind::Sale => total_sales += tx.amount,
            TransactionKind::Purchase => total_purchases += tx.amount,
        }
        transaction_count += 1;
    }

    let invoices = &reconciliation.summary;
    FinancialSummary {
        period,
        total_sales,
        total_purchases,
        gross_profit: total_sales - total_purchases,
        transaction_count,
        total_invoiced: invoices.total_invoiced,
        total_paid: invoices.total_paid,
        outstanding_balance: invoices.outstanding_balance,
        invoices_issued: invoices.invoices_issued,
        invoices_paid: invoices.invoices_paid,
        payments_received: invoices.payments_recorded,
        payment_rate: invoices.payment_rate,
        generated_at: Utc::now(),
    }
}

// ============================================================================
// COST CENTER PERFORMANCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenterPerformance {
    pub cost_center: String,
    pub total_transactions: usize,
    pub purchase_count: usize,
    pub sale_count: usize,
    pub total_spent: f64,
    /// First budget declared for the cost center; 0 when there is none
    pub budget_amount: f64,
    pub utilization_percentage: f64,
    /// 0 when there is no budget
    pub remaining_budget: f64,
    pub is_over_budget: bool,
}

/// Cost centers in a stable order: rule accounts, then any other account
/// seen on a transaction or a budget
fn cost_centers<'a>(
    transactions: &'a [Transaction],
    budgets: &'a [Budget],
    rules: &'a RuleSet,
) -> Vec<&'a str> {
    let mut centers: Vec<&str> = rules.accounts();
    let seen = transactions
        .iter()
        .map(|tx| tx.account(rules))
        .chain(budgets.iter().map(|b| b.cost_center.trim()));

    for account in seen {
        if !centers.iter().any(|c| c.eq_ignore_ascii_case(account)) {
            centers.push(account);
        }
    }
    centers
}

/// All-time activity per cost center against its budget
pub fn cost_center_performance(
    transactions: &[Transaction],
    budgets: &[Budget],
    rules: &RuleSet,
) -> Vec<CostCenterPerformance> {
    cost_centers(transactions, budgets, rules)
        .into_iter()
        .map(|center| {
            let booked: Vec<&Transaction> = transactions
                .iter()
                .filter(|tx| tx.account(rules).eq_ignore_ascii_case(center))
                .collect();

            let total_spent: f64 = booked.iter().map(|tx| tx.amount).sum();
            let purchase_count = booked
                .iter()
                .filter(|tx| tx.kind == TransactionKind::Purchase)
                .count();

            let budget = budgets.iter().find(|b| b.applies_to(center));
            let budget_amount = budget.map_or(0.0, |b| b.amount);

            CostCenterPerformance {
                cost_center: center.to_string(),
                total_transactions: booked.len(),
                purchase_count,
                sale_count: booked.len() - purchase_count,
                total_spent,
                budget_amount,
                utilization_percentage: utilization(total_spent, budget_amount),
                remaining_budget: budget.map_or(0.0, |b| b.amount - total_spent),
                is_over_budget: total_spent > budget_amount,
            }
        })
        .collect()
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub budget_id: String,
    pub cost_center: String,
    pub budget_amount: f64,
    pub actual_spent: f64,
    pub utilization: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub total_budgets: usize,
    pub total_transactions: usize,
    pub total_invoices: usize,
    pub total_payments: usize,
    pub today_transactions: usize,
    pub today_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub summary: DashboardCounts,
    /// Budgets at or above the near-limit threshold
    pub budget_alerts: Vec<BudgetAlert>,
    pub alert_count: usize,
    /// Unpaid and partial invoices, earliest due date first
    pub recent_unpaid_invoices: Vec<InvoiceReconciliation>,
    pub generated_at: DateTime<Utc>,
}

pub fn dashboard_stats(
    transactions: &[Transaction],
    budgets: &[Budget],
    reconciliation: &ReconciliationReport,
    rules: &RuleSet,
    today: NaiveDate,
) -> DashboardStats {
    let todays: Vec<&Transaction> = transactions.iter().filter(|tx| tx.date == today).collect();
    let today_sales: f64 = todays
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Sale)
        .map(|tx| tx.amount)
        .sum();

    let budget_alerts: Vec<BudgetAlert> = budget_vs_actual(budgets, transactions, rules)
        .details
        .into_iter()
        .filter(|line| line.status() != BudgetStatus::UnderBudget)
        .map(|line| BudgetAlert {
            remaining: line.budget_amount - line.actual_spent,
            utilization: round2(line.utilization_percentage),
            budget_id: line.budget_id,
            cost_center: line.cost_center,
            budget_amount: line.budget_amount,
            actual_spent: line.actual_spent,
        })
        .collect();

    let mut unpaid: Vec<InvoiceReconciliation> = reconciliation
        .invoices
        .iter()
        .filter(|inv| matches!(inv.status, InvoiceStatus::Unpaid | InvoiceStatus::Partial))
        .cloned()
        .collect();
    // Invoices without a due date go last
    unpaid.sort_by_key(|inv| (inv.due_date.is_none(), inv.due_date));
    unpaid.truncate(RECENT_UNPAID_LIMIT);

    tracing::debug!(alerts = budget_alerts.len(), unpaid = unpaid.len(), "dashboard stats computed");

    DashboardStats {
        summary: DashboardCounts {
            total_budgets: budgets.len(),
            total_transactions: transactions.len(),
            total_invoices: reconciliation.summary.invoices_issued,
            total_payments: reconciliation.summary.payments_recorded,
            today_transactions: todays.len(),
            today_sales,
        },
        alert_count: budget_alerts.len(),
        budget_alerts,
        recent_unpaid_invoices: unpaid,
        generated_at: Utc::now(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::{Invoice, Payment, PaymentStatus, ReconciliationEngine};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn tx(description: &str, kind: TransactionKind, amount: f64, on: NaiveDate) -> Transaction {
        Transaction {
            id: description.to_string(),
            date: on,
            kind,
            description: description.to_string(),
            amount,
            quantity: 1,
            cost_center: None,
        }
    }

    fn budget(id: &str, cost_center: &str, amount: f64) -> Budget {
        Budget {
            id: id.to_string(),
            cost_center: cost_center.to_string(),
            amount,
            period_start: date(1, 1),
            period_end: date(1, 31),
        }
    }

    fn invoice(number: &str, amount: f64, due_date: Option<NaiveDate>) -> Invoice {
        Invoice {
            number: number.to_string(),
            customer: "customer@example.com".to_string(),
            item: "Teak bed".to_string(),
            amount,
            due_date,
        }
    }

    fn payment(number: &str, amount: f64, status: PaymentStatus) -> Payment {
        Payment {
            invoice_number: number.to_string(),
            amount,
            method: "cash".to_string(),
            reference: None,
            status,
        }
    }

    fn ledger() -> Vec<Transaction> {
        vec![
            tx("Teak wood", TransactionKind::Purchase, 4_000.0, date(1, 5)),
            tx("Teak dining set", TransactionKind::Sale, 9_000.0, date(1, 10)),
            tx("Expo stall", TransactionKind::Purchase, 950.0, date(1, 12)),
            tx("Truck fuel", TransactionKind::Purchase, 300.0, date(2, 2)),
        ]
    }

    #[test]
    fn test_report_period() {
        let period = ReportPeriod::last_days(date(1, 31), DEFAULT_SUMMARY_DAYS);
        assert_eq!(period.start_date, date(1, 1));
        assert!(period.contains(date(1, 1)));
        assert!(period.contains(date(1, 31)));
        assert!(!period.contains(date(2, 1)));

        assert!(ReportPeriod::new(date(2, 1), date(1, 1)).is_err());
    }

    #[test]
    fn test_financial_summary_window() {
        let invoices = vec![invoice("INV-1", 1_000.0, None), invoice("INV-2", 500.0, None)];
        let payments = vec![
            payment("INV-1", 1_000.0, PaymentStatus::Completed),
            payment("INV-2", 500.0, PaymentStatus::Failed),
        ];
        let reconciliation = ReconciliationEngine::new().reconcile(&invoices, &payments, &RuleSet::default());

        let period = ReportPeriod::new(date(1, 1), date(1, 31)).unwrap();
        let summary = financial_summary(&ledger(), &reconciliation, period);

        assert_eq!(summary.total_sales, 9_000.0);
        assert_eq!(summary.total_purchases, 4_950.0);
        assert_eq!(summary.gross_profit, 4_050.0);
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.total_invoiced, 1_500.0);
        assert_eq!(summary.outstanding_balance, 500.0);
        assert_eq!(summary.payments_received, 2);
        assert_eq!(summary.payment_rate, 50.0);
    }

    #[test]
    fn test_cost_center_performance() {
        let rules = RuleSet::default();
        let budgets = vec![budget("b1", "Production", 10_000.0), budget("b2", "marketing", 900.0)];

        let mut manual = tx("Misc hardware", TransactionKind::Purchase, 40.0, date(1, 3));
        manual.cost_center = Some("Showroom".to_string());
        let mut txs = ledger();
        txs.push(manual);

        let report = cost_center_performance(&txs, &budgets, &rules);
        let names: Vec<&str> = report.iter().map(|p| p.cost_center.as_str()).collect();
        assert_eq!(
            names,
            vec!["Production", "Marketing", "Logistics", "Administrative", "Showroom"]
        );

        let production = &report[0];
        assert_eq!(production.purchase_count, 1);
        assert_eq!(production.sale_count, 1);
        assert_eq!(production.total_spent, 13_000.0);
        assert_eq!(production.remaining_budget, -3_000.0);
        assert_eq!(production.utilization_percentage, 130.0);
        assert!(production.is_over_budget);

        let marketing = &report[1];
        assert_eq!(marketing.budget_amount, 900.0);
        assert!(marketing.is_over_budget);

        // no budget: nothing remaining, any spend is over
        let logistics = &report[2];
        assert_eq!(logistics.total_spent, 300.0);
        assert_eq!(logistics.budget_amount, 0.0);
        assert_eq!(logistics.remaining_budget, 0.0);
        assert_eq!(logistics.utilization_percentage, 0.0);
        assert!(logistics.is_over_budget);

        let administrative = &report[3];
        assert_eq!(administrative.total_transactions, 0);
        assert!(!administrative.is_over_budget);
    }

    #[test]
    fn test_dashboard_stats() {
        let rules = RuleSet::default();
        let budgets = vec![
            budget("b1", "Production", 20_000.0),
            budget("b2", "Marketing", 1_000.0),
        ];
        let invoices = vec![
            invoice("INV-1", 100.0, Some(date(3, 1))),
            invoice("INV-2", 100.0, None),
            invoice("INV-3", 100.0, Some(date(2, 1))),
            invoice("INV-4", 100.0, Some(date(1, 1))),
        ];
        let payments = vec![
            payment("INV-3", 40.0, PaymentStatus::Completed),
            payment("INV-4", 100.0, PaymentStatus::Completed),
        ];
        let reconciliation = ReconciliationEngine::new().reconcile(&invoices, &payments, &rules);

        let stats = dashboard_stats(&ledger(), &budgets, &reconciliation, &rules, date(1, 10));

        assert_eq!(stats.summary.total_transactions, 4);
        assert_eq!(stats.summary.total_invoices, 4);
        assert_eq!(stats.summary.total_payments, 2);
        assert_eq!(stats.summary.today_transactions, 1);
        assert_eq!(stats.summary.today_sales, 9_000.0);

        // Marketing is at 95%, Production at 65%
        assert_eq!(stats.alert_count, 1);
        assert_eq!(stats.budget_alerts[0].cost_center, "Marketing");
        assert_eq!(stats.budget_alerts[0].utilization, 95.0);
        assert_eq!(stats.budget_alerts[0].remaining, 50.0);

        let order: Vec<&str> = stats
            .recent_unpaid_invoices
            .iter()
            .map(|inv| inv.invoice_number.as_str())
            .collect();
        assert_eq!(order, vec!["INV-3", "INV-1", "INV-2"]);
    }

    #[test]
    fn test_recent_unpaid_is_capped() {
        let invoices: Vec<Invoice> = (1..=8)
            .map(|d| invoice(&format!("INV-{}", d), 10.0, Some(date(1, d))))
            .collect();
        let reconciliation = ReconciliationEngine::new().reconcile(&invoices, &[], &RuleSet::default());

        let stats = dashboard_stats(&[], &[], &reconciliation, &RuleSet::default(), date(1, 1));
        assert_eq!(stats.recent_unpaid_invoices.len(), RECENT_UNPAID_LIMIT);
        assert_eq!(stats.recent_unpaid_invoices[0].invoice_number, "INV-1");
        assert_eq!(stats.alert_count, 0);
    }
}
