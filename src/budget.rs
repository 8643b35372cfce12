// 📊 Budget vs Actual
//
// Actual spend per cost center comes from the same account resolution the
// ledger uses (explicit cost center, otherwise the classifier), so a
// transaction is never counted against two different budgets.

use crate::ledger::Transaction;
use crate::rules::RuleSet;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Utilization at or above this percentage is reported as near the limit
pub const NEAR_LIMIT_PERCENT: f64 = 90.0;

// ============================================================================
// BUDGET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,

    /// Analytical account this budget applies to (e.g. "Marketing")
    pub cost_center: String,

    pub amount: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl Budget {
    /// Inclusive on both ends
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.period_start <= date && date <= self.period_end
    }

    /// Case-insensitive cost center comparison
    pub fn applies_to(&self, account: &str) -> bool {
        self.cost_center.trim().eq_ignore_ascii_case(account.trim())
    }
}

/// Load budgets from CSV with header `id,cost_center,amount,period_start,period_end`
pub fn load_budgets(csv_path: &Path) -> Result<Vec<Budget>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open budgets CSV: {:?}", csv_path))?;

    let mut budgets = Vec::new();

    for (row, result) in rdr.deserialize().enumerate() {
        let budget: Budget = result
            .with_context(|| format!("Failed to deserialize budget on line {}", row + 2))?;

        if budget.period_end < budget.period_start {
            bail!(
                "Budget '{}' on line {} ends ({}) before it starts ({})",
                budget.id,
                row + 2,
                budget.period_end,
                budget.period_start
            );
        }
        if budget.cost_center.trim().is_empty() {
            bail!("Budget '{}' on line {} has no cost center", budget.id, row + 2);
        }

        budgets.push(budget);
    }

    tracing::info!(path = %csv_path.display(), count = budgets.len(), "loaded budgets");
    Ok(budgets)
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    UnderBudget,
    NearLimit,
    OverBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub budget_id: String,
    pub cost_center: String,
    pub budget_amount: f64,
    pub actual_spent: f64,
    pub variance: f64,
    pub utilization_percentage: f64,
    pub transaction_count: usize,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl BudgetLine {
    pub fn status(&self) -> BudgetStatus {
        if self.utilization_percentage > 100.0 {
            BudgetStatus::OverBudget
        } else if self.utilization_percentage >= NEAR_LIMIT_PERCENT {
            BudgetStatus::NearLimit
        } else {
            BudgetStatus::UnderBudget
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budget: f64,
    pub total_actual: f64,
    pub total_variance: f64,
    pub overall_utilization: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetReport {
    pub summary: BudgetSummary,
    pub details: Vec<BudgetLine>,
    pub generated_at: DateTime<Utc>,
}

impl BudgetReport {
    pub fn over_budget(&self) -> impl Iterator<Item = &BudgetLine> {
        self.details
            .iter()
            .filter(|line| line.status() == BudgetStatus::OverBudget)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} budgets: budgeted {:.2}, spent {:.2}, variance {:.2} ({:.2}% used)",
            self.details.len(),
            self.summary.total_budget,
            self.summary.total_actual,
            self.summary.total_variance,
            self.summary.overall_utilization
        )
    }
}

pub(crate) fn utilization(actual: f64, budget: f64) -> f64 {
    if budget > 0.0 {
        round2(actual / budget * 100.0)
    } else {
        0.0
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compare each budget against the transactions booked to its cost center within its period
pub fn budget_vs_actual(
    budgets: &[Budget],
    transactions: &[Transaction],
    rules: &RuleSet,
) -> BudgetReport {
    // Resolve each transaction's account once
    let resolved: Vec<(&Transaction, &str)> = transactions
        .iter()
        .map(|tx| (tx, tx.account(rules)))
        .collect();

    let mut details = Vec::with_capacity(budgets.len());
    let mut total_budget = 0.0;
    let mut total_actual = 0.0;

    for budget in budgets {
        let mut actual_spent = 0.0;
        let mut transaction_count = 0;

        // Every transaction kind resolved to the cost center counts, sales included
        for (tx, account) in &resolved {
            if budget.applies_to(account) && budget.covers(tx.date) {
                actual_spent += tx.amount;
                transaction_count += 1;
            }
        }

        details.push(BudgetLine {
            budget_id: budget.id.clone(),
            cost_center: budget.cost_center.clone(),
            budget_amount: budget.amount,
            actual_spent,
            variance: budget.amount - actual_spent,
            utilization_percentage: utilization(actual_spent, budget.amount),
            transaction_count,
            period_start: budget.period_start,
            period_end: budget.period_end,
        });

        total_budget += budget.amount;
        total_actual += actual_spent;
    }

    let report = BudgetReport {
        summary: BudgetSummary {
            total_budget,
            total_actual,
            total_variance: total_budget - total_actual,
            overall_utilization: utilization(total_actual, total_budget),
        },
        details,
        generated_at: Utc::now(),
    };

    tracing::debug!("{}", report.summary_line());
    report
}

// ============================================================================
// TESTS
// ============================================================================
