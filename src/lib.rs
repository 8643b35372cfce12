// Shiv Budget - Library
// Analytical categorization, budget vs actual and invoice reconciliation

pub mod budget;
pub mod config;
pub mod labels;
pub mod ledger;
pub mod logging;
pub mod reconciliation;
pub mod reports;
pub mod rules;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use budget::{
    budget_vs_actual, load_budgets, Budget, BudgetLine, BudgetReport, BudgetStatus, BudgetSummary,
};
pub use config::AppConfig;
pub use labels::{label_for, AccountLabel, CostKind};
pub use ledger::{
    account_breakdown, load_transactions, monthly_totals, AccountTotal, MonthlyTotal,
    Transaction, TransactionDraft, TransactionKind,
};
pub use reconciliation::{
    load_invoices, load_payments, Invoice, InvoiceReconciliation, InvoiceStatus, Payment,
    PaymentStatus, ReconciliationEngine, ReconciliationReport, ReconciliationSummary,
};
pub use reports::{
    cost_center_performance, dashboard_stats, financial_summary, BudgetAlert,
    CostCenterPerformance, DashboardCounts, DashboardStats, FinancialSummary, ReportPeriod,
    DEFAULT_SUMMARY_DAYS,
};
pub use rules::{
    classify, fold_case, Classification, MatchOutcome, Rule, RuleSet, EMPTY_INPUT_ACCOUNT, NO_MATCH_ACCOUNT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
