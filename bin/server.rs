// Shiv Budget - Web Server
// Read-only JSON API over the analytical classifier and reports

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use shiv_budget::{
    account_breakdown, budget_vs_actual, cost_center_performance, dashboard_stats,
    financial_summary, label_for, load_budgets, load_invoices, load_payments, load_transactions,
    logging, monthly_totals, AccountLabel, AccountTotal, AppConfig, Budget, BudgetReport,
    CostCenterPerformance, DashboardStats, Invoice, MatchOutcome, MonthlyTotal, Payment,
    ReconciliationEngine, ReconciliationReport, ReportPeriod, Rule, RuleSet, Transaction,
    TransactionKind, DEFAULT_SUMMARY_DAYS,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Data loaded once at startup; never mutated afterwards
struct AppData {
    rules: RuleSet,
    transactions: Vec<Transaction>,
    budgets: Vec<Budget>,
    invoices: Vec<Invoice>,
    payments: Vec<Payment>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    data: Arc<AppData>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

impl AppData {
    fn reconciliation(&self) -> ReconciliationReport {
        ReconciliationEngine::new().reconcile(&self.invoices, &self.payments, &self.rules)
    }
}

#[derive(Deserialize)]
struct ClassifyQuery {
    description: Option<String>,
}

/// Optional `start_date`/`end_date` (YYYY-MM-DD); defaults to the last 30 days
#[derive(Deserialize, Default)]
struct PeriodQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl PeriodQuery {
    fn period(&self, today: NaiveDate) -> Result<ReportPeriod> {
        let end_date = self.end_date.unwrap_or(today);
        let start_date = self
            .start_date
            .unwrap_or_else(|| ReportPeriod::last_days(end_date, DEFAULT_SUMMARY_DAYS).start_date);
        ReportPeriod::new(start_date, end_date)
    }
}

#[derive(Serialize)]
struct ClassifyResponse {
    description: Option<String>,
    account: String,
    outcome: MatchOutcome,
    rule_index: Option<usize>,
    keyword: Option<String>,
    label: AccountLabel,
}

/// Transaction with its resolved account (for badges)
#[derive(Serialize)]
struct TransactionResponse {
    #[serde(flatten)]
    transaction: Transaction,
    account: String,
    auto_assigned: bool,
    label: AccountLabel,
}

#[derive(Serialize)]
struct AccountsResponse {
    by_account: Vec<AccountTotal>,
    monthly_purchases: Vec<MonthlyTotal>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/classify?description=... - Live account suggestion
async fn classify(
    State(state): State<AppState>,
    Query(query): Query<ClassifyQuery>,
) -> Json<ApiResponse<ClassifyResponse>> {
    let result = state.data.rules.classify_detailed(query.description.as_deref());

    let response = ClassifyResponse {
        account: result.account.to_string(),
        outcome: result.outcome,
        rule_index: result.rule_index,
        keyword: result.keyword.map(str::to_string),
        label: label_for(result.account),
        description: query.description,
    };
    Json(ApiResponse::ok(response))
}

/// GET /api/rules - Active rule table in evaluation order
async fn get_rules(State(state): State<AppState>) -> Json<ApiResponse<Vec<Rule>>> {
    Json(ApiResponse::ok(state.data.rules.rules().to_vec()))
}

/// GET /api/transactions - All transactions with their account
async fn get_transactions(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<TransactionResponse>>> {
    let rules = &state.data.rules;
    let response = state
        .data
        .transactions
        .iter()
        .map(|tx| {
            let account = tx.account(rules);
            TransactionResponse {
                account: account.to_string(),
                auto_assigned: tx.is_auto_assigned(),
                label: label_for(account),
                transaction: tx.clone(),
            }
        })
        .collect();

    Json(ApiResponse::ok(response))
}

/// GET /api/accounts - Totals per account and per month
async fn get_accounts(State(state): State<AppState>) -> Json<ApiResponse<AccountsResponse>> {
    let data = &state.data;
    Json(ApiResponse::ok(AccountsResponse {
        by_account: account_breakdown(&data.transactions, &data.rules),
        monthly_purchases: monthly_totals(&data.transactions, TransactionKind::Purchase),
    }))
}

/// GET /api/reports/budget-vs-actual
async fn get_budget_report(State(state): State<AppState>) -> Json<ApiResponse<BudgetReport>> {
    let data = &state.data;
    Json(ApiResponse::ok(budget_vs_actual(
        &data.budgets,
        &data.transactions,
        &data.rules,
    )))
}

/// GET /api/reports/financial-summary?start_date=&end_date=
async fn get_financial_summary(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Response {
    let data = &state.data;
    match query.period(Local::now().date_naive()) {
        Ok(period) => {
            let summary = financial_summary(&data.transactions, &data.reconciliation(), period);
            (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "rejected financial summary period");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))).into_response()
        }
    }
}

/// GET /api/reports/cost-center-performance
async fn get_cost_center_performance(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<CostCenterPerformance>>> {
    let data = &state.data;
    Json(ApiResponse::ok(cost_center_performance(
        &data.transactions,
        &data.budgets,
        &data.rules,
    )))
}

/// GET /api/reports/dashboard-stats
async fn get_dashboard_stats(State(state): State<AppState>) -> Json<ApiResponse<DashboardStats>> {
    let data = &state.data;
    Json(ApiResponse::ok(dashboard_stats(
        &data.transactions,
        &data.budgets,
        &data.reconciliation(),
        &data.rules,
        Local::now().date_naive(),
    )))
}

/// GET /api/invoices - Invoice/payment reconciliation
async fn get_invoices(State(state): State<AppState>) -> Json<ApiResponse<ReconciliationReport>> {
    Json(ApiResponse::ok(state.data.reconciliation()))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/classify", get(classify))
        .route("/rules", get(get_rules))
        .route("/transactions", get(get_transactions))
        .route("/accounts", get(get_accounts))
        .route("/reports/budget-vs-actual", get(get_budget_report))
        .route("/reports/financial-summary", get(get_financial_summary))
        .route("/reports/cost-center-performance", get(get_cost_center_performance))
        .route("/reports/dashboard-stats", get(get_dashboard_stats))
        .route("/invoices", get(get_invoices))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

/// Load a CSV when present; a missing file just means "no records yet"
fn load_optional<T>(path: &Path, load: fn(&Path) -> Result<Vec<T>>) -> Result<Vec<T>> {
    if path.exists() {
        load(path)
    } else {
        tracing::warn!(path = %path.display(), "data file not found, starting empty");
        Ok(Vec::new())
    }
}

fn load_data(config: &AppConfig) -> Result<AppData> {
    Ok(AppData {
        rules: config.rule_set()?,
        transactions: load_optional(&config.transactions_path(), load_transactions)?,
        budgets: load_optional(&config.budgets_path(), load_budgets)?,
        invoices: load_optional(&config.invoices_path(), load_invoices)?,
        payments: load_optional(&config.payments_path(), load_payments)?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let config = AppConfig::from_env();
    let data = load_data(&config)?;
    tracing::info!(
        rules = data.rules.rule_count(),
        transactions = data.transactions.len(),
        budgets = data.budgets.len(),
        invoices = data.invoices.len(),
        "data loaded"
    );

    let state = AppState {
        data: Arc::new(data),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn state() -> AppState {
        let tx = |id: &str, description: &str, amount: f64, cost_center: Option<&str>| Transaction {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            kind: TransactionKind::Purchase,
            description: description.to_string(),
            amount,
            quantity: 1,
            cost_center: cost_center.map(str::to_string),
        };

        AppState {
            data: Arc::new(AppData {
                rules: RuleSet::default(),
                transactions: vec![
                    tx("t1", "Teak wood log", 1000.0, None),
                    tx("t2", "Diesel delivery", 200.0, Some("Administrative")),
                ],
                budgets: vec![Budget {
                    id: "b1".to_string(),
                    cost_center: "Production".to_string(),
                    amount: 4000.0,
                    period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    period_end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
                }],
                invoices: Vec::new(),
                payments: Vec::new(),
            }),
        }
    }

    #[tokio::test]
    async fn test_classify_endpoint() {
        let query = ClassifyQuery {
            description: Some("Office Rent - January".to_string()),
        };
        let Json(response) = classify(State(state()), Query(query)).await;

        assert!(response.success);
        assert_eq!(response.data.account, "Administrative");
        assert_eq!(response.data.rule_index, Some(3));
        assert_eq!(response.data.keyword.as_deref(), Some("office"));
    }

    #[tokio::test]
    async fn test_classify_endpoint_without_description() {
        let Json(response) = classify(State(state()), Query(ClassifyQuery { description: None })).await;
        assert_eq!(response.data.account, "General");
        assert_eq!(response.data.outcome, MatchOutcome::EmptyInput);
    }

    #[tokio::test]
    async fn test_transactions_carry_accounts() {
        let Json(response) = get_transactions(State(state())).await;

        assert_eq!(response.data[0].account, "Production");
        assert!(response.data[0].auto_assigned);
        assert_eq!(response.data[1].account, "Administrative");
        assert!(!response.data[1].auto_assigned);
    }

    #[tokio::test]
    async fn test_budget_report_endpoint() {
        let Json(response) = get_budget_report(State(state())).await;
        let line = &response.data.details[0];
        assert_eq!(line.actual_spent, 1000.0);
        assert_eq!(line.utilization_percentage, 25.0);
    }

    #[test]
    fn test_period_query_defaults_and_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();

        let period = PeriodQuery::default().period(today).unwrap();
        assert_eq!(period.end_date, today);
        assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let inverted = PeriodQuery {
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            end_date: Some(today),
        };
        assert!(inverted.period(today).is_err());
    }

    #[tokio::test]
    async fn test_financial_summary_endpoint() {
        let query = PeriodQuery {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31),
        };
        let response = get_financial_summary(State(state()), Query(query)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bad = PeriodQuery {
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1),
        };
        let response = get_financial_summary(State(state()), Query(bad)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cost_center_performance_endpoint() {
        let Json(response) = get_cost_center_performance(State(state())).await;

        let production = &response.data[0];
        assert_eq!(production.cost_center, "Production");
        assert_eq!(production.total_spent, 1000.0);
        assert_eq!(production.remaining_budget, 3000.0);
        assert!(!production.is_over_budget);

        // "Diesel delivery" was booked to Administrative explicitly
        let administrative = response
            .data
            .iter()
            .find(|p| p.cost_center == "Administrative")
            .unwrap();
        assert_eq!(administrative.total_spent, 200.0);
    }

    #[tokio::test]
    async fn test_dashboard_stats_endpoint() {
        let Json(response) = get_dashboard_stats(State(state())).await;
        assert_eq!(response.data.summary.total_transactions, 2);
        assert_eq!(response.data.summary.total_budgets, 1);
        assert_eq!(response.data.alert_count, 0);
    }
}
