use anyhow::Result;
use std::env;

use shiv_budget::{
    budget_vs_actual, cost_center_performance, label_for, load_budgets, load_invoices, load_payments, load_transactions,
    logging, AppConfig, ReconciliationEngine, Transaction,
};

fn main() -> Result<()> {
    logging::init_tracing();

    let config = AppConfig::from_env();
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("classify") => run_classify(&config, &args[1..]),
        Some("rules") => run_rules(&config),
        Some("report") => run_report(&config),
        Some("invoices") => run_invoices(&config),
        Some("performance") => run_performance(&config),
        Some("ui") | None => run_ui_mode(&config),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: shiv-budget [command]");
    eprintln!("  classify <description...>  Show the analytical account for a description");
    eprintln!("  rules                      List the active rule table");
    eprintln!("  report                     Budget vs actual from SHIV_DATA_DIR");
    eprintln!("  invoices                   Invoice/payment reconciliation");
    eprintln!("  performance                Spend, purchase/sale counts and budget per cost center");
    eprintln!("  ui                         Terminal dashboard (default)");
}

fn run_classify(config: &AppConfig, words: &[String]) -> Result<()> {
    let rules = config.rule_set()?;
    let description = words.join(" ");

    let result = rules.classify_detailed(Some(&description));
    let label = label_for(result.account);

    println!("{}", label.badge());
    if result.is_match() {
        println!(
            "  matched rule #{} on keyword \"{}\"",
            result.rule_index.map_or(0, |index| index + 1),
            result.keyword.unwrap_or_default()
        );
    } else {
        println!("  no rule matched ({:?})", result.outcome);
    }

    Ok(())
}

fn run_rules(config: &AppConfig) -> Result<()> {
    let rules = config.rule_set()?;

    println!("{} rules (first match wins)", rules.rule_count());
    for (i, rule) in rules.rules().iter().enumerate() {
        println!("{:>3}. {:<16} {}", i + 1, rule.account, rule.keywords.join(", "));
    }

    Ok(())
}

fn load_ledger(config: &AppConfig) -> Result<Vec<Transaction>> {
    load_transactions(&config.transactions_path())
}

fn run_report(config: &AppConfig) -> Result<()> {
    let rules = config.rule_set()?;
    let transactions = load_ledger(config)?;
    let budgets = load_budgets(&config.budgets_path())?;

    let report = budget_vs_actual(&budgets, &transactions, &rules);

    println!(
        "{:<22} {:>14} {:>14} {:>14} {:>8}",
        "Cost Center", "Budget", "Actual", "Variance", "Used %"
    );
    for line in &report.details {
        println!(
            "{:<22} {:>14.2} {:>14.2} {:>14.2} {:>8.2}  {:?}",
            label_for(&line.cost_center).badge(),
            line.budget_amount,
            line.actual_spent,
            line.variance,
            line.utilization_percentage,
            line.status()
        );
    }
    println!();
    println!("{}", report.summary_line());

    Ok(())
}

fn run_invoices(config: &AppConfig) -> Result<()> {
    let rules = config.rule_set()?;
    let invoices = load_invoices(&config.invoices_path())?;
    let payments_path = config.payments_path();
    let payments = if payments_path.exists() {
        load_payments(&payments_path)?
    } else {
        tracing::warn!(path = %payments_path.display(), "no payments file, treating all invoices as unpaid");
        Vec::new()
    };

    let report = ReconciliationEngine::new().reconcile(&invoices, &payments, &rules);

    for inv in &report.invoices {
        println!(
            "{:<12} {:<28} {:>12.2} paid {:>12.2} balance {:>12.2}  {:?}  → {}",
            inv.invoice_number,
            inv.item,
            inv.amount,
            inv.paid_amount,
            inv.balance,
            inv.status,
            label_for(&inv.posting_account).badge()
        );
    }
    for orphan in &report.orphan_payments {
        println!("orphan payment: {} {:.2} ({})", orphan.invoice_number, orphan.amount, orphan.method);
    }
    println!();
    println!("{}", report.summary());

    Ok(())
}

fn run_performance(config: &AppConfig) -> Result<()> {
    let rules = config.rule_set()?;
    let transactions = load_ledger(config)?;
    let budgets = load_budgets(&config.budgets_path())?;

    println!(
        "{:<22} {:>6} {:>6} {:>14} {:>14} {:>14}",
        "Cost Center", "Buys", "Sales", "Spent", "Budget", "Remaining"
    );
    for line in cost_center_performance(&transactions, &budgets, &rules) {
        println!(
            "{:<22} {:>6} {:>6} {:>14.2} {:>14.2} {:>14.2}{}",
            label_for(&line.cost_center).badge(),
            line.purchase_count,
            line.sale_count,
            line.total_spent,
            line.budget_amount,
            line.remaining_budget,
            if line.is_over_budget { "  ⚠ over budget" } else { "" }
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    use shiv_budget::ui;

    let rules = config.rule_set()?;
    let transactions = load_ledger(config)?;
    let budgets_path = config.budgets_path();
    let budgets = if budgets_path.exists() {
        load_budgets(&budgets_path)?
    } else {
        Vec::new()
    };

    let mut app = ui::App::new(rules, transactions, budgets);
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin shiv-server --features server");
    std::process::exit(1);
}
