// ⚖️ Invoice Reconciliation - match payments to invoices
//
// For every invoice:
//   paid    = sum of non-failed payments referencing it
//   balance = amount - paid
//   status  = Paid | Partial | Unpaid
// and the analytical account the payment is posted against comes from the
// classifier applied to the invoiced item.

use crate::rules::RuleSet;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// INVOICES & PAYMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub customer: String,

    /// Product or service invoiced (e.g. "Teak dining table")
    pub item: String,

    pub amount: f64,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub invoice_number: String,
    pub amount: f64,

    /// "stripe", "cash", "bank_transfer", ...
    pub method: String,

    /// External reference (gateway transaction id)
    pub reference: Option<String>,

    pub status: PaymentStatus,
}

impl Payment {
    /// Failed payments never reduce an invoice balance
    pub fn counts_toward_balance(&self) -> bool {
        self.status != PaymentStatus::Failed
    }
}

#[derive(Debug, Deserialize)]
struct PaymentRecord {
    invoice_number: String,
    amount: f64,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    status: Option<PaymentStatus>,
}

impl From<PaymentRecord> for Payment {
    fn from(record: PaymentRecord) -> Self {
        Payment {
            invoice_number: record.invoice_number.trim().to_string(),
            amount: record.amount,
            method: record.method.unwrap_or_else(|| "cash".to_string()),
            reference: record.reference.filter(|r| !r.trim().is_empty()),
            status: record.status.unwrap_or_default(),
        }
    }
}

/// Load invoices from CSV with header `number,customer,item,amount,due_date`
pub fn load_invoices(csv_path: &Path) -> Result<Vec<Invoice>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open invoices CSV: {:?}", csv_path))?;

    let mut invoices = Vec::new();
    for (row, result) in rdr.deserialize().enumerate() {
        let invoice: Invoice = result
            .with_context(|| format!("Failed to deserialize invoice on line {}", row + 2))?;
        invoices.push(invoice);
    }

    tracing::info!(path = %csv_path.display(), count = invoices.len(), "loaded invoices");
    Ok(invoices)
}

/// Load payments from CSV with header `invoice_number,amount,method,reference,status`
pub fn load_payments(csv_path: &Path) -> Result<Vec<Payment>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open payments CSV: {:?}", csv_path))?;

    let mut payments = Vec::new();
    for (row, result) in rdr.deserialize().enumerate() {
        let record: PaymentRecord = result
            .with_context(|| format!("Failed to deserialize payment on line {}", row + 2))?;
        payments.push(Payment::from(record));
    }

    tracing::info!(path = %csv_path.display(), count = payments.len(), "loaded payments");
    Ok(payments)
}

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReconciliation {
    pub invoice_number: String,
    pub customer: String,
    pub item: String,
    pub amount: f64,
    pub paid_amount: f64,
    pub balance: f64,
    pub status: InvoiceStatus,

    /// Analytical account the payment is posted against
    pub posting_account: String,

    pub payment_count: usize,
    pub due_date: Option<NaiveDate>,
}

impl InvoiceReconciliation {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != InvoiceStatus::Paid && self.due_date.map_or(false, |due| due < today)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub outstanding_balance: f64,
    pub invoices_issued: usize,
    pub invoices_paid: usize,
    /// Every payment record, failed and orphan ones included
    pub payments_recorded: usize,
    /// Share of invoices fully paid, in percent
    pub payment_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub invoices: Vec<InvoiceReconciliation>,

    /// Payments that reference no known invoice
    pub orphan_payments: Vec<Payment>,

    pub summary: ReconciliationSummary,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} invoices, invoiced {:.2}, paid {:.2}, outstanding {:.2}, {} fully paid ({:.2}%), {} orphan payments",
            self.summary.invoices_issued,
            self.summary.total_invoiced,
            self.summary.total_paid,
            self.summary.outstanding_balance,
            self.summary.invoices_paid,
            self.summary.payment_rate,
            self.orphan_payments.len()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    /// Tolerance for floating-point comparisons (default: 0.01)
    pub tolerance: f64,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine { tolerance: 0.01 }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        ReconciliationEngine { tolerance }
    }

    /// An invoice stays unpaid until at least one payment counts toward it
    fn status_for(&self, amount: f64, paid: f64, payment_count: usize) -> InvoiceStatus {
        if payment_count == 0 {
            InvoiceStatus::Unpaid
        } else if paid + self.tolerance >= amount {
            InvoiceStatus::Paid
        } else if paid > 0.0 {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Unpaid
        }
    }

    /// Reconcile payments against invoices
    pub fn reconcile(
        &self,
        invoices: &[Invoice],
        payments: &[Payment],
        rules: &RuleSet,
    ) -> ReconciliationReport {
        // Paid amount and payment count per trimmed invoice number
        let mut by_invoice: HashMap<&str, (f64, usize)> = invoices
            .iter()
            .map(|inv| (inv.number.trim(), (0.0, 0)))
            .collect();
        let mut orphan_payments = Vec::new();

        for payment in payments {
            let Some(entry) = by_invoice.get_mut(payment.invoice_number.trim()) else {
                tracing::warn!(
                    invoice = %payment.invoice_number,
                    amount = payment.amount,
                    "payment references unknown invoice"
                );
                orphan_payments.push(payment.clone());
                continue;
            };
            if payment.counts_toward_balance() {
                entry.0 += payment.amount;
                entry.1 += 1;
            }
        }

        let mut results = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let (paid_amount, payment_count) = by_invoice
                .get(invoice.number.trim())
                .copied()
                .unwrap_or((0.0, 0));

            results.push(InvoiceReconciliation {
                invoice_number: invoice.number.clone(),
                customer: invoice.customer.clone(),
                item: invoice.item.clone(),
                amount: invoice.amount,
                paid_amount,
                balance: invoice.amount - paid_amount,
                status: self.status_for(invoice.amount, paid_amount, payment_count),
                posting_account: rules.classify(Some(&invoice.item)).to_string(),
                payment_count,
                due_date: invoice.due_date,
            });
        }

        let total_invoiced: f64 = results.iter().map(|r| r.amount).sum();
        let total_paid: f64 = results.iter().map(|r| r.paid_amount).sum();
        let invoices_paid = results
            .iter()
            .filter(|r| r.status == InvoiceStatus::Paid)
            .count();
        let payment_rate = if results.is_empty() {
            0.0
        } else {
            ((invoices_paid as f64 / results.len() as f64) * 100.0 * 100.0).round() / 100.0
        };

        ReconciliationReport {
            summary: ReconciliationSummary {
                total_invoiced,
                total_paid,
                outstanding_balance: total_invoiced - total_paid,
                invoices_issued: results.len(),
                invoices_paid,
                payments_recorded: payments.len(),
                payment_rate,
            },
            invoices: results,
            orphan_payments,
            reconciled_at: Utc::now(),
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
