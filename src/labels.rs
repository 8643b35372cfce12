// 🎨 Account Labels - display decoration for analytical accounts
//
// Icons and cost kinds are attached here, at the presentation boundary.
// The classifier in `rules` only ever deals in account names.

use crate::rules::{RuleSet, EMPTY_INPUT_ACCOUNT, NO_MATCH_ACCOUNT};
use serde::{Deserialize, Serialize};

// ============================================================================
// COST KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostKind {
    /// Cost that goes into making or moving product
    Direct,

    /// Running cost of the business (marketing, office)
    Overhead,

    /// Fallback or unknown account
    Unassigned,
}

impl CostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostKind::Direct => "Direct",
            CostKind::Overhead => "Overhead",
            CostKind::Unassigned => "Unassigned",
        }
    }
}

// ============================================================================
// ACCOUNT LABEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLabel {
    pub account: String,

    /// Badge icon for UI (e.g. "🚚")
    pub icon: String,

    pub kind: CostKind,
}

impl AccountLabel {
    /// Badge text such as "🚚 Logistics"
    pub fn badge(&self) -> String {
        format!("{} {}", self.icon, self.account)
    }
}

/// Decorate an account name. Unknown accounts (from injected rule files) get a neutral tag.
pub fn label_for(account: &str) -> AccountLabel {
    let (icon, kind) = match account.to_lowercase().as_str() {
        "production" => ("📦", CostKind::Direct),
        "logistics" => ("🚚", CostKind::Direct),
        "marketing" => ("🎯", CostKind::Overhead),
        "administrative" => ("⚡", CostKind::Overhead),
        _ if account == EMPTY_INPUT_ACCOUNT => ("⚡", CostKind::Unassigned),
        _ if account == NO_MATCH_ACCOUNT => ("❔", CostKind::Unassigned),
        _ => ("🏷️", CostKind::Unassigned),
    };

    AccountLabel {
        account: account.to_string(),
        icon: icon.to_string(),
        kind,
    }
}

impl RuleSet {
    /// Classify a description and decorate the result for display
    pub fn label(&self, description: Option<&str>) -> AccountLabel {
        label_for(self.classify(description))
    }
}
