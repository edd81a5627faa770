//! Ledger diff payload and the comparison key that decides "same financial state"
//!
//! A diff is the structured comparison of the current ledger against the
//! reference spreadsheet, produced by the remote diff service. Two diffs with
//! equal [`ComparisonKey`]s are the same financial state, whatever their
//! line items say.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single transaction line within a cost code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub date: String,
    pub description: String,
    pub money: f64,
}

/// Totals and entries for one cost code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostCode {
    pub balance: f64,
    pub change_in_balance: f64,
    pub money_in: f64,
    pub money_out: f64,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

/// The grand-total block of a diff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrandTotal {
    pub total_in: f64,
    pub total_out: f64,
    pub total_balance: f64,
    pub balance_brought_forward: f64,
}

/// Structured comparison of the current ledger against the reference sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDiff {
    /// Whose ledger this is; used in the notification subject.
    pub society_name: String,

    /// Per-cost-code comparison blocks. BTreeMap so report rows render in a
    /// stable order.
    pub cost_codes: BTreeMap<String, CostCode>,

    /// The grand-total block.
    pub grand_total: GrandTotal,

    /// Remote-assigned id of the sheet created during the diff, kept so the
    /// sheet can be deleted or hidden later.
    pub sheet_id: String,

    /// Timestamp of the reference snapshot the diff was computed against.
    pub reference_timestamp: String,
}

/// Outcome of the remote diff: either the upstream "no difference" sentinel
/// or a structured payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
    NoDifference,
    Changes(LedgerDiff),
}

/// The three grand-total fields that decide whether two diffs represent the
/// same financial state, each rendered in the fixed currency format.
///
/// Line-item differences that do not move these totals never count as a
/// change, so re-conversion jitter (rounding, reordering) is absorbed. A
/// ledger correction that nets to zero is also invisible here; that follows
/// the source system's behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparisonKey {
    pub total_in: String,
    pub total_out: String,
    pub balance_brought_forward: String,
}

impl ComparisonKey {
    /// Derive the key from a diff's grand-total block.
    pub fn of(diff: &LedgerDiff) -> Self {
        Self {
            total_in: format_gbp(diff.grand_total.total_in),
            total_out: format_gbp(diff.grand_total.total_out),
            balance_brought_forward: format_gbp(diff.grand_total.balance_brought_forward),
        }
    }
}

/// Format a monetary value as GBP in the en_GB locale, e.g. "£1,234.56".
///
/// Deterministic for a given input; both the report renderings and the
/// comparison key depend on that.
pub fn format_gbp(value: f64) -> String {
    let negative = value < -f64::EPSILON;
    let pence = (value.abs() * 100.0).round() as u64;
    let pounds = pence / 100;
    let minor = pence % 100;

    let digits = pounds.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-£{}.{:02}", grouped, minor)
    } else {
        format!("£{}.{:02}", grouped, minor)
    }
}
