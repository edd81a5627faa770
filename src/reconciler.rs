//! The change/no-change decision rule

use crate::models::{ComparisonKey, DiffOutcome, LedgerDiff, RunState};

/// Outcome of reconciling a fetched diff against the stored baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing materially new; the fetched artifacts can be discarded.
    NoChange,
    /// The ledger moved; this diff becomes the new baseline once notified.
    Changed(LedgerDiff),
}

/// Decide whether a fetched diff represents a materially new ledger state.
///
/// Pure over its inputs; the caller applies the resulting actions. The
/// upstream "no difference" sentinel always wins, and a diff whose
/// comparison key matches the baseline's is treated as re-conversion jitter
/// rather than a real change.
pub fn reconcile(outcome: &DiffOutcome, state: &RunState) -> Decision {
    let diff = match outcome {
        DiffOutcome::NoDifference => return Decision::NoChange,
        DiffOutcome::Changes(diff) => diff,
    };

    let key = ComparisonKey::of(diff);
    if let Some(baseline) = &state.baseline {
        if baseline.key == key {
            return Decision::NoChange;
        }
    }

    Decision::Changed(diff.clone())
}
