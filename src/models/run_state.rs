//! The persistent record of the last reconciled state and the failure streak
//!
//! Exactly one `RunState` exists per monitored ledger. It is read at the
//! start of a run and committed by the state store at every state-changing
//! event, so nothing is held dirty across a network call.

use super::{ComparisonKey, LedgerDiff};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Local artifacts behind one fetched ledger snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerArtifacts {
    /// The saved PDF document.
    pub pdf_path: PathBuf,

    /// Attachment filename, e.g. "Ledger 2026-08-25 at 10.30.00.pdf".
    pub filename: String,

    /// When the document was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl LedgerArtifacts {
    /// Where the converted spreadsheet sits, next to the document.
    pub fn spreadsheet_path(&self) -> PathBuf {
        self.pdf_path.with_extension("xlsx")
    }

    /// The document directory, used when nothing else pins one down.
    pub fn dir(&self) -> &Path {
        self.pdf_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// The last reconciled diff, its comparison key, and where its artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Baseline {
    pub diff: LedgerDiff,
    pub key: ComparisonKey,
    pub artifacts: LedgerArtifacts,
}

/// One failed run in the current streak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureEntry {
    pub at: DateTime<Utc>,
    pub cause: String,
}

/// Durable state for one monitored ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// The last reconciled snapshot, or None if nothing has ever been
    /// reconciled. Replaced only after a change notification is sent.
    #[serde(default)]
    pub baseline: Option<Baseline>,

    /// Threading reference of the most recently sent change notification.
    /// Successive changes that share it thread as replies until the user
    /// consumes the baseline.
    #[serde(default)]
    pub pending_notified_reference: Option<String>,

    /// Consecutive failed runs since the last success, oldest first.
    #[serde(default)]
    pub failure_log: Vec<FailureEntry>,

    /// When a run last reached a terminal non-error state.
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,

    /// Message id of the most recent escalation alert, for reply threading
    /// within an unbroken failure streak.
    #[serde(default)]
    pub last_error_notification: Option<String>,

    /// Message id of the most recent change report, for reply threading.
    #[serde(default)]
    pub last_change_notification: Option<String>,
}

impl RunState {
    /// Append a failed run to the streak.
    pub fn record_failure(&mut self, cause: impl Into<String>) {
        self.failure_log.push(FailureEntry {
            at: Utc::now(),
            cause: cause.into(),
        });
    }

    /// Clear the streak after a run reaches a terminal non-error state.
    ///
    /// Also forgets the alert thread, so a later streak starts fresh.
    pub fn mark_success(&mut self) {
        self.failure_log.clear();
        self.last_error_notification = None;
        self.last_success = Some(Utc::now());
    }

    pub fn consecutive_failures(&self) -> usize {
        self.failure_log.len()
    }
}
