// Ledgerd - Ledger Change Monitor
// Fetches a remote ledger on a schedule, reconciles it against the last known
// state, and emails change reports; consecutive failures escalate by email.

pub mod error;
pub mod escalation;
pub mod models;
pub mod notify;
pub mod reconciler;
pub mod runner;
pub mod services;
pub mod state;

pub use anyhow::{Context, Result};

// Re-export commonly used types
pub use error::{CheckError, CheckResult};
pub use models::{ComparisonKey, Config, DiffOutcome, LedgerDiff, RunState};
pub use reconciler::{reconcile, Decision};
pub use runner::Checker;
pub use state::StateStore;
