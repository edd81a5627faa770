pub mod config;
pub mod diff;
pub mod run_state;

pub use config::{
    CheckerConfig, Config, ConverterConfig, EmailConfig, SheetsConfig, SourceConfig, ThreadingKey,
};
pub use diff::{
    format_gbp, ComparisonKey, CostCode, DiffOutcome, GrandTotal, LedgerDiff, LedgerEntry,
};
pub use run_state::{Baseline, FailureEntry, LedgerArtifacts, RunState};
