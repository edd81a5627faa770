//! Change reports and escalation alerts
//!
//! One content model renders both the plain-text and HTML bodies, so the two
//! can differ in presentation but never in content.

mod notifier;
mod report;

pub use notifier::{Notifier, SentNotification};
pub use report::{humanize_since, ChangeReport, CostCodeRow, EntryRow};
