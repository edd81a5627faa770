//! External collaborators
//!
//! The snapshot source (document fetch, conversion, upload-and-diff) and the
//! mail transport are consumed through narrow traits so tests can substitute
//! fakes. The HTTP and SMTP implementations are thin adapters with no
//! reconciliation logic of their own.

mod http;
mod smtp;

pub use http::HttpSnapshotSource;
pub use smtp::SmtpMailer;

use crate::error::CheckResult;
use crate::models::{DiffOutcome, LedgerArtifacts};

/// Produces a timestamped ledger artifact and, on demand, a structured diff
/// against the reference spreadsheet.
pub trait SnapshotSource {
    /// Fetch the ledger document and save it under the artifact directory.
    fn fetch(&self) -> CheckResult<LedgerArtifacts>;

    /// Convert the document, upload it, and diff it against the reference
    /// sheet.
    fn diff(&self, artifacts: &LedgerArtifacts) -> CheckResult<DiffOutcome>;

    /// Delete artifacts that turned out not to be a new state, including the
    /// remote sheet created during the diff when there is one.
    fn discard(&self, artifacts: &LedgerArtifacts, sheet_id: Option<&str>) -> CheckResult<()>;

    /// Hide the remote sheet behind a superseded change notification.
    fn hide_sheet(&self, sheet_id: &str) -> CheckResult<()>;
}

/// A binary attachment on an outgoing message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One email, ready for a transport.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub subject: String,
    pub from: String,
    pub to: String,

    pub plain_body: String,
    /// Rich rendering of the same content, when there is one.
    pub html_body: Option<String>,

    pub attachments: Vec<Attachment>,

    /// Message id to thread this message under.
    pub in_reply_to: Option<String>,

    /// Marks escalation alerts, which carry a priority header.
    pub urgent: bool,
}

/// Sends messages and returns their message ids for future threading.
pub trait MailTransport {
    fn send(&self, message: &OutgoingMessage) -> CheckResult<String>;
}
