//! Notifier - builds and sends change reports and escalation alerts

use super::ChangeReport;
use crate::error::CheckResult;
use crate::models::{
    Baseline, ComparisonKey, Config, LedgerArtifacts, LedgerDiff, RunState, ThreadingKey,
};
use crate::services::{Attachment, MailTransport, OutgoingMessage};
use chrono::Utc;
use std::fs;

/// What came back from sending a change report: the message id and the
/// threading reference the caller must persist into the run state.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub message_id: String,
    pub thread_reference: String,
}

/// Formats and sends change reports and escalation alerts over an injected
/// mail transport.
pub struct Notifier<'a, M: MailTransport> {
    transport: &'a M,
    config: &'a Config,
}

impl<'a, M: MailTransport> Notifier<'a, M> {
    pub fn new(transport: &'a M, config: &'a Config) -> Self {
        Self { transport, config }
    }

    /// Send a change report.
    ///
    /// Attaches the new document and, when it still exists, the prior
    /// baseline's. Threads as a reply to the previous report while the
    /// configured threading key matches, so a run of changes the user has
    /// not acted on stays in one conversation.
    pub fn notify_change(
        &self,
        diff: &LedgerDiff,
        artifacts: &LedgerArtifacts,
        prior: Option<&Baseline>,
        state: &RunState,
    ) -> CheckResult<SentNotification> {
        let sheet_url = self
            .config
            .sheets
            .sheet_url_base
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), diff.sheet_id));
        let report = ChangeReport::build(diff, prior, sheet_url, Utc::now());

        let mut attachments = vec![read_attachment("NEW", artifacts)?];
        if let Some(prior) = prior {
            // The old document may already have been cleaned up.
            if prior.artifacts.pdf_path.exists() {
                attachments.push(read_attachment("OLD", &prior.artifacts)?);
            }
        }

        let in_reply_to = if self.threads_with_previous(diff, prior, state) {
            state.last_change_notification.clone()
        } else {
            None
        };

        let message = OutgoingMessage {
            subject: format!("{} Ledger Update", diff.society_name),
            from: self.config.email.from.clone(),
            to: self.config.email.to.clone(),
            plain_body: report.to_plain_text(),
            html_body: Some(report.to_html()),
            attachments,
            in_reply_to,
            urgent: false,
        };

        let message_id = self.transport.send(&message)?;
        Ok(SentNotification {
            message_id,
            thread_reference: self.thread_reference(diff),
        })
    }

    /// Send an escalation alert for the current failure streak.
    ///
    /// The alert carries every accumulated cause since the last success and,
    /// below the top threshold, how many more consecutive failures trigger
    /// the next alert. Within an unbroken streak it threads as a reply to
    /// the previous alert.
    pub fn notify_failure(&self, state: &RunState, thresholds: &[u32]) -> CheckResult<String> {
        let count = state.consecutive_failures();

        let mut traces = String::new();
        for entry in &state.failure_log {
            traces.push_str(&format!(
                "ERROR ON {}\n{}\n\n",
                entry
                    .at
                    .format("%A %d %B %Y AT %H:%M:%S")
                    .to_string()
                    .to_uppercase(),
                entry.cause
            ));
        }

        let future = match thresholds.iter().find(|&&t| t as usize > count) {
            Some(next) => format!(
                "Another alert will be sent after {} more consecutive failures (at {} in a row).",
                *next as usize - count,
                next
            ),
            None => "No further alerts will be sent until a check succeeds.".to_string(),
        };

        let most_recent = match state.last_success {
            Some(at) => at.format("%A %d %B %Y at %H:%M:%S").to_string(),
            None => "never".to_string(),
        };

        let plain_body = format!(
            "There have been {count} consecutive failed ledger checks. The most \
             recent successful check was {most_recent}.\n\nPlease see the causes \
             below and check the log. Future checks will continue as scheduled. \
             {future}\n\n\n{traces}"
        );

        let message = OutgoingMessage {
            subject: "ERROR with ledgerd!".to_string(),
            from: self.config.email.from.clone(),
            to: self.config.email.to.clone(),
            plain_body,
            html_body: None,
            attachments: Vec::new(),
            in_reply_to: state.last_error_notification.clone(),
            urgent: true,
        };

        self.transport.send(&message)
    }

    /// The reference to persist after a change notification is sent.
    fn thread_reference(&self, diff: &LedgerDiff) -> String {
        match self.config.checker.threading_key {
            ThreadingKey::ReferenceTimestamp => diff.reference_timestamp.clone(),
            ThreadingKey::NotifiedBaseline => render_key(&ComparisonKey::of(diff)),
        }
    }

    /// Whether this change continues the previous report's conversation.
    fn threads_with_previous(
        &self,
        diff: &LedgerDiff,
        prior: Option<&Baseline>,
        state: &RunState,
    ) -> bool {
        if state.last_change_notification.is_none() {
            return false;
        }
        let expected = match self.config.checker.threading_key {
            ThreadingKey::ReferenceTimestamp => diff.reference_timestamp.clone(),
            ThreadingKey::NotifiedBaseline => match prior {
                Some(baseline) => render_key(&baseline.key),
                None => return false,
            },
        };
        state.pending_notified_reference.as_deref() == Some(expected.as_str())
    }
}

fn render_key(key: &ComparisonKey) -> String {
    format!(
        "{}|{}|{}",
        key.total_in, key.total_out, key.balance_brought_forward
    )
}

fn read_attachment(tag: &str, artifacts: &LedgerArtifacts) -> CheckResult<Attachment> {
    let bytes = fs::read(&artifacts.pdf_path)?;
    Ok(Attachment {
        filename: format!("{} {}", tag, artifacts.filename),
        content_type: "application/pdf".to_string(),
        bytes,
    })
}
