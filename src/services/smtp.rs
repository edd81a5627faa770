//! SMTP mail transport

use super::{MailTransport, OutgoingMessage};
use crate::error::{CheckError, CheckResult};
use crate::models::EmailConfig;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Priority header carried by escalation alerts.
#[derive(Debug, Clone, PartialEq)]
struct XPriority(String);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// Sends reports and alerts over SMTPS.
///
/// Generates its own message ids so the reconciliation engine can thread
/// replies without asking the server anything.
pub struct SmtpMailer {
    transport: SmtpTransport,
    domain: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> CheckResult<Self> {
        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| CheckError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            domain: config.smtp_host.clone(),
        })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, message: &OutgoingMessage) -> CheckResult<String> {
        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), self.domain);

        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| CheckError::Transport(format!("invalid from address: {}", e)))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| CheckError::Transport(format!("invalid to address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .message_id(Some(message_id.clone()));
        if let Some(parent) = &message.in_reply_to {
            builder = builder.in_reply_to(parent.clone());
        }
        if message.urgent {
            builder = builder.header(XPriority("1".to_string()));
        }

        let email = if message.attachments.is_empty() && message.html_body.is_none() {
            builder.singlepart(SinglePart::plain(message.plain_body.clone()))
        } else {
            let mut mixed = match &message.html_body {
                Some(html) => MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
                    message.plain_body.clone(),
                    html.clone(),
                )),
                None => MultiPart::mixed().singlepart(SinglePart::plain(message.plain_body.clone())),
            };
            for attachment in &message.attachments {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                    CheckError::Transport(format!("invalid attachment content type: {}", e))
                })?;
                mixed = mixed.singlepart(
                    MimeAttachment::new(attachment.filename.clone())
                        .body(attachment.bytes.clone(), content_type),
                );
            }
            builder.multipart(mixed)
        }
        .map_err(|e| CheckError::Transport(format!("failed to build message: {}", e)))?;

        tracing::info!("sending \"{}\" via {}", message.subject, self.domain);
        self.transport
            .send(&email)
            .map_err(|e| CheckError::Transport(e.to_string()))?;
        tracing::info!("sent {}", message_id);

        Ok(message_id)
    }
}
