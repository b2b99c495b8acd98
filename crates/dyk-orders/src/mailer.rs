//! # Outgoing Mail
//!
//! The [`Mailer`] trait is the seam between the services and the SMTP
//! transport. [`SmtpMailer`] sends through lettre; [`MockMailer`] records
//! messages in memory and can be told to fail.
//!
//! Mail is only ever sent after a transaction has committed. A failed send
//! never undoes an order.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MailAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::Mutex;

use dyk_core::{CompanySettings, Invoice};

use crate::config::SmtpConfig;

// =============================================================================
// Message Types
// =============================================================================

/// A file attached to an e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Attachment {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            content,
        }
    }
}

/// An HTML e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

/// What the transport reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail is not enabled")]
    NotEnabled,

    #[error("Mail configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Sends e-mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<Delivery, MailError>;
}

// =============================================================================
// SMTP
// =============================================================================

/// lettre SMTP transport with STARTTLS.
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// Builds the transport. A disabled config gives a mailer that refuses
    /// to send.
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Configuration(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    fn build_message(&self, email: &Email) -> Result<Message, MailError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| MailError::Configuration(format!("Invalid from address: {}", e)))?;

        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::InvalidRecipient(format!("{}: {}", email.to, e)))?;

        let builder = Message::builder().from(from).to(to).subject(&email.subject);

        if email.attachments.is_empty() {
            return builder
                .header(ContentType::TEXT_HTML)
                .body(email.html.clone())
                .map_err(|e| MailError::SendFailed(format!("Failed to build message: {}", e)));
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(email.html.clone()));
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                MailError::Configuration(format!(
                    "Invalid content type '{}': {}",
                    attachment.content_type, e
                ))
            })?;
            body = body.singlepart(
                MailAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        builder
            .multipart(body)
            .map_err(|e| MailError::SendFailed(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<Delivery, MailError> {
        let transport = self.transport.as_ref().ok_or(MailError::NotEnabled)?;
        let message = self.build_message(&email)?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");

        let message_id = response.message().next().map(|s| s.to_string());
        Ok(Delivery { message_id })
    }
}

// =============================================================================
// In-Memory
// =============================================================================

/// Records every message it is asked to send.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<Email>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose sends always fail. Attempts are still recorded.
    pub fn failing() -> Self {
        MockMailer {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages handed to `send`, oldest first.
    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: Email) -> Result<Delivery, MailError> {
        let mut sent = self.sent.lock().await;
        sent.push(email);

        if self.fail {
            return Err(MailError::SendFailed("mock transport is down".to_string()));
        }

        Ok(Delivery {
            message_id: Some(format!("mock-{}", sent.len())),
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Account credentials for a customer registered at checkout.
pub fn welcome_email(
    to: &str,
    first_name: &str,
    password: &str,
    site_url: &str,
    company: &CompanySettings,
) -> Email {
    let sender = display_company(company);
    let html = format!(
        "<p>Hej {name}!</p>\
         <p>Ett konto har skapats åt dig hos {sender} i samband med din beställning.</p>\
         <p>E-post: <strong>{email}</strong><br>Lösenord: <strong>{password}</strong></p>\
         <p>Logga in på <a href=\"{url}\">{url}</a> och byt lösenord vid första inloggningen.</p>\
         <p>Välkommen!<br>{sender}</p>",
        name = escape_html(first_name),
        sender = escape_html(&sender),
        email = escape_html(to),
        password = escape_html(password),
        url = escape_html(site_url),
    );

    Email {
        to: to.to_string(),
        subject: format!("Välkommen till {}", sender),
        html,
        attachments: Vec::new(),
    }
}

/// Invoice notification with the PDF attached.
pub fn invoice_email(invoice: &Invoice, pdf: Vec<u8>, to: &str, company: &CompanySettings) -> Email {
    let sender = display_company(company);
    let mut html = format!(
        "<p>Hej {name}!</p>\
         <p>Bifogat finns faktura {number} på {total}, förfallodatum {due}.</p>\
         <p>Ange fakturanumret {number} som referens vid betalning.</p>",
        name = escape_html(&invoice.buyer_name),
        number = escape_html(&invoice.invoice_number),
        total = invoice.total_amount(),
        due = invoice.due_date,
    );
    if let Some(bankgiro) = &company.bankgiro {
        html.push_str(&format!("<p>Bankgiro: {}</p>", escape_html(bankgiro)));
    }
    html.push_str(&format!("<p>Med vänlig hälsning<br>{}</p>", escape_html(&sender)));

    Email {
        to: to.to_string(),
        subject: format!("Faktura {} från {}", invoice.invoice_number, sender),
        html,
        attachments: vec![Attachment::pdf(
            format!("faktura-{}.pdf", invoice.invoice_number),
            pdf,
        )],
    }
}

fn display_company(company: &CompanySettings) -> String {
    if company.name.trim().is_empty() {
        "Dykskolan".to_string()
    } else {
        company.name.clone()
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> Email {
        Email {
            to: "anna@example.se".to_string(),
            subject: "Faktura".to_string(),
            html: "<p>Hej</p>".to_string(),
            attachments: vec![Attachment::pdf("faktura.pdf", b"%PDF-1.5".to_vec())],
        }
    }

    #[tokio::test]
    async fn test_mock_records_messages() {
        let mailer = MockMailer::new();
        let delivery = mailer.send(sample_email()).await.unwrap();
        assert_eq!(delivery.message_id.as_deref(), Some("mock-1"));

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments[0].content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_failing_mock_records_attempt() {
        let mailer = MockMailer::failing();
        assert!(mailer.send(sample_email()).await.is_err());
        assert_eq!(mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_smtp_refuses() {
        let mailer = SmtpMailer::new(SmtpConfig::default()).unwrap();
        assert!(matches!(
            mailer.send(sample_email()).await,
            Err(MailError::NotEnabled)
        ));
    }

    #[tokio::test]
    async fn test_smtp_message_with_attachment() {
        let config = SmtpConfig {
            enabled: true,
            user: "mailer".to_string(),
            ..SmtpConfig::default()
        };
        let mailer = SmtpMailer::new(config).unwrap();

        assert!(mailer.build_message(&sample_email()).is_ok());

        let mut bad = sample_email();
        bad.to = "not an address".to_string();
        assert!(matches!(
            mailer.build_message(&bad),
            Err(MailError::InvalidRecipient(_))
        ));
    }

    #[test]
    fn test_welcome_email_escapes_input() {
        let company = CompanySettings {
            name: "Dykskolan AB".to_string(),
            ..CompanySettings::default()
        };
        let email = welcome_email(
            "anna@example.se",
            "<Anna>",
            "Ab3#defghijk",
            "https://dykskolan.se",
            &company,
        );

        assert_eq!(email.subject, "Välkommen till Dykskolan AB");
        assert!(email.html.contains("&lt;Anna&gt;"));
        assert!(email.html.contains("Ab3#defghijk"));
        assert!(email.attachments.is_empty());
    }
}
