//! Outgoing feedback e-mail over SMTP.

use chrono::{DateTime, Utc};
use lettre::{
    address::AddressError,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::MailConfig;
use crate::models::feedback::FeedbackRequest;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Whether each of the two feedback mails went out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackDelivery {
    pub emails_sent: bool,
    pub confirmation_sent: bool,
}

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl Mailer {
    /// Builds the transport. No connection is opened until the first send.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender_email.clone(),
                config.sender_password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            sender: config.sender_email.parse()?,
            recipient: config.recipient_email.parse()?,
        })
    }

    /// Notifies the feedback inbox; replies go to the author.
    pub fn admin_message(
        &self,
        feedback: &FeedbackRequest,
        submitted_at: DateTime<Utc>,
    ) -> Result<Message, MailError> {
        let author: Mailbox = feedback.email.parse()?;
        let body = format!(
            "New feedback\n\n\
             Name: {}\n\
             Email: {}\n\
             Date: {}\n\n\
             Category: {}\n\
             Rating: {} ({}/5)\n\n\
             {}\n\n\
             ---\n\
             Reply to this e-mail to answer the user directly.\n",
            feedback.name,
            feedback.email,
            submitted_at.format("%d.%m.%Y %H:%M"),
            category_label(&feedback.category),
            stars(feedback.rating),
            feedback.rating,
            feedback.feedback,
        );

        Ok(Message::builder()
            .from(self.sender.clone())
            .reply_to(author)
            .to(self.recipient.clone())
            .subject(format!("New feedback from {}", feedback.name))
            .header(ContentType::TEXT_PLAIN)
            .body(body)?)
    }

    /// Thank-you note back to the author.
    pub fn confirmation_message(
        &self,
        feedback: &FeedbackRequest,
        submitted_at: DateTime<Utc>,
    ) -> Result<Message, MailError> {
        let body = format!(
            "Dear {},\n\n\
             Thank you for taking the time to share your thoughts about the app.\n\n\
             Your feedback:\n\
             Rating: {} ({}/5)\n\
             Category: {}\n\
             Date: {}\n\n\
             We review every message within 24-48 hours and may contact you if \
             we need more details.\n\n\
             This message was sent automatically, please do not reply.\n",
            feedback.name,
            stars(feedback.rating),
            feedback.rating,
            category_label(&feedback.category),
            submitted_at.format("%d.%m.%Y %H:%M"),
        );

        Ok(Message::builder()
            .from(self.sender.clone())
            .to(feedback.email.parse()?)
            .subject("Thank you for your feedback!")
            .header(ContentType::TEXT_PLAIN)
            .body(body)?)
    }

    /// Sends the inbox notification, then the confirmation. Failures are
    /// logged and reported, never returned.
    pub async fn send_feedback(
        &self,
        feedback: &FeedbackRequest,
        submitted_at: DateTime<Utc>,
    ) -> FeedbackDelivery {
        let emails_sent = self.deliver(self.admin_message(feedback, submitted_at)).await;
        let confirmation_sent = emails_sent
            && self
                .deliver(self.confirmation_message(feedback, submitted_at))
                .await;

        FeedbackDelivery {
            emails_sent,
            confirmation_sent,
        }
    }

    async fn deliver(&self, message: Result<Message, MailError>) -> bool {
        let result = match message {
            Ok(message) => self.transport.send(message).await.map_err(MailError::from),
            Err(err) => Err(err),
        };
        match result {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to send feedback e-mail");
                false
            }
        }
    }
}

fn category_label(category: &str) -> &str {
    match category {
        "general" => "General feedback",
        "bug" => "Bug report",
        "feature" => "Feature request",
        "ui" => "User interface",
        "performance" => "Performance",
        other => other,
    }
}

fn stars(rating: i64) -> String {
    let filled = rating.clamp(0, 5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
