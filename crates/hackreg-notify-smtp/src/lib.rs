//! SMTP ticket email sender using Lettre
//!
//! Sends each attendee an HTML email with their scannable ticket code
//! embedded inline (`cid:<ticket code>`), over a STARTTLS relay.
//!
//! [`LogEmailSender`] stands in when no SMTP account is configured.

use async_trait::async_trait;
use hackreg_core::config::{EventConfig, SmtpConfig};
use hackreg_core::{Attendee, EmailSender, Error, Result, TicketImage};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP email sender
///
/// The transport is built once and reused; Lettre pools connections.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    event: EventConfig,
}

impl std::fmt::Debug for SmtpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailSender")
            .field("from", &self.from.to_string())
            .field("credentials", &"<REDACTED>")
            .finish()
    }
}

impl SmtpEmailSender {
    /// Create a sender for an SMTP account
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the settings are invalid or the relay
    /// address cannot be used.
    pub fn new(config: &SmtpConfig, event: EventConfig) -> Result<Self> {
        config.validate()?;

        let from = format!("{} <{}>", config.from_name, config.username)
            .parse::<Mailbox>()
            .map_err(|e| Error::config(format!("Invalid from address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| Error::config(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from,
            event,
        })
    }

    /// Compose the ticket email without sending it
    pub fn compose(&self, attendee: &Attendee, image: &TicketImage) -> Result<Message> {
        compose_ticket_email(self.from.clone(), &self.event, attendee, image)
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_ticket(&self, attendee: &Attendee, image: &TicketImage) -> Result<()> {
        let email = self.compose(attendee, image)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| Error::notification("smtp", format!("Failed to send email: {e}")))?;

        tracing::debug!("SMTP relay accepted ticket email for {}", attendee.ticket_code);
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "smtp"
    }
}

/// Logs ticket emails instead of sending them
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_ticket(&self, attendee: &Attendee, image: &TicketImage) -> Result<()> {
        tracing::info!(
            "[email] Ticket {} for {} <{}> ({} byte image)",
            attendee.ticket_code,
            attendee.full_name(),
            attendee.email,
            image.png.len()
        );
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "log"
    }
}

/// Build the ticket email
///
/// `multipart/related` with the HTML body first and the PNG as an inline
/// part whose Content-ID is the ticket code.
pub fn compose_ticket_email(
    from: Mailbox,
    event: &EventConfig,
    attendee: &Attendee,
    image: &TicketImage,
) -> Result<Message> {
    let to = attendee
        .email
        .parse::<Mailbox>()
        .map_err(|e| Error::invalid_input(format!("Invalid recipient address: {e}")))?;

    let png = ContentType::parse("image/png")
        .map_err(|e| Error::notification("smtp", format!("Invalid content type: {e}")))?;
    let inline_code = Attachment::new_inline(attendee.ticket_code.clone()).body(image.png.clone(), png);

    Message::builder()
        .from(from)
        .to(to)
        .subject(format!("{} Ticket - {}", event.name, attendee.ticket_code))
        .multipart(
            MultiPart::related()
                .singlepart(SinglePart::html(ticket_html(event, attendee)))
                .singlepart(inline_code),
        )
        .map_err(|e| Error::notification("smtp", format!("Failed to build email: {e}")))
}

fn ticket_html(event: &EventConfig, attendee: &Attendee) -> String {
    let event_name = escape(&event.name);
    let name = escape(attendee.display_name());
    let code = escape(&attendee.ticket_code);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{event_name} Ticket</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #222;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px; text-align: center;">
        <h2>Hi {name}, you're registered for {event_name}!</h2>
        <p>Show this code at check-in and at every meal.</p>
        <p style="margin: 30px 0;"><img src="cid:{code}" alt="Ticket {code}"></p>
        <p style="font-size: 18px; letter-spacing: 2px;"><strong>{code}</strong></p>
        <p style="color: #666; font-size: 12px;">Keep this email; your ticket can't be reissued at the door.</p>
    </div>
</body>
</html>
"#
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
