// # Discord Chat Notifier
//
// This crate posts organizer alerts to a Discord channel webhook.
//
// ## Purpose
//
// Organizers watch a channel for new registrations and for submissions
// that could not be registered. Each alert is one webhook message.
//
// ## Fallback
//
// When no webhook is configured, [`LogChatNotifier`] writes the same text
// to the log so local runs behave the same way.

use async_trait::async_trait;
use hackreg_core::config::EventConfig;
use hackreg_core::{ChatEvent, ChatNotifier, Error, Result};
use serde_json::json;
use std::time::Duration;

/// Default HTTP timeout for webhook posts
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord webhook notifier
pub struct DiscordNotifier {
    /// Webhook URL; contains the webhook token, so it is never logged
    webhook_url: String,

    /// Event details used to link ticket images
    event: EventConfig,

    client: reqwest::Client,
}

impl std::fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("webhook_url", &"<REDACTED>")
            .field("event", &self.event.name)
            .finish()
    }
}

impl DiscordNotifier {
    /// Create a notifier for a webhook URL
    pub fn new(webhook_url: impl Into<String>, event: EventConfig) -> Result<Self> {
        let webhook_url = webhook_url.into();
        if !webhook_url.starts_with("https://") && !webhook_url.starts_with("http://") {
            return Err(Error::config("Discord webhook URL must use HTTP or HTTPS scheme"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            webhook_url,
            event,
            client,
        })
    }
}

#[async_trait]
impl ChatNotifier for DiscordNotifier {
    async fn notify(&self, event: &ChatEvent) -> Result<()> {
        let content = render_message(event, &self.event);

        let response = self
            .client
            .post(&self.webhook_url)
            .header("Accept", "application/json")
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| Error::notification("discord", format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(
                "discord",
                format!("Webhook rejected message: {} {}", status, body.trim()),
            ));
        }

        tracing::debug!("Posted Discord alert ({})", status);
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "discord"
    }
}

/// Writes alerts to the log instead of a chat channel
#[derive(Debug, Default)]
pub struct LogChatNotifier {
    event: EventConfig,
}

impl LogChatNotifier {
    pub fn new(event: EventConfig) -> Self {
        Self { event }
    }
}

#[async_trait]
impl ChatNotifier for LogChatNotifier {
    async fn notify(&self, event: &ChatEvent) -> Result<()> {
        tracing::info!("[chat] {}", render_message(event, &self.event));
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "log"
    }
}

/// Message text for an alert
pub fn render_message(event: &ChatEvent, config: &EventConfig) -> String {
    match event {
        ChatEvent::Registered(attendee) => format!(
            "{} has registered!\nEmail: `{}`\nTicket Number: `{}`\nTicket Barcode: [link]({})",
            attendee.full_name(),
            attendee.email,
            attendee.ticket_code,
            config.ticket_url(&attendee.ticket_code)
        ),
        ChatEvent::RegistrationFailed { name, email } => format!(
            "WARNING: {} tried to register, but something went wrong.\nEmail: `{}`",
            name.as_deref().unwrap_or("Someone"),
            email.as_deref().unwrap_or("unknown")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hackreg_core::Attendee;

    fn attendee() -> Attendee {
        Attendee {
            record_id: "page-1".to_string(),
            ticket_code: "mRz8Xq".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            preferred_name: None,
            email: "ada@example.com".to_string(),
            flags: Default::default(),
            registered_at: None,
        }
    }

    #[test]
    fn registered_message_links_ticket_image() {
        let config = EventConfig {
            name: ".devHacks 2025".to_string(),
            public_base_url: "https://hacks.example.com/".to_string(),
        };

        let message = render_message(&ChatEvent::Registered(attendee()), &config);
        assert_eq!(
            message,
            "Ada Lovelace has registered!\n\
             Email: `ada@example.com`\n\
             Ticket Number: `mRz8Xq`\n\
             Ticket Barcode: [link](https://hacks.example.com/api/v25/tickets/mRz8Xq)"
        );
    }

    #[test]
    fn failed_message_is_a_warning() {
        let message = render_message(
            &ChatEvent::RegistrationFailed {
                name: Some("Ada Lovelace".to_string()),
                email: None,
            },
            &EventConfig::default(),
        );
        assert!(message.starts_with("WARNING: Ada Lovelace tried to register"));
        assert!(message.ends_with("Email: `unknown`"));
    }

    #[test]
    fn webhook_url_is_validated_and_redacted() {
        assert!(DiscordNotifier::new("discord.com/api/webhooks/1/x", EventConfig::default()).is_err());

        let notifier = DiscordNotifier::new(
            "https://discord.com/api/webhooks/1/secret-token",
            EventConfig::default(),
        )
        .unwrap();
        assert!(!format!("{notifier:?}").contains("secret-token"));
    }
}
