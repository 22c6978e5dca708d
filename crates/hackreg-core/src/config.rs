//! Configuration types for the registration pipeline
//!
//! This module defines all configuration structures used throughout the crate.
//! The daemon fills these from environment variables; library users can
//! build them directly or deserialize them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HackregConfig {
    /// Record store configuration
    pub store: StoreConfig,

    /// Outbound notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Retry and pacing settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Event details used in outbound messages
    #[serde(default)]
    pub event: EventConfig,
}

impl HackregConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.notify.validate()?;
        self.engine.validate()?;
        self.event.validate()?;
        Ok(())
    }
}

/// Record store configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Notion database
    Notion {
        /// Integration token
        api_token: String,
        /// Attendee database id
        database_id: String,
    },

    /// In-process store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Notion {
                api_token,
                database_id,
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Notion API token cannot be empty"));
                }
                if database_id.is_empty() {
                    return Err(crate::Error::config("Notion database id cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreConfig::Notion { .. } => "notion",
            StoreConfig::Memory => "memory",
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Notion { database_id, .. } => f
                .debug_struct("Notion")
                .field("api_token", &"<REDACTED>")
                .field("database_id", database_id)
                .finish(),
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

/// Outbound notification configuration
///
/// Either channel may be absent, in which case the daemon logs instead of sending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Discord webhook for organizer alerts
    #[serde(default)]
    pub discord_webhook_url: Option<String>,

    /// SMTP account for ticket emails
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl NotifyConfig {
    /// Validate the notification configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(url) = &self.discord_webhook_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            return Err(crate::Error::config(
                "Discord webhook URL must use HTTP or HTTPS scheme",
            ));
        }
        if let Some(smtp) = &self.smtp {
            smtp.validate()?;
        }
        Ok(())
    }
}

/// SMTP account settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay host (STARTTLS)
    #[serde(default = "default_smtp_server")]
    pub server: String,

    /// Relay port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Login, also used as the sender address
    pub username: String,

    /// Password (for Gmail, an app password)
    pub password: String,

    /// Display name on outgoing mail
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl SmtpConfig {
    /// Create SMTP settings for an account on the default relay
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: username.into(),
            password: password.into(),
            from_name: default_from_name(),
        }
    }

    /// Validate the SMTP settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.server.is_empty() {
            return Err(crate::Error::config("SMTP server cannot be empty"));
        }
        if !self.username.contains('@') {
            return Err(crate::Error::config(
                "SMTP username must be the sender email address",
            ));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("SMTP password cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("from_name", &self.from_name)
            .finish()
    }
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "devClub".to_string()
}

/// Retry and pacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum backend calls per logical operation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Wait before the first retry when the backend sends no hint (ms)
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    /// Cap on any single wait (ms)
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Overall time budget for one operation including waits (seconds)
    #[serde(default = "default_retry_deadline_secs")]
    pub retry_deadline_secs: u64,

    /// Pause between attendees during bulk resend (ms)
    ///
    /// Keeps bulk resend under the store's request rate.
    #[serde(default = "default_resend_pacing_ms")]
    pub resend_pacing_ms: u64,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("max_attempts must be at least 1"));
        }
        if self.max_retry_delay_ms < self.initial_retry_delay_ms {
            return Err(crate::Error::config(
                "max_retry_delay_ms must not be smaller than initial_retry_delay_ms",
            ));
        }
        if self.retry_deadline_secs == 0 {
            return Err(crate::Error::config("retry_deadline_secs must be > 0"));
        }
        Ok(())
    }

    /// Retry policy for store calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            multiplier: 2.0,
            deadline: Duration::from_secs(self.retry_deadline_secs),
        }
    }

    /// Pause between attendees during bulk resend
    pub fn resend_pacing(&self) -> Duration {
        Duration::from_millis(self.resend_pacing_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            retry_deadline_secs: default_retry_deadline_secs(),
            resend_pacing_ms: default_resend_pacing_ms(),
        }
    }
}

fn default_max_attempts() -> usize {
    6
}

fn default_initial_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    10_000
}

fn default_retry_deadline_secs() -> u64 {
    30
}

fn default_resend_pacing_ms() -> u64 {
    1000
}

/// Event details used in outbound messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Event name, e.g. in the email subject
    #[serde(default = "default_event_name")]
    pub name: String,

    /// Public base URL of this service, used to link ticket images
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl EventConfig {
    /// Validate the event settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Event name cannot be empty"));
        }
        if !self.public_base_url.starts_with("https://")
            && !self.public_base_url.starts_with("http://")
        {
            return Err(crate::Error::config(
                "Public base URL must use HTTP or HTTPS scheme",
            ));
        }
        Ok(())
    }

    /// Link to the ticket image for a code
    pub fn ticket_url(&self, ticket_code: &str) -> String {
        format!(
            "{}/api/v25/tickets/{}",
            self.public_base_url.trim_end_matches('/'),
            ticket_code
        )
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            name: default_event_name(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_event_name() -> String {
    ".devHacks 2025".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}
