//! Environment configuration for the daemon
//!
//! Variables are read through a lookup function so tests can supply a map
//! instead of touching the process environment.

use anyhow::{Context, Result};
use hackreg_core::config::{
    EngineConfig, EventConfig, HackregConfig, NotifyConfig, SmtpConfig, StoreConfig,
};
use std::net::SocketAddr;
use std::str::FromStr;

/// Address the HTTP server binds when `HACKREG_BIND_ADDR` is unset
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Pipeline configuration handed to the core
    pub pipeline: HackregConfig,

    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl DaemonConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match var("HACKREG_STORE_TYPE").as_deref().unwrap_or("notion") {
            "notion" => StoreConfig::Notion {
                api_token: var("NOTION_TOKEN")
                    .or_else(|| var("NOTION_KEY"))
                    .context(
                        "NOTION_TOKEN is required for the Notion store. \
                         Set it via: export NOTION_TOKEN=secret_...",
                    )?,
                database_id: var("NOTION_DATABASE_ID").context(
                    "NOTION_DATABASE_ID is required for the Notion store. \
                     Set it to the id of the attendee database",
                )?,
            },
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!(
                "HACKREG_STORE_TYPE '{}' is not supported. \
                Supported types: notion, memory",
                other
            ),
        };

        let smtp = match var("GOOGLE_APP_PASS") {
            Some(password) => {
                let username = var("HACKREG_SMTP_USERNAME").context(
                    "HACKREG_SMTP_USERNAME is required when GOOGLE_APP_PASS is set",
                )?;
                let mut smtp = SmtpConfig::new(username, password);
                if let Some(server) = var("HACKREG_SMTP_SERVER") {
                    smtp.server = server;
                }
                if let Some(port) = parse_var(&var, "HACKREG_SMTP_PORT")? {
                    smtp.port = port;
                }
                Some(smtp)
            }
            None => None,
        };

        let mut engine = EngineConfig::default();
        if let Some(max_attempts) = parse_var(&var, "HACKREG_MAX_ATTEMPTS")? {
            engine.max_attempts = max_attempts;
        }
        if let Some(deadline) = parse_var(&var, "HACKREG_RETRY_DEADLINE_SECS")? {
            engine.retry_deadline_secs = deadline;
        }
        if let Some(pacing) = parse_var(&var, "HACKREG_RESEND_PACING_MS")? {
            engine.resend_pacing_ms = pacing;
        }

        let mut event = EventConfig::default();
        if let Some(name) = var("HACKREG_EVENT_NAME") {
            event.name = name;
        }
        if let Some(base) = var("HACKREG_PUBLIC_BASE_URL") {
            event.public_base_url = base;
        }

        let bind_addr = var("HACKREG_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("HACKREG_BIND_ADDR '{bind_addr}' is not a socket address"))?;

        Ok(Self {
            pipeline: HackregConfig {
                store,
                notify: NotifyConfig {
                    discord_webhook_url: var("DISCORD_WEBHOOK_URL"),
                    smtp,
                },
                engine,
                event,
            },
            bind_addr,
            log_level: var("HACKREG_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Runs the core checks, then the ones only the daemon cares about.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;

        if let StoreConfig::Notion { api_token, .. } = &self.pipeline.store {
            // Check for obvious placeholder tokens (common mistake)
            let token_lower = api_token.to_lowercase();
            if token_lower.contains("your_token")
                || token_lower.contains("replace_me")
                || token_lower == "token"
            {
                anyhow::bail!(
                    "NOTION_TOKEN appears to be a placeholder. \
                    Use the integration token from your Notion workspace."
                );
            }
        }

        if self.pipeline.engine.max_attempts > 20 {
            anyhow::bail!(
                "HACKREG_MAX_ATTEMPTS must be between 1 and 20. Got: {}",
                self.pipeline.engine.max_attempts
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "HACKREG_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_var<T, V>(var: &V, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    V: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{key} '{raw}' is not a valid number"))
        })
        .transpose()
}
