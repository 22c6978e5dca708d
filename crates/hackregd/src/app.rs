//! Collaborator wiring
//!
//! Everything the handlers share is built once here and handed to the
//! router behind an `Arc`.

use anyhow::Result;
use hackreg_core::config::{HackregConfig, StoreConfig};
use hackreg_core::{
    AttendeeLookup, ChatNotifier, CheckInDesk, CodeRenderer, EmailSender, MemoryRecordStore,
    RecordStore, RegistrationIntake, ResendCoordinator, StoreGateway, TicketMailer,
};
use hackreg_ticket_qr::QrCodeRenderer;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handler state
pub struct AppState {
    pub desk: CheckInDesk,
    pub intake: RegistrationIntake,
    pub resend: ResendCoordinator,
    pub mailer: TicketMailer,
}

impl AppState {
    /// Assemble the pipeline around a store and outbound collaborators
    pub fn assemble(
        config: &HackregConfig,
        store: Arc<dyn RecordStore>,
        email: Arc<dyn EmailSender>,
        chat: Arc<dyn ChatNotifier>,
        renderer: Arc<dyn CodeRenderer>,
    ) -> Self {
        let gateway = StoreGateway::new(store, config.engine.retry_policy());
        let mailer = TicketMailer::new(gateway.clone(), email, renderer);

        Self {
            desk: CheckInDesk::new(AttendeeLookup::new(gateway)),
            intake: RegistrationIntake::new(mailer.clone(), chat),
            resend: ResendCoordinator::new(mailer.clone(), config.engine.resend_pacing()),
            mailer,
        }
    }

    /// Build the state described by the configuration
    pub fn from_config(config: &HackregConfig) -> Result<Self> {
        let store = build_store(&config.store)?;
        let email = build_email(config)?;
        let chat = build_chat(config)?;
        let renderer: Arc<dyn CodeRenderer> = Arc::new(QrCodeRenderer::new());

        info!(
            "Pipeline wired: store={}, email={}, chat={}",
            store.store_name(),
            email.channel_name(),
            chat.channel_name()
        );

        Ok(Self::assemble(config, store, email, chat, renderer))
    }
}

fn build_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    match config {
        StoreConfig::Memory => {
            warn!("Using the in-memory record store; attendees are lost on restart");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        #[cfg(feature = "notion")]
        StoreConfig::Notion { .. } => Ok(Arc::new(
            hackreg_store_notion::NotionRecordStore::from_config(config)?,
        )),
        #[cfg(not(feature = "notion"))]
        StoreConfig::Notion { .. } => {
            anyhow::bail!("The Notion store requires hackregd to be built with the 'notion' feature")
        }
    }
}

fn build_email(config: &HackregConfig) -> Result<Arc<dyn EmailSender>> {
    #[cfg(feature = "smtp")]
    {
        if let Some(smtp) = &config.notify.smtp {
            return Ok(Arc::new(hackreg_notify_smtp::SmtpEmailSender::new(
                smtp,
                config.event.clone(),
            )?));
        }
        warn!("GOOGLE_APP_PASS not set; ticket emails will only be logged");
        Ok(Arc::new(hackreg_notify_smtp::LogEmailSender))
    }

    #[cfg(not(feature = "smtp"))]
    {
        if config.notify.smtp.is_some() {
            anyhow::bail!("SMTP delivery requires hackregd to be built with the 'smtp' feature");
        }
        Ok(Arc::new(LoggedEmail))
    }
}

fn build_chat(config: &HackregConfig) -> Result<Arc<dyn ChatNotifier>> {
    #[cfg(feature = "discord")]
    {
        if let Some(url) = &config.notify.discord_webhook_url {
            return Ok(Arc::new(hackreg_notify_discord::DiscordNotifier::new(
                url.clone(),
                config.event.clone(),
            )?));
        }
        warn!("DISCORD_WEBHOOK_URL not set; organizer alerts will only be logged");
        Ok(Arc::new(hackreg_notify_discord::LogChatNotifier::new(
            config.event.clone(),
        )))
    }

    #[cfg(not(feature = "discord"))]
    {
        if config.notify.discord_webhook_url.is_some() {
            anyhow::bail!("Discord alerts require hackregd to be built with the 'discord' feature");
        }
        Ok(Arc::new(LoggedChat))
    }
}

// Minimal fallbacks for builds without the notifier crates.

#[cfg(not(feature = "smtp"))]
struct LoggedEmail;

#[cfg(not(feature = "smtp"))]
#[async_trait::async_trait]
impl EmailSender for LoggedEmail {
    async fn send_ticket(
        &self,
        attendee: &hackreg_core::Attendee,
        _image: &hackreg_core::TicketImage,
    ) -> hackreg_core::Result<()> {
        info!("[email] Ticket {} for {}", attendee.ticket_code, attendee.email);
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "log"
    }
}

#[cfg(not(feature = "discord"))]
struct LoggedChat;

#[cfg(not(feature = "discord"))]
#[async_trait::async_trait]
impl ChatNotifier for LoggedChat {
    async fn notify(&self, event: &hackreg_core::ChatEvent) -> hackreg_core::Result<()> {
        info!("[chat] {:?}", event);
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "log"
    }
}
