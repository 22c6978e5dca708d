//! Ticket delivery
//!
//! Render the attendee's code, email it, then mark the record as notified.
//! Shared by registration intake, single-ticket resend and bulk resend.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::gateway::StoreGateway;
use crate::model::{Attendee, Flag, TicketImage};
use crate::traits::{CodeRenderer, EmailSender};

/// Sends ticket emails and records that they went out
#[derive(Clone)]
pub struct TicketMailer {
    gateway: StoreGateway,
    email: Arc<dyn EmailSender>,
    renderer: Arc<dyn CodeRenderer>,
}

impl TicketMailer {
    /// Create a mailer
    pub fn new(
        gateway: StoreGateway,
        email: Arc<dyn EmailSender>,
        renderer: Arc<dyn CodeRenderer>,
    ) -> Self {
        Self {
            gateway,
            email,
            renderer,
        }
    }

    /// Render a ticket code without sending anything
    pub fn render(&self, ticket_code: &str) -> Result<TicketImage> {
        self.renderer.render_png(ticket_code)
    }

    /// Email the ticket and set `QrSent` on the record
    ///
    /// The flag is only set after the email was accepted, so a failed send
    /// leaves the attendee eligible for bulk resend.
    pub async fn send_and_confirm(&self, attendee: &Attendee) -> Result<()> {
        if attendee.email.trim().is_empty() {
            return Err(Error::invalid_input(format!(
                "{} has no email address",
                attendee.full_name()
            )));
        }

        let image = self.render(&attendee.ticket_code)?;
        self.email.send_ticket(attendee, &image).await?;
        info!(
            "Sent ticket {} to {} via {}",
            attendee.ticket_code,
            attendee.email,
            self.email.channel_name()
        );

        if let Err(e) = self.gateway.set_flag(&attendee.record_id, Flag::QrSent).await {
            warn!(
                "Ticket {} was emailed but could not be marked as sent: {}",
                attendee.ticket_code, e
            );
            return Err(e);
        }
        Ok(())
    }

    /// The gateway used to mark records
    pub fn gateway(&self) -> &StoreGateway {
        &self.gateway
    }
}
