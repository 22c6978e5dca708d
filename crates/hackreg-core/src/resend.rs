//! Ticket resend
//!
//! Re-delivers ticket emails, either to one record or to everyone whose
//! ticket has not gone out yet.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{Attendee, Flag};
use crate::notify::TicketMailer;

/// Re-sends ticket emails
#[derive(Clone)]
pub struct ResendCoordinator {
    mailer: TicketMailer,
    pacing: Duration,
}

impl ResendCoordinator {
    /// Create a coordinator that waits `pacing` between attendees
    pub fn new(mailer: TicketMailer, pacing: Duration) -> Self {
        Self { mailer, pacing }
    }

    /// Email one record's ticket, whether or not it was sent before
    ///
    /// # Returns
    ///
    /// - `Ok(Attendee)`: Sent and marked
    /// - `Err(Error::NotFound)`: No record with that id
    /// - `Err(Error::RetriesExhausted)`: The store kept rate limiting
    /// - `Err(Error)`: Anything else
    pub async fn resend_one(&self, record_id: &str) -> Result<Attendee> {
        let mut attendee = self.mailer.gateway().get_attendee(record_id).await?;
        self.mailer.send_and_confirm(&attendee).await?;
        attendee.flags.insert(Flag::QrSent);
        Ok(attendee)
    }

    /// Email every attendee whose ticket has not been sent
    ///
    /// Walks all pages of the store. A failed send is logged and counted;
    /// it does not stop the walk. Only a listing failure aborts.
    ///
    /// Returns the number of attendees a send was attempted for.
    pub async fn resend_all(&self) -> Result<usize> {
        let gateway = self.mailer.gateway();
        let mut cursor: Option<String> = None;
        let mut attempted = 0;
        let mut failed = 0;
        let mut visited = 0;

        loop {
            let page = gateway.list_attendees(cursor.as_deref()).await?;
            visited += page.attendees.len();

            for attendee in page.attendees.iter().filter(|a| !a.has(Flag::QrSent)) {
                if attempted > 0 && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                attempted += 1;

                if let Err(e) = self.mailer.send_and_confirm(attendee).await {
                    failed += 1;
                    warn!("Resend to ticket {} failed: {}", attendee.ticket_code, e);
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            "Resend pass visited {} attendee(s), attempted {}, failed {}",
            visited, attempted, failed
        );
        Ok(attempted)
    }
}
