// # Notification Collaborators
//
// Outbound side effects of a registration: the ticket email, the organizer
// chat alert and the scannable code image. The core only calls these; how a
// message is composed or delivered is up to the implementation.
//
// ## Implementations
//
// - Email: `hackreg-notify-smtp`
// - Chat: `hackreg-notify-discord`
// - Code image: `hackreg-ticket-qr`

use async_trait::async_trait;

use crate::model::{Attendee, TicketImage};

/// Sends the ticket email to an attendee
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver the ticket email with the code image attached
    ///
    /// Callers guarantee `attendee.email` is non-empty.
    async fn send_ticket(&self, attendee: &Attendee, image: &TicketImage) -> Result<(), crate::Error>;

    /// Channel name for logging
    fn channel_name(&self) -> &'static str;
}

/// Something organizers should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A registration went through
    Registered(Attendee),
    /// A submission arrived but could not be turned into a registration
    RegistrationFailed {
        /// Whatever name could be read from the submission
        name: Option<String>,
        /// Whatever email could be read from the submission
        email: Option<String>,
    },
}

/// Posts alerts to the organizers' chat
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Post an alert
    async fn notify(&self, event: &ChatEvent) -> Result<(), crate::Error>;

    /// Channel name for logging
    fn channel_name(&self) -> &'static str;
}

/// Renders a ticket code as a scannable image
pub trait CodeRenderer: Send + Sync {
    /// Render the code as PNG bytes
    fn render_png(&self, ticket_code: &str) -> Result<TicketImage, crate::Error>;
}
