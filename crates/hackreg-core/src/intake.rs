//! Registration intake
//!
//! Turns a form-webhook submission into an attendee record and fans out the
//! notifications. The submission shape is positional:
//!
//! ```text
//! data.responseId      → ticket code
//! data.fields[0].value → first name
//! data.fields[1].value → last name
//! data.fields[2].value → preferred name (optional)
//! data.fields[3].value → preferred email
//! data.fields[4].value → "use preferred email" toggle
//! data.fields[6].value → school email (used when the toggle is off)
//! ```
//!
//! Once the record exists the registration is complete. Chat and email
//! failures are logged and never undo it.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::model::{Attendee, Flag, NewAttendee};
use crate::notify::TicketMailer;
use crate::traits::{ChatEvent, ChatNotifier};

const FIRST_NAME: usize = 0;
const LAST_NAME: usize = 1;
const PREFERRED_NAME: usize = 2;
const PREFERRED_EMAIL: usize = 3;
const USE_PREFERRED_EMAIL: usize = 4;
const SCHOOL_EMAIL: usize = 6;

/// Result of processing one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// The attendee record exists
    Created(Attendee),
    /// The submission could not be registered
    Failed(String),
}

impl IntakeOutcome {
    /// Message returned to the webhook caller
    pub fn message(&self) -> &'static str {
        match self {
            IntakeOutcome::Created(_) => "Successfully Created Ticket",
            IntakeOutcome::Failed(_) => "Something went Wrong",
        }
    }

    /// HTTP status returned to the webhook caller
    pub fn status_code(&self) -> u16 {
        match self {
            IntakeOutcome::Created(_) => 201,
            IntakeOutcome::Failed(_) => 503,
        }
    }
}

/// Processes registration webhooks
pub struct RegistrationIntake {
    mailer: TicketMailer,
    chat: Arc<dyn ChatNotifier>,
}

impl RegistrationIntake {
    /// Create an intake that records through the mailer's gateway
    pub fn new(mailer: TicketMailer, chat: Arc<dyn ChatNotifier>) -> Self {
        Self { mailer, chat }
    }

    /// Register a submission
    ///
    /// Never fails: problems are logged together with the payload and
    /// reported as [`IntakeOutcome::Failed`].
    pub async fn register(&self, payload: &Value) -> IntakeOutcome {
        let new = match parse_submission(payload) {
            Ok(new) => new,
            Err(e) => {
                error!("Rejected registration submission: {} (payload: {})", e, payload);
                self.alert(&failed_event(payload)).await;
                return IntakeOutcome::Failed(e.to_string());
            }
        };

        let attendee = match self.ensure_record(&new).await {
            Ok(attendee) => attendee,
            Err(e) => {
                error!(
                    "Could not store registration for ticket {}: {} (payload: {})",
                    new.ticket_code, e, payload
                );
                self.alert(&ChatEvent::RegistrationFailed {
                    name: Some(new.full_name()),
                    email: Some(new.email.clone()),
                })
                .await;
                return IntakeOutcome::Failed(e.to_string());
            }
        };

        self.alert(&ChatEvent::Registered(attendee.clone())).await;

        if attendee.has(Flag::QrSent) {
            info!(
                "Ticket {} was already emailed, not sending again",
                attendee.ticket_code
            );
        } else if let Err(e) = self.mailer.send_and_confirm(&attendee).await {
            warn!("Failed to email ticket {}: {}", attendee.ticket_code, e);
        }

        IntakeOutcome::Created(attendee)
    }

    /// Return the existing record for this ticket, creating it if needed
    ///
    /// Webhooks can be redelivered, so a record with exactly this ticket
    /// code is reused. A record whose code merely contains it is not.
    async fn ensure_record(&self, new: &NewAttendee) -> Result<Attendee> {
        let gateway = self.mailer.gateway();
        if let Some(existing) = gateway.find_ticket_exact(&new.ticket_code).await? {
            info!("Ticket {} already registered", new.ticket_code);
            return Ok(existing);
        }

        let created = gateway.create_attendee(new).await?;
        info!("Registered {} with ticket {}", created.full_name(), created.ticket_code);
        Ok(created)
    }

    async fn alert(&self, event: &ChatEvent) {
        if let Err(e) = self.chat.notify(event).await {
            warn!("Chat alert via {} failed: {}", self.chat.channel_name(), e);
        }
    }
}

/// Read a form-webhook payload into a new attendee
pub fn parse_submission(payload: &Value) -> Result<NewAttendee> {
    let data = payload
        .get("data")
        .ok_or_else(|| Error::invalid_input("Submission has no data"))?;

    let ticket_code = text(data.get("responseId"))
        .ok_or_else(|| Error::invalid_input("Submission has no responseId"))?;

    let fields = data
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::invalid_input("Submission has no fields"))?;
    let field = |index: usize| fields.get(index).and_then(|f| f.get("value"));

    let first_name = text(field(FIRST_NAME))
        .ok_or_else(|| Error::invalid_input("Missing first name"))?;
    let last_name =
        text(field(LAST_NAME)).ok_or_else(|| Error::invalid_input("Missing last name"))?;
    let preferred_name = text(field(PREFERRED_NAME));

    let email = if truthy(field(USE_PREFERRED_EMAIL)) {
        text(field(PREFERRED_EMAIL))
    } else {
        text(field(SCHOOL_EMAIL))
    }
    .ok_or_else(|| Error::invalid_input("Missing email"))?;

    Ok(NewAttendee {
        ticket_code,
        first_name,
        last_name,
        preferred_name,
        email,
    })
}

fn failed_event(payload: &Value) -> ChatEvent {
    let fields = payload
        .pointer("/data/fields")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let field = |index: usize| fields.get(index).and_then(|f| f.get("value"));

    let name = match (text(field(FIRST_NAME)), text(field(LAST_NAME))) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (first, last) => first.or(last),
    };
    let email = text(field(PREFERRED_EMAIL)).or_else(|| text(field(SCHOOL_EMAIL)));

    ChatEvent::RegistrationFailed { name, email }
}

/// Non-blank string value, trimmed
fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Form toggles arrive as booleans, strings or option lists
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
    }
}
