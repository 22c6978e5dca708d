// # hackreg-core
//
// Core library for the hackathon registration and check-in pipeline.
//
// ## Architecture Overview
//
// This library holds everything that is not I/O glue:
// - **RecordStore**: Trait for the external attendee database (single-shot)
// - **StoreGateway**: Retries rate-limited store calls under a bounded policy
// - **AttendeeLookup**: Resolves ticket codes, keeping not-found apart from failure
// - **CheckInDesk**: Per-ticket serialized redemption state machine
// - **RegistrationIntake**: Webhook submission → record → notifications
// - **ResendCoordinator**: Single and bulk ticket re-delivery
// - **EmailSender / ChatNotifier / CodeRenderer**: Outbound collaborators
//
// ## Design Principles
//
// 1. **Store is authoritative**: No attendee state is cached in-process
// 2. **Monotonic flags**: Flags move from unset to set, never back
// 3. **Retry in one place**: Adapters are single-shot, the gateway retries
// 4. **Outcomes over errors**: Unknown or already-redeemed tickets are results
// 5. **Library-First**: The daemon only wires collaborators and routes

pub mod checkin;
pub mod config;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod model;
pub mod notify;
pub mod resend;
pub mod retry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use checkin::CheckInDesk;
pub use config::{EngineConfig, EventConfig, HackregConfig, NotifyConfig, SmtpConfig, StoreConfig};
pub use error::{Error, Result};
pub use gateway::{AttendeeLookup, StoreGateway};
pub use intake::{IntakeOutcome, RegistrationIntake, parse_submission};
pub use model::{
    Attendee, AttendeePage, CheckInResult, Day, Flag, Meal, NewAttendee, Slot, TicketImage,
};
pub use notify::TicketMailer;
pub use resend::ResendCoordinator;
pub use retry::RetryPolicy;
pub use store::MemoryRecordStore;
pub use traits::{ChatEvent, ChatNotifier, CodeRenderer, EmailSender, RecordStore};
