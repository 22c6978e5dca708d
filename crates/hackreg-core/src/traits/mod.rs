//! Core traits for the registration pipeline
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RecordStore`]: Lookup and update attendee records in the external database
//! - [`EmailSender`]: Deliver ticket emails
//! - [`ChatNotifier`]: Alert organizers
//! - [`CodeRenderer`]: Render scannable ticket codes

pub mod record_store;
pub mod notifier;

pub use record_store::RecordStore;
pub use notifier::{ChatEvent, ChatNotifier, CodeRenderer, EmailSender};
