//! Test doubles and common utilities for pipeline contract tests
//!
//! The doubles wrap or replace the outbound collaborators and count every
//! call, so tests can assert on exactly how often the core reached out.

#![allow(dead_code)]

use hackreg_core::error::Result;
use hackreg_core::{
    Attendee, AttendeeLookup, AttendeePage, ChatEvent, ChatNotifier, CheckInDesk, CodeRenderer,
    EmailSender, Error, Flag, MemoryRecordStore, NewAttendee, RecordStore, RegistrationIntake,
    ResendCoordinator, RetryPolicy, StoreGateway, TicketImage, TicketMailer,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A record store backed by memory that can be told to misbehave
///
/// - `rate_limit_next(n)`: the next `n` calls answer with a rate limit
/// - `fail_next_set_flag()`: the next `set_flag` fails with a backend error
/// - `fail_lookups()`: every ticket query fails with a backend error
/// - `with_lookup_delay(d)`: ticket queries sleep first, widening races
/// - `with_write_delay(d)`: `set_flag` sleeps first, widening races
///
/// `find_calls` counts both substring and exact ticket queries.
#[derive(Clone)]
pub struct ScriptedStore {
    inner: MemoryRecordStore,
    find_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    set_flag_calls: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    rate_limits: Arc<AtomicUsize>,
    retry_hint: Option<Duration>,
    fail_set_flag: Arc<AtomicBool>,
    fail_lookups: Arc<AtomicBool>,
    lookup_delay: Duration,
    write_delay: Duration,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::over(MemoryRecordStore::new())
    }

    /// Script a store that lists `page_size` attendees per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self::over(MemoryRecordStore::with_page_size(page_size))
    }

    fn over(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            find_calls: Arc::new(AtomicUsize::new(0)),
            get_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            set_flag_calls: Arc::new(AtomicUsize::new(0)),
            list_calls: Arc::new(AtomicUsize::new(0)),
            rate_limits: Arc::new(AtomicUsize::new(0)),
            retry_hint: None,
            fail_set_flag: Arc::new(AtomicBool::new(false)),
            fail_lookups: Arc::new(AtomicBool::new(false)),
            lookup_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
        }
    }

    /// Rate-limit responses carry this retry hint
    pub fn with_retry_hint(mut self, hint: Duration) -> Self {
        self.retry_hint = Some(hint);
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn rate_limit_next(&self, calls: usize) {
        self.rate_limits.store(calls, Ordering::SeqCst);
    }

    pub fn fail_next_set_flag(&self) {
        self.fail_set_flag.store(true, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub async fn seed(&self, attendee: NewAttendee) -> Attendee {
        self.inner.insert(attendee).await
    }

    pub async fn seed_sent(&self, attendee: NewAttendee) -> Attendee {
        let record = self.inner.insert(attendee).await;
        self.inner
            .set_flag(&record.record_id, Flag::QrSent)
            .await
            .unwrap();
        self.inner.attendee(&record.record_id).await.unwrap()
    }

    pub async fn snapshot(&self, record_id: &str) -> Attendee {
        self.inner.attendee(record_id).await.unwrap()
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn set_flag_calls(&self) -> usize {
        self.set_flag_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn ticket_query(&self) -> Result<()> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        self.take_rate_limit()?;
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::backend("scripted", "service unavailable"));
        }
        Ok(())
    }

    fn take_rate_limit(&self) -> Result<()> {
        let limited = self
            .rate_limits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            Err(Error::rate_limited(self.retry_hint))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for ScriptedStore {
    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        self.ticket_query().await?;
        self.inner.find_by_ticket(ticket_code).await
    }

    async fn find_ticket_exact(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        self.ticket_query().await?;
        self.inner.find_ticket_exact(ticket_code).await
    }

    async fn get_attendee(&self, record_id: &str) -> Result<Attendee> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.take_rate_limit()?;
        self.inner.get_attendee(record_id).await
    }

    async fn create_attendee(&self, attendee: &NewAttendee) -> Result<Attendee> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.take_rate_limit()?;
        self.inner.create_attendee(attendee).await
    }

    async fn set_flag(&self, record_id: &str, flag: Flag) -> Result<()> {
        self.set_flag_calls.fetch_add(1, Ordering::SeqCst);
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.take_rate_limit()?;
        if self.fail_set_flag.swap(false, Ordering::SeqCst) {
            return Err(Error::backend("scripted", "validation_error"));
        }
        self.inner.set_flag(record_id, flag).await
    }

    async fn list_attendees(&self, cursor: Option<&str>) -> Result<AttendeePage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_rate_limit()?;
        self.inner.list_attendees(cursor).await
    }

    fn store_name(&self) -> &'static str {
        "scripted"
    }
}

/// An email sender that records recipients
#[derive(Clone, Default)]
pub struct RecordingEmail {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingEmail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to this address fail
    pub fn fail_for(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_string());
    }

    /// Ticket codes of successfully sent emails, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmailSender for RecordingEmail {
    async fn send_ticket(&self, attendee: &Attendee, image: &TicketImage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        assert_eq!(image.ticket_code, attendee.ticket_code);
        if self.failing.lock().unwrap().contains(&attendee.email) {
            return Err(Error::notification("recording", "mailbox unavailable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push(attendee.ticket_code.clone());
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "recording"
    }
}

/// A chat notifier that records events
#[derive(Clone, Default)]
pub struct RecordingChat {
    events: Arc<Mutex<Vec<ChatEvent>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatNotifier for RecordingChat {
    async fn notify(&self, event: &ChatEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::notification("recording", "webhook gone"));
        }
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "recording"
    }
}

/// A renderer that encodes the code as its own bytes
pub struct StubRenderer;

impl CodeRenderer for StubRenderer {
    fn render_png(&self, ticket_code: &str) -> Result<TicketImage> {
        Ok(TicketImage {
            ticket_code: ticket_code.to_string(),
            png: ticket_code.as_bytes().to_vec(),
        })
    }
}

/// Build a new attendee with a derived email
pub fn new_attendee(ticket_code: &str) -> NewAttendee {
    NewAttendee {
        ticket_code: ticket_code.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        preferred_name: None,
        email: format!("{}@example.com", ticket_code.to_lowercase()),
    }
}

/// A gateway over the scripted store that never sleeps
pub fn gateway(store: &ScriptedStore, max_attempts: usize) -> StoreGateway {
    StoreGateway::new(Arc::new(store.clone()), RetryPolicy::immediate(max_attempts))
}

pub fn desk(store: &ScriptedStore) -> CheckInDesk {
    CheckInDesk::new(AttendeeLookup::new(gateway(store, 4)))
}

pub fn mailer(store: &ScriptedStore, email: &RecordingEmail) -> TicketMailer {
    TicketMailer::new(
        gateway(store, 4),
        Arc::new(email.clone()),
        Arc::new(StubRenderer),
    )
}

pub fn intake(store: &ScriptedStore, email: &RecordingEmail, chat: &RecordingChat) -> RegistrationIntake {
    RegistrationIntake::new(mailer(store, email), Arc::new(chat.clone()))
}

pub fn coordinator(store: &ScriptedStore, email: &RecordingEmail) -> ResendCoordinator {
    ResendCoordinator::new(mailer(store, email), Duration::ZERO)
}

/// A webhook submission in the form builder's shape
pub fn submission(ticket_code: &str, first: &str, last: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "eventId": "evt-1",
        "eventType": "FORM_RESPONSE",
        "data": {
            "responseId": ticket_code,
            "fields": [
                { "key": "question_first", "label": "First Name", "value": first },
                { "key": "question_last", "label": "Last Name", "value": last },
                { "key": "question_pref", "label": "Preferred Name", "value": null },
                { "key": "question_email", "label": "Preferred Email", "value": email },
                { "key": "question_toggle", "label": "Use this email?", "value": true },
                { "key": "question_student", "label": "Student Number", "value": "7654321" },
                { "key": "question_school", "label": "School Email", "value": "school@example.edu" }
            ]
        }
    })
}
