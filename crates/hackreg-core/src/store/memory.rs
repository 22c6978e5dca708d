// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Provides a simple, fast record store that doesn't persist across restarts.
// Useful for testing and for running the daemon locally without a Notion
// workspace.
//
// ## Behavior
//
// - Ticket lookup is substring match, first record in insertion order wins
// - Listing is cursor-paginated; the cursor is the offset of the next page
// - Never rate limits

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::model::{Attendee, AttendeePage, Flag, NewAttendee};
use crate::traits::RecordStore;
use crate::Error;

/// Default number of attendees per listing page
const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory record store implementation
///
/// This implementation stores all records in a Vec protected by a RwLock.
/// It provides no persistence across restarts.
///
/// # Example
///
/// ```rust,no_run
/// use hackreg_core::store::MemoryRecordStore;
/// use hackreg_core::{NewAttendee, RecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///
///     store.create_attendee(&NewAttendee {
///         ticket_code: "ABC123".to_string(),
///         first_name: "Ada".to_string(),
///         last_name: "Lovelace".to_string(),
///         preferred_name: None,
///         email: "ada@example.com".to_string(),
///     }).await?;
///
///     let found = store.find_by_ticket("ABC").await?;
///     assert!(found.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Vec<Attendee>>>,
    next_id: Arc<AtomicUsize>,
    page_size: usize,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store that lists `page_size` attendees per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            page_size: page_size.max(1),
        }
    }

    /// Insert a record directly, returning it
    pub async fn insert(&self, attendee: NewAttendee) -> Attendee {
        let record = Attendee {
            record_id: format!("page-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            ticket_code: attendee.ticket_code,
            first_name: attendee.first_name,
            last_name: attendee.last_name,
            preferred_name: attendee.preferred_name,
            email: attendee.email,
            flags: Default::default(),
            registered_at: Some(chrono::Utc::now()),
        };
        self.inner.write().await.push(record.clone());
        record
    }

    /// Snapshot of a record by id
    pub async fn attendee(&self, record_id: &str) -> Option<Attendee> {
        let guard = self.inner.read().await;
        guard.iter().find(|a| a.record_id == record_id).cloned()
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Attendee>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .iter()
            .find(|a| a.ticket_code.contains(ticket_code))
            .cloned())
    }

    async fn find_ticket_exact(&self, ticket_code: &str) -> Result<Option<Attendee>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.iter().find(|a| a.ticket_code == ticket_code).cloned())
    }

    async fn get_attendee(&self, record_id: &str) -> Result<Attendee, Error> {
        self.attendee(record_id)
            .await
            .ok_or_else(|| Error::not_found(format!("No record with id {record_id}")))
    }

    async fn create_attendee(&self, attendee: &NewAttendee) -> Result<Attendee, Error> {
        Ok(self.insert(attendee.clone()).await)
    }

    async fn set_flag(&self, record_id: &str, flag: Flag) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .iter_mut()
            .find(|a| a.record_id == record_id)
            .ok_or_else(|| Error::not_found(format!("No record with id {record_id}")))?;
        record.flags.insert(flag);
        Ok(())
    }

    async fn list_attendees(&self, cursor: Option<&str>) -> Result<AttendeePage, Error> {
        let offset = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::invalid_input(format!("Invalid cursor: {cursor}")))?,
            None => 0,
        };

        let guard = self.inner.read().await;
        let end = (offset + self.page_size).min(guard.len());
        let attendees = guard.get(offset..end).unwrap_or_default().to_vec();
        let next_cursor = (end < guard.len()).then(|| end.to_string());

        Ok(AttendeePage {
            attendees,
            next_cursor,
        })
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
