//! Record store gateway
//!
//! Wraps a single-shot [`RecordStore`] with the retry policy. Every store
//! call made by the pipeline goes through here, so rate limiting is absorbed
//! in one place and never reaches the check-in or intake logic as anything
//! other than [`Error::RetriesExhausted`].

use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Attendee, AttendeePage, Flag, NewAttendee};
use crate::retry::{retry_rate_limited, RetryPolicy};
use crate::traits::RecordStore;

/// Retrying front for a [`RecordStore`]
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<dyn RecordStore>,
    policy: RetryPolicy,
}

impl StoreGateway {
    /// Create a gateway over `store`
    pub fn new(store: Arc<dyn RecordStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Name of the underlying store
    pub fn store_name(&self) -> &'static str {
        self.store.store_name()
    }

    /// Retry policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Find the first attendee whose ticket code contains `ticket_code`
    pub async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        debug!("Querying {} for ticket {}", self.store_name(), ticket_code);
        let store = self.store.as_ref();
        retry_rate_limited(&self.policy, "find_by_ticket", move || {
            store.find_by_ticket(ticket_code)
        })
        .await
    }

    /// Find the attendee whose ticket code is exactly `ticket_code`
    pub async fn find_ticket_exact(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        debug!("Querying {} for exact ticket {}", self.store_name(), ticket_code);
        let store = self.store.as_ref();
        retry_rate_limited(&self.policy, "find_ticket_exact", move || {
            store.find_ticket_exact(ticket_code)
        })
        .await
    }

    /// Fetch an attendee by record id
    pub async fn get_attendee(&self, record_id: &str) -> Result<Attendee> {
        debug!("Fetching record {} from {}", record_id, self.store_name());
        let store = self.store.as_ref();
        retry_rate_limited(&self.policy, "get_attendee", move || {
            store.get_attendee(record_id)
        })
        .await
    }

    /// Create an attendee record
    pub async fn create_attendee(&self, attendee: &NewAttendee) -> Result<Attendee> {
        debug!(
            "Creating record for ticket {} in {}",
            attendee.ticket_code,
            self.store_name()
        );
        let store = self.store.as_ref();
        retry_rate_limited(&self.policy, "create_attendee", move || {
            store.create_attendee(attendee)
        })
        .await
    }

    /// Set a flag on a record
    pub async fn set_flag(&self, record_id: &str, flag: Flag) -> Result<()> {
        debug!("Setting {:?} on record {}", flag, record_id);
        let store = self.store.as_ref();
        retry_rate_limited(&self.policy, "set_flag", move || {
            store.set_flag(record_id, flag)
        })
        .await
    }

    /// List one page of attendees
    pub async fn list_attendees(&self, cursor: Option<&str>) -> Result<AttendeePage> {
        debug!("Listing attendees from {} (cursor: {:?})", self.store_name(), cursor);
        let store = self.store.as_ref();
        retry_rate_limited(&self.policy, "list_attendees", move || {
            store.list_attendees(cursor)
        })
        .await
    }
}

/// Resolves ticket codes to attendee records
///
/// Not-found is a normal outcome (`Ok(None)`); a store that is failing is an
/// `Err`, so callers can tell "no such ticket" from "couldn't ask".
#[derive(Clone)]
pub struct AttendeeLookup {
    gateway: StoreGateway,
}

impl AttendeeLookup {
    /// Create a lookup over the gateway
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    /// Resolve a ticket code
    ///
    /// Matching is substring on the store side. An empty code would match
    /// every record, so it is rejected up front.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Attendee))`: The first matching record
    /// - `Ok(None)`: No record matched
    /// - `Err(Error::InvalidInput)`: The code was blank
    /// - `Err(Error)`: The store failed or kept rate limiting
    pub async fn lookup(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        let ticket_code = ticket_code.trim();
        if ticket_code.is_empty() {
            return Err(Error::invalid_input("Ticket code cannot be empty"));
        }

        let found = self.gateway.find_by_ticket(ticket_code).await?;
        if found.is_none() {
            debug!("No attendee for ticket {}", ticket_code);
        }
        Ok(found)
    }

    /// The gateway this lookup uses
    pub fn gateway(&self) -> &StoreGateway {
        &self.gateway
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    fn new_attendee(code: &str) -> NewAttendee {
        NewAttendee {
            ticket_code: code.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            preferred_name: None,
            email: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn lookup_matches_on_substring() {
        let store = Arc::new(MemoryRecordStore::new());
        store.insert(new_attendee("TICKET-ABC123")).await;

        let lookup = AttendeeLookup::new(StoreGateway::new(store, RetryPolicy::immediate(1)));

        let found = lookup.lookup("ABC123").await.unwrap();
        assert_eq!(found.unwrap().ticket_code, "TICKET-ABC123");

        assert!(lookup.lookup("ZZZ999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_codes_are_rejected() {
        let store = Arc::new(MemoryRecordStore::new());
        store.insert(new_attendee("ABC123")).await;

        let lookup = AttendeeLookup::new(StoreGateway::new(store, RetryPolicy::immediate(1)));

        assert!(matches!(lookup.lookup("   ").await, Err(Error::InvalidInput(_))));
    }
}
