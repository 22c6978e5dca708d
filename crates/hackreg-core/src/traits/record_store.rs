// # Record Store Trait
//
// Defines the interface to the external attendee database.
//
// ## Implementations
//
// - Notion: `hackreg-store-notion` crate
// - In-memory: `hackreg_core::store::MemoryRecordStore` (tests, local development)
//
// ## Usage
//
// ```rust,ignore
// use hackreg_core::{Flag, RecordStore};
//
// let store = /* RecordStore implementation */;
//
// if let Some(attendee) = store.find_by_ticket("ABC123").await? {
//     store.set_flag(&attendee.record_id, Flag::CheckedIn).await?;
// }
// ```

use async_trait::async_trait;

use crate::model::{Attendee, AttendeePage, Flag, NewAttendee};

/// Trait for record store implementations
///
/// The store is authoritative for attendee state. Nothing is cached locally.
///
/// # Single-shot
///
/// Implementations make one backend request per call and report what the
/// backend said. In particular they must not retry or sleep: a rate-limit
/// response is returned as [`crate::Error::RateLimited`] carrying the
/// backend's retry hint, and the [`crate::StoreGateway`] decides whether and
/// when to try again.
///
/// # Field mapping
///
/// Implementations own the mapping from [`Flag`] to whatever field the
/// backend uses (e.g. `"Friday Lunch Verified"`), so callers stay enum-driven.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the first attendee whose ticket code contains `ticket_code`
    ///
    /// Matching is substring, not exact, and at most one record is fetched.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Attendee))`: A matching record
    /// - `Ok(None)`: No record matched
    /// - `Err(Error)`: The backend failed or rate limited us
    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Attendee>, crate::Error>;

    /// Find the attendee whose ticket code is exactly `ticket_code`
    ///
    /// Used where a near match would be wrong, e.g. detecting a redelivered
    /// registration.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Attendee))`: The record with this exact code
    /// - `Ok(None)`: No record has this exact code
    /// - `Err(Error)`: The backend failed or rate limited us
    async fn find_ticket_exact(&self, ticket_code: &str)
    -> Result<Option<Attendee>, crate::Error>;

    /// Fetch an attendee by store record id
    ///
    /// # Returns
    ///
    /// - `Ok(Attendee)`: The record
    /// - `Err(Error::NotFound)`: No such record
    /// - `Err(Error)`: The backend failed or rate limited us
    async fn get_attendee(&self, record_id: &str) -> Result<Attendee, crate::Error>;

    /// Create a new attendee record with all flags unset
    async fn create_attendee(&self, attendee: &NewAttendee) -> Result<Attendee, crate::Error>;

    /// Set a flag on a record
    ///
    /// Setting an already-set flag is harmless; flags are never cleared.
    async fn set_flag(&self, record_id: &str, flag: Flag) -> Result<(), crate::Error>;

    /// List one page of attendees
    ///
    /// # Parameters
    ///
    /// - `cursor`: `None` for the first page, otherwise the `next_cursor` of
    ///   the previous page. Page size is backend-defined.
    async fn list_attendees(&self, cursor: Option<&str>) -> Result<AttendeePage, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
