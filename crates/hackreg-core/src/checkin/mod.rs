//! Check-in desk
//!
//! The CheckInDesk redeems tickets against slots:
//! - Door check-in: one `CheckedIn` flag per attendee
//! - Meal claims: one `MealVerified { day, meal }` flag per (day, meal)
//!
//! ## State Machine
//!
//! ```text
//!              redeem() succeeds
//! UNREDEEMED ───────────────────────▶ REDEEMED  (terminal)
//!     │                                  │
//!     │ store fails                      │ redeem() again
//!     ▼                                  ▼
//! UNREDEEMED (failure result)       REDEEMED (no-op result)
//! ```
//!
//! ## Redemption Flow
//!
//! 1. Resolve the ticket code to a record (unknown ticket → rejected)
//! 2. Take the per-record lock and re-read the record
//! 3. Read the slot flag (already set → rejected, warning on meal slots)
//! 4. Set the flag through the gateway (rate limits retried there)
//! 5. Report the outcome as a [`CheckInResult`]

mod locks;

pub use locks::{RecordGuard, RecordLocks};

use tracing::{error, info, warn};

use crate::error::Error;
use crate::gateway::AttendeeLookup;
use crate::model::{Attendee, CheckInResult, Day, Meal, Slot};

/// Redeems tickets for door check-in and meals
///
/// One desk is shared by all requests. Redemptions of the same record are
/// serialized so the flag read and the flag write cannot interleave with
/// another redemption in this process, whichever code the caller used.
pub struct CheckInDesk {
    lookup: AttendeeLookup,
    locks: RecordLocks,
}

impl CheckInDesk {
    /// Create a desk that resolves tickets through `lookup`
    pub fn new(lookup: AttendeeLookup) -> Self {
        Self {
            lookup,
            locks: RecordLocks::new(),
        }
    }

    /// Check a ticket in at the door
    pub async fn check_in(&self, ticket_code: &str, day: Day) -> CheckInResult {
        self.redeem(ticket_code, Slot::CheckIn(day)).await
    }

    /// Claim a meal for a ticket
    pub async fn claim_meal(&self, ticket_code: &str, day: Day, meal: Meal) -> CheckInResult {
        self.redeem(ticket_code, Slot::Meal(day, meal)).await
    }

    /// Redeem a ticket against a slot
    ///
    /// Never fails: unknown tickets, already-redeemed slots and store
    /// failures are all reported through the returned [`CheckInResult`].
    /// Only a `success: true` result means the flag was set by this call.
    pub async fn redeem(&self, ticket_code: &str, slot: Slot) -> CheckInResult {
        let ticket_code = ticket_code.trim();

        let resolved = match self.lookup.lookup(ticket_code).await {
            Ok(Some(attendee)) => attendee,
            Ok(None) | Err(Error::InvalidInput(_)) => {
                info!("Rejected unknown ticket {} for {}", ticket_code, slot);
                return CheckInResult::rejected(invalid_ticket_message(ticket_code), false, None);
            }
            Err(e) => {
                error!("Lookup of ticket {} failed: {}", ticket_code, e);
                return CheckInResult::rejected(lookup_failed_message(ticket_code, &e), false, None);
            }
        };

        // Lookup matches substrings, so different codes can resolve to the
        // same record. Serialize on the record and read it fresh under the lock.
        let _guard = self.locks.acquire(&resolved.record_id).await;
        let attendee = match self.lookup.gateway().get_attendee(&resolved.record_id).await {
            Ok(attendee) => attendee,
            Err(e) => {
                error!("Re-reading record {} failed: {}", resolved.record_id, e);
                return CheckInResult::rejected(
                    lookup_failed_message(ticket_code, &e),
                    false,
                    Some(resolved),
                );
            }
        };

        let flag = slot.flag();
        if attendee.has(flag) {
            let status = already_redeemed_message(&attendee, slot);
            info!("{}", status);
            return CheckInResult::rejected(status, slot.warns_when_redeemed(), Some(attendee));
        }

        match self
            .lookup
            .gateway()
            .set_flag(&attendee.record_id, flag)
            .await
        {
            Ok(()) => {
                let mut attendee = attendee;
                attendee.flags.insert(flag);
                let status = redeemed_message(&attendee, ticket_code, slot);
                info!("{}", status);
                CheckInResult::success(status, attendee)
            }
            Err(e) => {
                if e.is_rate_limited() {
                    warn!("Gave up redeeming {} for {}: {}", ticket_code, slot, e);
                } else {
                    error!("Failed to redeem {} for {}: {}", ticket_code, slot, e);
                }
                let status = failure_message(&attendee, slot, &e);
                CheckInResult::rejected(status, false, Some(attendee))
            }
        }
    }

    /// Look up a ticket without redeeming anything
    pub async fn attendee(&self, ticket_code: &str) -> crate::Result<Option<Attendee>> {
        self.lookup.lookup(ticket_code).await
    }
}

fn invalid_ticket_message(ticket_code: &str) -> String {
    format!("{ticket_code} is an invalid ticket code. Please check the attendee database.")
}

fn lookup_failed_message(ticket_code: &str, error: &Error) -> String {
    format!("Could not look up ticket {ticket_code} right now - {error}. Please try again.")
}

fn already_redeemed_message(attendee: &Attendee, slot: Slot) -> String {
    match slot {
        Slot::CheckIn(day) => {
            format!("{} is already checked in on {}!", attendee.full_name(), day)
        }
        Slot::Meal(day, meal) => {
            format!("{} has already claimed {} {}!", attendee.full_name(), day, meal)
        }
    }
}

fn redeemed_message(attendee: &Attendee, ticket_code: &str, slot: Slot) -> String {
    let verb = match slot {
        Slot::CheckIn(_) => "checked in",
        Slot::Meal(..) => "redeemed",
    };
    format!(
        "Successfully {} {} with ticket {} for {}!",
        verb,
        attendee.full_name(),
        ticket_code,
        slot
    )
}

fn failure_message(attendee: &Attendee, slot: Slot, error: &Error) -> String {
    let action = match slot {
        Slot::CheckIn(_) => "check in",
        Slot::Meal(..) => "redeem",
    };
    format!(
        "Something went wrong trying to {} {} - {}!",
        action,
        attendee.full_name(),
        error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StoreGateway;
    use crate::model::{Flag, NewAttendee};
    use crate::retry::RetryPolicy;
    use crate::store::MemoryRecordStore;
    use std::sync::Arc;

    async fn desk_with_ticket(code: &str) -> (CheckInDesk, MemoryRecordStore, String) {
        let store = MemoryRecordStore::new();
        let record = store
            .insert(NewAttendee {
                ticket_code: code.to_string(),
                first_name: "Linus".to_string(),
                last_name: "Torvalds".to_string(),
                preferred_name: None,
                email: "linus@example.com".to_string(),
            })
            .await;
        let gateway = StoreGateway::new(Arc::new(store.clone()), RetryPolicy::immediate(3));
        (CheckInDesk::new(AttendeeLookup::new(gateway)), store, record.record_id)
    }

    #[tokio::test]
    async fn check_in_then_repeat() {
        let (desk, store, record_id) = desk_with_ticket("ABC123").await;

        let first = desk.check_in("ABC123", Day::Friday).await;
        assert!(first.success);
        assert!(!first.warning);
        assert_eq!(
            first.status,
            "Successfully checked in Linus Torvalds with ticket ABC123 for Friday!"
        );

        let second = desk.check_in("ABC123", Day::Friday).await;
        assert!(!second.success);
        assert!(!second.warning, "door check-in repeats are not warnings");
        assert_eq!(second.status, "Linus Torvalds is already checked in on Friday!");

        assert!(store.attendee(&record_id).await.unwrap().has(Flag::CheckedIn));
    }

    #[tokio::test]
    async fn meal_claims_are_independent_and_warn_on_repeat() {
        let (desk, _store, _) = desk_with_ticket("ABC123").await;

        assert!(desk.claim_meal("ABC123", Day::Friday, Meal::Lunch).await.success);
        assert!(desk.claim_meal("ABC123", Day::Friday, Meal::Dinner).await.success);
        assert!(desk.claim_meal("ABC123", Day::Saturday, Meal::Lunch).await.success);

        let repeat = desk.claim_meal("ABC123", Day::Friday, Meal::Lunch).await;
        assert!(!repeat.success);
        assert!(repeat.warning);
        assert_eq!(repeat.status, "Linus Torvalds has already claimed Friday Lunch!");
    }

    #[tokio::test]
    async fn unknown_ticket_is_rejected_with_its_code() {
        let (desk, _store, _) = desk_with_ticket("ABC123").await;

        let result = desk.check_in("NOPE42", Day::Saturday).await;
        assert!(!result.success);
        assert!(result.attendee.is_none());
        assert!(result.status.contains("NOPE42 is an invalid ticket code"));
    }
}
