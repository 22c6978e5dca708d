//! Data model for attendees and redemption slots
//!
//! The model is enum-driven: [`Day`], [`Meal`] and [`Flag`] identify slots,
//! and the mapping from a flag to a concrete store field lives in each
//! [`crate::RecordStore`] implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Event day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    /// First day of the event
    Friday,
    /// Second day of the event
    Saturday,
}

impl Day {
    /// All event days, in order
    pub const ALL: [Day; 2] = [Day::Friday, Day::Saturday];

    /// Display name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Day::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("Invalid Day: {s}")))
    }
}

/// Meal served during the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Meal {
    /// Midday meal
    Lunch,
    /// Evening meal
    Dinner,
}

impl Meal {
    /// All meals, in order
    pub const ALL: [Meal; 2] = [Meal::Lunch, Meal::Dinner];

    /// Display name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Meal::ALL
            .into_iter()
            .find(|meal| meal.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("Invalid Meal: {s}")))
    }
}

/// A monotonic boolean field on an attendee record
///
/// Flags only ever move from unset to set. Nothing in this crate clears one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "flag", rename_all = "snake_case")]
pub enum Flag {
    /// Attendee has checked in at the door
    CheckedIn,
    /// Attendee has claimed the given meal
    MealVerified {
        /// Day of the meal
        day: Day,
        /// Which meal
        meal: Meal,
    },
    /// Ticket email has been delivered
    QrSent,
}

impl Flag {
    /// Every flag an attendee record carries
    pub fn all() -> Vec<Flag> {
        let mut flags = vec![Flag::CheckedIn];
        for day in Day::ALL {
            for meal in Meal::ALL {
                flags.push(Flag::MealVerified { day, meal });
            }
        }
        flags.push(Flag::QrSent);
        flags
    }
}

/// A redemption slot: a day check-in or a (day, meal) claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Door check-in on a given day
    CheckIn(Day),
    /// Meal claim on a given day
    Meal(Day, Meal),
}

impl Slot {
    /// Build a slot from a day and an optional meal
    pub fn new(day: Day, meal: Option<Meal>) -> Self {
        match meal {
            Some(meal) => Slot::Meal(day, meal),
            None => Slot::CheckIn(day),
        }
    }

    /// The record flag backing this slot
    ///
    /// Door check-in is tracked by a single flag regardless of day.
    pub fn flag(&self) -> Flag {
        match *self {
            Slot::CheckIn(_) => Flag::CheckedIn,
            Slot::Meal(day, meal) => Flag::MealVerified { day, meal },
        }
    }

    /// Whether an already-redeemed outcome is reported as a warning
    pub fn warns_when_redeemed(&self) -> bool {
        matches!(self, Slot::Meal(..))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::CheckIn(day) => write!(f, "{day}"),
            Slot::Meal(day, meal) => write!(f, "{day} {meal}"),
        }
    }
}

/// An attendee record as held by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Store-assigned record identifier (e.g. a Notion page id)
    pub record_id: String,
    /// Ticket code embedded in the attendee's scannable code
    pub ticket_code: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Preferred name, if the attendee gave one
    pub preferred_name: Option<String>,
    /// Contact email for the ticket
    pub email: String,
    /// Flags currently set on the record
    #[serde(default)]
    pub flags: BTreeSet<Flag>,
    /// When the store created the record
    #[serde(default)]
    pub registered_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Attendee {
    /// Whether the given flag is set
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Name to greet the attendee with
    pub fn display_name(&self) -> &str {
        self.preferred_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.first_name)
    }
}

/// Fields needed to create an attendee record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttendee {
    /// Ticket code
    pub ticket_code: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Preferred name
    pub preferred_name: Option<String>,
    /// Contact email
    pub email: String,
}

impl NewAttendee {
    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One page of a paginated attendee listing
#[derive(Debug, Clone, Default)]
pub struct AttendeePage {
    /// Attendees on this page
    pub attendees: Vec<Attendee>,
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

/// Outcome of a redemption attempt
///
/// Every redemption returns one of these, including unknown tickets and
/// already-redeemed slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInResult {
    /// The slot was redeemed by this call
    pub success: bool,
    /// The slot had already been claimed (meal path only)
    pub warning: bool,
    /// Human-readable status for the station operator
    pub status: String,
    /// The attendee, when the ticket resolved
    pub attendee: Option<Attendee>,
}

impl CheckInResult {
    pub(crate) fn success(status: String, attendee: Attendee) -> Self {
        Self {
            success: true,
            warning: false,
            status,
            attendee: Some(attendee),
        }
    }

    pub(crate) fn rejected(status: String, warning: bool, attendee: Option<Attendee>) -> Self {
        Self {
            success: false,
            warning,
            status,
            attendee,
        }
    }
}

/// A rendered scannable ticket code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketImage {
    /// Ticket code the image encodes
    pub ticket_code: String,
    /// PNG bytes
    pub png: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_and_meal_parse_exact_names() {
        assert_eq!("Friday".parse::<Day>().unwrap(), Day::Friday);
        assert_eq!("Saturday".parse::<Day>().unwrap(), Day::Saturday);
        assert_eq!("Dinner".parse::<Meal>().unwrap(), Meal::Dinner);

        assert!("friday".parse::<Day>().is_err());
        assert!("Sunday".parse::<Day>().is_err());
        assert!("Breakfast".parse::<Meal>().is_err());
    }

    #[test]
    fn slots_map_to_independent_flags() {
        assert_eq!(Slot::new(Day::Friday, None).flag(), Flag::CheckedIn);
        assert_eq!(Slot::new(Day::Saturday, None).flag(), Flag::CheckedIn);
        assert_eq!(
            Slot::new(Day::Saturday, Some(Meal::Lunch)).flag(),
            Flag::MealVerified {
                day: Day::Saturday,
                meal: Meal::Lunch
            }
        );
        assert_eq!(Flag::all().len(), 6);
    }

    #[test]
    fn display_name_prefers_preferred_name() {
        let mut attendee = Attendee {
            record_id: "page-1".to_string(),
            ticket_code: "ABC123".to_string(),
            first_name: "Robert".to_string(),
            last_name: "Tables".to_string(),
            preferred_name: Some("Bobby".to_string()),
            email: "bobby@example.com".to_string(),
            flags: BTreeSet::new(),
            registered_at: None,
        };
        assert_eq!(attendee.display_name(), "Bobby");

        attendee.preferred_name = Some("  ".to_string());
        assert_eq!(attendee.display_name(), "Robert");
        assert_eq!(attendee.full_name(), "Robert Tables");
    }
}
