// # Notion Page Mapping
//
// Attendees are pages in a Notion database. This module is the only place
// that knows the database's property names and shapes:
//
// | Property             | Type      | Attendee field              |
// |----------------------|-----------|-----------------------------|
// | Ticket ID            | title     | ticket_code                 |
// | First Name           | rich_text | first_name                  |
// | Last Name            | rich_text | last_name                   |
// | Preferred Name       | rich_text | preferred_name              |
// | Preferred Email      | email     | email (when set)            |
// | School Email         | email     | email (fallback)            |
// | Checked In           | checkbox  | Flag::CheckedIn             |
// | {Day} {Meal} Verified| checkbox  | Flag::MealVerified          |
// | QR Sent              | checkbox  | Flag::QrSent                |

use hackreg_core::{Attendee, Error, Flag, NewAttendee, Result};
use serde_json::{Map, Value, json};

pub const TICKET_ID: &str = "Ticket ID";
pub const FIRST_NAME: &str = "First Name";
pub const LAST_NAME: &str = "Last Name";
pub const PREFERRED_NAME: &str = "Preferred Name";
pub const PREFERRED_EMAIL: &str = "Preferred Email";
pub const SCHOOL_EMAIL: &str = "School Email";

/// Checkbox property backing a flag
pub fn flag_property(flag: Flag) -> String {
    match flag {
        Flag::CheckedIn => "Checked In".to_string(),
        Flag::MealVerified { day, meal } => format!("{day} {meal} Verified"),
        Flag::QrSent => "QR Sent".to_string(),
    }
}

/// Database query filter for a ticket code (substring match)
pub fn ticket_filter(ticket_code: &str) -> Value {
    json!({
        "property": TICKET_ID,
        "rich_text": { "contains": ticket_code }
    })
}

/// Database query filter for exactly one ticket code
pub fn exact_ticket_filter(ticket_code: &str) -> Value {
    json!({
        "property": TICKET_ID,
        "rich_text": { "equals": ticket_code }
    })
}

/// PATCH body that sets one flag
pub fn flag_update(flag: Flag) -> Value {
    json!({
        "properties": {
            flag_property(flag): { "checkbox": true }
        }
    })
}

/// Properties for a new attendee page, every flag unset
pub fn new_page_properties(attendee: &NewAttendee) -> Value {
    let mut properties = Map::new();
    properties.insert(TICKET_ID.to_string(), json!({ "title": text(&attendee.ticket_code) }));
    properties.insert(FIRST_NAME.to_string(), json!({ "rich_text": text(&attendee.first_name) }));
    properties.insert(LAST_NAME.to_string(), json!({ "rich_text": text(&attendee.last_name) }));
    properties.insert(
        PREFERRED_NAME.to_string(),
        json!({ "rich_text": attendee.preferred_name.as_deref().map(text).unwrap_or_else(|| json!([])) }),
    );
    properties.insert(PREFERRED_EMAIL.to_string(), json!({ "email": attendee.email }));
    for flag in Flag::all() {
        properties.insert(flag_property(flag), json!({ "checkbox": false }));
    }
    Value::Object(properties)
}

/// Read a page object into an attendee
///
/// Missing checkbox properties read as unset. A page without an id or a
/// ticket code is malformed.
pub fn page_to_attendee(page: &Value) -> Result<Attendee> {
    let record_id = page
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("page has no id"))?
        .to_string();

    let properties = page
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(&format!("page {record_id} has no properties")))?;

    let ticket_code = plain_text(properties.get(TICKET_ID), "title")
        .ok_or_else(|| malformed(&format!("page {record_id} has no {TICKET_ID}")))?;

    let email = email(properties.get(PREFERRED_EMAIL))
        .or_else(|| email(properties.get(SCHOOL_EMAIL)))
        .unwrap_or_default();

    let flags = Flag::all()
        .into_iter()
        .filter(|flag| {
            properties
                .get(&flag_property(*flag))
                .and_then(|p| p.get("checkbox"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .collect();

    let registered_at = page
        .get("created_time")
        .and_then(Value::as_str)
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&chrono::Utc));

    Ok(Attendee {
        record_id,
        ticket_code,
        first_name: plain_text(properties.get(FIRST_NAME), "rich_text").unwrap_or_default(),
        last_name: plain_text(properties.get(LAST_NAME), "rich_text").unwrap_or_default(),
        preferred_name: plain_text(properties.get(PREFERRED_NAME), "rich_text"),
        email,
        flags,
        registered_at,
    })
}

fn text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

/// Concatenated plain text of a title or rich_text property
fn plain_text(property: Option<&Value>, kind: &str) -> Option<String> {
    let joined: String = property?
        .get(kind)?
        .as_array()?
        .iter()
        .filter_map(|span| span.get("plain_text").and_then(Value::as_str))
        .collect();
    let joined = joined.trim();
    (!joined.is_empty()).then(|| joined.to_string())
}

fn email(property: Option<&Value>) -> Option<String> {
    property?
        .get("email")?
        .as_str()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

fn malformed(message: &str) -> Error {
    Error::backend("notion", format!("Malformed page: {message}"))
}
