//! Safety check for parsed fragments.
//!
//! Values that flow straight into the front end (sort keys, CSS colours)
//! are checked against what it can render. Unknown topics pass.

use super::{FieldMap, Topic};
use serde_yaml::Value;

const SORT_TYPES: &[&str] = &["date", "name"];
const SORT_ORDERS: &[&str] = &["des", "asc"];

/// Whether `fields` can be used for `topic`. Never fails.
pub fn is_safe(topic: Topic, fields: &FieldMap) -> bool {
    match topic {
        Topic::Sorting => {
            one_of(fields.get("type"), SORT_TYPES) && one_of(fields.get("order"), SORT_ORDERS)
        }
        Topic::Design => fields.get("background").is_none_or(is_hex_colour),
        Topic::Information | Topic::Features => true,
    }
}

fn one_of(value: Option<&Value>, allowed: &[&str]) -> bool {
    match value {
        None => true,
        Some(v) => v.as_str().is_some_and(|s| allowed.contains(&s)),
    }
}

/// `#RRGGBB`-style: any leading marker character followed by hex digits.
fn is_hex_colour(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    let mut chars = text.chars();
    if chars.next().is_none() {
        return false;
    }
    let digits = chars.as_str();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
}
