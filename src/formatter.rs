//! Pure conversions between storage and API representations
use crate::store::ID_KEY;
use crate::value::{DocExt, Document, TimeStamp, Value};

/// Converts a stored document into its API representation: strips the
/// internal identity key and any `exclude` keys, recursively converts
/// timestamps to ISO-8601 UTC strings, and denormalizes each role
/// assignment by resolving its `role_id` through `role_lookup`. An
/// assignment whose role no longer exists passes through with its dates
/// converted but without the display fields.
pub fn to_api<F>(doc: &Document, exclude: &[&str], role_lookup: F) -> Document
where
    F: Fn(&str) -> Option<Document>,
{
    let mut out = doc.clone();
    out.remove(ID_KEY);
    for key in exclude {
        out.remove(*key);
    }

    if let Some(list) = out.get_list_mut("roles") {
        for entry in list.iter_mut() {
            if let Value::Map(fields) = entry {
                let denormalized = denormalize_assignment(fields, &role_lookup);
                *fields = denormalized;
            }
        }
    }

    convert_map(&out)
}

/// Converts designated keys holding ISO-8601 strings into internal
/// timestamps. Non-string and unlisted keys pass through unchanged.
pub fn to_storage(mut fields: Document, date_keys: &[&str]) -> Document {
    for key in date_keys {
        if let Some(Value::Text(text)) = fields.get(*key) {
            if let Some(stamp) = TimeStamp::parse_iso8601(text) {
                fields.insert((*key).to_string(), Value::Timestamp(stamp));
            }
        }
    }
    fields
}

fn denormalize_assignment<F>(fields: &Document, role_lookup: &F) -> Document
where
    F: Fn(&str) -> Option<Document>,
{
    let mut out = fields.clone();
    let Some(role) = fields.get_str("role_id").and_then(role_lookup) else {
        // Dangling reference: relation only, tolerated on read.
        return out;
    };
    for key in ["name", "short_description", "href"] {
        if let Some(value) = role.get(key) {
            out.insert(key.to_string(), value.clone());
        }
    }
    out.remove("role_id");
    out
}

fn convert_value(value: &Value) -> Value {
    match value {
        Value::Timestamp(stamp) => Value::Text(stamp.to_iso8601()),
        Value::List(items) => Value::List(items.iter().map(convert_value).collect()),
        Value::Map(map) => Value::Map(convert_map(map)),
        other => other.clone(),
    }
}

fn convert_map(map: &Document) -> Document {
    map.iter()
        .map(|(key, value)| (key.clone(), convert_value(value)))
        .collect()
}
