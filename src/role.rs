//! Role catalog document construction and validation
use crate::formatter;
use crate::store::ID_KEY;
use crate::value::{DocExt, Document, TimeStamp};

/// Keys every role payload must carry.
pub const REQUIRED_KEYS: [&str; 3] = ["account_type", "name", "role_data"];

/// Display fields denormalized onto assignments at read time, never
/// persisted on them.
pub const DISPLAY_KEYS: [&str; 3] = ["href", "short_description", "name"];

/// Role names may contain spaces; the href carries them as '+'.
pub fn urlsafe_name(name: &str) -> String {
    name.replace(' ', "+")
}

pub fn href(account_type: &str, name: &str) -> String {
    format!("/roles/{account_type}/{}", urlsafe_name(name))
}

/// Lookup filter by the derived href, which is unique per (type, name).
pub fn lookup_filter(account_type: &str, name: &str) -> Document {
    let mut filter = Document::new();
    filter.set("href", href(account_type, name));
    filter
}

/// Required keys that are absent or hold the wrong shape.
pub fn payload_errors(payload: &Document) -> Vec<String> {
    let mut bad = Vec::new();
    for key in ["account_type", "name"] {
        if payload.get_str(key).is_none() {
            bad.push(key.to_string());
        }
    }
    if payload.get_map("role_data").is_none() {
        bad.push("role_data".to_string());
    }
    bad
}

/// Builds the stored document for a validated create payload.
pub fn build_document(payload: &Document) -> Document {
    let account_type = payload.get_str("account_type").unwrap_or_default();
    let name = payload.get_str("name").unwrap_or_default();
    let role_data = payload.get_map("role_data").cloned().unwrap_or_default();

    let now = TimeStamp::new();
    let mut doc = formatter::to_storage(role_data, &[]);
    doc.set("account_type", account_type);
    doc.set("name", name);
    doc.set("href", href(account_type, name));
    for key in ["short_description", "long_description"] {
        if let Some(text) = payload.get_str(key) {
            doc.set(key, text);
        }
    }
    doc.set("created_date", now.clone());
    doc.set("modified_date", now);
    doc.set("status", crate::account::STATUS_ACTIVE);
    doc.remove(ID_KEY);
    doc
}

/// Patch for an in-place update: merged role_data plus the description
/// fields. modified_date is not refreshed here.
pub fn update_patch(payload: &Document) -> Document {
    let role_data = payload.get_map("role_data").cloned().unwrap_or_default();
    let mut patch = formatter::to_storage(role_data, &[]);
    for key in ["short_description", "long_description"] {
        if let Some(text) = payload.get_str(key) {
            patch.set(key, text);
        }
    }
    patch.remove(ID_KEY);
    patch.remove("account_type");
    patch.remove("name");
    patch.remove("href");
    patch
}
