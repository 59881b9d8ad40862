//! Account document construction and validation
use crate::formatter;
use crate::store::ID_KEY;
use crate::value::{DocExt, Document, TimeStamp, Value};

/// Keys every account payload must carry.
pub const REQUIRED_KEYS: [&str; 3] = ["account_type", "account_identifier", "account_data"];

/// account_data keys stored as native timestamps internally and ISO-8601
/// strings externally.
pub const DATE_KEYS: [&str; 3] = ["password_change", "last_used", "last_update"];

pub const STATUS_ACTIVE: &str = "Active";
pub const STATUS_REMOVED: &str = "Removed";

/// Canonical addressable key, functionally dependent on (type, identifier).
pub fn href(account_type: &str, identifier: &str) -> String {
    format!("/accounts/{account_type}/{identifier}")
}

/// Lookup filter for the unique (type, identifier) pair.
pub fn lookup_filter(account_type: &str, identifier: &str) -> Document {
    let mut filter = Document::new();
    filter.set("account_type", account_type);
    filter.set("account_identifier", identifier);
    filter
}

/// Required keys that are absent or hold the wrong shape. `account_type`
/// and `account_identifier` must be text, `account_data` a map.
pub fn payload_errors(payload: &Document) -> Vec<String> {
    let mut bad = Vec::new();
    for key in ["account_type", "account_identifier"] {
        if payload.get_str(key).is_none() {
            bad.push(key.to_string());
        }
    }
    if payload.get_map("account_data").is_none() {
        bad.push("account_data".to_string());
    }
    bad
}

/// Builds the stored document for a validated create payload. The roles
/// list is left empty; the caller fills it after reconciliation.
pub fn build_document(payload: &Document) -> Document {
    let account_type = payload.get_str("account_type").unwrap_or_default();
    let identifier = payload.get_str("account_identifier").unwrap_or_default();
    let account_data = payload.get_map("account_data").cloned().unwrap_or_default();

    let now = TimeStamp::new();
    let mut doc = formatter::to_storage(account_data, &DATE_KEYS);
    doc.set("account_type", account_type);
    doc.set("account_identifier", identifier);
    doc.set("href", href(account_type, identifier));
    if let Some(identity) = payload.get_str("identity") {
        doc.set("identity", identity);
    }
    doc.set("created_date", now.clone());
    doc.set("modified_date", now);
    doc.set("status", STATUS_ACTIVE);
    doc.set("roles", Vec::<Value>::new());
    doc.set("state", Vec::<Value>::new());
    doc.set("review", Vec::<Value>::new());
    doc.set("confirm", Vec::<Value>::new());
    doc.remove(ID_KEY);
    doc
}

/// Patch for an in-place update: merged account_data plus identity.
/// modified_date is not refreshed here.
pub fn update_patch(payload: &Document) -> Document {
    let account_data = payload.get_map("account_data").cloned().unwrap_or_default();
    let mut patch = formatter::to_storage(account_data, &DATE_KEYS);
    if let Some(identity) = payload.get_str("identity") {
        patch.set("identity", identity);
    }
    patch.remove(ID_KEY);
    patch.remove("account_type");
    patch.remove("account_identifier");
    patch.remove("href");
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn href_derivation() {
        assert_eq!(href("FAST", "ROCKYBULL"), "/accounts/FAST/ROCKYBULL");
    }

    #[test]
    fn payload_errors_report_wrong_shapes() {
        let mut payload = Document::new();
        payload.set("account_type", "FAST");
        payload.set("account_data", "not a map");

        let bad = payload_errors(&payload);
        assert_eq!(bad, vec!["account_identifier", "account_data"]);
    }

    #[test]
    fn build_document_merges_account_data_and_converts_dates() {
        let mut data = Document::new();
        data.set("email", "rocky@example.edu");
        data.set("last_used", "2024-03-09T14:30:45.000000Z");

        let mut payload = Document::new();
        payload.set("account_type", "FAST");
        payload.set("account_identifier", "ROCKYBULL");
        payload.set("identity", "U12345678");
        payload.set("account_data", data);

        let doc = build_document(&payload);
        assert_eq!(doc.get_str("href"), Some("/accounts/FAST/ROCKYBULL"));
        assert_eq!(doc.get_str("status"), Some(STATUS_ACTIVE));
        assert_eq!(doc.get_str("email"), Some("rocky@example.edu"));
        assert!(matches!(doc.get("last_used"), Some(Value::Timestamp(_))));
        assert!(matches!(doc.get("created_date"), Some(Value::Timestamp(_))));
        assert_eq!(doc.get_list("roles").map(Vec::len), Some(0));
    }

    #[test]
    fn update_patch_never_touches_structural_keys() {
        let mut data = Document::new();
        data.set("account_type", "GEMS");
        data.set("email", "new@example.edu");

        let mut payload = Document::new();
        payload.set("account_type", "FAST");
        payload.set("account_identifier", "ROCKYBULL");
        payload.set("account_data", data);

        let patch = update_patch(&payload);
        assert_eq!(patch.get_str("email"), Some("new@example.edu"));
        assert!(!patch.contains_key("account_type"));
        assert!(!patch.contains_key("href"));
        assert!(!patch.contains_key("modified_date"));
    }
}
