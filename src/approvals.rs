//! Per-manager approval records: state, review and confirm channels
//!
//! All three channels store lists of manager records keyed by `usfid`.
//! State and review are upsert-by-usfid (at most one record per manager);
//! confirm is append-only and order-significant, so "the last confirm by
//! manager X" is a reverse scan.
use crate::value::{DocExt, Document, TimeStamp, Value};

pub const USFID_KEY: &str = "usfid";
pub const STATE_KEY: &str = "state";
pub const REVIEW_KEY: &str = "review";
pub const CONFIRM_KEY: &str = "confirm";
pub const TIMESTAMP_KEY: &str = "timestamp";

/// A manager identity returned by the external directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supervisor {
    pub name: String,
    pub usfid: String,
}

impl Supervisor {
    /// Manager attributes as merged into approval records.
    pub fn to_attrs(&self) -> Document {
        let mut attrs = Document::new();
        attrs.set(USFID_KEY, self.usfid.as_str());
        attrs.set("name", self.name.as_str());
        attrs
    }
}

/// External directory capability used by the review fan-out.
pub trait Directory {
    fn lookup_supervisors(&self, identity: &str) -> anyhow::Result<Vec<Supervisor>>;
}

pub fn find_by_usfid<'a>(records: &'a [Value], usfid: &str) -> Option<&'a Document> {
    records.iter().find_map(|record| match record {
        Value::Map(fields) if fields.get_str(USFID_KEY) == Some(usfid) => Some(fields),
        _ => None,
    })
}

/// Most recent record for `usfid`; only meaningful on the append-only
/// confirm channel.
pub fn last_by_usfid<'a>(records: &'a [Value], usfid: &str) -> Option<&'a Document> {
    records.iter().rev().find_map(|record| match record {
        Value::Map(fields) if fields.get_str(USFID_KEY) == Some(usfid) => Some(fields),
        _ => None,
    })
}

/// The shared per-manager upsert primitive. If no record exists for the
/// manager's usfid a new one is appended; otherwise the existing record is
/// replaced in place, with the manager attributes and the new tag and
/// timestamp written over it. Never produces two records for one usfid.
pub fn upsert_by_usfid(records: &mut Vec<Value>, attrs: &Document, field: &str, tag: &str) {
    let usfid = attrs.get_str(USFID_KEY).unwrap_or_default();

    let merged = |base: Document| {
        let mut fields = base;
        for (key, value) in attrs {
            fields.insert(key.clone(), value.clone());
        }
        fields.set(field, tag);
        fields.set(TIMESTAMP_KEY, TimeStamp::new());
        Value::Map(fields)
    };

    for record in records.iter_mut() {
        let existing = match record {
            Value::Map(fields) if fields.get_str(USFID_KEY) == Some(usfid) => fields.clone(),
            _ => continue,
        };
        *record = merged(existing);
        return;
    }
    records.push(merged(Document::new()));
}

/// Append-only variant used by the confirm channel.
pub fn append_record(records: &mut Vec<Value>, attrs: &Document, field: &str, tag: &str) {
    let mut fields = attrs.clone();
    fields.set(field, tag);
    fields.set(TIMESTAMP_KEY, TimeStamp::new());
    records.push(Value::Map(fields));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(usfid: &str, name: &str) -> Document {
        let mut attrs = Document::new();
        attrs.set(USFID_KEY, usfid);
        attrs.set("name", name);
        attrs
    }

    #[test]
    fn upsert_appends_then_replaces() {
        let mut records = Vec::new();

        upsert_by_usfid(&mut records, &attrs("U1", "Rocky"), STATE_KEY, "removal_pending");
        assert_eq!(records.len(), 1);

        upsert_by_usfid(&mut records, &attrs("U1", "Rocky B"), STATE_KEY, "");
        assert_eq!(records.len(), 1);

        let record = find_by_usfid(&records, "U1").unwrap();
        assert_eq!(record.get_str(STATE_KEY), Some(""));
        assert_eq!(record.get_str("name"), Some("Rocky B"));
    }

    #[test]
    fn upsert_is_idempotent_per_manager() {
        let mut records = Vec::new();
        for _ in 0..3 {
            upsert_by_usfid(&mut records, &attrs("U1", "Rocky"), STATE_KEY, "removal_pending");
        }
        upsert_by_usfid(&mut records, &attrs("U2", "Bull"), STATE_KEY, "removal_pending");

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn upsert_keeps_fields_not_overwritten() {
        let mut records = Vec::new();
        let mut first = attrs("U1", "Rocky");
        first.set("department", "Finance");
        upsert_by_usfid(&mut records, &first, STATE_KEY, "pending");

        upsert_by_usfid(&mut records, &attrs("U1", "Rocky"), STATE_KEY, "done");

        let record = find_by_usfid(&records, "U1").unwrap();
        assert_eq!(record.get_str("department"), Some("Finance"));
        assert_eq!(record.get_str(STATE_KEY), Some("done"));
    }

    #[test]
    fn confirm_appends_and_last_wins() {
        let mut records = Vec::new();
        append_record(&mut records, &attrs("U1", "Rocky"), CONFIRM_KEY, "first");
        append_record(&mut records, &attrs("U2", "Bull"), CONFIRM_KEY, "other");
        append_record(&mut records, &attrs("U1", "Rocky"), CONFIRM_KEY, "second");

        assert_eq!(records.len(), 3);
        let last = last_by_usfid(&records, "U1").unwrap();
        assert_eq!(last.get_str(CONFIRM_KEY), Some("second"));
    }
}
