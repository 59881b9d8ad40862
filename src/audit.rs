//! Audit trail of mutating calls
use std::sync::Arc;

use uuid7::uuid7;

use crate::value::{DocExt, Document, TimeStamp, Value};

/// Who issued the mutating call, and from where.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user: String,
    pub source: String,
}

impl ActorContext {
    pub fn new(user: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            source: source.into(),
        }
    }
}

/// Write-through audit capability. Returning false means the entry was
/// not recorded; the mutation it describes has already happened.
pub trait AuditSink {
    fn append(
        &self,
        actor: &ActorContext,
        operation: &str,
        change: &Document,
        result: &Document,
    ) -> anyhow::Result<bool>;
}

const HEAD_KEY: &str = "head";

/// Sled-backed audit log. Entries are minicbor documents chained through
/// `prev_hash`, the sha256 of the previous entry's encoding.
pub struct SledAuditLog {
    entries: sled::Tree,
    meta: sled::Tree,
}

impl SledAuditLog {
    pub fn open(db: &Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            entries: db.open_tree("audit")?,
            meta: db.open_tree("audit_meta")?,
        })
    }

    /// Every recorded entry in chain order.
    pub fn entries(&self) -> anyhow::Result<Vec<Document>> {
        let mut found = Vec::new();
        for entry in self.entries.iter() {
            let (_, bytes) = entry?;
            found.push(minicbor::decode(&bytes)?);
        }
        Ok(found)
    }
}

impl AuditSink for SledAuditLog {
    fn append(
        &self,
        actor: &ActorContext,
        operation: &str,
        change: &Document,
        result: &Document,
    ) -> anyhow::Result<bool> {
        let prev_hash = match self.meta.get(HEAD_KEY)? {
            Some(bytes) => Value::Text(String::from_utf8(bytes.to_vec())?),
            None => Value::Null,
        };

        // uuid7 string keys sort chronologically, keeping the tree in
        // chain order.
        let entry_id = uuid7().to_string();
        let mut entry = Document::new();
        entry.set("entry_id", entry_id.as_str());
        entry.set("timestamp", TimeStamp::new());
        entry.set("user", actor.user.as_str());
        entry.set("source", actor.source.as_str());
        entry.set("operation", operation);
        entry.set("change", change.clone());
        entry.set("result", result.clone());
        entry.insert("prev_hash".to_string(), prev_hash);

        let bytes = minicbor::to_vec(&entry)?;
        let hash = sha256::digest(&bytes);

        self.entries.insert(entry_id.as_bytes(), bytes)?;
        self.meta.insert(HEAD_KEY, hash.as_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appended_entries_chain_hashes() {
        let dir = tempdir().unwrap();
        let db = Arc::new(sled::open(dir.path().join("audit.db")).unwrap());
        let log = SledAuditLog::open(&db).unwrap();
        let actor = ActorContext::new("svc-admin", "unit-test");

        let mut change = Document::new();
        change.set("before", Value::Null);

        assert!(log.append(&actor, "create_account", &change, &Document::new()).unwrap());
        assert!(log.append(&actor, "update_account", &change, &Document::new()).unwrap());

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);

        // uuid7 entry ids keep chain order; the first entry has no parent.
        assert_eq!(entries[0].get("prev_hash"), Some(&Value::Null));
        assert!(matches!(entries[1].get("prev_hash"), Some(Value::Text(_))));
        assert_eq!(entries[0].get_str("operation"), Some("create_account"));
        assert_eq!(entries[1].get_str("user"), Some("svc-admin"));
    }
}
