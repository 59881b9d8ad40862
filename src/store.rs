//! Abstract document collection access and the sled-backed implementation
use std::sync::Arc;

use crate::utils;
use crate::value::{Document, Value};

/// Internal identity key assigned by the store on insert. Stripped from
/// every API representation.
pub const ID_KEY: &str = "_id";

/// Document collection capability. Filters are top-level field equality;
/// patches replace whole fields.
pub trait Collection {
    fn find_one(&self, filter: &Document) -> anyhow::Result<Option<Document>>;
    fn find(&self, filter: &Document) -> anyhow::Result<Vec<Document>>;
    /// Returns false when the store accepted the call but did not write.
    fn insert(&self, doc: Document) -> anyhow::Result<bool>;
    /// Applies `patch` to the first document matching `filter`. Returns
    /// false when nothing matched.
    fn update(&self, filter: &Document, patch: Document) -> anyhow::Result<bool>;
    /// Unique non-null values of `field` across the collection.
    fn distinct(&self, field: &str) -> anyhow::Result<Vec<Value>>;
    /// Hard delete of every matching document. Returns false when nothing
    /// matched. The service layer never calls this; removal is a status
    /// flag.
    fn remove(&self, filter: &Document) -> anyhow::Result<bool>;
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

pub struct SledStore {
    db: Arc<sled::Db>,
}

impl SledStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    /// Open one named collection. `id_prefix` becomes the bech32 prefix of
    /// minted identity keys (e.g. "account", "role").
    pub fn collection(&self, name: &str, id_prefix: &str) -> anyhow::Result<SledCollection> {
        let tree = self.db.open_tree(name)?;
        Ok(SledCollection {
            tree,
            id_prefix: id_prefix.to_string(),
        })
    }
}

pub struct SledCollection {
    tree: sled::Tree,
    id_prefix: String,
}

impl SledCollection {
    fn decode(bytes: &[u8]) -> anyhow::Result<Document> {
        Ok(minicbor::decode(bytes)?)
    }

    fn write(&self, id: &str, doc: &Document) -> anyhow::Result<()> {
        self.tree.insert(id.as_bytes(), minicbor::to_vec(doc)?)?;
        Ok(())
    }
}

impl Collection for SledCollection {
    fn find_one(&self, filter: &Document) -> anyhow::Result<Option<Document>> {
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let doc = Self::decode(&bytes)?;
            if matches(&doc, filter) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    fn find(&self, filter: &Document) -> anyhow::Result<Vec<Document>> {
        let mut found = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let doc = Self::decode(&bytes)?;
            if matches(&doc, filter) {
                found.push(doc);
            }
        }
        Ok(found)
    }

    fn insert(&self, mut doc: Document) -> anyhow::Result<bool> {
        let id = match doc.get(ID_KEY) {
            Some(Value::Text(id)) => id.clone(),
            _ => {
                let minted = utils::new_uuid_to_bech32(&self.id_prefix)?;
                doc.insert(ID_KEY.to_string(), Value::Text(minted.clone()));
                minted
            }
        };
        self.write(&id, &doc)?;
        Ok(true)
    }

    fn update(&self, filter: &Document, patch: Document) -> anyhow::Result<bool> {
        for entry in self.tree.iter() {
            let (key, bytes) = entry?;
            let mut doc = Self::decode(&bytes)?;
            if matches(&doc, filter) {
                for (field, value) in patch {
                    doc.insert(field, value);
                }
                self.tree.insert(key, minicbor::to_vec(&doc)?)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn distinct(&self, field: &str) -> anyhow::Result<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let doc = Self::decode(&bytes)?;
            match doc.get(field) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
            }
        }
        Ok(values)
    }

    fn remove(&self, filter: &Document) -> anyhow::Result<bool> {
        let mut keys = Vec::new();
        for entry in self.tree.iter() {
            let (key, bytes) = entry?;
            let doc = Self::decode(&bytes)?;
            if matches(&doc, filter) {
                keys.push(key);
            }
        }
        let removed = !keys.is_empty();
        for key in keys {
            self.tree.remove(key)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DocExt;
    use tempfile::tempdir;

    fn open_collection(dir: &tempfile::TempDir) -> SledCollection {
        let db = sled::open(dir.path().join("store.db")).unwrap();
        SledStore::new(Arc::new(db))
            .collection("accounts", "account")
            .unwrap()
    }

    fn doc(pairs: &[(&str, &str)]) -> Document {
        let mut doc = Document::new();
        for (key, value) in pairs {
            doc.set(key, *value);
        }
        doc
    }

    #[test]
    fn insert_mints_id_and_find_one_matches() {
        let dir = tempdir().unwrap();
        let col = open_collection(&dir);

        col.insert(doc(&[("account_type", "FAST"), ("account_identifier", "A1")]))
            .unwrap();

        let found = col
            .find_one(&doc(&[("account_identifier", "A1")]))
            .unwrap()
            .unwrap();
        assert!(found.get_str(ID_KEY).unwrap().starts_with("account1"));
        assert_eq!(found.get_str("account_type"), Some("FAST"));

        assert!(col.find_one(&doc(&[("account_identifier", "A2")])).unwrap().is_none());
    }

    #[test]
    fn update_patches_first_match_only() {
        let dir = tempdir().unwrap();
        let col = open_collection(&dir);

        col.insert(doc(&[("account_identifier", "A1"), ("status", "Active")]))
            .unwrap();

        let written = col
            .update(&doc(&[("account_identifier", "A1")]), doc(&[("status", "Removed")]))
            .unwrap();
        assert!(written);

        let found = col
            .find_one(&doc(&[("account_identifier", "A1")]))
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("status"), Some("Removed"));

        let written = col
            .update(&doc(&[("account_identifier", "A9")]), doc(&[("status", "Removed")]))
            .unwrap();
        assert!(!written);
    }

    #[test]
    fn distinct_skips_missing_and_dedups() {
        let dir = tempdir().unwrap();
        let col = open_collection(&dir);

        col.insert(doc(&[("identity", "U1")])).unwrap();
        col.insert(doc(&[("identity", "U1")])).unwrap();
        col.insert(doc(&[("identity", "U2")])).unwrap();
        col.insert(doc(&[("account_identifier", "A4")])).unwrap();

        let mut identities = col.distinct("identity").unwrap();
        identities.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));
        assert_eq!(identities, vec![Value::from("U1"), Value::from("U2")]);
    }

    #[test]
    fn remove_deletes_all_matches() {
        let dir = tempdir().unwrap();
        let col = open_collection(&dir);

        col.insert(doc(&[("identity", "U1")])).unwrap();
        col.insert(doc(&[("identity", "U1")])).unwrap();

        assert!(col.remove(&doc(&[("identity", "U1")])).unwrap());
        assert!(col.find(&Document::new()).unwrap().is_empty());
        assert!(!col.remove(&doc(&[("identity", "U1")])).unwrap());
    }
}
