//! Account import: create-or-update keyed by (type, identifier)
//!
//! Import feeds come from the external systems themselves, so the same
//! payload arrives repeatedly; an existing account is updated in place
//! and keeps its href, accumulated role sub-state and approval records.
use crate::approvals::Directory;
use crate::audit::{ActorContext, AuditSink};
use crate::error::Outcome;
use crate::service::ArmService;
use crate::store::Collection;
use crate::value::{DocExt, Document, Value};

impl<C, A, D> ArmService<C, A, D>
where
    C: Collection,
    A: AuditSink,
    D: Directory,
{
    /// Upsert one account. Success payload carries the href and whether
    /// the call created or updated; validation and reconciliation rules
    /// are those of create/update.
    pub fn import_account(
        &self,
        actor: &ActorContext,
        payload: &Document,
    ) -> anyhow::Result<Outcome> {
        let account_type = payload.get_str("account_type").unwrap_or_default();
        let identifier = payload.get_str("account_identifier").unwrap_or_default();

        let (outcome, action) = if self.account_by_key(account_type, identifier)?.is_some() {
            let outcome = self.update_account(actor, account_type, identifier, payload)?;
            (outcome, "updated")
        } else {
            (self.create_account(actor, payload)?, "created")
        };

        match outcome {
            Outcome::Success(href) => {
                let mut summary = Document::new();
                summary.insert("href".to_string(), href);
                summary.set("action", action);
                Ok(Outcome::success(summary))
            }
            other => Ok(other),
        }
    }

    /// Bulk driver over a payload list. Per-entry failures are collected
    /// into the summary instead of aborting the batch.
    pub fn import_accounts(
        &self,
        actor: &ActorContext,
        payloads: &[Document],
    ) -> anyhow::Result<Outcome> {
        let mut imported = 0_i64;
        let mut updated = 0_i64;
        let mut failed: Vec<Value> = Vec::new();

        for (index, payload) in payloads.iter().enumerate() {
            match self.import_account(actor, payload)? {
                Outcome::Success(Value::Map(entry)) => {
                    if entry.get_str("action") == Some("created") {
                        imported += 1;
                    } else {
                        updated += 1;
                    }
                }
                Outcome::Success(_) => updated += 1,
                other => {
                    let mut failure = Document::new();
                    failure.set("index", index as i64);
                    if let Some(code) = other.code() {
                        failure.set("code", code.symbol());
                    }
                    if let Some(description) = other.description() {
                        failure.set("description", description);
                    }
                    failed.push(Value::Map(failure));
                }
            }
        }

        let mut summary = Document::new();
        summary.set("imported", imported);
        summary.set("updated", updated);
        summary.set("failed", failed);
        Ok(Outcome::success(summary))
    }
}
