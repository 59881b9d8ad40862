//! Service layer API for account, role and approval workflow operations
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::account;
use crate::approvals::{self, Directory};
use crate::audit::{ActorContext, AuditSink, SledAuditLog};
use crate::error::{ErrorCode, Outcome};
use crate::formatter;
use crate::reconcile;
use crate::role;
use crate::store::{Collection, ID_KEY, SledCollection, SledStore};
use crate::value::{DocExt, Document, Value};

pub struct ArmService<C, A, D> {
    accounts: C,
    roles: C,
    audit: A,
    directory: D,
}

impl<D: Directory> ArmService<SledCollection, SledAuditLog, D> {
    /// Opens the sled-backed service over one database instance.
    pub fn open(db: Arc<sled::Db>, directory: D) -> anyhow::Result<Self> {
        let store = SledStore::new(db.clone());
        Ok(Self::new(
            store.collection("accounts", "account")?,
            store.collection("roles", "role")?,
            SledAuditLog::open(&db)?,
            directory,
        ))
    }
}

impl<C, A, D> ArmService<C, A, D>
where
    C: Collection,
    A: AuditSink,
    D: Directory,
{
    pub fn new(accounts: C, roles: C, audit: A, directory: D) -> Self {
        Self {
            accounts,
            roles,
            audit,
            directory,
        }
    }

    // ---- accounts ------------------------------------------------------

    /// Create a new account; fails if the (type, identifier) pair exists.
    pub fn create_account(
        &self,
        actor: &ActorContext,
        payload: &Document,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_account_payload(payload) {
            return Ok(outcome);
        }
        let account_type = payload.get_str("account_type").unwrap_or_default();
        let identifier = payload.get_str("account_identifier").unwrap_or_default();

        let filter = account::lookup_filter(account_type, identifier);
        if self.accounts.find_one(&filter)?.is_some() {
            return Ok(Outcome::fail(ErrorCode::AccountExists));
        }

        let mut doc = account::build_document(payload);
        if payload.contains_key("roles") {
            match self.reconciled_roles(&[], payload)? {
                Ok(next) => doc.set("roles", next),
                Err(code) => return Ok(Outcome::fail(code)),
            }
        }

        if !self.accounts.insert(doc.clone())? {
            return Ok(Outcome::error(ErrorCode::AccountCreateError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "create_account", None, Some(&doc), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Fetch one account by its unique (type, identifier) pair. Removed
    /// accounts are still found; removal only flags status.
    pub fn get_account(&self, account_type: &str, identifier: &str) -> anyhow::Result<Outcome> {
        let filter = account::lookup_filter(account_type, identifier);
        match self.accounts.find_one(&filter)? {
            Some(doc) => Ok(Outcome::success(self.format(&doc)?)),
            None => Ok(Outcome::fail(ErrorCode::AccountNotExists)),
        }
    }

    /// All accounts bound to one person's canonical identity key.
    pub fn get_accounts_by_identity(&self, identity: &str) -> anyhow::Result<Outcome> {
        let docs = self.accounts.find(&identity_filter(identity))?;
        if docs.is_empty() {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        }
        let mut formatted = Vec::new();
        for doc in &docs {
            formatted.push(Value::Map(self.format(doc)?));
        }
        Ok(Outcome::success(formatted))
    }

    /// All accounts of one external system type.
    pub fn list_accounts(&self, account_type: &str) -> anyhow::Result<Outcome> {
        let mut filter = Document::new();
        filter.set("account_type", account_type);
        let docs = self.accounts.find(&filter)?;
        let mut formatted = Vec::new();
        for doc in &docs {
            formatted.push(Value::Map(self.format(doc)?));
        }
        Ok(Outcome::success(formatted))
    }

    /// Update an account in place: merges account_data fields and, when
    /// the payload carries a roles list, reconciles it against the held
    /// assignments. modified_date is not bumped.
    pub fn update_account(
        &self,
        actor: &ActorContext,
        account_type: &str,
        identifier: &str,
        payload: &Document,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_account_payload(payload) {
            return Ok(outcome);
        }
        if payload.get_str("account_type") != Some(account_type) {
            return Ok(Outcome::fail(ErrorCode::AccountTypeMismatch));
        }

        let filter = account::lookup_filter(account_type, identifier);
        let Some(existing) = self.accounts.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        };

        let mut patch = account::update_patch(payload);
        if payload.contains_key("roles") {
            let current = existing.get_list("roles").cloned().unwrap_or_default();
            match self.reconciled_roles(&current, payload)? {
                Ok(next) => patch.set("roles", next),
                Err(code) => return Ok(Outcome::fail(code)),
            }
        }

        let after = applied(&existing, &patch);
        if !self.accounts.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::AccountUpdateError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "update_account", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Soft delete: flags status as Removed, never deletes the document.
    pub fn remove_account(
        &self,
        actor: &ActorContext,
        account_type: &str,
        identifier: &str,
    ) -> anyhow::Result<Outcome> {
        let filter = account::lookup_filter(account_type, identifier);
        let Some(existing) = self.accounts.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        };

        let mut patch = Document::new();
        patch.set("status", account::STATUS_REMOVED);

        let after = applied(&existing, &patch);
        if !self.accounts.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::AccountDeleteError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "remove_account", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    // ---- roles ---------------------------------------------------------

    /// Create a catalog role; fails if the (type, name) pair exists.
    pub fn create_role(&self, actor: &ActorContext, payload: &Document) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_role_payload(payload) {
            return Ok(outcome);
        }
        let account_type = payload.get_str("account_type").unwrap_or_default();
        let name = payload.get_str("name").unwrap_or_default();

        let filter = role::lookup_filter(account_type, name);
        if self.roles.find_one(&filter)?.is_some() {
            return Ok(Outcome::fail(ErrorCode::RoleExists));
        }

        let doc = role::build_document(payload);
        if !self.roles.insert(doc.clone())? {
            return Ok(Outcome::error(ErrorCode::RoleCreateError));
        }

        let href = role::href(account_type, name);
        if !self.record(actor, "create_role", None, Some(&doc), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Fetch one catalog role by its derived href.
    pub fn get_role(&self, account_type: &str, name: &str) -> anyhow::Result<Outcome> {
        let filter = role::lookup_filter(account_type, name);
        match self.roles.find_one(&filter)? {
            Some(doc) => Ok(Outcome::success(self.format(&doc)?)),
            None => Ok(Outcome::fail(ErrorCode::RoleNotExists)),
        }
    }

    /// All catalog roles of one external system type.
    pub fn list_roles(&self, account_type: &str) -> anyhow::Result<Outcome> {
        let mut filter = Document::new();
        filter.set("account_type", account_type);
        let docs = self.roles.find(&filter)?;
        let mut formatted = Vec::new();
        for doc in &docs {
            formatted.push(Value::Map(self.format(doc)?));
        }
        Ok(Outcome::success(formatted))
    }

    /// Update a catalog role in place.
    pub fn update_role(
        &self,
        actor: &ActorContext,
        account_type: &str,
        name: &str,
        payload: &Document,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_role_payload(payload) {
            return Ok(outcome);
        }

        let filter = role::lookup_filter(account_type, name);
        let Some(existing) = self.roles.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::RoleNotExists));
        };

        let patch = role::update_patch(payload);
        let after = applied(&existing, &patch);
        if !self.roles.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::RoleUpdateError));
        }

        let href = role::href(account_type, name);
        if !self.record(actor, "update_role", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Soft delete of a catalog role. Assignments keep pointing at it as
    /// a dangling reference, which the formatter tolerates.
    pub fn remove_role(
        &self,
        actor: &ActorContext,
        account_type: &str,
        name: &str,
    ) -> anyhow::Result<Outcome> {
        let filter = role::lookup_filter(account_type, name);
        let Some(existing) = self.roles.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::RoleNotExists));
        };

        let mut patch = Document::new();
        patch.set("status", account::STATUS_REMOVED);

        let after = applied(&existing, &patch);
        if !self.roles.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::RoleDeleteError));
        }

        let href = role::href(account_type, name);
        if !self.record(actor, "remove_role", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    // ---- approval workflow ---------------------------------------------

    /// Declare an account-level state on behalf of one manager. At most
    /// one state record exists per usfid; repeat calls replace it.
    pub fn set_account_state(
        &self,
        actor: &ActorContext,
        account_type: &str,
        identifier: &str,
        manager: &Document,
        state: &str,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_manager(manager) {
            return Ok(outcome);
        }
        let filter = account::lookup_filter(account_type, identifier);
        let Some(existing) = self.accounts.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        };

        let mut records = existing.get_list("state").cloned().unwrap_or_default();
        approvals::upsert_by_usfid(&mut records, manager, approvals::STATE_KEY, state);

        let mut patch = Document::new();
        patch.set("state", records);

        let after = applied(&existing, &patch);
        if !self.accounts.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::AccountUpdateError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "set_account_state", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Declare a state on one held role assignment. The role must exist
    /// in the catalog and be assigned to the account.
    pub fn set_role_state(
        &self,
        actor: &ActorContext,
        account_type: &str,
        identifier: &str,
        role_href: &str,
        manager: &Document,
        state: &str,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_manager(manager) {
            return Ok(outcome);
        }
        let filter = account::lookup_filter(account_type, identifier);
        let Some(existing) = self.accounts.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        };

        let Some(role_doc) = self.role_by_href(role_href)? else {
            return Ok(Outcome::fail(ErrorCode::RoleNotExists));
        };
        let role_id = role_doc.get_str(ID_KEY).unwrap_or_default().to_string();

        let Some(current) = existing.get_list("roles") else {
            return Ok(Outcome::fail(ErrorCode::AccountNoRolesExist));
        };

        let mut roles_list = current.clone();
        let mut found = false;
        for entry in roles_list.iter_mut() {
            let Value::Map(fields) = entry else { continue };
            if fields.get_str("role_id") != Some(role_id.as_str()) {
                continue;
            }
            let mut records = fields.get_list("state").cloned().unwrap_or_default();
            approvals::upsert_by_usfid(&mut records, manager, approvals::STATE_KEY, state);
            fields.set("state", records);
            found = true;
            break;
        }
        if !found {
            return Ok(Outcome::fail(ErrorCode::AccountRoleNotExists));
        }

        let mut patch = Document::new();
        patch.set("roles", roles_list);

        let after = applied(&existing, &patch);
        if !self.accounts.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::AccountUpdateError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "set_role_state", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Open or close a review on one account for one manager.
    pub fn set_review_by_account(
        &self,
        actor: &ActorContext,
        account_type: &str,
        identifier: &str,
        manager: &Document,
        review: &str,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_manager(manager) {
            return Ok(outcome);
        }
        let filter = account::lookup_filter(account_type, identifier);
        let Some(existing) = self.accounts.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        };

        let mut records = existing.get_list("review").cloned().unwrap_or_default();
        approvals::upsert_by_usfid(&mut records, manager, approvals::REVIEW_KEY, review);

        let mut patch = Document::new();
        patch.set("review", records);

        let after = applied(&existing, &patch);
        if !self.accounts.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::AccountUpdateError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "set_review_by_account", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Open or close a review on every account bound to one identity.
    pub fn set_review_by_identity(
        &self,
        actor: &ActorContext,
        identity: &str,
        manager: &Document,
        review: &str,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_manager(manager) {
            return Ok(outcome);
        }
        let docs = self.accounts.find(&identity_filter(identity))?;
        if docs.is_empty() {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        }

        let mut changes: Vec<Value> = Vec::new();
        for doc in &docs {
            let mut records = doc.get_list("review").cloned().unwrap_or_default();
            approvals::upsert_by_usfid(&mut records, manager, approvals::REVIEW_KEY, review);
            let mut patch = Document::new();
            patch.set("review", records);
            let after = applied(doc, &patch);
            if !self.accounts.update(&id_filter(doc), patch)? {
                return Ok(Outcome::error(ErrorCode::AccountUpdateError));
            }
            changes.push(change_entry(doc, &after));
        }

        let mut summary = Document::new();
        summary.set("identity", identity);
        summary.set("accounts", changes.len() as i64);
        if !self.record_fanout(actor, "set_review_by_identity", changes, summary.clone())? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(summary))
    }

    /// Fan a review out across every identity in the accounts collection,
    /// with the managers discovered through the directory lookup.
    pub fn set_review_all(&self, actor: &ActorContext, review: &str) -> anyhow::Result<Outcome> {
        let identities: Vec<String> = self
            .accounts
            .distinct("identity")?
            .into_iter()
            .filter_map(|value| match value {
                Value::Text(text) => Some(text),
                _ => None,
            })
            .collect();
        if identities.is_empty() {
            return Ok(Outcome::fail(ErrorCode::IdentitiesNoneFound));
        }

        let mut changes: Vec<Value> = Vec::new();
        for identity in &identities {
            let supervisors = self.directory.lookup_supervisors(identity)?;
            for doc in self.accounts.find(&identity_filter(identity))? {
                let mut records = doc.get_list("review").cloned().unwrap_or_default();
                for supervisor in &supervisors {
                    approvals::upsert_by_usfid(
                        &mut records,
                        &supervisor.to_attrs(),
                        approvals::REVIEW_KEY,
                        review,
                    );
                }
                let mut patch = Document::new();
                patch.set("review", records);
                let after = applied(&doc, &patch);
                if !self.accounts.update(&id_filter(&doc), patch)? {
                    return Ok(Outcome::error(ErrorCode::AccountUpdateError));
                }
                changes.push(change_entry(&doc, &after));
            }
        }

        let mut summary = Document::new();
        summary.set("identities", identities.len() as i64);
        summary.set("accounts", changes.len() as i64);
        if !self.record_fanout(actor, "set_review_all", changes, summary.clone())? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(summary))
    }

    /// Record that a declared state was acted on. Requires the manager to
    /// have both a state and a review on the account; each call appends a
    /// new confirm record.
    pub fn set_confirm_by_account(
        &self,
        actor: &ActorContext,
        account_type: &str,
        identifier: &str,
        manager: &Document,
        confirm: &str,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_manager(manager) {
            return Ok(outcome);
        }
        let usfid = manager.get_str(approvals::USFID_KEY).unwrap_or_default();

        let filter = account::lookup_filter(account_type, identifier);
        let Some(existing) = self.accounts.find_one(&filter)? else {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        };

        let state_records = existing.get_list("state").cloned().unwrap_or_default();
        if approvals::find_by_usfid(&state_records, usfid).is_none() {
            return Ok(Outcome::fail(ErrorCode::AccountStateUnsetByManager));
        }
        let review_records = existing.get_list("review").cloned().unwrap_or_default();
        if approvals::find_by_usfid(&review_records, usfid).is_none() {
            return Ok(Outcome::fail(ErrorCode::AccountReviewUnsetByManager));
        }

        let mut records = existing.get_list("confirm").cloned().unwrap_or_default();
        approvals::append_record(&mut records, manager, approvals::CONFIRM_KEY, confirm);

        let mut patch = Document::new();
        patch.set("confirm", records);

        let after = applied(&existing, &patch);
        if !self.accounts.update(&filter, patch)? {
            return Ok(Outcome::error(ErrorCode::AccountUpdateError));
        }

        let href = account::href(account_type, identifier);
        if !self.record(actor, "set_confirm_by_account", Some(&existing), Some(&after), href_result(&href))? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(href))
    }

    /// Append a confirm record to every account bound to one identity.
    /// No workflow precondition applies on the identity-wide path.
    pub fn set_confirm(
        &self,
        actor: &ActorContext,
        identity: &str,
        manager: &Document,
        confirm: &str,
    ) -> anyhow::Result<Outcome> {
        if let Some(outcome) = validate_manager(manager) {
            return Ok(outcome);
        }
        let docs = self.accounts.find(&identity_filter(identity))?;
        if docs.is_empty() {
            return Ok(Outcome::fail(ErrorCode::AccountNotExists));
        }

        let mut changes: Vec<Value> = Vec::new();
        for doc in &docs {
            let mut records = doc.get_list("confirm").cloned().unwrap_or_default();
            approvals::append_record(&mut records, manager, approvals::CONFIRM_KEY, confirm);
            let mut patch = Document::new();
            patch.set("confirm", records);
            let after = applied(doc, &patch);
            if !self.accounts.update(&id_filter(doc), patch)? {
                return Ok(Outcome::error(ErrorCode::AccountUpdateError));
            }
            changes.push(change_entry(doc, &after));
        }

        let mut summary = Document::new();
        summary.set("identity", identity);
        summary.set("accounts", changes.len() as i64);
        if !self.record_fanout(actor, "set_confirm", changes, summary.clone())? {
            return Ok(Outcome::error(ErrorCode::AuditlogEntryError));
        }
        Ok(Outcome::success(summary))
    }

    // ---- shared helpers ------------------------------------------------

    /// API representation of a stored document. The catalog entries the
    /// role assignments reference are fetched up front, so a store fault
    /// propagates instead of rendering every assignment as dangling.
    pub(crate) fn format(&self, doc: &Document) -> anyhow::Result<Document> {
        let mut catalog: BTreeMap<String, Document> = BTreeMap::new();
        if let Some(list) = doc.get_list("roles") {
            for entry in list {
                let Value::Map(fields) = entry else { continue };
                let Some(id) = fields.get_str("role_id") else { continue };
                if catalog.contains_key(id) {
                    continue;
                }
                let mut filter = Document::new();
                filter.set(ID_KEY, id);
                if let Some(role) = self.roles.find_one(&filter)? {
                    catalog.insert(id.to_string(), role);
                }
            }
        }
        Ok(formatter::to_api(doc, &[], |id: &str| {
            catalog.get(id).cloned()
        }))
    }

    pub(crate) fn role_by_href(&self, href: &str) -> anyhow::Result<Option<Document>> {
        let mut filter = Document::new();
        filter.set("href", href);
        self.roles.find_one(&filter)
    }

    pub(crate) fn account_by_key(
        &self,
        account_type: &str,
        identifier: &str,
    ) -> anyhow::Result<Option<Document>> {
        self.accounts
            .find_one(&account::lookup_filter(account_type, identifier))
    }

    /// Reconciles the requested roles list against the held assignments.
    /// Catalog reads happen here, before the pure reconciler runs: a store
    /// fault is a transport error, not an invalid reference.
    pub(crate) fn reconciled_roles(
        &self,
        current: &[Value],
        payload: &Document,
    ) -> anyhow::Result<Result<Vec<Value>, ErrorCode>> {
        let Some(requested) = payload.get_list("roles") else {
            return Ok(Err(ErrorCode::RolesContainsInvalid));
        };
        let mut catalog: BTreeMap<String, Document> = BTreeMap::new();
        for entry in requested {
            let Value::Map(fields) = entry else { continue };
            let Some(href) = fields.get_str("href") else { continue };
            if catalog.contains_key(href) {
                continue;
            }
            if let Some(role) = self.role_by_href(href)? {
                catalog.insert(href.to_string(), role);
            }
        }
        Ok(reconcile::reconcile(current, requested, |href| {
            catalog.get(href).cloned()
        }))
    }

    pub(crate) fn record(
        &self,
        actor: &ActorContext,
        operation: &str,
        before: Option<&Document>,
        after: Option<&Document>,
        result: Document,
    ) -> anyhow::Result<bool> {
        let mut change = Document::new();
        change.insert("before".to_string(), snapshot(before));
        change.insert("after".to_string(), snapshot(after));
        self.audit.append(actor, operation, &change, &result)
    }

    /// Audit entry for a fan-out mutation: one before/after pair per
    /// touched account.
    pub(crate) fn record_fanout(
        &self,
        actor: &ActorContext,
        operation: &str,
        changes: Vec<Value>,
        result: Document,
    ) -> anyhow::Result<bool> {
        let mut change = Document::new();
        change.set("accounts", changes);
        self.audit.append(actor, operation, &change, &result)
    }
}

fn validate_account_payload(payload: &Document) -> Option<Outcome> {
    if payload.is_empty() {
        return Some(Outcome::fail(ErrorCode::PayloadEmpty));
    }
    let bad = account::payload_errors(payload);
    if !bad.is_empty() {
        return Some(Outcome::fail_with_keys(ErrorCode::AccountKeysMissing, bad));
    }
    None
}

fn validate_role_payload(payload: &Document) -> Option<Outcome> {
    if payload.is_empty() {
        return Some(Outcome::fail(ErrorCode::PayloadEmpty));
    }
    let bad = role::payload_errors(payload);
    if !bad.is_empty() {
        return Some(Outcome::fail_with_keys(ErrorCode::RoleKeysMissing, bad));
    }
    None
}

fn validate_manager(manager: &Document) -> Option<Outcome> {
    if manager.get_str(approvals::USFID_KEY).is_none() {
        return Some(Outcome::fail_with_keys(
            ErrorCode::ManagerKeysMissing,
            vec![approvals::USFID_KEY.to_string()],
        ));
    }
    None
}

fn identity_filter(identity: &str) -> Document {
    let mut filter = Document::new();
    filter.set("identity", identity);
    filter
}

fn id_filter(doc: &Document) -> Document {
    let mut filter = Document::new();
    filter.set(ID_KEY, doc.get_str(ID_KEY).unwrap_or_default());
    filter
}

fn href_result(href: &str) -> Document {
    let mut result = Document::new();
    result.set("href", href);
    result
}

/// One per-account pair inside a fan-out audit entry.
fn change_entry(before: &Document, after: &Document) -> Value {
    let mut entry = Document::new();
    entry.set("href", before.get_str("href").unwrap_or_default());
    entry.set("before", before.clone());
    entry.set("after", after.clone());
    Value::Map(entry)
}

fn snapshot(doc: Option<&Document>) -> Value {
    match doc {
        Some(doc) => Value::Map(doc.clone()),
        None => Value::Null,
    }
}

/// The document as it reads after a whole-field patch.
fn applied(existing: &Document, patch: &Document) -> Document {
    let mut after = existing.clone();
    for (key, value) in patch {
        after.insert(key.clone(), value.clone());
    }
    after
}
