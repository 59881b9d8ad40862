//! Pure role-assignment reconciliation
use crate::error::ErrorCode;
use crate::role;
use crate::store::ID_KEY;
use crate::value::{DocExt, Document, TimeStamp, Value};

/// Computes the new assignment list for an account given the existing list
/// and a requested list. Assignments retained across the call keep their
/// existing record untouched, so accumulated sub-state (approval history,
/// dynamic_role flags) survives. Requested entries must resolve to a
/// catalog role via their href through `lookup`; any entry that does not
/// resolve fails the whole call with `ROLES_CONTAINS_INVALID` and the
/// caller writes nothing.
pub fn reconcile<F>(
    current: &[Value],
    requested: &[Value],
    lookup: F,
) -> Result<Vec<Value>, ErrorCode>
where
    F: Fn(&str) -> Option<Document>,
{
    // Resolve every requested entry before touching anything.
    let mut resolved: Vec<(String, &Document)> = Vec::new();
    for entry in requested {
        let Value::Map(fields) = entry else {
            return Err(ErrorCode::RolesContainsInvalid);
        };
        let Some(href) = fields.get_str("href") else {
            return Err(ErrorCode::RolesContainsInvalid);
        };
        let Some(role) = lookup(href) else {
            return Err(ErrorCode::RolesContainsInvalid);
        };
        let Some(role_id) = role.get_str(ID_KEY) else {
            return Err(ErrorCode::RolesContainsInvalid);
        };
        resolved.push((role_id.to_string(), fields));
    }

    let requested_ids: Vec<&str> = resolved.iter().map(|(id, _)| id.as_str()).collect();
    let current_ids: Vec<&str> = current
        .iter()
        .filter_map(|entry| match entry {
            Value::Map(fields) => fields.get_str("role_id"),
            _ => None,
        })
        .collect();

    let mut next = Vec::new();

    // Retained: keep the existing record verbatim.
    for entry in current {
        if let Value::Map(fields) = entry {
            if let Some(id) = fields.get_str("role_id") {
                if requested_ids.contains(&id) {
                    next.push(entry.clone());
                }
            }
        }
    }

    // Added: fresh assignment with the caller's fields minus the
    // catalog-derived display keys.
    for (role_id, fields) in &resolved {
        if current_ids.contains(&role_id.as_str()) {
            continue;
        }
        if next.iter().any(|entry| match entry {
            Value::Map(existing) => existing.get_str("role_id") == Some(role_id.as_str()),
            _ => false,
        }) {
            continue;
        }
        let mut assignment = (*fields).clone();
        for key in role::DISPLAY_KEYS {
            assignment.remove(key);
        }
        assignment.set("role_id", role_id.as_str());
        assignment.set("added_date", TimeStamp::new());
        next.push(Value::Map(assignment));
    }

    Ok(next)
}
