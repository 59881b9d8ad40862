//! Property-based tests for role-assignment reconciliation
//!
//! Reconciliation is a pure set-reconciliation over role identity keys.
//! These tests verify its invariants across randomly generated current
//! and requested assignment sets against a fixed catalog.

use std::collections::BTreeSet;

use account_roles::reconcile::reconcile;
use account_roles::store::ID_KEY;
use account_roles::value::{DocExt, Document, Value};
use proptest::prelude::*;

const CATALOG_SIZE: usize = 8;

/// Fixed catalog: role `i` lives at `/roles/FAST/Ri` with id `role-i`.
fn catalog(href: &str) -> Option<Document> {
    let idx: usize = href.strip_prefix("/roles/FAST/R")?.parse().ok()?;
    if idx >= CATALOG_SIZE {
        return None;
    }
    let mut role = Document::new();
    role.set(ID_KEY, format!("role-{idx}"));
    role.set("href", href.to_string());
    role.set("name", format!("R{idx}"));
    role.set("short_description", "catalog role");
    Some(role)
}

/// An existing assignment for role `i`, carrying a marker field standing
/// in for accumulated sub-state.
fn held_assignment(idx: usize) -> Value {
    let mut fields = Document::new();
    fields.set("role_id", format!("role-{idx}"));
    fields.set("marker", idx as i64);
    Value::Map(fields)
}

fn requested_entry(idx: usize) -> Value {
    let mut fields = Document::new();
    fields.set("href", format!("/roles/FAST/R{idx}"));
    fields.set("name", format!("R{idx}"));
    Value::Map(fields)
}

fn role_ids(assignments: &[Value]) -> BTreeSet<String> {
    assignments
        .iter()
        .filter_map(|entry| match entry {
            Value::Map(fields) => fields.get_str("role_id").map(str::to_string),
            _ => None,
        })
        .collect()
}

fn subset_strategy() -> impl Strategy<Value = BTreeSet<usize>> {
    prop::collection::btree_set(0..CATALOG_SIZE, 0..=CATALOG_SIZE)
}

proptest! {
    /// Property: the result holds exactly the requested roles, once each,
    /// whatever was held before.
    #[test]
    fn result_ids_equal_requested_ids(current in subset_strategy(), requested in subset_strategy()) {
        let held: Vec<Value> = current.iter().map(|&i| held_assignment(i)).collect();
        let wanted: Vec<Value> = requested.iter().map(|&i| requested_entry(i)).collect();

        let next = reconcile(&held, &wanted, catalog).unwrap();

        let expected: BTreeSet<String> = requested.iter().map(|i| format!("role-{i}")).collect();
        prop_assert_eq!(role_ids(&next), expected);
        prop_assert_eq!(next.len(), requested.len());
    }

    /// Property: assignments retained across the call keep their record
    /// verbatim, marker sub-state included.
    #[test]
    fn retained_assignments_are_untouched(current in subset_strategy(), requested in subset_strategy()) {
        let held: Vec<Value> = current.iter().map(|&i| held_assignment(i)).collect();
        let wanted: Vec<Value> = requested.iter().map(|&i| requested_entry(i)).collect();

        let next = reconcile(&held, &wanted, catalog).unwrap();

        for idx in current.intersection(&requested) {
            let id = format!("role-{idx}");
            let kept = next.iter().find(|entry| match entry {
                Value::Map(fields) => fields.get_str("role_id") == Some(id.as_str()),
                _ => false,
            });
            prop_assert_eq!(kept, Some(&held_assignment(*idx)));
        }
    }

    /// Property: newly added assignments carry an added_date and none of
    /// the catalog display fields.
    #[test]
    fn added_assignments_are_fresh(current in subset_strategy(), requested in subset_strategy()) {
        let held: Vec<Value> = current.iter().map(|&i| held_assignment(i)).collect();
        let wanted: Vec<Value> = requested.iter().map(|&i| requested_entry(i)).collect();

        let next = reconcile(&held, &wanted, catalog).unwrap();

        for idx in requested.difference(&current) {
            let id = format!("role-{idx}");
            let added = next.iter().find_map(|entry| match entry {
                Value::Map(fields) if fields.get_str("role_id") == Some(id.as_str()) => Some(fields),
                _ => None,
            }).unwrap();
            prop_assert!(matches!(added.get("added_date"), Some(Value::Timestamp(_))));
            prop_assert!(!added.contains_key("href"));
            prop_assert!(!added.contains_key("name"));
            prop_assert!(!added.contains_key("short_description"));
        }
    }

    /// Property: reconciling the result against the same request again is
    /// a fixed point.
    #[test]
    fn reconciliation_is_idempotent(current in subset_strategy(), requested in subset_strategy()) {
        let held: Vec<Value> = current.iter().map(|&i| held_assignment(i)).collect();
        let wanted: Vec<Value> = requested.iter().map(|&i| requested_entry(i)).collect();

        let once = reconcile(&held, &wanted, catalog).unwrap();
        let twice = reconcile(&once, &wanted, catalog).unwrap();

        prop_assert_eq!(once, twice);
    }

    /// Property: one unresolvable entry anywhere in the request fails the
    /// whole call, whatever else it contains.
    #[test]
    fn any_invalid_entry_fails_everything(
        current in subset_strategy(),
        requested in subset_strategy(),
        position in 0..=CATALOG_SIZE,
    ) {
        let held: Vec<Value> = current.iter().map(|&i| held_assignment(i)).collect();
        let mut wanted: Vec<Value> = requested.iter().map(|&i| requested_entry(i)).collect();

        let mut bogus = Document::new();
        bogus.set("href", "/roles/FAST/R999");
        wanted.insert(position.min(wanted.len()), Value::Map(bogus));

        prop_assert!(reconcile(&held, &wanted, catalog).is_err());
    }
}
