// SPDX-License-Identifier: PMPL-1.0-or-later
//! Combining filter results.
//!
//! A read with both a `name` and a `communication` filter returns the persons
//! matched by both. Filters that matched nothing do not narrow the result.

use std::collections::HashSet;

use person_storage::{Person, PersonId};

/// Persons from `first` whose identifier also appears in `second`.
///
/// Keeps the order of `first` and emits one entry per occurrence in `first`.
pub fn intersect_by_id(first: Vec<Person>, second: &[Person]) -> Vec<Person> {
    let wanted: HashSet<PersonId> = second.iter().map(|p| p.id).collect();
    first
        .into_iter()
        .filter(|p| wanted.contains(&p.id))
        .collect()
}

/// Merge the results of the `name` and `communication` filters.
///
/// Both non-empty: their intersection. One non-empty: that one. Otherwise
/// nothing.
pub fn combine_filters(by_name: Vec<Person>, by_communication: Vec<Person>) -> Vec<Person> {
    match (by_name.is_empty(), by_communication.is_empty()) {
        (false, false) => intersect_by_id(by_name, &by_communication),
        (false, true) => by_name,
        (true, false) => by_communication,
        (true, true) => Vec::new(),
    }
}
