// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the filter combinator

use std::collections::HashSet;

use person_api::intersect_by_id;
use person_storage::{Person, PersonId};
use proptest::prelude::*;

/// Persons drawn from a small id pool so the two sides overlap often.
fn arb_persons() -> impl Strategy<Value = Vec<Person>> {
    prop::collection::vec((0u8..12, "[A-Za-z]{0,8}"), 0..16).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(n, name)| {
                let id: PersonId = format!("00000000-0000-4000-8000-{n:012x}").parse().unwrap();
                Person::new(id, name, Vec::<String>::new())
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn test_result_is_ordered_subsequence_of_first(first in arb_persons(), second in arb_persons()) {
        let result = intersect_by_id(first.clone(), &second);

        let mut remaining = first.iter();
        for person in &result {
            prop_assert!(remaining.any(|p| p == person));
        }
    }

    #[test]
    fn test_every_result_is_in_second(first in arb_persons(), second in arb_persons()) {
        let second_ids: HashSet<PersonId> = second.iter().map(|p| p.id).collect();
        let result = intersect_by_id(first, &second);
        prop_assert!(result.iter().all(|p| second_ids.contains(&p.id)));
    }

    #[test]
    fn test_one_output_per_matching_occurrence(first in arb_persons(), second in arb_persons()) {
        let second_ids: HashSet<PersonId> = second.iter().map(|p| p.id).collect();
        let expected = first.iter().filter(|p| second_ids.contains(&p.id)).count();
        prop_assert_eq!(intersect_by_id(first, &second).len(), expected);
    }

    #[test]
    fn test_intersection_with_self_is_identity(first in arb_persons()) {
        prop_assert_eq!(intersect_by_id(first.clone(), &first), first);
    }
}
