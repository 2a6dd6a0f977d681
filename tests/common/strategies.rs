use migrator_core::state_machine::MigrationStatus;
use proptest::prelude::*;
use std::collections::HashMap;

/// Repository names `org/repo-N` for `0..count`
pub fn repository_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("org/repo-{i}")).collect()
}

/// Input order is shuffled so dependencies do not trivially precede dependents.
pub fn shuffled_names_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    (1..=max).prop_flat_map(|count| Just(repository_names(count)).prop_shuffle())
}

/// Acyclic local dependency edges: `org/repo-i` may only depend on `org/repo-j` with
/// `j < i`. Some targets are outside the input set.
pub fn acyclic_graph_strategy(
    max: usize,
) -> impl Strategy<Value = (Vec<String>, HashMap<String, Vec<String>>)> {
    shuffled_names_strategy(max).prop_flat_map(|names| {
        let count = names.len();
        let edges = prop::collection::vec((0..count, 0..count + 3), 0..count * 2);
        (Just(names), edges).prop_map(move |(names, edges)| {
            let mut deps: HashMap<String, Vec<String>> = HashMap::new();
            for (from, to) in edges {
                if to < from || to >= count {
                    deps.entry(format!("org/repo-{from}"))
                        .or_default()
                        .push(format!("org/repo-{to}"));
                }
            }
            (names, deps)
        })
    })
}

/// Arbitrary local dependency edges, including cycles and self-edges.
pub fn cyclic_graph_strategy(
    max: usize,
) -> impl Strategy<Value = (Vec<String>, HashMap<String, Vec<String>>)> {
    shuffled_names_strategy(max).prop_flat_map(|names| {
        let count = names.len();
        let edges = prop::collection::vec((0..count, 0..count), 0..count * 3);
        (Just(names), edges).prop_map(|(names, edges)| {
            let mut deps: HashMap<String, Vec<String>> = HashMap::new();
            for (from, to) in edges {
                deps.entry(format!("org/repo-{from}"))
                    .or_default()
                    .push(format!("org/repo-{to}"));
            }
            (names, deps)
        })
    })
}

pub fn migration_status_strategy() -> impl Strategy<Value = MigrationStatus> {
    prop::sample::select(MigrationStatus::ALL.to_vec())
}
