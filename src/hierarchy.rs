//! Re-aggregation of a cohort within its parent administrative units.

use std::collections::BTreeMap;

use crate::ranking::rank;
use crate::types::{Aggregate, EnrichedEntity};

/// First related country of an entity; the parent of a state or an IU.
pub fn first_country(e: &EnrichedEntity) -> Option<&str> {
    e.related_countries.first().map(String::as_str)
}

/// First related state of an entity; the parent of an IU.
pub fn first_state(e: &EnrichedEntity) -> Option<&str> {
    e.related_states.first().map(String::as_str)
}

/// Entities whose parent (per `parent_of`) is `parent`.
pub fn within_parent<F>(entities: &[EnrichedEntity], parent_of: F, parent: &str) -> Vec<EnrichedEntity>
where
    F: Fn(&EnrichedEntity) -> Option<&str>,
{
    entities
        .iter()
        .filter(|e| parent_of(*e) == Some(parent))
        .cloned()
        .collect()
}

/// Partition by parent and rank each partition on its own.
///
/// Stats in each partition are local to it. `scope` restricts the input to a
/// single parent before grouping. Entities without a parent are left out.
pub fn aggregate_by_parent<F>(
    entities: &[EnrichedEntity],
    parent_of: F,
    scope: Option<&str>,
) -> BTreeMap<String, Aggregate>
where
    F: Fn(&EnrichedEntity) -> Option<&str>,
{
    let mut groups: BTreeMap<&str, Vec<EnrichedEntity>> = BTreeMap::new();
    for e in entities {
        let Some(parent) = parent_of(e) else {
            continue;
        };
        if scope.is_some_and(|s| s != parent) {
            continue;
        }
        groups.entry(parent).or_default().push(e.clone());
    }
    groups
        .into_iter()
        .map(|(parent, members)| (parent.to_string(), rank(&members)))
        .collect()
}
