//! Multi-key lookup over the administrative relation table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{DataError, Result};
use crate::types::RelationRow;

/// Administrative level a relation lookup is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKey {
    Country,
    StateCode,
    #[serde(rename = "IUID")]
    Iuid,
}

impl RelationKey {
    pub fn column(self) -> &'static str {
        match self {
            RelationKey::Country => "Country",
            RelationKey::StateCode => "StateCode",
            RelationKey::Iuid => "IUID",
        }
    }

    pub fn id_of(self, row: &RelationRow) -> &str {
        match self {
            RelationKey::Country => &row.country,
            RelationKey::StateCode => &row.state_code,
            RelationKey::Iuid => &row.iu_id,
        }
    }

    /// Display name matching the level of the key.
    pub fn name_of(self, row: &RelationRow) -> &str {
        match self {
            RelationKey::Country => &row.country_name,
            RelationKey::StateCode => &row.state_name,
            RelationKey::Iuid => &row.iu_name,
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Administrative granularity of a table, a cohort and its map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Country,
    State,
    Iu,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Country, Level::State, Level::Iu];

    pub fn key(self) -> RelationKey {
        match self {
            Level::Country => RelationKey::Country,
            Level::State => RelationKey::StateCode,
            Level::Iu => RelationKey::Iuid,
        }
    }

    /// Feature property holding the administrative code in this level's
    /// GeoJSON layer.
    pub fn join_key(self) -> &'static str {
        match self {
            Level::Country => "ADMIN0ISO3",
            Level::State => "ADMIN1ID",
            Level::Iu => "IU_ID",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Country => "countries",
            Level::State => "states",
            Level::Iu => "ius",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Relation rows grouped by one key, insertion order preserved per group.
#[derive(Debug, Clone)]
pub struct RelationIndex<'a> {
    key: RelationKey,
    groups: HashMap<&'a str, Vec<&'a RelationRow>>,
}

impl<'a> RelationIndex<'a> {
    pub fn build(relations: &'a [RelationRow], key: RelationKey) -> Self {
        let mut groups: HashMap<&'a str, Vec<&'a RelationRow>> = HashMap::new();
        for row in relations {
            groups.entry(key.id_of(row)).or_default().push(row);
        }
        Self { key, groups }
    }

    pub fn key(&self) -> RelationKey {
        self.key
    }

    /// All rows sharing `id`, earliest first. Empty when unknown.
    pub fn rows(&self, id: &str) -> &[&'a RelationRow] {
        self.groups.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The earliest-inserted row for `id`.
    ///
    /// A miss is a data-integrity defect, not a normal condition.
    pub fn lookup_first(&self, id: &str) -> Result<&'a RelationRow> {
        self.rows(id).first().copied().ok_or_else(|| DataError::RelationNotFound {
            key: self.key,
            id: id.to_string(),
        })
    }

    /// Ids whose rows disagree on the display name for this key's level,
    /// sorted. Lookups still use the first row.
    pub fn conflicts(&self) -> Vec<&'a str> {
        let mut out: Vec<&'a str> = self
            .groups
            .iter()
            .filter(|(_, rows)| {
                let first = self.key.name_of(rows[0]);
                rows.iter().any(|r| self.key.name_of(r) != first)
            })
            .map(|(id, _)| *id)
            .collect();
        out.sort_unstable();
        out
    }
}

/// Distinct values of `level` across `rows`, in first-seen order.
pub fn distinct_ids(rows: &[&RelationRow], level: RelationKey) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in rows {
        let id = level.id_of(row);
        if !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn rel(country: &str, state: &str, iu: &str) -> RelationRow {
        RelationRow {
            country: country.to_string(),
            country_name: format!("{country} name"),
            state_code: state.to_string(),
            state_name: format!("{state} name"),
            iu_id: iu.to_string(),
            iu_name: format!("{iu} name"),
        }
    }

    #[test]
    fn lookup_first_returns_earliest_row() {
        let mut second = rel("NGA", "NGA01", "IU2");
        second.country_name = "Other".to_string();
        let rows = vec![rel("NGA", "NGA01", "IU1"), second];
        let index = RelationIndex::build(&rows, RelationKey::Country);
        let first = index.lookup_first("NGA").unwrap();
        assert_eq!(first.iu_id, "IU1");
        assert_eq!(index.rows("NGA").len(), 2);
        assert_eq!(index.conflicts(), vec!["NGA"]);
    }

    #[test]
    fn lookup_miss_is_relation_not_found() {
        let rows = vec![rel("NGA", "NGA01", "IU1")];
        let index = RelationIndex::build(&rows, RelationKey::StateCode);
        match index.lookup_first("GHA01") {
            Err(DataError::RelationNotFound { key, id }) => {
                assert_eq!(key, RelationKey::StateCode);
                assert_eq!(id, "GHA01");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn distinct_ids_keeps_first_seen_order() {
        let rows = vec![
            rel("NGA", "NGA02", "IU3"),
            rel("NGA", "NGA01", "IU1"),
            rel("NGA", "NGA02", "IU4"),
        ];
        let index = RelationIndex::build(&rows, RelationKey::Country);
        let group = index.rows("NGA");
        assert_eq!(distinct_ids(group, RelationKey::Country), vec!["NGA"]);
        assert_eq!(distinct_ids(group, RelationKey::StateCode), vec!["NGA02", "NGA01"]);
        assert_eq!(distinct_ids(group, RelationKey::Iuid).len(), 3);
        assert!(index.conflicts().is_empty());
    }
}
