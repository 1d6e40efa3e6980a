//! Joins raw records against the relation table.

use log::{debug, warn};

use crate::error::Result;
use crate::relations::{distinct_ids, RelationIndex, RelationKey};
use crate::schema::{series_column, Series};
use crate::types::{EnrichedEntity, RawRecord, RelationRow, YearSeries};
use crate::util::round_to;

fn normalize(series: &YearSeries, which: Series) -> YearSeries {
    let f = series_column(which).normalize;
    series.iter().map(|(year, v)| (*year, f(*v))).collect()
}

/// Enrich every record, or fail the whole batch on the first record whose id
/// has no relation row.
pub fn enrich(
    rows: &[RawRecord],
    relations: &[RelationRow],
    key: RelationKey,
) -> Result<Vec<EnrichedEntity>> {
    let index = RelationIndex::build(relations, key);
    for id in index.conflicts() {
        warn!("relation rows disagree on the {key} name of {id:?}; using the first");
    }

    let entities = rows
        .iter()
        .map(|row| enrich_one(row, &index))
        .collect::<Result<Vec<_>>>()?;
    debug!("enriched {} {key} rows", entities.len());
    Ok(entities)
}

fn enrich_one(row: &RawRecord, index: &RelationIndex<'_>) -> Result<EnrichedEntity> {
    let key = index.key();
    let meta = index.lookup_first(&row.id)?;
    let related = index.rows(&row.id);

    Ok(EnrichedEntity {
        id: row.id.clone(),
        name: key.name_of(meta).to_string(),
        population: row
            .population
            .filter(|p| p.is_finite())
            .map(|p| round_to(p, 0) as i64),
        endemicity: row.endemicity.clone(),
        prevalence: normalize(&row.prevalence, Series::Prevalence),
        probability: normalize(&row.probability, Series::Probability),
        lower: normalize(&row.lower, Series::Lower),
        upper: normalize(&row.upper, Series::Upper),
        related_countries: distinct_ids(related, RelationKey::Country),
        related_states: distinct_ids(related, RelationKey::StateCode),
        related_iu: distinct_ids(related, RelationKey::Iuid),
    })
}
