//! Per-year cross-entity ranking and cohort statistics.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::types::{
    AggregatedEntity, Aggregate, CohortStats, EnrichedEntity, Extent, RankEntry, YearSeries,
};
use crate::util::round_to;

/// Rank a cohort.
///
/// Entities are keyed by id (a repeated id keeps the later entity). For every
/// year, finite prevalences are sorted ascending by `(prevalence, id)` and
/// ranked from 1. Non-finite values take no rank and do not count toward the
/// stats.
pub fn rank(entities: &[EnrichedEntity]) -> Aggregate {
    let mut by_id: BTreeMap<&str, &EnrichedEntity> = BTreeMap::new();
    for e in entities {
        by_id.insert(e.id.as_str(), e);
    }

    let mut by_year: BTreeMap<i32, Vec<(f64, &str)>> = BTreeMap::new();
    for (id, e) in &by_id {
        for (year, p) in e.prevalence.iter().filter(|(_, p)| p.is_finite()) {
            by_year.entry(*year).or_default().push((*p, *id));
        }
    }

    // Years are visited ascending, so each entity's ranks come out ordered.
    let mut ranks: HashMap<&str, Vec<RankEntry>> = HashMap::new();
    for (year, mut group) in by_year {
        group.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        for (pos, (prevalence, id)) in group.into_iter().enumerate() {
            ranks.entry(id).or_default().push(RankEntry {
                year,
                prevalence,
                rank: pos + 1,
            });
        }
    }

    let data: BTreeMap<String, AggregatedEntity> = by_id
        .into_iter()
        .map(|(id, e)| {
            let agg = AggregatedEntity {
                entity: e.clone(),
                ranks: ranks.remove(id).unwrap_or_default(),
                performance: performance(&e.prevalence),
            };
            (id.to_string(), agg)
        })
        .collect();

    let stats = CohortStats {
        prevalence: extent(data.values().flat_map(|a| a.entity.prevalence.values().copied())),
    };
    Aggregate { data, stats }
}

/// Last minus first finite value of a year-ordered series, or 0 when the
/// series has no finite value.
pub fn performance(series: &YearSeries) -> f64 {
    let mut finite = series.values().copied().filter(|v| v.is_finite());
    let Some(first) = finite.next() else {
        return 0.0;
    };
    let last = finite.last().unwrap_or(first);
    round_to(last - first, 2)
}

/// Min/max over finite values; `{0, 0}` when there are none.
pub fn extent(values: impl Iterator<Item = f64>) -> Extent {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        return Extent::default();
    }
    Extent { min, max }
}
