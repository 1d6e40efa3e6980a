use crate::types::{
    Aggregate, AggregatedEntity, CountryStatesRow, LevelSummary, RankingRow, Selection,
    SummaryStats,
};
use crate::util::{format_int, format_number};
use chrono::{DateTime, SecondsFormat, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

fn latest_rank(e: &AggregatedEntity) -> Option<usize> {
    e.ranks.last().map(|r| r.rank)
}

fn ranking_row(e: &AggregatedEntity) -> RankingRow {
    let prevalence = &e.entity.prevalence;
    let first = prevalence.values().copied().find(|v| v.is_finite());
    let last = prevalence.values().rev().copied().find(|v| v.is_finite());
    RankingRow {
        rank: latest_rank(e).map(|r| r.to_string()).unwrap_or_else(|| "–".to_string()),
        id: e.entity.id.clone(),
        name: e.entity.name.clone(),
        population: e
            .entity
            .population
            .map(format_int)
            .unwrap_or_else(|| "–".to_string()),
        endemicity: e.entity.endemicity.clone().unwrap_or_else(|| "–".to_string()),
        first_prevalence: format_number(first.unwrap_or(f64::NAN), 2),
        last_prevalence: format_number(last.unwrap_or(f64::NAN), 2),
        performance: format_number(e.performance, 2),
    }
}

/// Cohort ordered by rank in the latest ranked year; unranked entities last.
pub fn generate_ranking(agg: &Aggregate) -> Vec<RankingRow> {
    let mut entities: Vec<&AggregatedEntity> = agg.data.values().collect();
    entities.sort_by(|a, b| match (latest_rank(a), latest_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.entity.id.cmp(&b.entity.id),
    });
    entities.into_iter().map(ranking_row).collect()
}

/// The `n` entities with the lowest performance (strongest decline first).
pub fn generate_top_performers(agg: &Aggregate, n: usize) -> Vec<RankingRow> {
    let mut entities: Vec<&AggregatedEntity> = agg.data.values().collect();
    entities.sort_by(|a, b| {
        a.performance
            .partial_cmp(&b.performance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entity.id.cmp(&b.entity.id))
    });
    entities.into_iter().take(n).map(ranking_row).collect()
}

pub fn generate_country_states(by_country: &BTreeMap<String, Aggregate>) -> Vec<CountryStatesRow> {
    by_country
        .iter()
        .map(|(country, agg)| CountryStatesRow {
            country: country.clone(),
            states: agg.data.len(),
            min_prevalence: format_number(agg.stats.prevalence.min, 2),
            max_prevalence: format_number(agg.stats.prevalence.max, 2),
        })
        .collect()
}

fn level_summary(agg: &Aggregate) -> LevelSummary {
    LevelSummary { entities: agg.data.len(), stats: agg.stats }
}

pub fn generate_summary(
    selection: &Selection,
    countries: &Aggregate,
    states: &Aggregate,
    ius: &Aggregate,
    generated_at: DateTime<Utc>,
) -> SummaryStats {
    SummaryStats {
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        selection: selection.clone(),
        countries: level_summary(countries),
        states: level_summary(states),
        ius: level_summary(ius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::rank;
    use crate::ranking::tests::entity;
    use chrono::TimeZone;

    fn cohort() -> Aggregate {
        rank(&[
            entity("A", &[(2020, 10.0), (2021, 5.0)]),
            entity("B", &[(2020, 20.0), (2021, 20.0)]),
            entity("C", &[(2020, 30.0), (2021, 2.0)]),
            entity("D", &[]),
        ])
    }

    #[test]
    fn ranking_follows_latest_year() {
        let rows = generate_ranking(&cohort());
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B", "D"]);
        assert_eq!(rows[0].rank, "1");
        assert_eq!(rows[0].first_prevalence, "30.00");
        assert_eq!(rows[0].last_prevalence, "2.00");
        assert_eq!(rows[0].performance, "-28.00");
        assert_eq!(rows[0].population, "1,000");
        assert_eq!(rows[3].rank, "–");
    }

    #[test]
    fn top_performers_are_most_improved() {
        let rows = generate_top_performers(&cohort(), 2);
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A"]);
    }

    #[test]
    fn summary_counts_each_level() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let s = generate_summary(
            &Selection::default(),
            &cohort(),
            &Aggregate::default(),
            &Aggregate::default(),
            at,
        );
        assert_eq!(s.generated_at, "2026-01-02T03:04:05Z");
        assert_eq!(s.countries.entities, 4);
        assert_eq!(s.countries.stats.prevalence.max, 30.0);
        assert_eq!(s.states.entities, 0);
    }

    #[test]
    fn country_state_rows_use_local_stats() {
        let mut by_country = BTreeMap::new();
        by_country.insert("NGA".to_string(), cohort());
        let rows = generate_country_states(&by_country);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].states, 4);
        assert_eq!(rows[0].min_prevalence, "2.00");
        assert_eq!(rows[0].max_prevalence, "30.00");
    }
}
