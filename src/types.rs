use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

use crate::error::DataError;

/// Year -> value. Years iterate in ascending order.
pub type YearSeries = BTreeMap<i32, f64>;

/// Simulated treatment scenario a row was modelled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    NoMda,
    #[default]
    Who,
    Coverage,
    Frequency,
}

impl Regime {
    pub const ALL: [Regime; 4] = [Regime::NoMda, Regime::Who, Regime::Coverage, Regime::Frequency];

    pub fn as_str(self) -> &'static str {
        match self {
            Regime::NoMda => "NO_MDA",
            Regime::Who => "WHO",
            Regime::Coverage => "COVERAGE",
            Regime::Frequency => "FREQUENCY",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Regime::ALL
            .into_iter()
            .find(|r| r.as_str() == norm)
            .ok_or_else(|| DataError::UnknownRegime(s.trim().to_string()))
    }
}

/// One modelled row for an administrative unit under one regime.
///
/// Series values are stored as read (fractions for prevalence); scaling and
/// rounding happen during enrichment. Missing cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: String,
    pub regime: Regime,
    pub endemicity: Option<String>,
    pub population: Option<f64>,
    pub prevalence: YearSeries,
    pub probability: YearSeries,
    pub lower: YearSeries,
    pub upper: YearSeries,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, regime: Regime) -> Self {
        Self {
            id: id.into(),
            regime,
            endemicity: None,
            population: None,
            prevalence: YearSeries::new(),
            probability: YearSeries::new(),
            lower: YearSeries::new(),
            upper: YearSeries::new(),
        }
    }
}

/// One implementation unit with its state and country.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelationRow {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "CountryName")]
    pub country_name: String,
    #[serde(rename = "StateCode")]
    pub state_code: String,
    #[serde(rename = "StateName")]
    pub state_name: String,
    #[serde(rename = "IUID")]
    pub iu_id: String,
    #[serde(rename = "IUName")]
    pub iu_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEntity {
    pub id: String,
    pub name: String,
    pub population: Option<i64>,
    pub endemicity: Option<String>,
    /// Percentages rounded to two decimals.
    pub prevalence: YearSeries,
    pub probability: YearSeries,
    pub lower: YearSeries,
    pub upper: YearSeries,
    pub related_countries: Vec<String>,
    pub related_states: Vec<String>,
    #[serde(rename = "relatedIU")]
    pub related_iu: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankEntry {
    pub year: i32,
    pub prevalence: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEntity {
    #[serde(flatten)]
    pub entity: EnrichedEntity,
    /// One entry per ranked year, ascending.
    pub ranks: Vec<RankEntry>,
    /// Last minus first prevalence; negative means improving.
    pub performance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CohortStats {
    pub prevalence: Extent,
}

/// A ranked cohort keyed by entity id, with cohort-wide stats.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Aggregate {
    pub data: BTreeMap<String, AggregatedEntity>,
    pub stats: CohortStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
}

/// Active UI selection, threaded explicitly into the cohort filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub regime: Regime,
    pub endemicity: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: String,
    #[serde(rename = "Id")]
    #[tabled(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Population")]
    #[tabled(rename = "Population")]
    pub population: String,
    #[serde(rename = "Endemicity")]
    #[tabled(rename = "Endemicity")]
    pub endemicity: String,
    #[serde(rename = "FirstPrevalence")]
    #[tabled(rename = "FirstPrevalence")]
    pub first_prevalence: String,
    #[serde(rename = "LastPrevalence")]
    #[tabled(rename = "LastPrevalence")]
    pub last_prevalence: String,
    #[serde(rename = "Performance")]
    #[tabled(rename = "Performance")]
    pub performance: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountryStatesRow {
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "States")]
    #[tabled(rename = "States")]
    pub states: usize,
    #[serde(rename = "MinPrevalence")]
    #[tabled(rename = "MinPrevalence")]
    pub min_prevalence: String,
    #[serde(rename = "MaxPrevalence")]
    #[tabled(rename = "MaxPrevalence")]
    pub max_prevalence: String,
}

#[derive(Debug, Serialize)]
pub struct LevelSummary {
    pub entities: usize,
    pub stats: CohortStats,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: String,
    pub selection: Selection,
    pub countries: LevelSummary,
    pub states: LevelSummary,
    pub ius: LevelSummary,
}
