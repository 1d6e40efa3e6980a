//! Column layout of the modelled prevalence tables.
//!
//! Year-indexed series live in prefixed columns (`Prev_2020`,
//! `elimination2020`, `Lower2020`, `Upper2020`). The layout is resolved once
//! per header row so per-row extraction is plain index lookups.

use csv::StringRecord;
use once_cell::sync::Lazy;

use crate::error::{DataError, Result};
use crate::util::{round_to, year_from_suffix};

/// Logical series carried by a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Prevalence,
    Probability,
    Lower,
    Upper,
}

/// How a logical series is found in the header and normalised on enrichment.
#[derive(Debug, Clone, Copy)]
pub struct SeriesColumn {
    pub series: Series,
    pub prefix: &'static str,
    pub normalize: fn(f64) -> f64,
}

fn percent_2dp(v: f64) -> f64 {
    round_to(v * 100.0, 2)
}

fn identity(v: f64) -> f64 {
    v
}

pub static SERIES_COLUMNS: Lazy<Vec<SeriesColumn>> = Lazy::new(|| {
    vec![
        SeriesColumn { series: Series::Prevalence, prefix: "Prev_", normalize: percent_2dp },
        SeriesColumn { series: Series::Probability, prefix: "elimination", normalize: identity },
        SeriesColumn { series: Series::Lower, prefix: "Lower", normalize: identity },
        SeriesColumn { series: Series::Upper, prefix: "Upper", normalize: identity },
    ]
});

pub fn series_column(series: Series) -> &'static SeriesColumn {
    let idx = match series {
        Series::Prevalence => 0,
        Series::Probability => 1,
        Series::Lower => 2,
        Series::Upper => 3,
    };
    &SERIES_COLUMNS[idx]
}

pub const REGIME_COLUMN: &str = "Regime";
pub const ENDEMICITY_COLUMN: &str = "Endemicity";
pub const POPULATION_COLUMN: &str = "Population";

/// Header positions for one raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub id: usize,
    pub regime: usize,
    pub endemicity: Option<usize>,
    pub population: Option<usize>,
    /// `(column index, series, year)` in header order.
    pub series: Vec<(usize, Series, i32)>,
}

impl ColumnLayout {
    pub fn resolve(table: &str, headers: &StringRecord, id_column: &str) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| DataError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
        };

        let mut series = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            for col in SERIES_COLUMNS.iter() {
                if let Some(suffix) = header.strip_prefix(col.prefix) {
                    if let Some(year) = year_from_suffix(suffix) {
                        series.push((idx, col.series, year));
                    }
                }
            }
        }

        Ok(Self {
            id: required(id_column)?,
            regime: required(REGIME_COLUMN)?,
            endemicity: position(ENDEMICITY_COLUMN),
            population: position(POPULATION_COLUMN),
            series,
        })
    }

    pub fn years(&self, series: Series) -> impl Iterator<Item = i32> + '_ {
        self.series
            .iter()
            .filter(move |(_, s, _)| *s == series)
            .map(|(_, _, y)| *y)
    }
}
