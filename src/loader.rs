use crate::error::Result;
use crate::geojson::FeatureCollection;
use crate::relations::Level;
use crate::schema::{ColumnLayout, Series};
use crate::types::{RawRecord, RelationRow};
use crate::util::parse_f64_safe;
use csv::{ReaderBuilder, StringRecord};
use log::{info, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

/// Read one prevalence table of `level` from CSV.
///
/// Rows without an id or with an unknown regime are counted in
/// `parse_errors` and skipped. Blank or unparsable series cells become NaN.
pub fn read_table<R: Read>(reader: R, level: Level) -> Result<(Vec<RawRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let layout = ColumnLayout::resolve(level.label(), &headers, level.key().column())?;

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows: Vec<RawRecord> = Vec::new();

    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(_) => { parse_errors += 1; continue; }
        };
        match parse_row(&record, &layout) {
            Some(row) => rows.push(row),
            None => parse_errors += 1,
        }
    }

    if parse_errors > 0 {
        warn!("{}: skipped {} of {} rows", level.label(), parse_errors, total_rows);
    }
    let report = LoadReport { total_rows, loaded_rows: rows.len(), parse_errors };
    Ok((rows, report))
}

fn parse_row(record: &StringRecord, layout: &ColumnLayout) -> Option<RawRecord> {
    let id = record.get(layout.id)?.trim();
    if id.is_empty() {
        return None;
    }
    let regime = record.get(layout.regime)?.parse().ok()?;

    let mut row = RawRecord::new(id, regime);
    row.endemicity = layout
        .endemicity
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);
    row.population = layout.population.and_then(|i| parse_f64_safe(record.get(i)));

    for &(idx, series, year) in &layout.series {
        let value = parse_f64_safe(record.get(idx)).unwrap_or(f64::NAN);
        let target = match series {
            Series::Prevalence => &mut row.prevalence,
            Series::Probability => &mut row.probability,
            Series::Lower => &mut row.lower,
            Series::Upper => &mut row.upper,
        };
        target.insert(year, value);
    }
    Some(row)
}

pub fn load_table(path: &Path, level: Level) -> Result<(Vec<RawRecord>, LoadReport)> {
    let file = File::open(path)?;
    let (rows, report) = read_table(BufReader::new(file), level)?;
    info!("loaded {} {} rows from {}", report.loaded_rows, level.label(), path.display());
    Ok((rows, report))
}

pub fn read_relations<R: Read>(reader: R) -> Result<Vec<RelationRow>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let rows = rdr.deserialize::<RelationRow>().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_relations(path: &Path) -> Result<Vec<RelationRow>> {
    let rows = read_relations(BufReader::new(File::open(path)?))?;
    info!("loaded {} relation rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn load_features(path: &Path) -> Result<FeatureCollection> {
    let fc: FeatureCollection = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    info!("loaded {} features from {}", fc.features.len(), path.display());
    Ok(fc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Regime;

    const STATES: &str = "\
StateCode,Regime,Endemicity,Population,Prev_2020,Prev_2021,elimination2020,Lower2020,Upper2020
NGA01,WHO,high,\"12,500.4\",0.12,0.08,0.3,0.1,0.2
NGA02,NO_MDA,,900,0.2,,0.1,0.15,0.25
,WHO,low,10,0.1,0.1,0,0,0
GHA01,WEEKLY,low,10,0.1,0.1,0,0,0
";

    #[test]
    fn reads_rows_and_counts_rejects() {
        let (rows, report) = read_table(STATES.as_bytes(), Level::State).unwrap();
        assert_eq!(report, LoadReport { total_rows: 4, loaded_rows: 2, parse_errors: 2 });

        let first = &rows[0];
        assert_eq!(first.id, "NGA01");
        assert_eq!(first.regime, Regime::Who);
        assert_eq!(first.endemicity.as_deref(), Some("high"));
        assert_eq!(first.population, Some(12500.4));
        assert_eq!(first.prevalence.keys().copied().collect::<Vec<_>>(), vec![2020, 2021]);
        assert_eq!(first.probability[&2020], 0.3);
        assert_eq!(first.lower[&2020], 0.1);
        assert_eq!(first.upper[&2020], 0.2);

        let second = &rows[1];
        assert_eq!(second.regime, Regime::NoMda);
        assert_eq!(second.endemicity, None);
        assert!(second.prevalence[&2021].is_nan());
    }

    #[test]
    fn table_without_id_column_fails() {
        let err = read_table(STATES.as_bytes(), Level::Country).unwrap_err();
        assert!(err.to_string().contains("Country"));
    }

    #[test]
    fn reads_relation_rows() {
        let csv = "Country,CountryName,StateCode,StateName,IUID,IUName\n\
                   NGA,Nigeria,NGA01,Abia,NGA0001,Aba North\n";
        let rows = read_relations(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].country_name, "Nigeria");
        assert_eq!(rows[0].iu_id, "NGA0001");
    }
}
