//! Glue between files on disk and the derivation graph.

use chrono::{DateTime, Utc};
use log::info;
use std::fs::create_dir_all;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::Result;
use crate::graph::DataApi;
use crate::loader::{load_features, load_relations, load_table, LoadReport};
use crate::output::{write_csv, write_json};
use crate::relations::Level;
use crate::reports::{
    generate_country_states, generate_ranking, generate_summary, generate_top_performers,
};

/// Read every configured input into `api`. Returns the per-level table
/// reports.
pub fn load_inputs(api: &mut DataApi, config: &AppConfig) -> Result<Vec<(Level, LoadReport)>> {
    let relations = load_relations(&config.inputs.relations)?;
    api.set_relations(relations);

    let mut reports = Vec::new();
    for level in Level::ALL {
        let (rows, report) = load_table(config.inputs.table(level), level)?;
        api.set_table(level, rows);
        api.set_shapes(level, load_features(config.inputs.shapes(level))?);
        reports.push((level, report));
    }
    Ok(reports)
}

/// Write rankings, map layers, centroids and the summary into the output
/// directory. Returns the written paths.
pub fn export_outputs(
    api: &DataApi,
    config: &AppConfig,
    generated_at: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    let dir = &config.output_dir;
    create_dir_all(dir)?;
    let mut written = Vec::new();

    for level in Level::ALL {
        let data = api.data(level)?;
        let path = dir.join(format!("{}_ranking.csv", level.label()));
        write_csv(&path, &generate_ranking(&data))?;
        written.push(path);

        let path = dir.join(format!("{}.geojson", level.label()));
        write_json(&path, &*api.features(level)?)?;
        written.push(path);
    }

    let path = dir.join("country_centroids.geojson");
    write_json(&path, &*api.country_centroids()?)?;
    written.push(path);

    let path = dir.join("top_countries.csv");
    write_csv(&path, &generate_top_performers(&*api.country_data()?, config.top_n))?;
    written.push(path);

    let path = dir.join("states_by_country.csv");
    write_csv(&path, &generate_country_states(&*api.state_by_country_data()?))?;
    written.push(path);

    let summary = generate_summary(
        &api.selection(),
        &*api.country_data()?,
        &*api.state_data()?,
        &*api.iu_data()?,
        generated_at,
    );
    let path = dir.join("summary.json");
    write_json(&path, &summary)?;
    written.push(path);

    info!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
