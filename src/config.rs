//! Application configuration.
//!
//! Read from `prevalence.json` (or the file named by `PREVALENCE_CONFIG`).
//! Every field has a default, so a partial file or no file at all works.

use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graph::GraphOptions;
use crate::merge::{MergePolicy, DEFAULT_NICE_STEPS};
use crate::relations::Level;
use crate::types::Selection;

pub const CONFIG_ENV: &str = "PREVALENCE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "prevalence.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub countries: PathBuf,
    pub states: PathBuf,
    pub ius: PathBuf,
    pub relations: PathBuf,
    pub country_shapes: PathBuf,
    pub state_shapes: PathBuf,
    pub iu_shapes: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            countries: "data/countries.csv".into(),
            states: "data/states.csv".into(),
            ius: "data/ius.csv".into(),
            relations: "data/relations.csv".into(),
            country_shapes: "data/level0.geojson".into(),
            state_shapes: "data/level1.geojson".into(),
            iu_shapes: "data/level2.geojson".into(),
        }
    }
}

impl InputPaths {
    pub fn table(&self, level: Level) -> &Path {
        match level {
            Level::Country => &self.countries,
            Level::State => &self.states,
            Level::Iu => &self.ius,
        }
    }

    pub fn shapes(&self, level: Level) -> &Path {
        match level {
            Level::Country => &self.country_shapes,
            Level::State => &self.state_shapes,
            Level::Iu => &self.iu_shapes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MergePolicies {
    pub country: MergePolicy,
    pub state: MergePolicy,
    pub iu: MergePolicy,
}

impl Default for MergePolicies {
    fn default() -> Self {
        let options = GraphOptions::default();
        Self {
            country: options.country_policy,
            state: options.state_policy,
            iu: options.iu_policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    pub merge: MergePolicies,
    /// Round steps the color domain is niced to.
    pub nice_steps: usize,
    pub preview_rows: usize,
    pub top_n: usize,
    pub selection: Selection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            output_dir: "output".into(),
            merge: MergePolicies::default(),
            nice_steps: DEFAULT_NICE_STEPS,
            preview_rows: 5,
            top_n: 4,
            selection: Selection::default(),
        }
    }
}

impl AppConfig {
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            country_policy: self.merge.country,
            state_policy: self.merge.state,
            iu_policy: self.merge.iu,
            nice_steps: self.nice_steps.max(1),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load from `PREVALENCE_CONFIG` or `prevalence.json`; defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        info!("reading config from {}", path.display());
        Self::from_path(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Regime;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{
                "inputs": { "countries": "in/c.csv" },
                "merge": { "state": "decorate_all" },
                "selection": { "regime": "NO_MDA", "endemicity": "high" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.inputs.countries, PathBuf::from("in/c.csv"));
        assert_eq!(cfg.inputs.relations, PathBuf::from("data/relations.csv"));
        assert_eq!(cfg.merge.state, MergePolicy::DecorateAll);
        assert_eq!(cfg.merge.country, MergePolicy::FilterAndDecorate);
        assert_eq!(cfg.selection.regime, Regime::NoMda);
        assert_eq!(cfg.selection.endemicity.as_deref(), Some("high"));
        assert_eq!(cfg.nice_steps, 5);
        assert_eq!(cfg.graph_options().policy(Level::State), MergePolicy::DecorateAll);
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prevalence.json");
        std::fs::write(&path, r#"{ "top_n": 10, "output_dir": "maps" }"#).unwrap();
        let cfg = AppConfig::from_path(&path).unwrap();
        assert_eq!(cfg.top_n, 10);
        assert_eq!(cfg.output_dir, PathBuf::from("maps"));
    }
}
