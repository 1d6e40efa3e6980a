//! Prevalence maps: enrichment, ranking and choropleth projection of
//! modelled lymphatic filariasis prevalence by administrative unit.
//!
//! Flow: raw tables + relation table + selection -> [`filter`] ->
//! [`enrich`] -> [`ranking`] -> [`merge`] / [`hierarchy`], all exposed as
//! memoized views on [`graph::DataApi`].

pub mod centroid;
pub mod color;
pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod geojson;
pub mod graph;
pub mod hierarchy;
pub mod loader;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod relations;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;

pub use error::{DataError, Result};
pub use graph::{DataApi, GraphOptions};
pub use relations::Level;
