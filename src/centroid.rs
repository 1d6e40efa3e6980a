//! Point symbology: one centroid per polygon feature.

use geo::Centroid;
use log::debug;
use serde_json::{Map, Value};

use crate::geojson::{Feature, FeatureCollection, Geometry};

/// Replace each feature by a point at its centroid, keeping only
/// `population`. Features without a computable centroid are skipped.
pub fn centroids(features: &FeatureCollection) -> FeatureCollection {
    let points = features
        .features
        .iter()
        .filter_map(|f| {
            let geometry = f.geometry.as_ref()?;
            let Some(c) = geo::Geometry::from(geometry).centroid() else {
                debug!("feature without centroid skipped");
                return None;
            };
            let mut props = Map::new();
            props.insert(
                "population".to_string(),
                f.properties.get("population").cloned().unwrap_or(Value::Null),
            );
            Some(Feature::new(
                Some(Geometry::Point { coordinates: vec![c.x(), c.y()] }),
                props,
            ))
        })
        .collect();
    FeatureCollection::new(points)
}
