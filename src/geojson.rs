//! Typed GeoJSON `FeatureCollection` / `Feature` / geometry.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `[x, y]` (extra ordinates are carried through untouched).
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureCollectionType {
    #[default]
    FeatureCollection,
}

fn null_as_empty<'de, D>(d: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self { kind: FeatureType::Feature, id: None, geometry, properties }
    }

    /// Join key as text. Integral floats render without a fraction, so
    /// `12345.0` joins against `"12345"`.
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() => Some(f.to_string()),
                _ => Some(n.to_string()),
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: FeatureCollectionType,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { kind: FeatureCollectionType::FeatureCollection, features }
    }
}

fn coord(p: &Position) -> geo::Coord<f64> {
    geo::Coord {
        x: p.first().copied().unwrap_or(f64::NAN),
        y: p.get(1).copied().unwrap_or(f64::NAN),
    }
}

fn line(ring: &[Position]) -> geo::LineString<f64> {
    geo::LineString::new(ring.iter().map(coord).collect())
}

fn polygon(rings: &[Vec<Position>]) -> geo::Polygon<f64> {
    let mut rings = rings.iter();
    let exterior = rings.next().map(|r| line(r)).unwrap_or_else(|| geo::LineString::new(vec![]));
    geo::Polygon::new(exterior, rings.map(|r| line(r)).collect())
}

impl From<&Geometry> for geo::Geometry<f64> {
    fn from(g: &Geometry) -> Self {
        match g {
            Geometry::Point { coordinates } => geo::Geometry::Point(geo::Point(coord(coordinates))),
            Geometry::MultiPoint { coordinates } => geo::Geometry::MultiPoint(geo::MultiPoint(
                coordinates.iter().map(|p| geo::Point(coord(p))).collect(),
            )),
            Geometry::LineString { coordinates } => geo::Geometry::LineString(line(coordinates)),
            Geometry::MultiLineString { coordinates } => geo::Geometry::MultiLineString(
                geo::MultiLineString(coordinates.iter().map(|l| line(l)).collect()),
            ),
            Geometry::Polygon { coordinates } => geo::Geometry::Polygon(polygon(coordinates)),
            Geometry::MultiPolygon { coordinates } => geo::Geometry::MultiPolygon(
                geo::MultiPolygon(coordinates.iter().map(|p| polygon(p)).collect()),
            ),
            Geometry::GeometryCollection { geometries } => geo::Geometry::GeometryCollection(
                geo::GeometryCollection(geometries.iter().map(geo::Geometry::from).collect()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_standard_feature_collection() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                    "properties": { "ADMIN0ISO3": "NGA", "code": 42 }
                },
                { "type": "Feature", "geometry": null, "properties": null }
            ]
        });
        let fc: FeatureCollection = serde_json::from_value(raw).unwrap();
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].property_str("ADMIN0ISO3").as_deref(), Some("NGA"));
        assert_eq!(fc.features[0].property_str("code").as_deref(), Some("42"));
        assert!(fc.features[1].properties.is_empty());

        let back = serde_json::to_value(&fc).unwrap();
        assert_eq!(back["type"], "FeatureCollection");
        assert_eq!(back["features"][0]["type"], "Feature");
        assert_eq!(back["features"][0]["geometry"]["type"], "Point");
    }

    #[test]
    fn numeric_join_keys_render_like_ids() {
        let props = |v: Value| {
            let mut m = Map::new();
            m.insert("IU_ID".to_string(), v);
            Feature::new(None, m)
        };
        assert_eq!(props(json!(12345)).property_str("IU_ID").as_deref(), Some("12345"));
        assert_eq!(props(json!(12345.0)).property_str("IU_ID").as_deref(), Some("12345"));
        assert_eq!(props(json!(12.5)).property_str("IU_ID").as_deref(), Some("12.5"));
        assert_eq!(props(json!(true)).property_str("IU_ID"), None);
    }
}
