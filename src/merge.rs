//! Projection of cohort statistics onto GeoJSON features.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeSet;

use crate::color::ColorScale;
use crate::geojson::{Feature, FeatureCollection};
use crate::types::{Aggregate, AggregatedEntity};

pub const PLACEHOLDER: &str = "–";
pub const DEFAULT_NICE_STEPS: usize = 5;

/// What happens to features and their properties on merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Drop features without a cohort entry; attach color, prevalence,
    /// population and endemicity.
    #[default]
    FilterAndDecorate,
    /// Keep every feature; attach colors only where the cohort has an entry.
    DecorateAll,
}

pub fn color_key(year: i32) -> String {
    format!("color-{year}")
}

pub fn prev_key(year: i32) -> String {
    format!("prev-{year}")
}

/// Every year with a prevalence value anywhere in the cohort.
pub fn cohort_years(aggregate: &Aggregate) -> BTreeSet<i32> {
    aggregate
        .data
        .values()
        .flat_map(|a| a.entity.prevalence.keys().copied())
        .collect()
}

/// Scale over `[0, max prevalence]`, niced to `steps` round steps.
pub fn prevalence_scale(aggregate: &Aggregate, steps: usize) -> ColorScale {
    ColorScale::reds(aggregate.stats.prevalence.max).nice(steps)
}

fn finite(v: Option<f64>) -> Value {
    v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null)
}

fn decorate(
    feature: &Feature,
    entity: &AggregatedEntity,
    years: &BTreeSet<i32>,
    scale: &ColorScale,
    policy: MergePolicy,
) -> Feature {
    let mut out = feature.clone();
    let props = &mut out.properties;
    for &year in years {
        let p = entity.entity.prevalence.get(&year).copied();
        let color = p.and_then(|p| scale.color(p)).map(Value::String).unwrap_or(Value::Null);
        props.insert(color_key(year), color);
        if policy == MergePolicy::FilterAndDecorate {
            props.insert(prev_key(year), finite(p));
        }
    }
    if policy == MergePolicy::FilterAndDecorate {
        let population = entity
            .entity
            .population
            .map(Value::from)
            .unwrap_or_else(|| Value::from(PLACEHOLDER));
        let endemicity = entity
            .entity
            .endemicity
            .clone()
            .map(Value::String)
            .unwrap_or_else(|| Value::from(PLACEHOLDER));
        props.insert("population".to_string(), population);
        props.insert("endemicity".to_string(), endemicity);
    }
    out
}

/// Build a new collection with cohort colors attached; inputs are untouched.
pub fn merge(
    aggregate: &Aggregate,
    features: &FeatureCollection,
    join_key: &str,
    policy: MergePolicy,
    steps: usize,
) -> FeatureCollection {
    let scale = prevalence_scale(aggregate, steps);
    let years = cohort_years(aggregate);

    let merged = features
        .features
        .iter()
        .filter_map(|feature| {
            let entity = feature
                .property_str(join_key)
                .and_then(|id| aggregate.data.get(&id));
            match (entity, policy) {
                (Some(e), _) => Some(decorate(feature, e, &years, &scale, policy)),
                (None, MergePolicy::DecorateAll) => Some(feature.clone()),
                (None, MergePolicy::FilterAndDecorate) => None,
            }
        })
        .collect();
    FeatureCollection::new(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Geometry;
    use crate::ranking::rank;
    use crate::ranking::tests::entity;
    use serde_json::{json, Map};

    fn feature(iso: &str) -> Feature {
        let mut props = Map::new();
        props.insert("ADMIN0ISO3".to_string(), json!(iso));
        props.insert("NAME".to_string(), json!(format!("{iso} land")));
        Feature::new(
            Some(Geometry::Point { coordinates: vec![0.0, 0.0] }),
            props,
        )
    }

    fn scenario() -> Aggregate {
        rank(&[
            entity("A", &[(2020, 10.0), (2021, 5.0)]),
            entity("B", &[(2020, 20.0), (2021, 20.0)]),
        ])
    }

    #[test]
    fn filter_and_decorate_attaches_values_and_drops_unmatched() {
        let fc = FeatureCollection::new(vec![feature("A"), feature("C")]);
        let out = merge(&scenario(), &fc, "ADMIN0ISO3", MergePolicy::FilterAndDecorate, 5);
        assert_eq!(out.features.len(), 1);
        let props = &out.features[0].properties;
        assert!(props["color-2020"].is_string());
        assert!(props["color-2021"].is_string());
        assert_eq!(props["prev-2020"], json!(10.0));
        assert_eq!(props["prev-2021"], json!(5.0));
        assert_eq!(props["population"], json!(1000));
        assert_eq!(props["endemicity"], json!(PLACEHOLDER));
        assert_eq!(props["NAME"], json!("A land"));
        // domain is [0, 20]: B's 20 is the darkest stop, A's 10 is mid-scale
        let b = merge(
            &scenario(),
            &FeatureCollection::new(vec![feature("B")]),
            "ADMIN0ISO3",
            MergePolicy::FilterAndDecorate,
            5,
        );
        assert_eq!(b.features[0].properties["color-2020"], json!("#67000d"));
    }

    #[test]
    fn decorate_all_keeps_every_feature() {
        let fc = FeatureCollection::new(vec![feature("A"), feature("C")]);
        let out = merge(&scenario(), &fc, "ADMIN0ISO3", MergePolicy::DecorateAll, 5);
        assert_eq!(out.features.len(), 2);
        let a = &out.features[0].properties;
        assert!(a["color-2021"].is_string());
        assert!(!a.contains_key("prev-2021"));
        assert!(!a.contains_key("population"));
        assert_eq!(out.features[1], fc.features[1]);
    }

    #[test]
    fn non_finite_prevalence_maps_to_null() {
        let agg = rank(&[
            entity("A", &[(2020, f64::NAN), (2021, 5.0)]),
            entity("B", &[(2020, 8.0)]),
        ]);
        let fc = FeatureCollection::new(vec![feature("A"), feature("B")]);
        let out = merge(&agg, &fc, "ADMIN0ISO3", MergePolicy::FilterAndDecorate, 5);
        let a = &out.features[0].properties;
        assert_eq!(a["color-2020"], Value::Null);
        assert_eq!(a["prev-2020"], Value::Null);
        let b = &out.features[1].properties;
        assert_eq!(b["color-2021"], Value::Null);
        assert_eq!(b["prev-2021"], Value::Null);
    }

    #[test]
    fn merge_is_deterministic_and_leaves_input_alone() {
        let fc = FeatureCollection::new(vec![feature("B"), feature("A")]);
        let before = fc.clone();
        let agg = scenario();
        let first = merge(&agg, &fc, "ADMIN0ISO3", MergePolicy::FilterAndDecorate, 5);
        let second = merge(&agg, &fc, "ADMIN0ISO3", MergePolicy::FilterAndDecorate, 5);
        assert_eq!(first, second);
        assert_eq!(fc, before);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn numeric_join_keys_match_text_ids() {
        let agg = rank(&[entity("12345", &[(2020, 4.0)])]);
        let iu = |id: Value| {
            let mut props = Map::new();
            props.insert("IU_ID".to_string(), id);
            Feature::new(None, props)
        };
        let fc = FeatureCollection::new(vec![iu(json!(12345)), iu(json!(12345.0))]);
        let out = merge(&agg, &fc, "IU_ID", MergePolicy::FilterAndDecorate, 5);
        assert_eq!(out.features.len(), 2);
        assert!(out.features.iter().all(|f| f.properties["prev-2020"] == json!(4.0)));
    }

    #[test]
    fn empty_cohort_yields_empty_collection() {
        let fc = FeatureCollection::new(vec![feature("A")]);
        let out = merge(&Aggregate::default(), &fc, "ADMIN0ISO3", MergePolicy::FilterAndDecorate, 5);
        assert!(out.features.is_empty());
    }
}
