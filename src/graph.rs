//! Memoized derivation graph over the loaded tables and the UI selection.
//!
//! Every derived value is a node that declares the revisions it depends on.
//! Reading a node first reads its dependencies, then reuses its cached value
//! when their revisions are unchanged, so repeated reads hand out the same
//! `Arc`. Writing an input only bumps its revision; dependents recompute
//! lazily on their next read.

use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use crate::centroid::centroids;
use crate::enrich::enrich;
use crate::error::Result;
use crate::filter::{filter, Criteria};
use crate::geojson::FeatureCollection;
use crate::hierarchy::{aggregate_by_parent, first_country, within_parent};
use crate::merge::{merge, MergePolicy, DEFAULT_NICE_STEPS};
use crate::ranking::rank;
use crate::relations::Level;
use crate::types::{
    AggregatedEntity, Aggregate, EnrichedEntity, RawRecord, Regime, RelationRow, Selection,
    Suggestion,
};

#[derive(Debug, Default)]
struct Clock {
    now: Cell<u64>,
    computations: Cell<u64>,
}

impl Clock {
    fn tick(&self) -> u64 {
        let next = self.now.get() + 1;
        self.now.set(next);
        next
    }
}

/// A value with the revision it was produced at.
#[derive(Debug)]
struct Node<T> {
    value: Arc<T>,
    revision: u64,
}

#[derive(Debug)]
struct Input<T> {
    value: Arc<T>,
    revision: u64,
}

impl<T: PartialEq> Input<T> {
    fn new(value: T, clock: &Clock) -> Self {
        Self { value: Arc::new(value), revision: clock.tick() }
    }

    fn set(&mut self, value: T, clock: &Clock) {
        self.value = Arc::new(value);
        self.revision = clock.tick();
    }

    /// Setting an equal value is not a change.
    fn update(&mut self, value: T, clock: &Clock) {
        if *self.value != value {
            self.set(value, clock);
        }
    }

    fn node(&self) -> Node<T> {
        Node { value: Arc::clone(&self.value), revision: self.revision }
    }
}

#[derive(Debug)]
struct Cached<T> {
    deps: Vec<u64>,
    value: Arc<T>,
    revision: u64,
}

#[derive(Debug)]
struct Memo<T> {
    name: &'static str,
    slot: RefCell<Option<Cached<T>>>,
}

impl<T> Memo<T> {
    fn new(name: &'static str) -> Self {
        Self { name, slot: RefCell::new(None) }
    }

    fn try_get<E>(
        &self,
        deps: &[u64],
        clock: &Clock,
        compute: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<Node<T>, E> {
        if let Some(cached) = self.slot.borrow().as_ref() {
            if cached.deps == deps {
                return Ok(Node { value: Arc::clone(&cached.value), revision: cached.revision });
            }
        }
        debug!("recomputing {}", self.name);
        let value = Arc::new(compute()?);
        let revision = clock.tick();
        clock.computations.set(clock.computations.get() + 1);
        *self.slot.borrow_mut() = Some(Cached {
            deps: deps.to_vec(),
            value: Arc::clone(&value),
            revision,
        });
        Ok(Node { value, revision })
    }

    fn get(&self, deps: &[u64], clock: &Clock, compute: impl FnOnce() -> T) -> Node<T> {
        match self.try_get::<Infallible>(deps, clock, || Ok(compute())) {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }
}

/// Per-call-site choices the graph is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    pub country_policy: MergePolicy,
    pub state_policy: MergePolicy,
    pub iu_policy: MergePolicy,
    pub nice_steps: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            country_policy: MergePolicy::FilterAndDecorate,
            state_policy: MergePolicy::FilterAndDecorate,
            iu_policy: MergePolicy::DecorateAll,
            nice_steps: DEFAULT_NICE_STEPS,
        }
    }
}

impl GraphOptions {
    pub fn policy(&self, level: Level) -> MergePolicy {
        match level {
            Level::Country => self.country_policy,
            Level::State => self.state_policy,
            Level::Iu => self.iu_policy,
        }
    }
}

/// Inputs plus every derived view the renderers read.
#[derive(Debug)]
pub struct DataApi {
    options: GraphOptions,
    clock: Clock,

    tables: [Input<Vec<RawRecord>>; 3],
    shapes: [Input<FeatureCollection>; 3],
    relations: Input<Vec<RelationRow>>,
    regime: Input<Regime>,
    endemicity: Input<Option<String>>,
    country: Input<Option<String>>,

    row_filter: Memo<Criteria>,
    filtered: [Memo<Vec<RawRecord>>; 3],
    with_meta: [Memo<Vec<EnrichedEntity>>; 3],
    ranked: [Memo<Aggregate>; 3],
    features: [Memo<FeatureCollection>; 3],
    state_by_country: Memo<BTreeMap<String, Aggregate>>,
    country_centroids: Memo<FeatureCollection>,
    country_suggestions: Memo<Vec<Suggestion>>,
    selected_country: Memo<Option<AggregatedEntity>>,
}

impl Default for DataApi {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

impl DataApi {
    pub fn new(options: GraphOptions) -> Self {
        let clock = Clock::default();
        let selection = Selection::default();
        Self {
            options,
            tables: [
                Input::new(Vec::new(), &clock),
                Input::new(Vec::new(), &clock),
                Input::new(Vec::new(), &clock),
            ],
            shapes: [
                Input::new(FeatureCollection::default(), &clock),
                Input::new(FeatureCollection::default(), &clock),
                Input::new(FeatureCollection::default(), &clock),
            ],
            relations: Input::new(Vec::new(), &clock),
            regime: Input::new(selection.regime, &clock),
            endemicity: Input::new(selection.endemicity, &clock),
            country: Input::new(selection.country, &clock),
            row_filter: Memo::new("row_filter"),
            filtered: [
                Memo::new("filtered_countries"),
                Memo::new("filtered_states"),
                Memo::new("filtered_ius"),
            ],
            with_meta: [
                Memo::new("countries_with_meta"),
                Memo::new("states_with_meta"),
                Memo::new("ius_with_meta"),
            ],
            ranked: [
                Memo::new("country_data"),
                Memo::new("state_data"),
                Memo::new("iu_data"),
            ],
            features: [
                Memo::new("country_features"),
                Memo::new("state_features"),
                Memo::new("iu_features"),
            ],
            state_by_country: Memo::new("state_by_country"),
            country_centroids: Memo::new("country_centroids"),
            country_suggestions: Memo::new("country_suggestions"),
            selected_country: Memo::new("selected_country"),
            clock,
        }
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    /// Number of node recomputations so far.
    pub fn computations(&self) -> u64 {
        self.clock.computations.get()
    }

    // ---- inputs ----------------------------------------------------------

    pub fn set_table(&mut self, level: Level, rows: Vec<RawRecord>) {
        self.tables[level.index()].set(rows, &self.clock);
    }

    pub fn set_shapes(&mut self, level: Level, features: FeatureCollection) {
        self.shapes[level.index()].set(features, &self.clock);
    }

    pub fn set_relations(&mut self, rows: Vec<RelationRow>) {
        self.relations.set(rows, &self.clock);
    }

    pub fn set_regime(&mut self, regime: Regime) {
        self.regime.update(regime, &self.clock);
    }

    pub fn set_endemicity(&mut self, endemicity: Option<String>) {
        self.endemicity.update(endemicity.filter(|e| !e.is_empty()), &self.clock);
    }

    pub fn set_country(&mut self, country: Option<String>) {
        self.country.update(country.filter(|c| !c.is_empty()), &self.clock);
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.set_regime(selection.regime);
        self.set_endemicity(selection.endemicity);
        self.set_country(selection.country);
    }

    pub fn selection(&self) -> Selection {
        Selection {
            regime: *self.regime.value,
            endemicity: (*self.endemicity.value).clone(),
            country: (*self.country.value).clone(),
        }
    }

    pub fn regimes(&self) -> &'static [Regime] {
        &Regime::ALL
    }

    // ---- nodes -----------------------------------------------------------

    fn row_filter_node(&self) -> Node<Criteria> {
        let deps = [self.regime.revision, self.endemicity.revision];
        self.row_filter.get(&deps, &self.clock, || Criteria {
            regime: *self.regime.value,
            endemicity: (*self.endemicity.value).clone(),
        })
    }

    fn filtered_node(&self, level: Level) -> Node<Vec<RawRecord>> {
        let table = self.tables[level.index()].node();
        let criteria = self.row_filter_node();
        self.filtered[level.index()].get(&[table.revision, criteria.revision], &self.clock, || {
            filter(&table.value, &criteria.value)
        })
    }

    fn with_meta_node(&self, level: Level) -> Result<Node<Vec<EnrichedEntity>>> {
        let rows = self.filtered_node(level);
        let relations = self.relations.node();
        self.with_meta[level.index()].try_get(
            &[rows.revision, relations.revision],
            &self.clock,
            || enrich(&rows.value, &relations.value, level.key()),
        )
    }

    fn ranked_node(&self, level: Level) -> Result<Node<Aggregate>> {
        let entities = self.with_meta_node(level)?;
        let memo = &self.ranked[level.index()];
        if level != Level::State {
            return Ok(memo.get(&[entities.revision], &self.clock, || rank(&entities.value)));
        }
        let country = self.country.node();
        Ok(memo.get(&[entities.revision, country.revision], &self.clock, || {
            match country.value.as_deref() {
                Some(c) => rank(&within_parent(&entities.value, first_country, c)),
                None => rank(&entities.value),
            }
        }))
    }

    fn features_node(&self, level: Level) -> Result<Node<FeatureCollection>> {
        let data = self.ranked_node(level)?;
        let shapes = self.shapes[level.index()].node();
        let country = self.country.node();
        let mut deps = vec![data.revision, shapes.revision];
        if level == Level::State {
            deps.push(country.revision);
        }
        let policy = self.options.policy(level);
        let steps = self.options.nice_steps;
        Ok(self.features[level.index()].get(&deps, &self.clock, || {
            match (level, country.value.as_deref()) {
                (Level::State, Some(c)) => {
                    let scoped = Aggregate {
                        data: data
                            .value
                            .data
                            .iter()
                            .filter(|(_, e)| e.entity.related_countries.iter().any(|x| x == c))
                            .map(|(id, e)| (id.clone(), e.clone()))
                            .collect(),
                        stats: data.value.stats,
                    };
                    merge(&scoped, &shapes.value, level.join_key(), policy, steps)
                }
                _ => merge(&data.value, &shapes.value, level.join_key(), policy, steps),
            }
        }))
    }

    // ---- public views ----------------------------------------------------

    pub fn row_filter(&self) -> Arc<Criteria> {
        self.row_filter_node().value
    }

    /// Raw rows of `level` matching the active regime and endemicity.
    pub fn filtered(&self, level: Level) -> Arc<Vec<RawRecord>> {
        self.filtered_node(level).value
    }

    /// Filtered rows joined with their relation metadata.
    pub fn with_meta(&self, level: Level) -> Result<Arc<Vec<EnrichedEntity>>> {
        Ok(self.with_meta_node(level)?.value)
    }

    /// Ranked cohort of `level`. The state cohort is restricted to the
    /// selected country when one is set.
    pub fn data(&self, level: Level) -> Result<Arc<Aggregate>> {
        Ok(self.ranked_node(level)?.value)
    }

    pub fn country_data(&self) -> Result<Arc<Aggregate>> {
        self.data(Level::Country)
    }

    pub fn state_data(&self) -> Result<Arc<Aggregate>> {
        self.data(Level::State)
    }

    pub fn iu_data(&self) -> Result<Arc<Aggregate>> {
        self.data(Level::Iu)
    }

    /// All filtered states ranked within their own country.
    pub fn state_by_country_data(&self) -> Result<Arc<BTreeMap<String, Aggregate>>> {
        let states = self.with_meta_node(Level::State)?;
        let node = self.state_by_country.get(&[states.revision], &self.clock, || {
            aggregate_by_parent(&states.value, first_country, None)
        });
        Ok(node.value)
    }

    /// Map layer of `level` colored by its cohort.
    pub fn features(&self, level: Level) -> Result<Arc<FeatureCollection>> {
        Ok(self.features_node(level)?.value)
    }

    pub fn country_features(&self) -> Result<Arc<FeatureCollection>> {
        self.features(Level::Country)
    }

    pub fn state_features(&self) -> Result<Arc<FeatureCollection>> {
        self.features(Level::State)
    }

    pub fn iu_features(&self) -> Result<Arc<FeatureCollection>> {
        self.features(Level::Iu)
    }

    pub fn country_centroids(&self) -> Result<Arc<FeatureCollection>> {
        let merged = self.features_node(Level::Country)?;
        let node = self
            .country_centroids
            .get(&[merged.revision], &self.clock, || centroids(&merged.value));
        Ok(node.value)
    }

    /// `{id, name}` of the filtered countries, sorted by name.
    pub fn country_suggestions(&self) -> Result<Arc<Vec<Suggestion>>> {
        let countries = self.with_meta_node(Level::Country)?;
        let node = self.country_suggestions.get(&[countries.revision], &self.clock, || {
            let mut out: Vec<Suggestion> = countries
                .value
                .iter()
                .map(|e| Suggestion { id: e.id.clone(), name: e.name.clone() })
                .collect();
            out.sort_by(|a, b| a.name.cmp(&b.name));
            out
        });
        Ok(node.value)
    }

    /// The ranked entry of the selected country, if any.
    pub fn selected_country(&self) -> Result<Arc<Option<AggregatedEntity>>> {
        let data = self.ranked_node(Level::Country)?;
        let country = self.country.node();
        let node = self
            .selected_country
            .get(&[data.revision, country.revision], &self.clock, || {
                country
                    .value
                    .as_deref()
                    .and_then(|c| data.value.data.get(c).cloned())
            });
        Ok(node.value)
    }
}
