use std::sync::Arc;
use parking_lot::RwLock;

use crate::accessor::{FacetKey, ValueKey};
use crate::domain::{compute_domain, Domain};
use crate::error::Result;
use crate::events::events::{DatasetLoaded, FacetClicked, LayoutComputed};
use crate::events::EventBus;
use crate::facet::FacetIndex;
use crate::layout::{arrange, LayoutOptions, TrellisLayout};
use crate::sort::SortSpec;

type SharedFacetKey<T> = Arc<dyn FacetKey<T> + Send + Sync>;
type SharedValueKey<T> = Arc<dyn ValueKey<T> + Send + Sync>;

/// Trellis state with memoized grouping and domain.
///
/// The grouping depends only on the rows and the facet key; the domain only
/// on the rows, the value key, the shared-scale flag and the explicit
/// domain. Query and sort changes reuse both and only redo filter and sort.
pub struct TrellisState<T> {
    /// The full, unfiltered rows
    rows: Arc<Vec<T>>,

    /// Facet label accessor
    facet_key: SharedFacetKey<T>,

    /// Optional value accessor for metrics and the shared domain
    value_key: Option<SharedValueKey<T>>,

    /// Sort specification
    sort: Arc<RwLock<SortSpec<T>>>,

    /// Query, shared scale and explicit domain
    options: Arc<RwLock<LayoutOptions>>,

    /// Cached grouping
    index: RwLock<Option<Arc<FacetIndex>>>,

    /// Cached domain; the outer `None` means not computed yet
    domain: RwLock<Option<Option<Domain>>>,

    /// The event bus
    event_bus: Arc<EventBus>,
}

impl<T: Send + Sync + 'static> TrellisState<T> {
    /// Create a new trellis state
    pub fn new<K>(rows: Vec<T>, facet_key: K) -> Self
    where
        K: FacetKey<T> + Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(rows), facet_key)
    }

    /// Create a trellis state over rows shared with other owners
    pub fn from_shared<K>(rows: Arc<Vec<T>>, facet_key: K) -> Self
    where
        K: FacetKey<T> + Send + Sync + 'static,
    {
        Self {
            rows,
            facet_key: Arc::new(facet_key),
            value_key: None,
            sort: Arc::new(RwLock::new(SortSpec::default())),
            options: Arc::new(RwLock::new(LayoutOptions::default())),
            index: RwLock::new(None),
            domain: RwLock::new(None),
            event_bus: Arc::new(EventBus::new()),
        }
    }

    pub fn with_value_key<V>(mut self, value_key: V) -> Self
    where
        V: ValueKey<T> + Send + Sync + 'static,
    {
        self.set_value_key(Some(Arc::new(value_key)));
        self
    }

    /// Share an existing event bus
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_sort(self, sort: SortSpec<T>) -> Self {
        self.set_sort(sort);
        self
    }

    pub fn with_options(self, options: LayoutOptions) -> Self {
        *self.options.write() = options;
        self.invalidate_domain();
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn rows(&self) -> &[T] {
        self.rows.as_slice()
    }

    /// Replace the rows; both caches are dropped
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = Arc::new(rows);
        self.invalidate_index();
        self.invalidate_domain();
    }

    pub fn set_facet_key<K>(&mut self, facet_key: K)
    where
        K: FacetKey<T> + Send + Sync + 'static,
    {
        self.facet_key = Arc::new(facet_key);
        self.invalidate_index();
    }

    pub fn set_value_key(&mut self, value_key: Option<SharedValueKey<T>>) {
        self.value_key = value_key;
        self.invalidate_domain();
    }

    pub fn has_value_key(&self) -> bool {
        self.value_key.is_some()
    }

    pub fn sort(&self) -> SortSpec<T> {
        self.sort.read().clone()
    }

    pub fn set_sort(&self, sort: SortSpec<T>) {
        tracing::debug!("Sort changed to {:?}", sort);
        *self.sort.write() = sort;
    }

    pub fn options(&self) -> LayoutOptions {
        self.options.read().clone()
    }

    pub fn query(&self) -> String {
        self.options.read().query.clone()
    }

    /// Set the search query, returns whether it changed
    pub fn set_query(&self, query: impl Into<String>) -> bool {
        let query = query.into();
        let mut options = self.options.write();
        if options.query == query {
            return false;
        }
        options.query = query;
        true
    }

    pub fn set_shared_scale(&self, shared_scale: bool) {
        let changed = {
            let mut options = self.options.write();
            std::mem::replace(&mut options.shared_scale, shared_scale) != shared_scale
        };
        if changed {
            self.invalidate_domain();
        }
    }

    pub fn set_y_domain(&self, y_domain: Option<Domain>) {
        self.options.write().y_domain = y_domain;
        self.invalidate_domain();
    }

    /// Grouping of the current rows, built on first use
    pub fn facet_index(&self) -> Result<Arc<FacetIndex>> {
        if let Some(index) = self.index.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(FacetIndex::build(self.rows(), &*self.facet_key)?);
        *self.index.write() = Some(Arc::clone(&index));

        self.event_bus.publish(DatasetLoaded {
            row_count: self.rows.len(),
            facet_count: index.len(),
        });

        Ok(index)
    }

    /// Shared domain of the current rows, computed on first use
    pub fn domain(&self) -> Result<Option<Domain>> {
        if let Some(domain) = *self.domain.read() {
            return Ok(domain);
        }

        let options = self.options();
        let domain = compute_domain(
            self.rows(),
            self.value_key(),
            options.y_domain,
            options.shared_scale,
        )?;
        *self.domain.write() = Some(domain);
        Ok(domain)
    }

    /// Filtered, ordered facets with the shared domain
    pub fn layout(&self) -> Result<TrellisLayout<'_, T>> {
        let index = self.facet_index()?;
        let domain = self.domain()?;
        let sort = self.sort();
        let query = self.query();

        let layout = arrange(self.rows(), &index, self.value_key(), &sort, &query, domain)?;

        self.event_bus.publish(LayoutComputed {
            visible: layout.counts.visible,
            total: layout.counts.total,
            domain: layout.domain,
        });

        Ok(layout)
    }

    fn value_key(&self) -> Option<&dyn ValueKey<T>> {
        self.value_key
            .as_deref()
            .map(|key| key as &dyn ValueKey<T>)
    }

    fn invalidate_index(&self) {
        tracing::debug!("Facet grouping invalidated");
        *self.index.write() = None;
    }

    fn invalidate_domain(&self) {
        tracing::debug!("Shared domain invalidated");
        *self.domain.write() = None;
    }
}

impl<T: Clone + Send + Sync + 'static> TrellisState<T> {
    /// Publish a click on `label` with its subset.
    ///
    /// Returns `false` without publishing when no facet has that label.
    pub fn click(&self, label: &str) -> Result<bool> {
        let index = self.facet_index()?;
        let Some(facet) = index.facet(self.rows(), label) else {
            tracing::warn!("Click on unknown facet '{}'", label);
            return Ok(false);
        };

        self.event_bus.publish(FacetClicked {
            label: facet.label,
            rows: facet.rows.into_iter().cloned().collect(),
        });
        Ok(true)
    }
}
