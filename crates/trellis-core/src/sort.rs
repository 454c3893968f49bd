//! Search filtering and metric-based ordering of facets

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::accessor::ValueKey;
use crate::error::{Result, TrellisError};
use crate::facet::Facet;
use crate::metric::{calculate_metric, MetricKind};

/// Sort direction for metric ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(TrellisError::UnknownSortType(other.to_string())),
        }
    }
}

type CustomMetric<T> = Arc<dyn Fn(&[&T]) -> f64 + Send + Sync>;

/// What facets are ordered by
pub enum SortType<T> {
    /// Label order; the direction is ignored
    Default,
    /// A built-in metric over the value accessor
    Metric(MetricKind),
    /// A caller-supplied metric over the whole subset
    Custom(CustomMetric<T>),
}

impl<T> SortType<T> {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[&T]) -> f64 + Send + Sync + 'static,
    {
        SortType::Custom(Arc::new(f))
    }

    /// Parse `"default"` or a metric name
    pub fn parse(name: &str) -> Result<Self> {
        if name.trim().eq_ignore_ascii_case("default") {
            return Ok(SortType::Default);
        }
        Ok(SortType::Metric(name.parse()?))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, SortType::Default)
    }
}

impl<T> Clone for SortType<T> {
    fn clone(&self) -> Self {
        match self {
            SortType::Default => SortType::Default,
            SortType::Metric(kind) => SortType::Metric(*kind),
            SortType::Custom(f) => SortType::Custom(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for SortType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortType::Default => f.write_str("Default"),
            SortType::Metric(kind) => f.debug_tuple("Metric").field(kind).finish(),
            SortType::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Sort type plus direction
pub struct SortSpec<T> {
    pub kind: SortType<T>,
    pub direction: SortDirection,
}

impl<T> SortSpec<T> {
    pub fn new(kind: SortType<T>, direction: SortDirection) -> Self {
        Self { kind, direction }
    }

    pub fn metric(kind: MetricKind, direction: SortDirection) -> Self {
        Self::new(SortType::Metric(kind), direction)
    }

    pub fn custom<F>(f: F, direction: SortDirection) -> Self
    where
        F: Fn(&[&T]) -> f64 + Send + Sync + 'static,
    {
        Self::new(SortType::custom(f), direction)
    }
}

impl<T> Default for SortSpec<T> {
    fn default() -> Self {
        Self::new(SortType::Default, SortDirection::Asc)
    }
}

impl<T> Clone for SortSpec<T> {
    fn clone(&self) -> Self {
        Self::new(self.kind.clone(), self.direction)
    }
}

impl<T> fmt::Debug for SortSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortSpec")
            .field("kind", &self.kind)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Case-insensitive substring match of `query` in `label`
pub fn matches_query(label: &str, query: &str) -> bool {
    query.is_empty() || label.to_lowercase().contains(&query.to_lowercase())
}

/// Keep only facets whose label matches `query`; rows are untouched
pub fn filter_facets<'a, T>(facets: Vec<Facet<'a, T>>, query: &str) -> Vec<Facet<'a, T>> {
    if query.is_empty() {
        return facets;
    }
    let needle = query.to_lowercase();
    facets
        .into_iter()
        .filter(|facet| facet.label.to_lowercase().contains(&needle))
        .collect()
}

/// Order facets according to `spec`.
///
/// The sort is stable. Named metrics without a value accessor score zero for
/// every facet, which leaves the input order in place.
pub fn sort_facets<'a, T>(
    mut facets: Vec<Facet<'a, T>>,
    spec: &SortSpec<T>,
    value: Option<&dyn ValueKey<T>>,
) -> Result<Vec<Facet<'a, T>>> {
    if let SortType::Default = spec.kind {
        facets.sort_by(|a, b| compare_labels(&a.label, &b.label));
        return Ok(facets);
    }

    if let (SortType::Metric(kind), None) = (&spec.kind, value) {
        tracing::warn!("Sorting by {} without a value accessor, keeping input order", kind);
    }

    let mut scored = Vec::with_capacity(facets.len());
    for facet in facets {
        let metric = match (&spec.kind, value) {
            (SortType::Custom(f), _) => f(&facet.rows),
            (SortType::Metric(kind), Some(value)) => calculate_metric(&facet.rows, value, *kind)?,
            _ => 0.0,
        };
        scored.push((metric, facet));
    }

    scored.sort_by(|(a, _), (b, _)| compare_metrics(*a, *b, spec.direction));
    Ok(scored.into_iter().map(|(_, facet)| facet).collect())
}

/// Numeric order by direction, with NaN placed last either way
fn compare_metrics(a: f64, b: f64, direction: SortDirection) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Locale-style label comparison.
///
/// Levels are compared in turn: base letters with accents and case removed,
/// then accents (unaccented first), then case (lowercase first), then code
/// points.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded_nfd(a).cmp(folded_nfd(b)))
        .then_with(|| compare_case(a, b))
        .then_with(|| a.cmp(b))
}

fn base_letters(label: &str) -> impl Iterator<Item = char> + '_ {
    folded_nfd(label).filter(|c| !is_combining_mark(*c))
}

fn folded_nfd(label: &str) -> impl Iterator<Item = char> + '_ {
    label.nfd().flat_map(char::to_lowercase)
}

fn compare_case(a: &str, b: &str) -> Ordering {
    for (x, y) in a.nfd().zip(b.nfd()) {
        if x == y {
            continue;
        }
        match (x.is_lowercase(), y.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    Ordering::Equal
}
