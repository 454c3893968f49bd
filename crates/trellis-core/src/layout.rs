//! One-shot trellis layout: group, filter, sort and scale in a single call

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accessor::{FacetKey, ValueKey};
use crate::domain::{compute_domain, Domain};
use crate::error::Result;
use crate::facet::{Facet, FacetIndex};
use crate::sort::{filter_facets, sort_facets, SortSpec};

/// Display options that are not part of the sort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Search query matched against facet labels
    pub query: String,
    /// Scale every chart to the same domain
    pub shared_scale: bool,
    /// Fixed domain, bypasses the computed one
    pub y_domain: Option<Domain>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            shared_scale: true,
            y_domain: None,
        }
    }
}

/// Visible and total facet counts, rendered as `"visible / total"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacetCounts {
    pub visible: usize,
    pub total: usize,
}

impl fmt::Display for FacetCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.visible, self.total)
    }
}

/// Ordered facets ready for a presentation layer
#[derive(Debug)]
pub struct TrellisLayout<'a, T> {
    pub facets: Vec<Facet<'a, T>>,
    pub domain: Option<Domain>,
    pub counts: FacetCounts,
}

impl<'a, T> TrellisLayout<'a, T> {
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.facets.iter().map(|f| f.label.as_str())
    }
}

/// Group `rows`, filter by the query, order by `sort`, and attach the
/// shared domain computed over all of `rows`
pub fn layout<'a, T>(
    rows: &'a [T],
    facet_key: &dyn FacetKey<T>,
    value_key: Option<&dyn ValueKey<T>>,
    sort: &SortSpec<T>,
    options: &LayoutOptions,
) -> Result<TrellisLayout<'a, T>> {
    let index = FacetIndex::build(rows, facet_key)?;
    let domain = compute_domain(rows, value_key, options.y_domain, options.shared_scale)?;
    arrange(rows, &index, value_key, sort, &options.query, domain)
}

/// Filter and order an existing grouping
pub(crate) fn arrange<'a, T>(
    rows: &'a [T],
    index: &FacetIndex,
    value_key: Option<&dyn ValueKey<T>>,
    sort: &SortSpec<T>,
    query: &str,
    domain: Option<Domain>,
) -> Result<TrellisLayout<'a, T>> {
    let total = index.len();
    let filtered = filter_facets(index.facets(rows), query);
    let facets = sort_facets(filtered, sort, value_key)?;

    let counts = FacetCounts {
        visible: facets.len(),
        total,
    };
    tracing::debug!("Trellis layout: {} facets, domain {:?}", counts, domain);

    Ok(TrellisLayout {
        facets,
        domain,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricKind;
    use crate::sort::SortDirection;
    use crate::accessor::{FieldValue, KeyAccessor, ValueAccessor};
    use crate::error::TrellisError;
    use std::collections::BTreeMap;

    struct Sale {
        region: &'static str,
        category: &'static str,
        value: f64,
    }

    fn mock_data() -> Vec<Sale> {
        vec![
            Sale { region: "A", category: "X", value: 10.0 },
            Sale { region: "A", category: "Y", value: 20.0 },
            Sale { region: "B", category: "X", value: 30.0 },
            Sale { region: "B", category: "Y", value: 40.0 },
        ]
    }

    fn region(s: &Sale) -> String {
        s.region.to_string()
    }

    fn value(s: &Sale) -> f64 {
        s.value
    }

    #[test]
    fn test_renders_one_facet_per_region() {
        let rows = mock_data();
        let out = layout(&rows, &region, None, &SortSpec::default(), &LayoutOptions::default()).unwrap();
        assert_eq!(out.labels().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(out.domain, None);
        assert_eq!(out.counts.to_string(), "2 / 2");
    }

    #[test]
    fn test_shared_scale() {
        let rows = mock_data();
        let out = layout(&rows, &region, Some(&value), &SortSpec::default(), &LayoutOptions::default()).unwrap();
        assert_eq!(out.domain, Some(Domain::new(0.0, 40.0)));
    }

    #[test]
    fn test_sum_desc() {
        let rows = mock_data();
        let sort = SortSpec::metric(MetricKind::Sum, SortDirection::Desc);
        let out = layout(&rows, &region, Some(&value), &sort, &LayoutOptions::default()).unwrap();
        assert_eq!(out.labels().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn test_query_filters_but_domain_is_stable() {
        let rows = mock_data();
        let unfiltered = layout(&rows, &region, Some(&value), &SortSpec::default(), &LayoutOptions::default()).unwrap();

        let options = LayoutOptions {
            query: "a".to_string(),
            ..LayoutOptions::default()
        };
        let filtered = layout(&rows, &region, Some(&value), &SortSpec::default(), &options).unwrap();

        assert_eq!(filtered.labels().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(filtered.counts, FacetCounts { visible: 1, total: 2 });
        assert_eq!(filtered.domain, unfiltered.domain);
        // the surviving facet keeps all of its rows
        assert_eq!(filtered.facets[0].len(), 2);
    }

    #[test]
    fn test_composite_labels() {
        let rows = mock_data();
        let key = |s: &Sale| format!("{} • {}", s.region, s.category);
        let out = layout(&rows, &key, Some(&value), &SortSpec::default(), &LayoutOptions::default()).unwrap();
        assert_eq!(out.counts.total, 4);
        assert!(out.facets.iter().all(|f| f.len() == 1));
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<Sale> = Vec::new();
        let out = layout(&rows, &region, Some(&value), &SortSpec::default(), &LayoutOptions::default()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.domain, None);
        assert_eq!(out.counts, FacetCounts::default());
    }

    #[test]
    fn test_unmatched_query_yields_empty_layout() {
        let rows = mock_data();
        let options = LayoutOptions {
            query: "nothing".to_string(),
            ..LayoutOptions::default()
        };
        let out = layout(&rows, &region, Some(&value), &SortSpec::default(), &options).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.counts.total, 2);
    }

    type Row = BTreeMap<String, FieldValue>;

    fn row(region: &str, revenue: f64) -> Row {
        let mut row = Row::new();
        row.insert("region".to_string(), region.into());
        row.insert("revenue".to_string(), revenue.into());
        row
    }

    /// Revenue that cannot be read for region B
    fn corrupt_revenue() -> ValueAccessor<Row> {
        ValueAccessor::try_func(|row: &Row| {
            if row.get("region") == Some(&FieldValue::from("B")) {
                return Err(TrellisError::accessor("corrupt revenue"));
            }
            Ok(row.get("revenue").map(FieldValue::to_number).unwrap_or(f64::NAN))
        })
    }

    #[test]
    fn test_value_accessor_failure_propagates() {
        let rows = vec![row("A", 10.0), row("B", 20.0)];
        let facet_key = KeyAccessor::field("region");
        let revenue = corrupt_revenue();

        let err = layout(&rows, &facet_key, Some(&revenue), &SortSpec::default(), &LayoutOptions::default())
            .unwrap_err();
        assert_eq!(err, TrellisError::Accessor("corrupt revenue".to_string()));

        let independent = LayoutOptions {
            shared_scale: false,
            ..LayoutOptions::default()
        };
        let sort = SortSpec::metric(MetricKind::Mean, SortDirection::Asc);
        let err = layout(&rows, &facet_key, Some(&revenue), &sort, &independent).unwrap_err();
        assert_eq!(err, TrellisError::Accessor("corrupt revenue".to_string()));
    }
}
