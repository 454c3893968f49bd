//! Facet grouping
//!
//! Splits a flat row set into labelled subsets. Buckets are created lazily in
//! first-seen order and each bucket keeps its rows in input order.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::accessor::FacetKey;
use crate::error::Result;

/// A labelled subset of rows
#[derive(Debug)]
pub struct Facet<'a, T> {
    pub label: String,
    pub rows: Vec<&'a T>,
}

impl<'a, T> Facet<'a, T> {
    pub fn new(label: impl Into<String>, rows: Vec<&'a T>) -> Self {
        Self {
            label: label.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> Clone for Facet<'_, T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            rows: self.rows.clone(),
        }
    }
}

/// Owned result of grouping: label to row positions, in first-seen order.
///
/// Holds indices rather than references so it can be cached independently
/// of the borrow on the rows it was built from.
#[derive(Debug, Clone, Default)]
pub struct FacetIndex {
    buckets: IndexMap<String, Vec<usize>, RandomState>,
    row_count: usize,
}

impl FacetIndex {
    /// Group `rows` by `key`, failing on the first accessor error
    pub fn build<T, K>(rows: &[T], key: &K) -> Result<Self>
    where
        K: FacetKey<T> + ?Sized,
    {
        let mut buckets: IndexMap<String, Vec<usize>, RandomState> =
            IndexMap::with_hasher(RandomState::new());

        for (idx, row) in rows.iter().enumerate() {
            let label = key.key_of(row)?;
            buckets.entry(label).or_default().push(idx);
        }

        tracing::debug!("Grouped {} rows into {} facets", rows.len(), buckets.len());

        Ok(Self {
            buckets,
            row_count: rows.len(),
        })
    }

    /// Number of facets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of rows the index was built from
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Row positions of one facet
    pub fn indices(&self, label: &str) -> Option<&[usize]> {
        self.buckets.get(label).map(Vec::as_slice)
    }

    /// Resolve one facet against the rows the index was built from
    pub fn facet<'a, T>(&self, rows: &'a [T], label: &str) -> Option<Facet<'a, T>> {
        let (label, indices) = self.buckets.get_key_value(label)?;
        Some(Facet::new(label.clone(), resolve(rows, indices)))
    }

    /// Resolve every facet against the rows the index was built from
    pub fn facets<'a, T>(&self, rows: &'a [T]) -> Vec<Facet<'a, T>> {
        self.buckets
            .iter()
            .map(|(label, indices)| Facet::new(label.clone(), resolve(rows, indices)))
            .collect()
    }
}

fn resolve<'a, T>(rows: &'a [T], indices: &[usize]) -> Vec<&'a T> {
    indices.iter().filter_map(|&idx| rows.get(idx)).collect()
}

/// Group rows into facets keyed by `key`
pub fn group<'a, T, K>(rows: &'a [T], key: &K) -> Result<Vec<Facet<'a, T>>>
where
    K: FacetKey<T> + ?Sized,
{
    Ok(FacetIndex::build(rows, key)?.facets(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrellisError;
    use crate::KeyAccessor;
    use crate::accessor::FieldValue;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq)]
    struct Sale {
        region: &'static str,
        value: f64,
    }

    fn sales() -> Vec<Sale> {
        vec![
            Sale { region: "B", value: 1.0 },
            Sale { region: "A", value: 2.0 },
            Sale { region: "B", value: 3.0 },
            Sale { region: "C", value: 4.0 },
            Sale { region: "A", value: 5.0 },
        ]
    }

    #[test]
    fn test_group_first_seen_order() {
        let rows = sales();
        let facets = group(&rows, &|s: &Sale| s.region.to_string()).unwrap();
        let labels: Vec<_> = facets.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_every_row_in_exactly_one_facet() {
        let rows = sales();
        let facets = group(&rows, &|s: &Sale| s.region.to_string()).unwrap();

        let total: usize = facets.iter().map(Facet::len).sum();
        assert_eq!(total, rows.len());

        for facet in &facets {
            assert!(facet.rows.iter().all(|s| s.region == facet.label));
        }
    }

    #[test]
    fn test_subset_keeps_input_order() {
        let rows = sales();
        let facets = group(&rows, &|s: &Sale| s.region.to_string()).unwrap();
        let b: Vec<f64> = facets[0].rows.iter().map(|s| s.value).collect();
        let a: Vec<f64> = facets[1].rows.iter().map(|s| s.value).collect();
        assert_eq!(b, vec![1.0, 3.0]);
        assert_eq!(a, vec![2.0, 5.0]);
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<Sale> = Vec::new();
        let facets = group(&rows, &|s: &Sale| s.region.to_string()).unwrap();
        assert!(facets.is_empty());
    }

    struct RejectRegion(&'static str);

    impl FacetKey<Sale> for RejectRegion {
        fn key_of(&self, row: &Sale) -> Result<String> {
            if row.region == self.0 {
                Err(TrellisError::accessor(format!("no label for {}", row.region)))
            } else {
                Ok(row.region.to_string())
            }
        }
    }

    #[test]
    fn test_accessor_failure_propagates() {
        let rows = sales();
        let err = group(&rows, &RejectRegion("C")).unwrap_err();
        assert_eq!(err, TrellisError::Accessor("no label for C".to_string()));
    }

    #[test]
    fn test_field_name_grouping() {
        use crate::FieldValue;
        use std::collections::BTreeMap;

        let rows: Vec<BTreeMap<String, FieldValue>> = ["x", "y", "x"]
            .iter()
            .map(|k| {
                let mut r = BTreeMap::new();
                r.insert("kind".to_string(), FieldValue::from(*k));
                r
            })
            .collect();
        let facets = group(&rows, &KeyAccessor::field("kind")).unwrap();
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].len(), 2);
    }

    #[test]
    fn test_index_resolves_single_facet() {
        let rows = sales();
        let index = FacetIndex::build(&rows, &|s: &Sale| s.region.to_string()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.row_count(), 5);
        assert_eq!(index.indices("A"), Some(&[1usize, 4][..]));

        let c = index.facet(&rows, "C").unwrap();
        assert_eq!(c.rows, vec![&rows[3]]);
        assert!(index.facet(&rows, "Z").is_none());
    }

    #[test]
    fn test_key_accessor_failure_propagates() {
        let mut row = BTreeMap::new();
        row.insert("region".to_string(), FieldValue::Null);
        let rows = vec![row];

        let key = KeyAccessor::try_func(|row: &BTreeMap<String, FieldValue>| match row.get("region") {
            Some(FieldValue::Null) | None => Err(TrellisError::accessor("region is empty")),
            Some(value) => Ok(value.to_label()),
        });
        let err = group(&rows, &key).unwrap_err();
        assert_eq!(err, TrellisError::Accessor("region is empty".to_string()));
    }
}
