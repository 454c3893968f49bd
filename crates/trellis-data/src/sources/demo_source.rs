//! Synthetic sales data for trying out a large trellis

use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{DataError, DataSource};

pub const DEMO_REGIONS: usize = 50;
pub const DEMO_CATEGORIES: usize = 20;
pub const DEMO_MONTHS: u32 = 12;

/// Monthly revenue per region and category, one chart per combination
pub struct SalesDemoSource {
    schema: SchemaRef,
    regions: usize,
    categories: usize,
}

impl SalesDemoSource {
    pub fn new() -> Self {
        Self::with_size(DEMO_REGIONS, DEMO_CATEGORIES)
    }

    /// Categories are lettered, so at most 26 are used
    pub fn with_size(regions: usize, categories: usize) -> Self {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("region", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("date", DataType::Date32, false),
            Field::new("revenue", DataType::Float64, false),
        ]));

        Self {
            schema,
            regions,
            categories: categories.min(26),
        }
    }

    pub fn region_name(index: usize) -> String {
        format!("Region {}", index + 1)
    }

    pub fn category_name(index: usize) -> String {
        format!("Category {}", (b'A' + index as u8) as char)
    }

    fn generate_batch(&self) -> Result<RecordBatch, DataError> {
        let months = (1..=DEMO_MONTHS)
            .filter_map(|month| NaiveDate::from_ymd_opt(2024, month, 1))
            .map(Date32Type::from_naive_date)
            .collect::<Vec<_>>();

        let capacity = self.regions * self.categories * months.len();
        let mut ids = Vec::with_capacity(capacity);
        let mut regions = Vec::with_capacity(capacity);
        let mut categories = Vec::with_capacity(capacity);
        let mut dates = Vec::with_capacity(capacity);
        let mut revenues = Vec::with_capacity(capacity);

        for r in 0..self.regions {
            let region = Self::region_name(r);
            for c in 0..self.categories {
                let category = Self::category_name(c);

                // Base level per chart
                let mut base = 1000.0 + pseudo_random((r * 31 + c) as f64) * 5000.0;
                if r == 0 {
                    base *= 3.0;
                }
                if c == 0 {
                    base *= 1.5;
                }

                for (i, &date) in months.iter().enumerate() {
                    let seasonal = (i as f64 / 2.0).sin() * 1000.0;
                    let seed = (r * 10_000 + c * 100 + i) as f64;
                    let noise = (pseudo_random(seed) - 0.5) * 500.0;

                    ids.push(format!("{}-{}-{}", region, category, i));
                    regions.push(region.clone());
                    categories.push(category.clone());
                    dates.push(date);
                    revenues.push((base + seasonal + noise).round().max(0.0));
                }
            }
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(regions)),
            Arc::new(StringArray::from(categories)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(Float64Array::from(revenues)),
        ];

        Ok(RecordBatch::try_new(self.schema.clone(), columns)?)
    }
}

impl Default for SalesDemoSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic value in [0, 1)
fn pseudo_random(seed: f64) -> f64 {
    ((seed * 12345.6789).sin() * 43758.5453).fract().abs()
}

#[async_trait]
impl DataSource for SalesDemoSource {
    async fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    async fn query_all(&self) -> Result<RecordBatch, DataError> {
        self.generate_batch()
    }

    async fn row_count(&self) -> Result<usize, DataError> {
        Ok(self.regions * self.categories * DEMO_MONTHS as usize)
    }

    fn source_name(&self) -> &str {
        "Sales Demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{group, KeyAccessor, Record, FieldValue};

    #[tokio::test]
    async fn test_demo_dimensions() {
        let source = SalesDemoSource::new();
        let batch = source.query_all().await.unwrap();

        assert_eq!(batch.num_rows(), 50 * 20 * 12);
        assert_eq!(source.row_count().await.unwrap(), batch.num_rows());
        assert_eq!(batch.num_columns(), 5);
    }

    #[tokio::test]
    async fn test_demo_rows_group_into_composite_facets() {
        let source = SalesDemoSource::with_size(3, 4);
        let rows = source.load_rows().await.unwrap();

        let key = KeyAccessor::composite(["region", "category"], " • ");
        let facets = group(&rows, &key).unwrap();

        assert_eq!(facets.len(), 12);
        assert_eq!(facets[0].label, "Region 1 • Category A");
        assert!(facets.iter().all(|f| f.len() == 12));

        assert_eq!(rows[0].field("date"), Some(FieldValue::Text("2024-01-01".to_string())));
        assert_eq!(rows[11].field("date"), Some(FieldValue::Text("2024-12-01".to_string())));
    }

    #[tokio::test]
    async fn test_demo_values_are_deterministic_and_non_negative() {
        let first = SalesDemoSource::with_size(2, 2).query_all().await.unwrap();
        let second = SalesDemoSource::with_size(2, 2).query_all().await.unwrap();
        assert_eq!(first, second);

        let revenue = first
            .column_by_name("revenue")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(revenue.values().iter().all(|v| *v >= 0.0 && v.fract() == 0.0));
    }

    #[test]
    fn test_names() {
        assert_eq!(SalesDemoSource::region_name(0), "Region 1");
        assert_eq!(SalesDemoSource::category_name(19), "Category T");
    }
}
