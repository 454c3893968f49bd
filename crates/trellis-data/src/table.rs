//! Record view over a row of an Arrow record batch

use std::fmt;
use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use trellis_core::{FieldValue, Record};

/// One row of a shared record batch
#[derive(Clone)]
pub struct TableRow {
    batch: Arc<RecordBatch>,
    index: usize,
}

impl TableRow {
    pub fn new(batch: Arc<RecordBatch>, index: usize) -> Self {
        Self { batch, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// All fields of the row, in schema order
    pub fn values(&self) -> Vec<(String, FieldValue)> {
        self.batch
            .schema()
            .fields()
            .iter()
            .zip(self.batch.columns())
            .map(|(field, column)| (field.name().clone(), column_value(column.as_ref(), self.index)))
            .collect()
    }
}

impl Record for TableRow {
    fn field(&self, name: &str) -> Option<FieldValue> {
        let column = self.batch.column_by_name(name)?;
        Some(column_value(column.as_ref(), self.index))
    }
}

impl fmt::Debug for TableRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.values() {
            map.entry(&name, &value);
        }
        map.finish()
    }
}

impl PartialEq for TableRow {
    fn eq(&self, other: &Self) -> bool {
        self.values() == other.values()
    }
}

/// Split a batch into row views
pub fn rows_from_batch(batch: Arc<RecordBatch>) -> Vec<TableRow> {
    (0..batch.num_rows())
        .map(|index| TableRow::new(Arc::clone(&batch), index))
        .collect()
}

macro_rules! primitive_value {
    ($array:expr, $index:expr, $ty:ty, $variant:ident, $conv:ty) => {
        $array
            .as_any()
            .downcast_ref::<$ty>()
            .map(|a| FieldValue::$variant(a.value($index) as $conv))
    };
}

/// Read one cell as a field value
pub fn column_value(array: &dyn Array, index: usize) -> FieldValue {
    if index >= array.len() || array.is_null(index) {
        return FieldValue::Null;
    }

    let value = match array.data_type() {
        DataType::Utf8 => array
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| FieldValue::Text(a.value(index).to_string())),
        DataType::LargeUtf8 => array
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|a| FieldValue::Text(a.value(index).to_string())),
        DataType::Boolean => array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| FieldValue::Bool(a.value(index))),
        DataType::Int8 => primitive_value!(array, index, Int8Array, Int, i64),
        DataType::Int16 => primitive_value!(array, index, Int16Array, Int, i64),
        DataType::Int32 => primitive_value!(array, index, Int32Array, Int, i64),
        DataType::Int64 => primitive_value!(array, index, Int64Array, Int, i64),
        DataType::UInt8 => primitive_value!(array, index, UInt8Array, Int, i64),
        DataType::UInt16 => primitive_value!(array, index, UInt16Array, Int, i64),
        DataType::UInt32 => primitive_value!(array, index, UInt32Array, Int, i64),
        DataType::UInt64 => primitive_value!(array, index, UInt64Array, Float, f64),
        DataType::Float32 => primitive_value!(array, index, Float32Array, Float, f64),
        DataType::Float64 => primitive_value!(array, index, Float64Array, Float, f64),
        DataType::Date32 => array
            .as_any()
            .downcast_ref::<Date32Array>()
            .and_then(|a| a.value_as_date(index))
            .map(|d| FieldValue::Text(d.format("%Y-%m-%d").to_string())),
        DataType::Timestamp(TimeUnit::Millisecond, _) => array
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .and_then(|a| a.value_as_datetime(index))
            .map(|d| FieldValue::Text(d.format("%Y-%m-%dT%H:%M:%S").to_string())),
        _ => arrow::util::display::array_value_to_string(array, index)
            .ok()
            .map(FieldValue::Text),
    };

    value.unwrap_or(FieldValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};

    fn batch() -> Arc<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("region", DataType::Utf8, false),
            Field::new("units", DataType::Int64, true),
            Field::new("revenue", DataType::Float64, false),
            Field::new("date", DataType::Date32, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["A", "B"])),
            Arc::new(Int64Array::from(vec![Some(3), None])),
            Arc::new(Float64Array::from(vec![10.5, 20.0])),
            Arc::new(Date32Array::from(vec![19723, 19754])),
        ];
        Arc::new(RecordBatch::try_new(schema, columns).unwrap())
    }

    #[test]
    fn test_rows_read_fields() {
        let rows = rows_from_batch(batch());
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].field("region"), Some(FieldValue::Text("A".to_string())));
        assert_eq!(rows[0].field("units"), Some(FieldValue::Int(3)));
        assert_eq!(rows[1].field("units"), Some(FieldValue::Null));
        assert_eq!(rows[1].field("revenue"), Some(FieldValue::Float(20.0)));
        assert_eq!(rows[0].field("date"), Some(FieldValue::Text("2024-01-01".to_string())));
        assert_eq!(rows[0].field("missing"), None);
    }

    #[test]
    fn test_rows_work_with_field_accessors() {
        use trellis_core::{group, FacetKey, KeyAccessor, ValueAccessor, ValueKey};

        let rows = rows_from_batch(batch());
        let key = KeyAccessor::field("region");
        let value = ValueAccessor::field("revenue");

        assert_eq!(key.key_of(&rows[1]).unwrap(), "B");
        assert_eq!(value.value_of(&rows[0]).unwrap(), 10.5);
        assert_eq!(group(&rows, &key).unwrap().len(), 2);
    }
}
