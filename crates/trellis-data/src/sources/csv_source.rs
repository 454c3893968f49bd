use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use csv::ReaderBuilder;

use crate::config::NullConfig;
use crate::{DataError, DataSource};

/// Rows sampled for type detection
const MAX_SAMPLE_ROWS: usize = 5000;

/// CSV file loaded fully into one record batch
pub struct CsvSource {
    path: PathBuf,
    schema: Arc<Schema>,
    batch: RecordBatch,
}

impl CsvSource {
    /// Read and type a CSV file
    pub async fn new(path: PathBuf, null_config: NullConfig) -> Result<Self, DataError> {
        let batch = tokio::task::spawn_blocking({
            let path = path.clone();
            move || Self::read_file(&path, &null_config)
        })
        .await??;

        tracing::debug!(
            "Read {} rows x {} columns from {}",
            batch.num_rows(),
            batch.num_columns(),
            path.display()
        );

        Ok(Self {
            path,
            schema: batch.schema(),
            batch,
        })
    }

    fn read_file(path: &Path, null_config: &NullConfig) -> Result<RecordBatch, DataError> {
        let file = File::open(path)?;
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BufReader::new(file));

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(DataError::SchemaDetection(format!(
                "{} has no header row",
                path.display()
            )));
        }

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }

        let sample = &rows[..rows.len().min(MAX_SAMPLE_ROWS)];
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| Field::new(name, detect_column_type(sample, idx, null_config), true))
            .collect::<Vec<_>>();
        let schema = Arc::new(Schema::new(fields));

        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| build_column(&rows, idx, field.data_type(), null_config))
            .collect::<Vec<_>>();

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

/// Detect column type from sample data
fn detect_column_type(samples: &[Vec<String>], col_idx: usize, null_config: &NullConfig) -> DataType {
    let mut is_int = true;
    let mut is_float = true;
    let mut is_bool = true;
    let mut seen = false;

    for value in samples.iter().filter_map(|row| row.get(col_idx)) {
        if null_config.is_null(value) {
            continue;
        }
        seen = true;
        let value = value.trim();

        if is_int && value.parse::<i64>().is_err() {
            is_int = false;
        }
        if is_float && value.parse::<f64>().is_err() {
            is_float = false;
        }
        if is_bool && parse_bool(value).is_none() {
            is_bool = false;
        }
    }

    if !seen {
        DataType::Utf8
    } else if is_int {
        DataType::Int64
    } else if is_float {
        DataType::Float64
    } else if is_bool {
        DataType::Boolean
    } else {
        DataType::Utf8
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn build_column(
    rows: &[Vec<String>],
    col_idx: usize,
    data_type: &DataType,
    null_config: &NullConfig,
) -> ArrayRef {
    let cells = rows.iter().map(|row| {
        row.get(col_idx)
            .filter(|value| !null_config.is_null(value))
            .map(|value| value.trim())
    });

    match data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(rows.len());
            for cell in cells {
                builder.append_option(cell.and_then(|v| v.parse::<i64>().ok()));
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(rows.len());
            for cell in cells {
                builder.append_option(cell.and_then(|v| v.parse::<f64>().ok()));
            }
            Arc::new(builder.finish())
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(rows.len());
            for cell in cells {
                builder.append_option(cell.and_then(parse_bool));
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                builder.append_option(cell);
            }
            Arc::new(builder.finish())
        }
    }
}

#[async_trait]
impl DataSource for CsvSource {
    async fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    async fn query_all(&self) -> Result<RecordBatch, DataError> {
        Ok(self.batch.clone())
    }

    async fn row_count(&self) -> Result<usize, DataError> {
        Ok(self.batch.num_rows())
    }

    fn source_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use trellis_core::{FieldValue, Record};

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_and_detect_types() {
        let file = write_csv(
            "region,units,revenue,active\n\
             North,3,10.5,true\n\
             South,N/A,20,no\n\
             East,7,,yes\n",
        );
        let source = CsvSource::new(file.path().to_path_buf(), NullConfig::default())
            .await
            .unwrap();

        let schema = source.schema().await;
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
        assert_eq!(schema.field(3).data_type(), &DataType::Boolean);
        assert_eq!(source.row_count().await.unwrap(), 3);

        let rows = source.load_rows().await.unwrap();
        assert_eq!(rows[1].field("units"), Some(FieldValue::Null));
        assert_eq!(rows[1].field("revenue"), Some(FieldValue::Float(20.0)));
        assert_eq!(rows[2].field("revenue"), Some(FieldValue::Null));
        assert_eq!(rows[2].field("active"), Some(FieldValue::Bool(true)));
    }

    #[tokio::test]
    async fn test_null_patterns_follow_config() {
        let file = write_csv("region,units\nNorth,-\nSouth,4\n");

        let strict = CsvSource::new(file.path().to_path_buf(), NullConfig::empty_only())
            .await
            .unwrap();
        assert_eq!(strict.schema().await.field(1).data_type(), &DataType::Utf8);

        let lenient = CsvSource::new(file.path().to_path_buf(), NullConfig::default())
            .await
            .unwrap();
        assert_eq!(lenient.schema().await.field(1).data_type(), &DataType::Int64);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = CsvSource::new(PathBuf::from("/nonexistent/sales.csv"), NullConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DataError::Io(_)));
    }
}
