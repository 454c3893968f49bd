//! Trellis configuration file

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trellis_core::{
    Domain, KeyAccessor, LayoutOptions, SortDirection, SortSpec, SortType, ValueAccessor,
    DEFAULT_FACET_SEPARATOR,
};

use super::null_handling::NullConfig;
use crate::DataError;

/// Everything needed to lay out a trellis from a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    /// Columns whose values form the facet label
    pub facet_columns: Vec<String>,

    /// Separator between the parts of a composite label
    pub facet_separator: String,

    /// Numeric column used for metrics and the shared domain
    pub value_column: Option<String>,

    /// `default` or a metric name
    pub sort_by: String,

    /// Metric sort direction
    pub direction: SortDirection,

    /// Initial search query
    pub query: String,

    /// Scale all charts to one domain
    pub shared_scale: bool,

    /// Fixed domain, overrides the computed one
    pub y_domain: Option<Domain>,

    /// Quiet period before a typed query applies
    pub debounce_ms: u64,

    /// Minimum chart width, decides how many charts fit in a row
    pub min_chart_width: u32,

    /// Chart height
    pub chart_height: u32,

    /// Null handling for CSV input
    pub null_config: NullConfig,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            facet_columns: Vec::new(),
            facet_separator: DEFAULT_FACET_SEPARATOR.to_string(),
            value_column: None,
            sort_by: "default".to_string(),
            direction: SortDirection::Asc,
            query: String::new(),
            shared_scale: true,
            y_domain: None,
            debounce_ms: 300,
            min_chart_width: 300,
            chart_height: 200,
            null_config: NullConfig::default(),
        }
    }
}

impl TrellisConfig {
    /// Load and validate a JSON configuration file
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let reader = BufReader::new(File::open(path)?);
        let config: TrellisConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        tracing::info!("Loaded trellis config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON configuration string
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let config: TrellisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), DataError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), DataError> {
        SortType::<()>::parse(&self.sort_by)?;

        if let Some(domain) = self.y_domain {
            if domain.min.is_nan() || domain.max.is_nan() || domain.min > domain.max {
                return Err(DataError::Config(format!("Invalid y_domain {}", domain)));
            }
        }

        if self.min_chart_width == 0 || self.chart_height == 0 {
            return Err(DataError::Config("Chart size must be non-zero".to_string()));
        }

        Ok(())
    }

    /// Facet accessor over the configured columns
    pub fn facet_key<T>(&self) -> Result<KeyAccessor<T>, DataError> {
        if self.facet_columns.is_empty() {
            return Err(DataError::Config("No facet column configured".to_string()));
        }
        Ok(KeyAccessor::composite(
            self.facet_columns.iter().cloned(),
            self.facet_separator.clone(),
        ))
    }

    /// Value accessor, if a value column is configured
    pub fn value_key<T>(&self) -> Option<ValueAccessor<T>> {
        self.value_column.as_ref().map(ValueAccessor::field)
    }

    pub fn sort_spec<T>(&self) -> Result<SortSpec<T>, DataError> {
        Ok(SortSpec::new(SortType::parse(&self.sort_by)?, self.direction))
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            query: self.query.clone(),
            shared_scale: self.shared_scale,
            y_domain: self.y_domain,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{MetricKind, TrellisError};

    #[test]
    fn test_defaults_from_empty_object() {
        let config = TrellisConfig::from_json("{}").unwrap();
        assert_eq!(config, TrellisConfig::default());
        assert!(config.shared_scale);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.facet_separator, " • ");
    }

    #[test]
    fn test_full_config() {
        let config = TrellisConfig::from_json(
            r#"{
                "facet_columns": ["region", "category"],
                "value_column": "revenue",
                "sort_by": "sum",
                "direction": "desc",
                "y_domain": [0, 1000],
                "shared_scale": false
            }"#,
        )
        .unwrap();

        let sort = config.sort_spec::<()>().unwrap();
        assert!(matches!(sort.kind, SortType::Metric(MetricKind::Sum)));
        assert_eq!(sort.direction, SortDirection::Desc);
        assert_eq!(config.y_domain, Some(Domain::new(0.0, 1000.0)));
        assert!(matches!(config.facet_key::<()>().unwrap(), KeyAccessor::Composite { .. }));
        assert!(config.value_key::<()>().is_some());

        let options = config.layout_options();
        assert!(!options.shared_scale);
    }

    #[test]
    fn test_unknown_sort_is_rejected() {
        let err = TrellisConfig::from_json(r#"{ "sort_by": "median" }"#).unwrap_err();
        assert!(matches!(
            err,
            DataError::Trellis(TrellisError::UnknownSortType(ref name)) if name == "median"
        ));
    }

    #[test]
    fn test_inverted_domain_is_rejected() {
        let err = TrellisConfig::from_json(r#"{ "y_domain": [10, 0] }"#).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[test]
    fn test_missing_facet_column() {
        let config = TrellisConfig::default();
        assert!(config.facet_key::<()>().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.json");

        let config = TrellisConfig {
            facet_columns: vec!["region".to_string()],
            value_column: Some("revenue".to_string()),
            sort_by: "trend".to_string(),
            ..TrellisConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(TrellisConfig::from_path(&path).unwrap(), config);
    }
}
