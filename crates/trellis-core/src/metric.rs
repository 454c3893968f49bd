//! Scalar metrics over a facet's values, used to order facets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::accessor::ValueKey;
use crate::error::{Result, TrellisError};

/// Built-in metric kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Sum of values
    Sum,
    /// Largest value
    Max,
    /// Smallest value
    Min,
    /// Arithmetic mean
    Mean,
    /// Number of rows
    Count,
    /// Population standard deviation
    Deviation,
    /// Least-squares slope of value against position
    Trend,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::Sum,
        MetricKind::Max,
        MetricKind::Min,
        MetricKind::Mean,
        MetricKind::Count,
        MetricKind::Deviation,
        MetricKind::Trend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Sum => "sum",
            MetricKind::Max => "max",
            MetricKind::Min => "min",
            MetricKind::Mean => "mean",
            MetricKind::Count => "count",
            MetricKind::Deviation => "deviation",
            MetricKind::Trend => "trend",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TrellisError::UnknownSortType(name.to_string()))
    }
}

/// Compute `kind` over the values of `rows`.
///
/// NaN values are skipped. An empty value set yields zero. `Count` counts
/// rows, NaN or not.
pub fn calculate_metric<T, V>(rows: &[&T], value: &V, kind: MetricKind) -> Result<f64>
where
    V: ValueKey<T> + ?Sized,
{
    // (position in facet, value)
    let mut points = Vec::with_capacity(rows.len());
    for (idx, &row) in rows.iter().enumerate() {
        let v = value.value_of(row)?;
        if !v.is_nan() {
            points.push((idx as f64, v));
        }
    }

    let values: Vec<f64> = points.iter().map(|&(_, v)| v).collect();
    let metric = match kind {
        MetricKind::Count => rows.len() as f64,
        _ if values.is_empty() => 0.0,
        MetricKind::Sum => values.iter().sum::<f64>(),
        MetricKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        MetricKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        MetricKind::Mean => mean(&values),
        MetricKind::Deviation => std_dev(&values),
        MetricKind::Trend => slope(&points),
    };

    Ok(metric)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Simple linear regression slope of `y` over `x`
pub fn slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|&(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let (mut num, mut den) = (0.0, 0.0);
    for &(x, y) in points {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x).powi(2);
    }

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
