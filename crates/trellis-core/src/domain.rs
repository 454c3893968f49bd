//! Shared value domain across all facets
//!
//! The domain is scanned over every row, never over the filtered subset, so
//! charts keep the same scale while the user searches.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accessor::ValueKey;
use crate::error::Result;

/// Inclusive numeric range shared by every chart in the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Position of `value` within the domain, 0.0 at `min` and 1.0 at `max`
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            0.0
        } else {
            (value - self.min) / span
        }
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.min, self.max]
    }
}

impl From<[f64; 2]> for Domain {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Domain> for [f64; 2] {
    fn from(domain: Domain) -> Self {
        domain.as_array()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Compute the shared domain.
///
/// Precedence: an explicit domain is returned as is; otherwise nothing is
/// computed unless shared scale is on and a value accessor exists. The floor
/// is pulled down to zero when every value is positive. Returns `None` when
/// no row yields a number.
pub fn compute_domain<T>(
    rows: &[T],
    value: Option<&dyn ValueKey<T>>,
    explicit: Option<Domain>,
    shared_scale: bool,
) -> Result<Option<Domain>> {
    if let Some(domain) = explicit {
        return Ok(Some(domain));
    }
    if !shared_scale {
        return Ok(None);
    }
    let Some(value) = value else {
        return Ok(None);
    };

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for row in rows {
        let v = value.value_of(row)?;
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }

    if min > max {
        // no rows, or only NaN values
        return Ok(None);
    }

    if min > 0.0 {
        min = 0.0;
    }

    Ok(Some(Domain::new(min, max)))
}
