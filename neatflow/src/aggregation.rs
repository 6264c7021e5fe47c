use crate::NeatError;

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A named reduction over a list of values.
///
/// Used by network nodes to combine their weighted inputs,
/// and by populations to summarize member fitnesses.
/// Aggregations persist by name only (e.g. `"maxabs"`).
///
/// Every aggregation of an empty list is `0.0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Product,
    Min,
    Max,
    Mean,
    Median,
    // Largest absolute value.
    MaxAbs,
}

impl Aggregation {
    /// All registered aggregations.
    pub const ALL: [Aggregation; 7] = [
        Aggregation::Sum,
        Aggregation::Product,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Mean,
        Aggregation::Median,
        Aggregation::MaxAbs,
    ];

    /// Returns the aggregation's registry name.
    pub fn name(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Product => "product",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::MaxAbs => "maxabs",
        }
    }

    /// Reduces `values` to a single number.
    ///
    /// # Examples
    /// ```
    /// use neatflow::Aggregation;
    ///
    /// let values = [3.0, -7.0, 1.0, 5.0];
    /// assert_eq!(Aggregation::Sum.apply(&values), 2.0);
    /// assert_eq!(Aggregation::Max.apply(&values), 5.0);
    /// assert_eq!(Aggregation::MaxAbs.apply(&values), 7.0);
    /// assert_eq!(Aggregation::Median.apply(&values), 2.0);
    /// assert_eq!(Aggregation::Product.apply(&[]), 0.0);
    /// ```
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Product => values.iter().product(),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Median => median(values),
            Aggregation::MaxAbs => values.iter().fold(0.0, |m: f64, v| m.max(v.abs())),
        }
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Sum
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = NeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggregation::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| NeatError::configuration(format!("unknown aggregation `{}`", s)))
    }
}
