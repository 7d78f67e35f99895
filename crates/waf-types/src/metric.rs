//! CloudWatch metric names accepted by WAF.

use crate::TypeError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static METRIC_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z]+$").expect("metric name pattern is valid")
});

/// Validated WAF metric name.
///
/// WAF only accepts non-empty, purely alphanumeric metric names; whitespace
/// and punctuation are rejected by the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricName(String);

impl MetricName {
    /// Validates and wraps a metric name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if METRIC_NAME_RE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(TypeError::InvalidMetricName(name))
        }
    }

    /// Returns the metric name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MetricName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MetricName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MetricName> for String {
    fn from(name: MetricName) -> Self {
        name.0
    }
}
