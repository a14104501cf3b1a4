//! Data models for the dashboard feed.
//!
//! The template and composite documents are kept as untyped JSON objects:
//! callers may store arbitrary fields in the template, and everything the
//! aggregator does not touch must round-trip unchanged.

use serde::Serialize;
use serde_json::{Map, Value};

/// Top-level key of the KPI tree inside the template.
pub const KPIS_KEY: &str = "kpis";

/// Top-level key the news analysis result is attached under.
pub const NEWS_ANALYSIS_KEY: &str = "news_analysis";

/// Top-level key the customer analysis result is attached under.
pub const CUSTOMER_INSIGHTS_KEY: &str = "customer_insights";

/// The base configuration document, loaded fresh for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    fields: Map<String, Value>,
}

impl Template {
    /// Wrap a JSON object. Returns `None` for any other JSON value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Look up a KPI entry by category and metric name.
    ///
    /// Only entries that are JSON objects count as present.
    pub fn kpi(&self, category: &str, metric: &str) -> Option<&Map<String, Value>> {
        self.fields
            .get(KPIS_KEY)?
            .get(category)?
            .get(metric)?
            .as_object()
    }

    /// Mutable access to a KPI entry, with the same presence rule as [`Template::kpi`].
    pub fn kpi_mut(&mut self, category: &str, metric: &str) -> Option<&mut Map<String, Value>> {
        self.fields
            .get_mut(KPIS_KEY)?
            .get_mut(category)?
            .get_mut(metric)?
            .as_object_mut()
    }

    /// Set a top-level field, replacing any existing value.
    pub fn set_field(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Consume the template and return the underlying JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// The merged document returned to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Composite(pub Value);

impl Composite {
    /// Borrow the composite as a JSON value.
    #[cfg(test)]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
