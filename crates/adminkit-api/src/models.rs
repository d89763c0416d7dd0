// Wire types for the list and background-job endpoints.
//
// List responses are kept loosely typed (`Record = serde_json::Value`)
// because every console screen lists a different resource shape; only
// the pagination envelope is interpreted here.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// One row of a paginated list. Opaque to the transport layer.
pub type Record = Value;

/// Extra list filters, in caller insertion order.
pub type Filters = IndexMap<String, FilterValue>;

// ── Filters ──────────────────────────────────────────────────────────

/// A scalar filter value.
///
/// The variant is significant: `Text("")` and `Null` are different
/// filters, and `Int(1)` differs from `Float(1.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Query-string rendering. `Null` filters are not sent.
    pub fn as_query_value(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_query_value() {
            Some(v) => f.write_str(&v),
            None => f.write_str("null"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ── List query / envelope ────────────────────────────────────────────

/// Parameters for one `GET {resource}` page request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: String,
    pub filters: Filters,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            search: String::new(),
            filters: Filters::new(),
        }
    }
}

impl ListQuery {
    /// Serialize into `page`, `per_page`, `search` and one pair per
    /// non-null filter, in that order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_owned(), self.page.to_string()),
            ("per_page".to_owned(), self.per_page.to_string()),
            ("search".to_owned(), self.search.clone()),
        ];
        pairs.extend(
            self.filters
                .iter()
                .filter_map(|(k, v)| v.as_query_value().map(|v| (k.clone(), v))),
        );
        pairs
    }
}

/// A parsed `{ data: [...], meta?: { total }, total? }` list response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEnvelope {
    pub items: Vec<Record>,
    pub total: u64,
    /// The full server envelope, untouched.
    pub raw: Value,
}

impl ListEnvelope {
    /// Interpret a raw list response.
    ///
    /// `data` must be an array. The total is read from `meta.total`, then
    /// `total`, and is 0 when both are absent or `data` is empty.
    pub fn from_value(raw: Value) -> Result<Self, Error> {
        let items = match raw.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                return Err(Error::Deserialization {
                    message: "list response has no `data` array".into(),
                    body: raw.to_string(),
                });
            }
        };

        let total = if items.is_empty() {
            0
        } else {
            raw.get("meta")
                .and_then(|m| m.get("total"))
                .and_then(Value::as_u64)
                .or_else(|| raw.get("total").and_then(Value::as_u64))
                .unwrap_or(0)
        };

        Ok(Self { items, total, raw })
    }
}

// ── Background jobs ──────────────────────────────────────────────────

/// Server-side state of a background job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    /// Any status this client does not know about; treated as in progress.
    #[serde(other)]
    Unknown,
}

/// Result counters reported by a finished job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fetched: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_emails: Option<u64>,
    /// Counters this client does not model explicitly.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Payload of `GET {job}/sync-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    /// `true` only when the reported status belongs to the latest run.
    #[serde(default)]
    pub is_recent: bool,
    #[serde(default)]
    pub stats: Option<JobStats>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// `{ data: T }` wrapper used by the job status endpoint.
#[derive(Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// Error body shape: `{ message }` and/or `{ errors: { field: [msg] } }`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<IndexMap<String, Vec<String>>>,
}

impl ErrorBody {
    /// Join every field message into one line, in field order.
    pub(crate) fn aggregate_errors(&self) -> Option<String> {
        let errors = self.errors.as_ref()?;
        let joined = errors
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}
