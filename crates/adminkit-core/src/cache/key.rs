// ── Cache key derivation ──

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};

use adminkit_api::{FilterValue, Filters};

/// Opaque fingerprint of one paginated list query.
///
/// Two queries with identical components produce equal keys; filter
/// insertion order does not matter, filter value types do.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: Arc<str>,
    fingerprint: String,
}

impl CacheKey {
    /// The resource this key belongs to (used for invalidation).
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({}:{})", self.resource, self.fingerprint)
    }
}

/// Derive the cache key for a list query.
///
/// Pure and deterministic. Filters are sorted by name before being
/// fingerprinted; `deps` keep their order.
pub fn compute_key(
    resource: &str,
    page: u32,
    per_page: u32,
    search: &str,
    filters: &Filters,
    deps: &[Value],
) -> CacheKey {
    let sorted: BTreeMap<&str, Value> = filters
        .iter()
        .map(|(k, v)| (k.as_str(), fingerprint_value(v)))
        .collect();

    let fingerprint = json!({
        "page": page,
        "per_page": per_page,
        "search": search,
        "filters": sorted,
        "deps": deps,
    })
    .to_string();

    CacheKey {
        resource: Arc::from(resource),
        fingerprint,
    }
}

/// JSON has no NaN or infinity, so floats are tagged and kept as text.
fn fingerprint_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Float(f) => json!({ "float": f.to_string() }),
        other => json!(other),
    }
}
