//! Core types shared by the client, the configuration file and callers
//!
//! [`ProviderConfig`] describes one routing-service endpoint and its
//! credentials. [`QueryParams`] holds the query string of a single request.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Public openrouteservice origin; requests to it always need a key
pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";

/// Default overall request budget, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for one routing-service provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique human identifier
    pub name: String,

    /// Origin to which all request paths are appended
    pub base_url: String,

    /// API key; empty for self-hosted instances without auth
    #[serde(default)]
    pub key: String,

    /// Overall wall-clock budget in seconds across all retries of one request
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Logical quota variable name -> response header name
    #[serde(default, rename = "ENV_VARS", alias = "env_vars")]
    pub env_vars: BTreeMap<String, String>,

    /// Self-imposed ceiling on requests per rolling minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_per_minute: Option<u32>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderConfig {
    /// Create a provider with the default timeout and no quota headers
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            key: key.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
            env_vars: BTreeMap::new(),
            queries_per_minute: None,
        }
    }

    /// The public openrouteservice provider with its quota headers
    pub fn openrouteservice(key: impl Into<String>) -> Self {
        Self::new("openrouteservice", DEFAULT_BASE_URL, key)
            .with_env_var("ORS_QUOTA", "X-Ratelimit-Limit")
            .with_env_var("ORS_REMAINING", "X-Ratelimit-Remaining")
    }

    /// Set the overall timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Mirror a response header into the quota state under `name`
    pub fn with_env_var(mut self, name: impl Into<String>, header: impl Into<String>) -> Self {
        self.env_vars.insert(name.into(), header.into());
        self
    }

    /// Limit the number of requests sent per rolling minute
    pub fn with_queries_per_minute(mut self, limit: u32) -> Self {
        self.queries_per_minute = Some(limit);
        self
    }

    /// The timeout as a [`Duration`]
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Whether this provider targets the public default origin
    pub fn is_default_origin(&self) -> bool {
        self.base_url.trim_end_matches('/') == DEFAULT_BASE_URL
    }
}

/// A single query-string value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Rendered as its elements joined with `,`
    List(Vec<QueryValue>),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(s) => write!(f, "{}", s),
            QueryValue::Integer(i) => write!(f, "{}", i),
            QueryValue::Float(x) => write!(f, "{}", x),
            QueryValue::Bool(b) => write!(f, "{}", b),
            QueryValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Integer(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Integer(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Query parameters of one request
///
/// A *mapping* replaces values on repeated keys and is sorted by key when
/// encoded, so the resulting URL does not depend on insertion order. An
/// *ordered* sequence is encoded exactly as given.
///
/// A mapping serializes as an object, an ordered sequence as an array of
/// `[key, value]` pairs, so both forms survive a round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, QueryValue)>,
    ordered: bool,
}

impl QueryParams {
    /// An empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence of pairs encoded in the given order
    pub fn ordered<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ordered: true,
        }
    }

    /// Set `key` to `value`
    ///
    /// In a mapping an existing value for `key` is replaced; an ordered
    /// sequence appends.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        if !self.ordered {
            if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
                return;
            }
        }
        self.pairs.push((key, value));
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether this is an ordered sequence rather than a mapping
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Pairs in encoding order: sorted by key for a mapping, as given otherwise
    pub fn encoding_pairs(&self) -> Vec<(&str, String)> {
        let mut pairs: Vec<(&str, String)> = self
            .pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect();
        if !self.ordered {
            pairs.sort_by(|a, b| a.0.cmp(b.0));
        }
        pairs
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<V: Into<QueryValue>> From<HashMap<String, V>> for QueryParams {
    fn from(map: HashMap<String, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<V: Into<QueryValue>> From<BTreeMap<String, V>> for QueryParams {
    fn from(map: BTreeMap<String, V>) -> Self {
        map.into_iter().collect()
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.ordered {
            serializer.collect_seq(&self.pairs)
        } else {
            let sorted: BTreeMap<&str, &QueryValue> = self.pairs.iter().map(|(k, v)| (k.as_str(), v)).collect();
            serializer.collect_map(sorted)
        }
    }
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Mapping(BTreeMap<String, QueryValue>),
            Ordered(Vec<(String, QueryValue)>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Mapping(map) => map.into(),
            Repr::Ordered(pairs) => QueryParams::ordered(pairs),
        })
    }
}
