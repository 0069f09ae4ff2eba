//! Attribute sets select a sub-series within an instrument.
//!
//! Keys are kept ordered so that `[("b", ..), ("a", ..)]` and
//! `[("a", ..), ("b", ..)]` address the same sub-series and render identically.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Attribute key carrying the raw request path.
pub const PATH_KEY: &str = "path";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<String, String>);

impl AttributeSet {
    /// Empty set (the single unlabelled sub-series).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from borrowed pairs. A repeated key keeps the last value.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// `{path=<path>}`, taken verbatim.
    pub fn path(path: &str) -> Self {
        Self::from_pairs(&[(PATH_KEY, path)])
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}=\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
