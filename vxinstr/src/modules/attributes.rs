//! String attributes attached to functions, parameters and call sites.
//!
//! Attributes are `key = value` pairs. Flag attributes carry an empty value.
//! Keys are kept sorted so printing a module is deterministic.
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Never inline this function.
pub const ATTR_NOINLINE: &str = "noinline";

/// Always inline this function into its callers.
pub const ATTR_ALWAYS_INLINE: &str = "alwaysinline";

/// Inline every call reachable from this function into it.
pub const ATTR_FLATTEN: &str = "flatten";

/// Namespace of back-end directives.
pub const FPGA_NAMESPACE: &str = "fpga.";

/// Set on functions that only exist to carry `fpga.*` directives.
pub const ATTR_PROPERTY_WRAPPER: &str = "fpga.propertywrapper";

/// Set on kernels once the HLS flow has identified them.
pub const ATTR_TOP_FUNC: &str = "fpga.top.func";

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttributeSet {
    entries: BTreeMap<String, String>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or overwrite `key` with `value`. Returns `true` if the set changed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.entries.insert(key.into(), value.clone()) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    /// Insert a flag attribute (empty value).
    pub fn insert_flag(&mut self, key: impl Into<String>) -> bool {
        self.insert(key, String::new())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over the attributes whose key starts with `prefix`.
    pub fn iter_prefixed<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }
}

impl std::fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if value.is_empty() {
                write!(f, "\"{}\"", key)?;
            } else {
                write!(f, "\"{}\"=\"{}\"", key, value)?;
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = AttributeSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}
