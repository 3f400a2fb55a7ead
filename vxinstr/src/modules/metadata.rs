//! Metadata records attached to modules and functions.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single typed constant inside a metadata node.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetadataValue {
    Int { bits: u32, value: u64 },
    Str(String),
}

impl MetadataValue {
    pub fn i32(value: u32) -> Self {
        MetadataValue::Int {
            bits: 32,
            value: value as u64,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            MetadataValue::Int { value, .. } => Some(*value),
            MetadataValue::Str(_) => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Int { bits, value } => write!(f, "i{} {}", bits, value),
            MetadataValue::Str(s) => write!(f, "!\"{}\"", s),
        }
    }
}

/// Ordered list of metadata values, e.g. a version pair or a work-group size triple.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetadataNode(pub Vec<MetadataValue>);

impl MetadataNode {
    pub fn from_i32s(values: impl IntoIterator<Item = u32>) -> Self {
        MetadataNode(values.into_iter().map(MetadataValue::i32).collect())
    }

    /// Integer view of the node. `None` if any value is not an integer.
    pub fn ints(&self) -> Option<Vec<u64>> {
        self.0.iter().map(MetadataValue::as_int).collect()
    }
}

impl std::fmt::Display for MetadataNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{{")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}

/// Module-level named metadata: a name and the ordered nodes registered under it.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NamedMetadata {
    pub name: String,
    pub operands: Vec<MetadataNode>,
}
