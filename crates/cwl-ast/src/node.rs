//! The position-tracked source tree.

use indexmap::IndexMap;

use crate::Position;
use crate::Range;

/// The presentation style of a scalar in the source document.
///
/// The style distinguishes `foo` from `"foo"`; completion replacement and
/// expression detection care about the difference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    /// An unquoted scalar.
    Plain,
    /// A single-quoted scalar.
    SingleQuoted,
    /// A double-quoted scalar.
    DoubleQuoted,
    /// A literal block scalar (`|`).
    Literal,
    /// A folded block scalar (`>`).
    Folded,
}

/// A single entry of a [`Mapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    /// The range of the entry's key scalar.
    pub key_range: Range,
    /// The entry's value.
    pub value: SourceNode,
}

/// An ordered mapping of keys to values.
///
/// Entry order is document order; symbol outlines and the walker's
/// "process `requirements` first" reordering both depend on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    /// The entries of the mapping, in document order.
    pub entries: IndexMap<String, MappingEntry>,
    /// The source range of the whole mapping.
    pub range: Range,
    /// Whether the mapping was written in flow style (`{...}`).
    pub flow: bool,
}

impl Mapping {
    /// Gets the entry for the given key.
    pub fn get(&self, key: &str) -> Option<&MappingEntry> {
        self.entries.get(key)
    }

    /// Gets the value node for the given key.
    pub fn value(&self, key: &str) -> Option<&SourceNode> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Gets the key range for the given key.
    pub fn key_range(&self, key: &str) -> Option<Range> {
        self.entries.get(key).map(|entry| entry.key_range)
    }

    /// Determines if the mapping contains the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates the mapping's keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates the mapping's entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Gets the number of entries in the mapping.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Determines if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A node of the position-tracked source tree.
///
/// Invariant: a node's range contains the ranges of all of its descendants.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceNode {
    /// A scalar value.
    Scalar {
        /// The scalar's resolved text.
        value: String,
        /// The scalar's presentation style.
        style: ScalarStyle,
        /// The scalar's source range.
        range: Range,
    },
    /// An explicit or implicit null.
    ///
    /// Kept distinct from an empty scalar so that "section present but
    /// empty" can be told apart from "section absent".
    Null {
        /// The null's source range.
        range: Range,
    },
    /// A sequence of nodes.
    Sequence {
        /// The items of the sequence, in document order.
        items: Vec<SourceNode>,
        /// The source range of the whole sequence.
        range: Range,
        /// Whether the sequence was written in flow style (`[...]`).
        flow: bool,
    },
    /// An ordered mapping.
    Mapping(Mapping),
}

impl SourceNode {
    /// Creates a null node anchored at the document origin.
    pub fn null() -> Self {
        Self::Null {
            range: Range::at(Position::default()),
        }
    }

    /// Gets the source range of the node.
    pub fn range(&self) -> Range {
        match self {
            Self::Scalar { range, .. }
            | Self::Null { range }
            | Self::Sequence { range, .. }
            | Self::Mapping(Mapping { range, .. }) => *range,
        }
    }

    /// Gets the scalar text of the node, if it is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Gets the node as a mapping, if it is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Gets the node's items, if it is a sequence.
    pub fn as_sequence(&self) -> Option<&[SourceNode]> {
        match self {
            Self::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Determines if the node is a null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null { .. })
    }

    /// Determines if the node is scalar-shaped (a scalar or a null).
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar { .. } | Self::Null { .. })
    }

    /// Determines if the node is a scalar containing a CWL parameter
    /// reference (`$(...)`) or expression (`${...}`).
    pub fn has_expression(&self) -> bool {
        match self.as_str() {
            Some(value) => value.contains("$(") || value.contains("${"),
            None => false,
        }
    }

    /// Gets a short name for the node's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar { .. } => "scalar",
            Self::Null { .. } => "null",
            Self::Sequence { .. } => "list",
            Self::Mapping(_) => "mapping",
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn expression_detection() {
        let scalar = |value: &str| SourceNode::Scalar {
            value: value.to_string(),
            style: ScalarStyle::Plain,
            range: Range::default(),
        };

        assert!(scalar("$(inputs.reads)").has_expression());
        assert!(scalar("prefix ${ return 1; } suffix").has_expression());
        assert!(!scalar("plain string").has_expression());
        assert!(!scalar("$HOME").has_expression());
        assert!(!SourceNode::null().has_expression());
    }

    #[test]
    fn mapping_preserves_document_order() {
        let mut mapping = Mapping::default();
        for key in ["cwlVersion", "class", "inputs", "outputs"] {
            mapping.entries.insert(
                key.to_string(),
                MappingEntry {
                    key_range: Range::default(),
                    value: SourceNode::null(),
                },
            );
        }

        assert_eq!(
            mapping.keys().collect::<Vec<_>>(),
            ["cwlVersion", "class", "inputs", "outputs"]
        );
    }
}
