//! The list-as-map identity projection.
//!
//! Several CWL fields may legally be written either as a mapping keyed by an
//! identity (`inputs: {reads: File}`) or as a sequence of records carrying
//! the identity inline (`inputs: [{id: reads, type: File}]`). The
//! [`IdentityView`] projects both forms into one ordered, map-like view so
//! downstream code never re-detects which form was used.

use indexmap::IndexMap;

use crate::Range;
use crate::SourceNode;

/// A problem found while projecting a sequence item into the view.
///
/// Projection problems exclude the item from the view; the caller converts
/// them into diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A sequence item is not a mapping and cannot carry an identity field.
    NotARecord {
        /// The item's position in the sequence.
        index: usize,
        /// The item's source range.
        range: Range,
    },
    /// A sequence item has no identity field.
    MissingIdentity {
        /// The name of the expected identity field.
        field: String,
        /// The item's source range.
        range: Range,
    },
    /// Two items share the same identity value.
    Duplicate {
        /// The duplicated identity value.
        key: String,
        /// The later item's source range.
        range: Range,
    },
}

/// A single projected entry.
#[derive(Debug, Clone, Copy)]
pub struct ViewEntry<'a> {
    /// The range of the text supplying the entry's key (the mapping key, or
    /// the identity field's value in list form).
    pub key_range: Range,
    /// The entry's node: the mapping value, or the whole list item.
    pub node: &'a SourceNode,
}

/// A read-only, ordered, map-like view over a list-or-map field.
#[derive(Debug)]
pub struct IdentityView<'a> {
    /// The projected entries, in document order.
    entries: IndexMap<String, ViewEntry<'a>>,
    /// Problems found while projecting.
    errors: Vec<IdentityError>,
    /// Whether the source form was a sequence.
    from_list: bool,
    /// The source range of the projected node.
    range: Range,
}

impl<'a> IdentityView<'a> {
    /// Projects a node into an identity view using the given identity field.
    ///
    /// Returns `None` if the node is neither a mapping nor a sequence; a
    /// null projects to an empty map-form view, since an empty section is a
    /// valid document with zero entries.
    pub fn project(node: &'a SourceNode, identity: &str) -> Option<Self> {
        match node {
            SourceNode::Mapping(mapping) => {
                let entries = mapping
                    .iter()
                    .map(|(key, entry)| {
                        (
                            key.to_string(),
                            ViewEntry {
                                key_range: entry.key_range,
                                node: &entry.value,
                            },
                        )
                    })
                    .collect();
                Some(Self {
                    entries,
                    errors: Vec::new(),
                    from_list: false,
                    range: mapping.range,
                })
            }
            SourceNode::Sequence { items, range, .. } => {
                let mut entries = IndexMap::new();
                let mut errors = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let Some(mapping) = item.as_mapping() else {
                        errors.push(IdentityError::NotARecord {
                            index,
                            range: item.range(),
                        });
                        continue;
                    };
                    let Some(id) = mapping.value(identity).and_then(SourceNode::as_str) else {
                        errors.push(IdentityError::MissingIdentity {
                            field: identity.to_string(),
                            range: item.range(),
                        });
                        continue;
                    };

                    let key_range = mapping
                        .value(identity)
                        .map(SourceNode::range)
                        .unwrap_or_else(|| item.range());
                    if entries.contains_key(id) {
                        errors.push(IdentityError::Duplicate {
                            key: id.to_string(),
                            range: key_range,
                        });
                        continue;
                    }

                    entries.insert(id.to_string(), ViewEntry {
                        key_range,
                        node: item,
                    });
                }
                Some(Self {
                    entries,
                    errors,
                    from_list: true,
                    range: *range,
                })
            }
            SourceNode::Null { range } => Some(Self {
                entries: IndexMap::new(),
                errors: Vec::new(),
                from_list: false,
                range: *range,
            }),
            SourceNode::Scalar { .. } => None,
        }
    }

    /// Gets the entry for the given key.
    pub fn get(&self, key: &str) -> Option<ViewEntry<'a>> {
        self.entries.get(key).copied()
    }

    /// Gets the key range for the given key.
    pub fn key_range(&self, key: &str) -> Option<Range> {
        self.entries.get(key).map(|entry| entry.key_range)
    }

    /// Iterates the entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ViewEntry<'a>)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), *entry))
    }

    /// Iterates the keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Determines if the view contains the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Gets the number of projected entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Determines if the view has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the problems found while projecting.
    pub fn errors(&self) -> &[IdentityError] {
        &self.errors
    }

    /// Determines if the source form was a sequence.
    pub fn from_list(&self) -> bool {
        self.from_list
    }

    /// Gets the source range of the projected node.
    pub fn range(&self) -> Range {
        self.range
    }
}
