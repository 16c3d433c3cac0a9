//! The cursor-addressable lookup table.
//!
//! The walker registers a flat, document-ordered list of range → semantic
//! node entries; queries scan it linearly, which is comfortably fast at CWL
//! document sizes.

use std::path::PathBuf;

use cwl_ast::Position;
use cwl_ast::Range;

use crate::graph::TypeHandle;

/// What a lookup entry offers beyond its semantic node.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupContext {
    /// A value position; completion and hover derive from the semantic
    /// node itself (enum symbols, record documentation).
    Value,
    /// A key position inside a record; completion offers the record's
    /// fields not yet present and hover shows the field's documentation.
    Key {
        /// The field names to offer.
        options: Vec<String>,
        /// The documentation of the field under the key, if any.
        doc: Option<String>,
    },
    /// A connection (`source`/`outputSource`) value; completion offers the
    /// valid connection targets.
    Ports {
        /// The valid connection targets.
        options: Vec<String>,
    },
    /// A type expression value; completion offers the primitive type
    /// symbols plus the user-defined type names in scope.
    Types {
        /// The type names to offer.
        options: Vec<String>,
    },
    /// A JavaScript expression value; hover previews its text.
    Preview {
        /// The expression text as written.
        text: String,
    },
    /// A value naming a linked file (`run:`, `$import`, `$include`, or a
    /// schema-def); hover previews it and definition navigates to it.
    Linked {
        /// The resolved path of the linked file.
        path: PathBuf,
        /// Whether the file existed when the document was walked.
        exists: bool,
    },
}

/// One entry of the lookup table: a source range and the semantic node
/// resolved at that range.
#[derive(Debug, Clone)]
pub struct LookupEntry {
    /// The source range the entry covers.
    pub range: Range,
    /// The semantic node resolved at the range.
    pub node: TypeHandle,
    /// The entry's query payload.
    pub context: LookupContext,
}

/// The document-ordered lookup table.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    /// The entries, in registration (document) order.
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    /// Registers an entry.
    pub(crate) fn register(&mut self, entry: LookupEntry) {
        self.entries.push(entry);
    }

    /// Resolves a position to the first entry whose range contains it.
    ///
    /// Returns `None` when no entry contains the position; absence of a
    /// match is the normal "nothing to offer here" case, not an error.
    pub fn resolve(&self, position: Position) -> Option<&LookupEntry> {
        self.entries
            .iter()
            .find(|entry| entry.range.contains(position))
    }

    /// Iterates the entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = &LookupEntry> {
        self.entries.iter()
    }

    /// Gets the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Determines if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::graph::TypeNode;

    #[test]
    fn resolves_first_containing_entry() {
        let mut table = LookupTable::default();
        table.register(LookupEntry {
            range: Range::new(Position::new(1, 0), Position::new(1, 5)),
            node: TypeHandle::synthesized(TypeNode::Base {
                name: "string".to_string(),
            }),
            context: LookupContext::Value,
        });
        table.register(LookupEntry {
            range: Range::new(Position::new(1, 7), Position::new(1, 12)),
            node: TypeHandle::synthesized(TypeNode::Base {
                name: "int".to_string(),
            }),
            context: LookupContext::Value,
        });

        let entry = table.resolve(Position::new(1, 8)).unwrap();
        assert_eq!(entry.range.start, Position::new(1, 7));

        // Positions inside a registered range resolve to that entry.
        assert!(table.resolve(Position::new(1, 0)).is_some());
        assert!(table.resolve(Position::new(1, 4)).is_some());

        // Positions outside every range resolve to none.
        assert!(table.resolve(Position::new(1, 5)).is_none());
        assert!(table.resolve(Position::new(0, 0)).is_none());
        assert!(table.resolve(Position::new(2, 0)).is_none());
    }
}
