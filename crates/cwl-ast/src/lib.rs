//! Position-tracked YAML source trees for Common Workflow Language (CWL)
//! documents.
//!
//! This crate turns CWL document text into a [`SourceNode`] tree in which
//! every scalar, sequence, and mapping carries the source [`Range`] it was
//! parsed from. Downstream analysis maps any cursor position back to the
//! semantic element under it, so positions are retained at load time rather
//! than recomputed later.
//!
//! Loading is tolerant of the transiently-invalid YAML produced by
//! interactive editing: a bounded self-healing retry repairs the most common
//! mid-keystroke error (a block mapping key missing its trailing colon)
//! before a parse failure is surfaced.
//!
//! # Examples
//!
//! ```
//! use cwl_ast::Position;
//! use cwl_ast::parse;
//!
//! let root = parse("class: CommandLineTool\ncwlVersion: v1.2\n").unwrap();
//! let mapping = root.as_mapping().unwrap();
//! let class = mapping.get("class").unwrap();
//! assert_eq!(class.value.as_str(), Some("CommandLineTool"));
//! assert_eq!(class.value.range().start, Position::new(0, 7));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

mod loader;
mod node;
mod position;
mod view;

pub use loader::ParseError;
pub use loader::parse;
pub use node::Mapping;
pub use node::MappingEntry;
pub use node::ScalarStyle;
pub use node::SourceNode;
pub use position::Position;
pub use position::Range;
pub use view::IdentityError;
pub use view::IdentityView;
