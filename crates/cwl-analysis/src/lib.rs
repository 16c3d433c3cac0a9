//! Analysis of Common Workflow Language documents.
//!
//! This crate compiles the embedded CWL schemas into type graphs, walks
//! positioned source trees produced by [`cwl_ast`] against them, and
//! answers editor queries (diagnostics, completion, hover, definition,
//! and the symbol outline) from the artifacts of a single walk.
//!
//! The entry point is [`Document::analyze`]:
//!
//! ```
//! use cwl_analysis::Document;
//!
//! let document = Document::analyze(
//!     "cwlVersion: v1.2\nclass: CommandLineTool\ninputs: {}\noutputs: {}\n",
//!     None,
//! );
//! assert!(document.diagnostics().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(clippy::missing_docs_in_private_items)]

mod diagnostic;
pub mod diagnostics;
mod document;
pub mod graph;
pub mod handlers;
mod lookup;
pub mod matcher;
pub mod schema;
pub mod walker;
pub mod workflow;

pub use diagnostic::DIAGNOSTIC_SOURCE;
pub use diagnostic::Diagnostic;
pub use diagnostic::Severity;
pub use diagnostic::position_to_lsp;
pub use diagnostic::range_to_lsp;
pub use document::Document;
pub use lookup::LookupContext;
pub use lookup::LookupEntry;
pub use lookup::LookupTable;
