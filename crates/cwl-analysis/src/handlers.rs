//! Helper functions for answering editor queries with LSP structures.
//!
//! Every function here is a pure projection of an analyzed [`Document`]:
//! the walk already recorded everything there is to offer, so handlers
//! only translate lookup entries into `lsp_types` values.

use std::fs;
use std::path::Path;

use cwl_ast::Position;
use lsp_types::CompletionItem;
use lsp_types::CompletionItemKind;
use lsp_types::DocumentSymbol;
use lsp_types::Hover;
use lsp_types::HoverContents;
use lsp_types::Location;
use lsp_types::MarkupContent;
use lsp_types::MarkupKind;
use url::Url;

use crate::diagnostic::range_to_lsp;
use crate::document::Document;
use crate::graph::TypeGraph;
use crate::graph::TypeHandle;
use crate::graph::TypeNode;
use crate::lookup::LookupContext;
use crate::walker::Symbol;
use crate::walker::SymbolKind;

/// The number of lines shown when hovering a linked file.
const LINKED_PREVIEW_LINES: usize = 16;

/// Computes the completion items at a position.
pub fn completion(document: &Document, position: Position) -> Vec<CompletionItem> {
    let Some(entry) = document.lookup(position) else {
        return Vec::new();
    };

    match &entry.context {
        LookupContext::Key { options, .. } => items(options, CompletionItemKind::FIELD),
        LookupContext::Ports { options } => items(options, CompletionItemKind::REFERENCE),
        LookupContext::Types { options } => items(options, CompletionItemKind::CLASS),
        LookupContext::Value => match entry.node.resolve(document.graph()) {
            TypeNode::Enum { symbols, .. } => items(symbols, CompletionItemKind::ENUM_MEMBER),
            _ => Vec::new(),
        },
        LookupContext::Preview { .. } | LookupContext::Linked { .. } => Vec::new(),
    }
}

/// Computes the hover content at a position.
pub fn hover(document: &Document, position: Position) -> Option<Hover> {
    let entry = document.lookup(position)?;

    let value = match &entry.context {
        LookupContext::Key {
            doc: Some(doc), ..
        } => doc.clone(),
        LookupContext::Preview { text } => {
            format!("```javascript\n{text}\n```")
        }
        LookupContext::Linked { path, exists } => linked_preview(path, *exists),
        _ => describe(document.graph(), &entry.node)?,
    };

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(range_to_lsp(entry.range)),
    })
}

/// Computes the definition location at a position.
///
/// Only linked-file entries (`run:`, `$import`, `$include`, schema-defs)
/// have definitions; the target is the top of the linked file.
pub fn definition(document: &Document, position: Position) -> Option<Location> {
    let entry = document.lookup(position)?;
    let LookupContext::Linked { path, exists } = &entry.context else {
        return None;
    };
    if !exists {
        return None;
    }

    let uri = Url::from_file_path(path).ok()?;
    Some(Location {
        uri,
        range: lsp_types::Range::default(),
    })
}

/// Computes the document's symbol outline.
pub fn document_symbols(document: &Document) -> Vec<DocumentSymbol> {
    document.symbols().iter().map(convert_symbol).collect()
}

/// Converts an outline symbol into an LSP document symbol.
fn convert_symbol(symbol: &Symbol) -> DocumentSymbol {
    let kind = match symbol.kind {
        SymbolKind::Section => lsp_types::SymbolKind::NAMESPACE,
        SymbolKind::Step => lsp_types::SymbolKind::FUNCTION,
    };
    let children: Vec<DocumentSymbol> = symbol.children.iter().map(convert_symbol).collect();

    // `deprecated` is required by the LSP structure despite its own
    // deprecation.
    #[allow(deprecated)]
    DocumentSymbol {
        name: symbol.name.clone(),
        detail: None,
        kind,
        tags: None,
        deprecated: None,
        range: range_to_lsp(symbol.range),
        selection_range: range_to_lsp(symbol.selection),
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    }
}

/// Builds completion items of one kind from a list of labels.
fn items<S: AsRef<str>>(labels: &[S], kind: CompletionItemKind) -> Vec<CompletionItem> {
    labels
        .iter()
        .map(|label| CompletionItem {
            label: label.as_ref().to_string(),
            kind: Some(kind),
            ..Default::default()
        })
        .collect()
}

/// Describes a semantic node as hover markdown.
fn describe(graph: &TypeGraph, handle: &TypeHandle) -> Option<String> {
    match handle.resolve(graph) {
        TypeNode::Record { name, doc, .. } => Some(match doc {
            Some(doc) => format!("**{name}**\n\n{doc}"),
            None => format!("**{name}**"),
        }),
        TypeNode::Enum {
            name, doc, symbols, ..
        } => {
            let mut value = format!("**{name}**");
            if let Some(doc) = doc {
                value.push_str("\n\n");
                value.push_str(doc);
            }
            value.push_str("\n\nOne of: ");
            value.push_str(&join_ticked(symbols));
            Some(value)
        }
        TypeNode::DataType { name, symbols } => Some(format!(
            "**{name}**\n\nOne of: {symbols}",
            symbols = join_ticked(symbols)
        )),
        TypeNode::Namespaced { prefix, name } => Some(format!("`{prefix}:{name}`")),
        _ => None,
    }
}

/// Joins names as backticked, comma-separated markdown.
fn join_ticked(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Previews the head of a linked file as fenced markdown.
fn linked_preview(path: &Path, exists: bool) -> String {
    if !exists {
        return format!("File not found: `{path}`", path = path.display());
    }
    match fs::read_to_string(path) {
        Ok(text) => {
            let head: Vec<&str> = text.lines().take(LINKED_PREVIEW_LINES).collect();
            let ellipsis = if text.lines().count() > LINKED_PREVIEW_LINES {
                "\n..."
            } else {
                ""
            };
            format!(
                "`{path}`\n\n```yaml\n{head}{ellipsis}\n```",
                path = path.display(),
                head = head.join("\n")
            )
        }
        Err(error) => format!("Unable to read `{path}`: {error}", path = path.display()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// A small workflow used by the handler tests.
    const WORKFLOW: &str = "\
cwlVersion: v1.2
class: Workflow
inputs:
  reads: File
outputs:
  final:
    type: File
    outputSource: sort/sorted
steps:
  align:
    run:
      class: CommandLineTool
      inputs:
        reads: File
      outputs:
        bam:
          type: File
          outputBinding:
            glob: '*.bam'
    in:
      reads: reads
    out: [bam]
  sort:
    run:
      class: CommandLineTool
      inputs:
        bam: File
      outputs:
        sorted:
          type: File
          outputBinding:
            glob: '*.sorted.bam'
    in:
      bam: align/bam
    out: [sorted]
";

    #[test]
    fn completion_offers_connection_targets() {
        let document = Document::analyze(WORKFLOW, None);
        // The `reads: reads` value inside the align step's `in` block.
        let entries: Vec<String> = completion(&document, Position::new(20, 13))
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert!(entries.contains(&"reads".to_string()), "found {entries:?}");
        assert!(
            entries.contains(&"sort/sorted".to_string()),
            "found {entries:?}"
        );
        assert!(
            !entries.contains(&"align/bam".to_string()),
            "own ports are excluded: {entries:?}"
        );
    }

    #[test]
    fn symbols_cover_top_level_sections() {
        let document = Document::analyze(WORKFLOW, None);
        let symbols = document_symbols(&document);
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["cwlVersion", "class", "inputs", "outputs", "steps"]
        );

        let steps = symbols.last().unwrap();
        let children: Vec<&str> = steps
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(children, ["align", "sort"]);
    }

    #[test]
    fn hover_shows_enum_symbols() {
        let document = Document::analyze(
            "cwlVersion: v1.2\n\
             class: CommandLineTool\n\
             inputs: {}\n\
             outputs: {}\n",
            None,
        );
        // The `cwlVersion` value resolves to the CWLVersion enum.
        let hover = hover(&document, Position::new(0, 13)).unwrap();
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup hover");
        };
        assert!(markup.value.contains("CWLVersion"), "{}", markup.value);
        assert!(markup.value.contains("`v1.2`"), "{}", markup.value);
    }

    #[test]
    fn definition_requires_a_linked_entry() {
        let document = Document::analyze(WORKFLOW, None);
        assert_eq!(definition(&document, Position::new(3, 3)), None);
    }
}
