//! Loading YAML text into a position-tracked source tree.
//!
//! The loader folds the marked event stream of a standard YAML scanner into
//! a [`SourceNode`] tree, capturing each event's source marks before the
//! underlying representation is discarded. It never materializes a plain
//! (positionless) YAML value.

use indexmap::IndexMap;
use tracing::debug;
use yaml_rust2::parser::Event;
use yaml_rust2::parser::MarkedEventReceiver;
use yaml_rust2::parser::Parser;
use yaml_rust2::scanner::Marker;
use yaml_rust2::scanner::ScanError;
use yaml_rust2::scanner::TScalarStyle;

use crate::Mapping;
use crate::MappingEntry;
use crate::Position;
use crate::Range;
use crate::ScalarStyle;
use crate::SourceNode;

/// The maximum number of self-healing reparse attempts.
///
/// Interactive editing constantly produces transiently-invalid YAML; a
/// single-character heal per attempt keeps mid-keystroke text from flooding
/// the diagnostics list.
const MAX_HEAL_ATTEMPTS: usize = 3;

/// An unrecoverable YAML scan or parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    /// The zero-based line of the failure.
    pub line: u32,
    /// The zero-based column of the failure.
    pub column: u32,
    /// The scanner's description of the failure.
    pub message: String,
}

impl ParseError {
    /// Creates a parse error from a scanner error.
    fn from_scan(error: &ScanError) -> Self {
        let marker = error.marker();
        Self {
            line: position_of(marker).line,
            column: position_of(marker).column,
            message: error.to_string(),
        }
    }
}

/// Parses YAML text into a position-tracked source tree.
///
/// A semantically empty document (only comments, or nothing at all) parses
/// successfully to a [`SourceNode::Null`] at the origin; absence of content
/// is not an error.
///
/// Two known mid-edit error shapes are healed before a failure is surfaced:
/// the simple-key error a block-mapping key line missing its trailing colon
/// produces, and the ambiguous "mapping values are not allowed" the same
/// omission produces on the following line. Healing appends a colon to the
/// nearest non-blank line preceding the reported error and reparses, at
/// most [`MAX_HEAL_ATTEMPTS`] times. The original error is surfaced
/// verbatim if healing does not converge.
pub fn parse(text: &str) -> Result<SourceNode, ParseError> {
    let mut current = text.to_string();
    let mut first_error: Option<ParseError> = None;

    for attempt in 0..=MAX_HEAL_ATTEMPTS {
        match load_document(&current) {
            Ok(node) => {
                if attempt > 0 {
                    debug!("YAML healed after {attempt} attempt(s)");
                }
                return Ok(node);
            }
            Err(error) => {
                let parse_error = ParseError::from_scan(&error);
                if first_error.is_none() {
                    first_error = Some(parse_error.clone());
                }

                if attempt == MAX_HEAL_ATTEMPTS {
                    break;
                }

                match heal(&current, &error) {
                    Some(healed) => current = healed,
                    None => break,
                }
            }
        }
    }

    // Healing did not converge; surface the original error verbatim.
    Err(first_error.expect("loop always records an error before exiting"))
}

/// Determines if a scan error is one of the healable shapes.
///
/// The scanner reports a key line missing its colon as a simple-key error
/// ("simple key expect ':'" mid-document, "simple key expected" at the end
/// of input) or, when the following line carries its own colon, as
/// "mapping values are not allowed in this context".
fn is_healable(error: &ScanError) -> bool {
    let message = error.to_string();
    message.contains("simple key expect") || message.contains("mapping values are not allowed")
}

/// Produces a healed copy of the text for a healable error, appending a
/// colon to the nearest non-blank line preceding the reported position.
///
/// Returns `None` if the error is not healable or no candidate line exists.
fn heal(text: &str, error: &ScanError) -> Option<String> {
    if !is_healable(error) {
        return None;
    }

    let error_line = position_of(error.marker()).line as usize;
    let lines: Vec<&str> = text.split('\n').collect();

    // The scanner reports both healable shapes at or after the line that is
    // actually missing its colon. Search upward from the error line for the
    // nearest non-blank, non-comment line with no colon of its own; lines
    // that already contain one are complete mapping lines, not the culprit.
    let candidate = lines
        .iter()
        .enumerate()
        .take(error_line.saturating_add(1).min(lines.len()))
        .rev()
        .find(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.contains(':') && !trimmed.starts_with('#')
        })
        .map(|(index, _)| index)?;

    let mut healed: Vec<String> = lines.iter().map(|line| (*line).to_string()).collect();
    let line = &mut healed[candidate];
    let end = line.trim_end().len();
    line.insert(end, ':');

    debug!("healing YAML by appending ':' to line {candidate}");
    Some(healed.join("\n"))
}

/// Loads the first YAML document of the text into a source tree.
fn load_document(text: &str) -> Result<SourceNode, ScanError> {
    let mut builder = TreeBuilder::new(text);
    let mut parser = Parser::new_from_str(text);
    parser.load(&mut builder, true)?;
    Ok(builder.root.unwrap_or_else(SourceNode::null))
}

/// Converts a scanner marker (one-based lines) to a zero-based position.
fn position_of(marker: &Marker) -> Position {
    Position {
        line: marker.line().saturating_sub(1) as u32,
        column: marker.col() as u32,
    }
}

/// Converts a scanner scalar style to the tree's scalar style.
fn style_of(style: TScalarStyle) -> ScalarStyle {
    match style {
        TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        TScalarStyle::Literal => ScalarStyle::Literal,
        TScalarStyle::Folded => ScalarStyle::Folded,
        _ => ScalarStyle::Plain,
    }
}

/// Determines if a plain-style scalar value spells a YAML null.
fn is_null_scalar(value: &str, style: ScalarStyle) -> bool {
    style == ScalarStyle::Plain && matches!(value, "" | "~" | "null" | "Null" | "NULL")
}

/// A container being assembled while its events stream in.
#[derive(Debug)]
enum Container {
    /// A sequence under construction.
    Sequence {
        /// The items collected so far.
        items: Vec<SourceNode>,
        /// The sequence's start position.
        start: Position,
        /// Whether the sequence is flow style.
        flow: bool,
    },
    /// A mapping under construction.
    Mapping {
        /// The entries collected so far.
        entries: IndexMap<String, MappingEntry>,
        /// The mapping's start position.
        start: Position,
        /// Whether the mapping is flow style.
        flow: bool,
        /// The key awaiting its value, if the next node is a value.
        pending_key: Option<(String, Range)>,
    },
}

/// Folds the marked event stream into a [`SourceNode`] tree.
#[derive(Debug)]
struct TreeBuilder {
    /// The source text as characters, for flow-style detection.
    chars: Vec<char>,
    /// The stack of open containers.
    stack: Vec<Container>,
    /// The completed root node of the first document.
    root: Option<SourceNode>,
    /// Set once the first document has ended; later documents are ignored.
    done: bool,
}

impl TreeBuilder {
    /// Creates a builder over the given source text.
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            stack: Vec::new(),
            root: None,
            done: false,
        }
    }

    /// Determines if the container starting at the marker is flow style.
    ///
    /// The event stream does not carry the style, so the opening character
    /// in the source is consulted instead.
    fn is_flow_at(&self, marker: &Marker) -> bool {
        matches!(self.chars.get(marker.index()), Some('[') | Some('{'))
    }

    /// Attaches a completed node to the innermost open container, or makes
    /// it the document root.
    fn attach(&mut self, node: SourceNode) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Container::Sequence { items, .. }) => items.push(node),
            Some(Container::Mapping {
                entries,
                pending_key,
                start,
                ..
            }) => match pending_key.take() {
                Some((key, key_range)) => {
                    if entries
                        .insert(
                            key.clone(),
                            MappingEntry {
                                key_range,
                                value: node,
                            },
                        )
                        .is_some()
                    {
                        debug!("duplicate mapping key `{key}`; keeping the later value");
                    }
                }
                None => {
                    // The node is a key. Non-scalar keys do not occur in
                    // CWL; stringify them so the entry still exists.
                    let key = match &node {
                        SourceNode::Scalar { value, .. } => value.clone(),
                        SourceNode::Null { .. } => String::new(),
                        other => {
                            debug!("non-scalar mapping key of kind `{}`", other.kind());
                            format!("<{}>", other.kind())
                        }
                    };
                    // A block mapping's start event is marked at the first
                    // value indicator, after the first key; widen the start
                    // so the mapping encloses its own keys.
                    *start = (*start).min(node.range().start);
                    *pending_key = Some((key, node.range()));
                }
            },
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        if self.done {
            return;
        }

        let start = position_of(&marker);
        match event {
            Event::Scalar(value, scalar_style, _, _) => {
                let style = style_of(scalar_style);
                let node = if is_null_scalar(&value, style) {
                    SourceNode::Null {
                        // A zero-width range would be invisible to cursor
                        // queries, so give nulls one column.
                        range: Range::new(start, start.shifted(1)),
                    }
                } else {
                    let range = Range::new(start, scalar_end(start, &value, style));
                    SourceNode::Scalar {
                        value,
                        style,
                        range,
                    }
                };
                self.attach(node);
            }
            Event::SequenceStart(..) => {
                let flow = self.is_flow_at(&marker);
                self.stack.push(Container::Sequence {
                    items: Vec::new(),
                    start,
                    flow,
                });
            }
            Event::SequenceEnd => {
                if let Some(Container::Sequence { items, start, flow }) = self.stack.pop() {
                    let children_end = items
                        .last()
                        .map(|item| item.range().end)
                        .unwrap_or(start);
                    let end = children_end.max(position_of(&marker));
                    self.attach(SourceNode::Sequence {
                        items,
                        range: Range::new(start, end),
                        flow,
                    });
                }
            }
            Event::MappingStart(..) => {
                let flow = self.is_flow_at(&marker);
                self.stack.push(Container::Mapping {
                    entries: IndexMap::new(),
                    start,
                    flow,
                    pending_key: None,
                });
            }
            Event::MappingEnd => {
                if let Some(Container::Mapping {
                    entries,
                    start,
                    flow,
                    ..
                }) = self.stack.pop()
                {
                    let children_end = entries
                        .values()
                        .map(|entry| entry.value.range().end)
                        .max()
                        .unwrap_or(start);
                    let end = children_end.max(position_of(&marker));
                    self.attach(SourceNode::Mapping(Mapping {
                        entries,
                        range: Range::new(start, end),
                        flow,
                    }));
                }
            }
            Event::Alias(id) => {
                debug!("YAML alias *{id} replaced with null; aliases carry no position data");
                self.attach(SourceNode::Null {
                    range: Range::new(start, start.shifted(1)),
                });
            }
            Event::DocumentEnd => {
                if self.root.is_some() {
                    self.done = true;
                }
            }
            Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::Nothing => {}
        }
    }
}

/// Computes the end position of a scalar from its value and style.
///
/// The event stream reports only the scalar's start mark; the end is
/// recovered from the rendered length. Quoted styles add their two quote
/// columns; multi-line scalars end after the final line's content.
fn scalar_end(start: Position, value: &str, style: ScalarStyle) -> Position {
    let quote_columns = match style {
        ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted => 2,
        _ => 0,
    };

    if let Some((head, tail)) = value.split_once('\n') {
        let extra_lines = 1 + tail.matches('\n').count() as u32;
        let last = value.rsplit('\n').next().unwrap_or(head);
        Position::new(
            start.line + extra_lines,
            last.chars().count() as u32 + quote_columns,
        )
    } else {
        start.shifted(value.chars().count() as u32 + quote_columns)
    }
}
