//! Terminal reporting of analysis diagnostics.

use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::diagnostic::Label;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::Config;
use codespan_reporting::term::termcolor::StandardStream;
use cwl_analysis::Severity;
use cwl_ast::Position;
use cwl_ast::Range;

/// A reporter that renders analysis diagnostics with source snippets.
pub struct Reporter<'a> {
    /// The rendering configuration.
    config: Config,
    /// The stream to write to.
    stream: StandardStream,
    /// The file repository the diagnostics refer into.
    files: &'a SimpleFiles<String, String>,
}

impl<'a> Reporter<'a> {
    /// Creates a new reporter.
    pub fn new(
        config: Config,
        stream: StandardStream,
        files: &'a SimpleFiles<String, String>,
    ) -> Self {
        Self {
            config,
            stream,
            files,
        }
    }

    /// Reports one diagnostic against the file registered under `handle`.
    pub fn report(&mut self, diagnostic: &cwl_analysis::Diagnostic, handle: usize, source: &str) {
        let rendered = match diagnostic.severity() {
            Severity::Error => Diagnostic::error(),
            Severity::Warning => Diagnostic::warning(),
            Severity::Note => Diagnostic::note(),
        }
        .with_message(diagnostic.message())
        .with_labels(vec![Label::primary(
            handle,
            byte_range(source, diagnostic.range()),
        )]);

        if let Err(error) = term::emit(&mut self.stream, &self.config, self.files, &rendered) {
            eprintln!("failed to write diagnostic: {error}");
        }
    }
}

/// Converts a line/column range into a byte range within the source text.
///
/// Analysis ranges are sometimes empty (anchored at a single position);
/// those widen to one byte so the snippet renderer has something to point
/// at.
pub fn byte_range(source: &str, range: Range) -> std::ops::Range<usize> {
    let start = offset_of(source, range.start);
    let end = offset_of(source, range.end)
        .max(start + 1)
        .min(source.len().max(start + 1));
    start..end
}

/// Converts a zero-based line/column position into a byte offset.
fn offset_of(source: &str, position: Position) -> usize {
    let mut offset = 0;
    for (index, line) in source.split_inclusive('\n').enumerate() {
        if index as u32 == position.line {
            let in_line = line
                .char_indices()
                .nth(position.column as usize)
                .map(|(byte, _)| byte)
                .unwrap_or_else(|| line.trim_end_matches(['\n', '\r']).len());
            return offset + in_line;
        }
        offset += line.len();
    }
    source.len()
}
