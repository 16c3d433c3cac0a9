//! Implementation of the `check` subcommand.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::Config;
use codespan_reporting::term::termcolor::ColorChoice;
use codespan_reporting::term::termcolor::StandardStream;
use colored::Colorize;
use cwl_analysis::Document;
use cwl_analysis::Severity;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::report::Reporter;

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CheckArgs {
    /// The CWL documents to check.
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Emits diagnostics as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Treats warnings as errors.
    #[arg(long)]
    pub deny_warnings: bool,
}

/// Checks CWL documents and reports their diagnostics.
pub fn check(args: CheckArgs) -> anyhow::Result<()> {
    let mut files = SimpleFiles::new();
    let mut analyzed = Vec::new();

    for path in &args.paths {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{path}`", path = path.display()))?;
        let uri = path
            .canonicalize()
            .ok()
            .and_then(|path| Url::from_file_path(path).ok());
        info!("checking `{path}`", path = path.display());

        let document = Document::analyze(&source, uri.as_ref());
        let handle = files.add(path.display().to_string(), source.clone());
        analyzed.push((handle, source, document));
    }

    let mut errors = 0usize;
    let mut warnings = 0usize;
    for (_, _, document) in &analyzed {
        for diagnostic in document.diagnostics() {
            match diagnostic.severity() {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Note => {}
            }
        }
    }

    if args.json {
        emit_json(&args, &analyzed)?;
    } else {
        emit_text(&files, &analyzed, errors, warnings);
    }

    if errors > 0 {
        bail!("failing due to {errors} error{s}", s = plural(errors));
    }
    if args.deny_warnings && warnings > 0 {
        bail!(
            "failing due to {warnings} warning{s} (`--deny-warnings`)",
            s = plural(warnings)
        );
    }
    Ok(())
}

/// Emits diagnostics as rendered source snippets plus a summary line.
fn emit_text(
    files: &SimpleFiles<String, String>,
    analyzed: &[(usize, String, Document)],
    errors: usize,
    warnings: usize,
) {
    let stream = StandardStream::stderr(if std::io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    let mut reporter = Reporter::new(Config::default(), stream, files);

    for (handle, source, document) in analyzed {
        for diagnostic in document.diagnostics() {
            reporter.report(diagnostic, *handle, source);
        }
    }

    let summary = format!(
        "{errors} error{es}, {warnings} warning{ws}",
        es = plural(errors),
        ws = plural(warnings)
    );
    if errors > 0 {
        eprintln!("{}", summary.red().bold());
    } else if warnings > 0 {
        eprintln!("{}", summary.yellow().bold());
    } else {
        eprintln!("{}", summary.green().bold());
    }
}

/// Emits diagnostics as a JSON array on standard output.
fn emit_json(args: &CheckArgs, analyzed: &[(usize, String, Document)]) -> anyhow::Result<()> {
    let entries: Vec<serde_json::Value> = analyzed
        .iter()
        .zip(&args.paths)
        .flat_map(|((_, _, document), path)| {
            document.diagnostics().iter().map(move |diagnostic| {
                json!({
                    "path": path.display().to_string(),
                    "severity": diagnostic.severity().to_string(),
                    "message": diagnostic.message(),
                    "line": diagnostic.range().start.line,
                    "column": diagnostic.range().start.column,
                })
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

/// Pluralizes a count's noun suffix.
fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
