//! Implementation of the `symbols` subcommand.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use cwl_analysis::Document;
use cwl_analysis::walker::Symbol;
use serde_json::json;
use url::Url;

/// Arguments for the `symbols` subcommand.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct SymbolsArgs {
    /// The CWL document to outline.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Emits the outline as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,
}

/// Prints the symbol outline of a CWL document.
pub fn symbols(args: SymbolsArgs) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read `{path}`", path = args.path.display()))?;
    let uri = args
        .path
        .canonicalize()
        .ok()
        .and_then(|path| Url::from_file_path(path).ok());
    let document = Document::analyze(&source, uri.as_ref());

    if args.json {
        let entries: Vec<serde_json::Value> =
            document.symbols().iter().map(symbol_json).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for symbol in document.symbols() {
            print_symbol(symbol, 0);
        }
    }
    Ok(())
}

/// Prints one symbol and its children, indented.
fn print_symbol(symbol: &Symbol, depth: usize) {
    let line = symbol.selection.start.line + 1;
    println!(
        "{indent}{name} {location}",
        indent = "  ".repeat(depth),
        name = symbol.name.bold(),
        location = format!("(line {line})").dimmed(),
    );
    for child in &symbol.children {
        print_symbol(child, depth + 1);
    }
}

/// Converts one symbol and its children to JSON.
fn symbol_json(symbol: &Symbol) -> serde_json::Value {
    json!({
        "name": symbol.name,
        "line": symbol.selection.start.line,
        "column": symbol.selection.start.column,
        "children": symbol.children.iter().map(symbol_json).collect::<Vec<_>>(),
    })
}
