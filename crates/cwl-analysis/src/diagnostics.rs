//! Module for all diagnostic creation functions.

use cwl_ast::IdentityError;
use cwl_ast::ParseError;
use cwl_ast::Position;
use cwl_ast::Range;

use crate::Diagnostic;

/// Formats a list of names the way diagnostics quote alternatives:
/// `['compute', 'storage']`.
pub(crate) fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::from("[");
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push('\'');
        out.push_str(item.as_ref());
        out.push('\'');
    }
    out.push(']');
    out
}

/// Creates a diagnostic for an unrecoverable YAML scan/parse failure.
pub fn yaml_error(error: &ParseError) -> Diagnostic {
    let position = Position::new(error.line, error.column);
    Diagnostic::error(error.message.clone())
        .with_range(Range::new(position, position.shifted(1)))
}

/// Creates an "unknown field" diagnostic.
pub fn unknown_field(field: &str, range: Range) -> Diagnostic {
    Diagnostic::warning(format!("Unknown field: {field}")).with_range(range)
}

/// Creates a "missing required section" diagnostic.
pub fn missing_required_section(section: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("Missing required section: {section}")).with_range(range)
}

/// Creates an "expecting one of" diagnostic for a value outside an allowed
/// symbol or type set.
pub fn expecting_one_of<S: AsRef<str>>(allowed: &[S], range: Range) -> Diagnostic {
    Diagnostic::error(format!("Expecting one of: {}", quoted_list(allowed))).with_range(range)
}

/// Creates an "unknown class" diagnostic for a `class` discriminator that
/// matches none of the candidate types.
pub fn unknown_class<S: AsRef<str>>(class: &str, expected: &[S], range: Range) -> Diagnostic {
    Diagnostic::error(format!(
        "Unknown class {class}; expecting one of: {expected}",
        expected = quoted_list(expected)
    ))
    .with_range(range)
}

/// Creates a diagnostic for an unrecognized class under `hints`, where
/// executors tolerate extensions.
pub fn unknown_hint_class(class: &str, range: Range) -> Diagnostic {
    Diagnostic::warning(format!("Unknown hint class {class}")).with_range(range)
}

/// Creates a "no such step" diagnostic for a connection naming an
/// undeclared step.
pub fn no_such_step(step: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("No such step {step}")).with_range(range)
}

/// Creates a diagnostic for a `source` connection naming a port the step
/// does not declare.
pub fn no_port_called(step: &str, port: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("{step} has no port called {port}")).with_range(range)
}

/// Creates a diagnostic for an `outputSource` connection naming an output
/// port the step does not declare.
pub fn no_output_port(step: &str, port: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("{step} has no output port {port}")).with_range(range)
}

/// Creates a diagnostic for a step input id that is not among the step's
/// declared input ports, listing the ports that exist.
pub fn no_input_port<S: AsRef<str>>(
    step: &str,
    port: &str,
    declared: &[S],
    range: Range,
) -> Diagnostic {
    Diagnostic::error(format!(
        "{step} has no input port called {port}. Input ports: {declared}",
        declared = quoted_list(declared)
    ))
    .with_range(range)
}

/// Creates a diagnostic for a step whose connection references itself.
pub fn step_self_reference(step: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("Step {step} references itself")).with_range(range)
}

/// Creates a diagnostic for a bare connection id that is not a workflow
/// input.
pub fn no_such_workflow_input(id: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("No such workflow input {id}")).with_range(range)
}

/// Creates a diagnostic for a linked file that does not exist.
pub fn missing_linked_file(path: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("Missing linked file: {path}")).with_range(range)
}

/// Creates a diagnostic for a linked file that exists but could not be
/// read or parsed.
pub fn unreadable_linked_file(path: &str, reason: &str, range: Range) -> Diagnostic {
    Diagnostic::error(format!("Unable to load linked file {path}: {reason}")).with_range(range)
}

/// Creates a diagnostic for a namespaced name whose prefix is not declared
/// in `$namespaces`.
pub fn unresolved_namespace(prefix: &str, range: Range) -> Diagnostic {
    Diagnostic::warning(format!("Unresolved namespace prefix: {prefix}")).with_range(range)
}

/// Creates a diagnostic for a `scatter` entry that is not a declared input
/// port of its step.
pub fn scatter_unknown_port<S: AsRef<str>>(
    name: &str,
    declared: &[S],
    range: Range,
) -> Diagnostic {
    Diagnostic::error(format!(
        "Scattered parameter {name} is not an input port of this step. Input ports: {declared}",
        declared = quoted_list(declared)
    ))
    .with_range(range)
}

/// Creates a diagnostic for an unrecognized `cwlVersion`.
pub fn unsupported_cwl_version(version: &str, fallback: &str, range: Range) -> Diagnostic {
    Diagnostic::warning(format!(
        "Unrecognized cwlVersion {version}; validating against {fallback}"
    ))
    .with_range(range)
}

/// Creates a diagnostic for a value that must be a list or a map but is
/// neither.
pub fn expecting_list_or_map(range: Range) -> Diagnostic {
    Diagnostic::error("Expecting a list or a map here").with_range(range)
}

/// Creates a diagnostic for a document whose root is not a mapping.
pub fn not_a_cwl_document(range: Range) -> Diagnostic {
    Diagnostic::error("Expecting a CWL process document (a mapping with a class field)")
        .with_range(range)
}

/// Creates a diagnostic from a list-as-map projection problem.
pub fn identity_error(error: &IdentityError) -> Diagnostic {
    match error {
        IdentityError::NotARecord { range, .. } => {
            Diagnostic::error("Expecting a record here").with_range(*range)
        }
        IdentityError::MissingIdentity { field, range } => {
            Diagnostic::error(format!("Missing required field: {field}")).with_range(*range)
        }
        IdentityError::Duplicate { key, range } => {
            Diagnostic::error(format!("Duplicate id: {key}")).with_range(*range)
        }
    }
}
