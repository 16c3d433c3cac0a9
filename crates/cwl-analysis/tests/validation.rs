//! End-to-end validation tests: analyze complete documents and check the
//! diagnostics the walk produces.

use std::fs;

use cwl_analysis::Document;
use cwl_analysis::Severity;
use pretty_assertions::assert_eq;
use url::Url;

/// Collects the diagnostic messages of a document, in discovery order.
fn messages(document: &Document) -> Vec<String> {
    document
        .diagnostics()
        .iter()
        .map(|d| d.message().to_string())
        .collect()
}

/// Collects only the error-severity messages of a document.
fn errors(document: &Document) -> Vec<String> {
    document
        .diagnostics()
        .iter()
        .filter(|d| d.severity().is_error())
        .map(|d| d.message().to_string())
        .collect()
}

#[test]
fn missing_required_sections() {
    let document = Document::analyze("cwlVersion: v1.2\nclass: CommandLineTool\n", None);
    assert_eq!(
        messages(&document),
        [
            "Missing required section: inputs",
            "Missing required section: outputs"
        ]
    );
    // Anchored at the class declaration.
    assert_eq!(document.diagnostics()[0].range().start.line, 1);
}

#[test]
fn unknown_field_warns() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         inputs: {}\n\
         outputs: {}\n\
         basecommand: echo\n",
        None,
    );
    assert_eq!(messages(&document), ["Unknown field: basecommand"]);
    assert_eq!(document.diagnostics()[0].severity(), Severity::Warning);
}

#[test]
fn connection_errors_name_the_step_and_port() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs:\n\
         \x20 final:\n\
         \x20   type: File\n\
         \x20   outputSource: step1/missingPort\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run:\n\
         \x20     class: CommandLineTool\n\
         \x20     inputs:\n\
         \x20       reads: File\n\
         \x20     outputs:\n\
         \x20       bam: File\n\
         \x20   in:\n\
         \x20     reads: missing_step/out\n\
         \x20   out: [bam]\n",
        None,
    );
    let found = messages(&document);
    assert!(
        found.contains(&"step1 has no output port missingPort".to_string()),
        "found {found:?}"
    );
    assert!(
        found.contains(&"No such step missing_step".to_string()),
        "found {found:?}"
    );
    assert_eq!(found.len(), 2);
}

#[test]
fn undeclared_step_input_lists_the_declared_ports() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs: {}\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run:\n\
         \x20     class: CommandLineTool\n\
         \x20     inputs:\n\
         \x20       reads: File\n\
         \x20     outputs:\n\
         \x20       bam: File\n\
         \x20   in:\n\
         \x20     x: reads\n\
         \x20   out: [bam]\n",
        None,
    );
    assert_eq!(
        messages(&document),
        ["step1 has no input port called x. Input ports: ['reads']"]
    );
}

#[test]
fn step_may_not_connect_to_itself() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs: {}\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run:\n\
         \x20     class: CommandLineTool\n\
         \x20     inputs:\n\
         \x20       reads: File\n\
         \x20     outputs:\n\
         \x20       bam: File\n\
         \x20   in:\n\
         \x20     reads: step1/bam\n\
         \x20   out: [bam]\n",
        None,
    );
    assert_eq!(messages(&document), ["Step step1 references itself"]);
}

#[test]
fn scatter_must_name_an_input_port() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs: {}\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run:\n\
         \x20     class: CommandLineTool\n\
         \x20     inputs:\n\
         \x20       reads: File\n\
         \x20     outputs:\n\
         \x20       bam: File\n\
         \x20   scatter: nope\n\
         \x20   in:\n\
         \x20     reads: reads\n\
         \x20   out: [bam]\n",
        None,
    );
    assert_eq!(
        messages(&document),
        ["Scattered parameter nope is not an input port of this step. Input ports: ['reads']"]
    );
}

#[test]
fn when_references_extend_the_step_input_set() {
    // `cond` is not an input of the run process, but `when` references it,
    // so wiring it in is legal.
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         \x20 flag: boolean\n\
         outputs: {}\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run:\n\
         \x20     class: CommandLineTool\n\
         \x20     inputs:\n\
         \x20       reads: File\n\
         \x20     outputs:\n\
         \x20       bam: File\n\
         \x20   when: $(inputs.cond)\n\
         \x20   in:\n\
         \x20     reads: reads\n\
         \x20     cond: flag\n\
         \x20   out: [bam]\n",
        None,
    );
    assert!(
        messages(&document).is_empty(),
        "unexpected diagnostics: {:?}",
        messages(&document)
    );
}

#[test]
fn unknown_requirement_errors_but_unknown_hint_warns() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         requirements:\n\
         \x20 - class: MadeUpRequirement\n\
         hints:\n\
         \x20 - class: MadeUpHint\n\
         inputs: {}\n\
         outputs: {}\n",
        None,
    );

    let errors = errors(&document);
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].starts_with("Unknown class MadeUpRequirement"),
        "found {errors:?}"
    );

    let warnings: Vec<&str> = document
        .diagnostics()
        .iter()
        .filter(|d| d.severity() == Severity::Warning)
        .map(|d| d.message())
        .collect();
    assert_eq!(warnings, ["Unknown hint class MadeUpHint"]);
}

#[test]
fn schema_def_types_are_usable_in_type_expressions() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         requirements:\n\
         \x20 SchemaDefRequirement:\n\
         \x20   types:\n\
         \x20     - name: paired_end\n\
         \x20       type: enum\n\
         \x20       symbols: [paired, single]\n\
         inputs:\n\
         \x20 mode: paired_end\n\
         \x20 bad: not_a_type\n\
         outputs: {}\n",
        None,
    );

    // `mode` resolves against the user-defined enum; only `bad` is flagged.
    let errors = errors(&document);
    assert_eq!(errors.len(), 1, "found {errors:?}");
    assert!(errors[0].starts_with("Expecting one of:"), "found {errors:?}");
    assert!(errors[0].contains("'paired_end'"), "found {errors:?}");
}

#[test]
fn expression_library_is_collected() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         requirements:\n\
         \x20 InlineJavascriptRequirement:\n\
         \x20   expressionLib:\n\
         \x20     - \"function reverse(s) { return s.split('').reverse().join(''); }\"\n\
         inputs: {}\n\
         outputs: {}\n",
        None,
    );
    assert!(messages(&document).is_empty());
    assert_eq!(document.expression_lib().len(), 1);
    assert!(document.expression_lib()[0].starts_with("function reverse"));
}

#[test]
fn duplicate_ids_are_flagged() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         inputs:\n\
         \x20 - id: reads\n\
         \x20   type: File\n\
         \x20 - id: reads\n\
         \x20   type: File\n\
         outputs: {}\n",
        None,
    );
    assert_eq!(messages(&document), ["Duplicate id: reads"]);
}

#[test]
fn namespaced_classes_need_a_declared_prefix() {
    let without = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         hints:\n\
         \x20 - class: custom:Accelerator\n\
         inputs: {}\n\
         outputs: {}\n",
        None,
    );
    assert_eq!(
        messages(&without),
        ["Unresolved namespace prefix: custom"]
    );
    assert_eq!(without.diagnostics()[0].severity(), Severity::Warning);

    let with = Document::analyze(
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         $namespaces:\n\
         \x20 custom: https://example.com/schema#\n\
         hints:\n\
         \x20 - class: custom:Accelerator\n\
         inputs: {}\n\
         outputs: {}\n",
        None,
    );
    assert!(messages(&with).is_empty(), "found {:?}", messages(&with));
}

#[test]
fn when_is_not_a_field_before_v1_2() {
    let text = |version: &str| {
        format!(
            "cwlVersion: {version}\n\
             class: Workflow\n\
             inputs:\n\
             \x20 reads: File\n\
             outputs: {{}}\n\
             steps:\n\
             \x20 step1:\n\
             \x20   run:\n\
             \x20     class: CommandLineTool\n\
             \x20     inputs:\n\
             \x20       reads: File\n\
             \x20     outputs:\n\
             \x20       bam: File\n\
             \x20   when: $(inputs.reads)\n\
             \x20   in:\n\
             \x20     reads: reads\n\
             \x20   out: [bam]\n"
        )
    };

    let v10 = Document::analyze(&text("v1.0"), None);
    assert_eq!(messages(&v10), ["Unknown field: when"]);

    let v12 = Document::analyze(&text("v1.2"), None);
    assert!(messages(&v12).is_empty(), "found {:?}", messages(&v12));
}

#[test]
fn missing_run_file_is_diagnosed() {
    let dir = tempfile::tempdir().unwrap();
    let uri = Url::from_file_path(dir.path().join("wf.cwl")).unwrap();

    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs: {}\n\
         outputs: {}\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run: tool.cwl\n\
         \x20   in: {}\n\
         \x20   out: []\n",
        Some(&uri),
    );
    assert_eq!(messages(&document), ["Missing linked file: tool.cwl"]);
}

#[test]
fn linked_run_file_supplies_the_step_interface() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tool.cwl"),
        "cwlVersion: v1.2\n\
         class: CommandLineTool\n\
         baseCommand: samtools\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs:\n\
         \x20 bam: File\n",
    )
    .unwrap();
    let uri = Url::from_file_path(dir.path().join("wf.cwl")).unwrap();

    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs:\n\
         \x20 final:\n\
         \x20   type: File\n\
         \x20   outputSource: step1/bam\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run: tool.cwl\n\
         \x20   in:\n\
         \x20     reads: reads\n\
         \x20   out: [bam]\n",
        Some(&uri),
    );
    assert!(
        messages(&document).is_empty(),
        "unexpected diagnostics: {:?}",
        messages(&document)
    );

    let model = document.workflow().unwrap();
    let interface = &model.step_interfaces["step1"];
    assert_eq!(
        interface.inputs.iter().map(String::as_str).collect::<Vec<_>>(),
        ["reads"]
    );
    assert_eq!(
        interface.outputs.iter().map(String::as_str).collect::<Vec<_>>(),
        ["bam"]
    );
}

#[test]
fn document_model_is_the_outermost_workflow() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         outputs: {}\n\
         steps:\n\
         \x20 nested:\n\
         \x20   run:\n\
         \x20     class: Workflow\n\
         \x20     inputs:\n\
         \x20       x: File\n\
         \x20     outputs: {}\n\
         \x20     steps: {}\n\
         \x20   in:\n\
         \x20     x: reads\n\
         \x20   out: []\n",
        None,
    );
    assert!(
        messages(&document).is_empty(),
        "unexpected diagnostics: {:?}",
        messages(&document)
    );

    // The inline sub-workflow must not displace the document's own model.
    let model = document.workflow().unwrap();
    assert_eq!(
        model.input_ids.iter().map(String::as_str).collect::<Vec<_>>(),
        ["reads"]
    );
    assert_eq!(
        model.step_interfaces["nested"]
            .inputs
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>(),
        ["x"]
    );
}

#[test]
fn workflow_model_reports_ports() {
    let document = Document::analyze(
        "cwlVersion: v1.2\n\
         class: Workflow\n\
         inputs:\n\
         \x20 reads: File\n\
         \x20 sample: string\n\
         outputs:\n\
         \x20 final:\n\
         \x20   type: File\n\
         \x20   outputSource: step1/bam\n\
         steps:\n\
         \x20 step1:\n\
         \x20   run:\n\
         \x20     class: CommandLineTool\n\
         \x20     inputs:\n\
         \x20       reads: File\n\
         \x20     outputs:\n\
         \x20       bam: File\n\
         \x20   in:\n\
         \x20     reads: reads\n\
         \x20   out: [bam]\n",
        None,
    );
    let model = document.workflow().unwrap();
    assert_eq!(
        model.input_ids.iter().map(String::as_str).collect::<Vec<_>>(),
        ["reads", "sample"]
    );
    assert_eq!(
        model.output_ids.iter().map(String::as_str).collect::<Vec<_>>(),
        ["final"]
    );
    assert_eq!(
        model.connection_options(Some("step1")),
        ["reads", "sample"]
    );
    assert_eq!(
        model.connection_options(None),
        ["reads", "sample", "step1/bam"]
    );
}
