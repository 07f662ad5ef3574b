use crate::{detect_dialect, parse, parse_strict, Dialect, Error};

#[test]
fn parse_reports_dialect_title_and_model() {
    let text = "---\ntitle: Pipeline\n---\nflowchart LR\n    A --> B\n";
    let parsed = parse(text);
    assert_eq!(parsed.dialect, Dialect::Flowchart);
    assert_eq!(parsed.title.as_deref(), Some("Pipeline"));
    assert!(parsed.model.edge("A", "B").is_some());
}

#[test]
fn parse_is_total_on_unknown_text() {
    let parsed = parse("just some prose\n");
    assert_eq!(parsed.dialect, Dialect::Unsupported);
    assert!(parsed.model.nodes.is_empty());
}

#[test]
fn parse_strict_rejects_unknown_text() {
    let err = parse_strict("just some prose\n").unwrap_err();
    assert!(matches!(err, Error::UnsupportedDialect { .. }));
}

#[test]
fn every_supported_header_detects() {
    let cases = [
        ("flowchart TD\n", Dialect::Flowchart),
        ("graph LR\n", Dialect::Flowchart),
        ("classDiagram\n", Dialect::Class),
        ("erDiagram\n", Dialect::Er),
        ("stateDiagram-v2\n", Dialect::State),
        ("sequenceDiagram\n", Dialect::Sequence),
        ("gantt\n", Dialect::Gantt),
        ("pie\n", Dialect::Pie),
        ("mindmap\n", Dialect::Mindmap),
        ("timeline\n", Dialect::Timeline),
        ("C4Context\n", Dialect::C4),
        ("gitGraph\n", Dialect::GitGraph),
        ("quadrantChart\n", Dialect::Quadrant),
    ];
    for (text, expected) in cases {
        assert_eq!(detect_dialect(text), expected, "for {text:?}");
    }
}

#[test]
fn dialect_model_serializes_with_camel_case_keys() {
    let parsed = parse("flowchart TD\n    A[Go] --> B\n");
    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(json["dialect"], "flowchart");
    assert!(json["model"]["nodes"][0]["id"].is_string());
}
