//! Mutation behavior across whole documents: spans, totality and the
//! restore properties the editor relies on.

use crate::flowchart::mutate::{
    add_edge, add_node, add_subgraph, move_node_out_of_subgraph, move_node_to_subgraph,
    remove_edge, remove_node, remove_subgraph, rename_subgraph, update_edge_arrow,
    update_edge_label, update_node_label, update_node_shape,
};
use crate::flowchart::{
    find_node_subgraph, parse_flowchart, ArrowHead, ArrowKind, NodeShape, Stroke,
};

const BASE: &str = "flowchart TD\n    A[Start] --> B{Decide}\n    B -->|yes| C([Ship])\n    B -->|no| D\n";

const GROUPED: &str =
    "flowchart TD\n    subgraph g1 [Group]\n        A[Start]\n        B\n    end\n    C --> A\n";

#[test]
fn missing_targets_leave_the_text_byte_identical() {
    assert_eq!(remove_edge(BASE, "A", "C"), BASE);
    assert_eq!(remove_node(BASE, "Zed"), BASE);
    assert_eq!(update_node_label(BASE, "Zed", "x"), BASE);
    assert_eq!(update_edge_arrow(BASE, "C", "A", &ArrowKind::solid_point()), BASE);
    assert_eq!(move_node_out_of_subgraph(BASE, "A"), BASE);
    assert_eq!(rename_subgraph(BASE, "g1", "x"), BASE);
}

#[test]
fn identity_label_rewrite_is_byte_identical() {
    assert_eq!(update_node_label(BASE, "A", "Start"), BASE);
}

#[test]
fn add_then_remove_node_restores_the_text() {
    let out = add_node(BASE, "E", "Review", &NodeShape::Rounded);
    assert!(out.contains("    E(Review)"));
    assert_eq!(remove_node(&out, "E"), BASE);
}

#[test]
fn add_then_remove_edge_restores_the_text() {
    let out = add_edge(BASE, "D", "A", &ArrowKind::solid_point(), None);
    assert!(out.contains("    D --> A"));
    assert_eq!(remove_edge(&out, "D", "A"), BASE);
}

#[test]
fn remove_node_strips_edges_and_keeps_other_declarations() {
    let out = remove_node(BASE, "B");
    assert_eq!(out, "flowchart TD\n    A[Start]\n    C([Ship])\n    D\n");
    let model = parse_flowchart(&out);
    assert!(model.node("B").is_none());
    assert!(model.edges.is_empty());
    assert_eq!(model.node("C").unwrap().label, "Ship");
}

#[test]
fn removing_one_edge_of_a_chain_rebuilds_the_rest() {
    let code = "flowchart LR\n    A --> B --> C\n";
    let out = remove_edge(code, "A", "B");
    assert!(out.contains("B --> C"));
    let model = parse_flowchart(&out);
    assert!(model.edge("A", "B").is_none());
    assert!(model.edge("B", "C").is_some());
    // A had no declaration elsewhere, so it survives as a bare reference.
    assert!(model.node("A").is_some());
}

#[test]
fn circle_shape_then_label_produces_plain_double_parens() {
    let out = update_node_shape(BASE, "A", &NodeShape::Circle);
    let out = update_node_label(&out, "A", "Go");
    assert!(out.contains("A((Go))"));
    assert!(!out.contains("A@{"));
}

#[test]
fn extended_shape_writes_fallback_and_annotation() {
    let quoted = "flowchart TD\n    A[\"Start\"] --> B\n";
    let out = update_node_shape(quoted, "A", &NodeShape::Named("cloud".to_string()));
    assert!(out.contains("A[\"Start\"] --> B"));
    assert!(out.contains("A@{ shape: cloud, label: \"Start\" }"));

    // Retargeting to a classic shape removes the stale annotation line.
    let back = update_node_shape(&out, "A", &NodeShape::Diamond);
    assert!(back.contains("A{Start}"));
    assert!(!back.contains("@{"));
}

#[test]
fn edge_label_updates_touch_only_the_arrow_span() {
    let out = update_edge_label(BASE, "B", "C", Some("maybe"));
    assert!(out.contains("    B -->|maybe| C([Ship])"));
    let cleared = update_edge_label(BASE, "B", "C", None);
    assert!(cleared.contains("    B --> C([Ship])"));
}

#[test]
fn edge_arrow_update_keeps_endpoints_and_label() {
    let dotted = ArrowKind {
        stroke: Stroke::Dotted,
        head: ArrowHead::Point,
        bidirectional: false,
    };
    let out = update_edge_arrow(BASE, "A", "B", &dotted);
    assert!(out.contains("    A[Start] -.-> B{Decide}"));
    let labeled = update_edge_arrow(BASE, "B", "C", &dotted);
    assert!(labeled.contains("    B -.->|yes| C([Ship])"));
}

#[test]
fn subgraph_wrappers_add_rename_remove() {
    let out = add_subgraph(BASE, "g2", "Extras");
    let model = parse_flowchart(&out);
    assert_eq!(model.subgraph("g2").unwrap().label, "Extras");

    let renamed = rename_subgraph(GROUPED, "g1", "Crew");
    assert!(renamed.contains("    subgraph g1 [Crew]"));

    let flattened = remove_subgraph(GROUPED, "g1");
    assert_eq!(
        flattened,
        "flowchart TD\n    A[Start]\n    B\n    C --> A\n"
    );
}

#[test]
fn move_out_places_the_declaration_after_the_closing_line() {
    assert_eq!(find_node_subgraph(GROUPED, "A").as_deref(), Some("g1"));
    let out = move_node_out_of_subgraph(GROUPED, "A");
    assert_eq!(find_node_subgraph(&out, "A"), None);
    let end_line = out.lines().position(|l| l.trim() == "end").unwrap();
    let decl_line = out.lines().position(|l| l.contains("A[Start]")).unwrap();
    assert!(decl_line > end_line);

    let back = move_node_to_subgraph(&out, "A", "g1");
    assert_eq!(find_node_subgraph(&back, "A").as_deref(), Some("g1"));
}

#[test]
fn moving_a_shared_line_declaration_leaves_a_bare_reference() {
    let code = "flowchart TD\n    subgraph g1\n    X\n    end\n    A[Start] --> B\n";
    let out = move_node_to_subgraph(code, "A", "g1");
    assert!(out.contains("    A --> B"));
    assert_eq!(find_node_subgraph(&out, "A").as_deref(), Some("g1"));
}

#[test]
fn unclosed_group_rejects_moves() {
    let code = "flowchart TD\n    subgraph g1\n    A[Start]\n";
    assert_eq!(move_node_out_of_subgraph(code, "A"), code);
    assert_eq!(move_node_to_subgraph(code, "A", "g1"), code);
}
