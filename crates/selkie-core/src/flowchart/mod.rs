//! Flowchart dialect: lexical tables, tokenizer, parser and span-precise
//! mutators.

pub mod lexical;
pub(crate) mod lexer;
pub mod model;
pub mod mutate;
pub mod parse;

pub use lexical::{ArrowHead, ArrowKind, NodeShape, Stroke};
pub use model::{FlowEdge, FlowNode, FlowSubgraph, FlowchartModel};
pub use parse::{find_node_subgraph, parse_flowchart};
