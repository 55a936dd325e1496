//! Conversation graph derivation.
//!
//! A completion is rendered as a linear chain: the prompt is node 1 and every
//! line of the completion becomes the next node in the path.


use serde::{Deserialize, Serialize};

/// Label used for the root node when the caller has no prompt of its own.
pub const DEFAULT_ROOT_LABEL: &str = "Start";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ConversationGraph {
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Build the chain graph for `prompt` followed by each line of `body`.
///
/// Empty lines are kept as nodes with an empty label. An empty `body` yields
/// the prompt node alone.
#[inline]
pub fn build_graph(prompt: &str, body: &str) -> ConversationGraph {
    let mut nodes = vec![Node {
        id: 1,
        label: prompt.to_string(),
    }];
    let mut edges = Vec::new();

    if body.is_empty() {
        return ConversationGraph { nodes, edges };
    }

    for (id, line) in (2..).zip(body.split('\n')) {
        nodes.push(Node {
            id,
            label: line.to_string(),
        });
        edges.push(Edge { from: id - 1, to: id });
    }

    ConversationGraph { nodes, edges }
}
