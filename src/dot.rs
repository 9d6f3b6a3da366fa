//! DD to DOT (Graphviz) conversion.
//!
//! Renders the decision diagram rooted at an edge as a directed graph:
//!
//! - The terminal is a square at the bottom (sink rank).
//! - Non-terminal nodes are circles labeled `q<level>`, grouped by level.
//! - Each occupied branch becomes an arrow labeled with its branch index
//!   (0 to 3, row-major) and, unless it is one, the edge weight.
//! - The root is a rectangle at the top (source rank); its edge carries the
//!   root weight.
//!
//! Zero edges are not drawn. Render with `dot -Tpng output.dot -o output.png`.

use std::collections::BTreeMap;

use fxhash::FxHashMap;

use crate::complex::Weight;
use crate::edge::{Edge, NodeId};
use crate::qdd::Qdd;
use crate::serialize::fmt_complex;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for non-terminal nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for the terminal node (default: "square")
    pub terminal_shape: &'static str,
    /// Shape for the root marker (default: "rect")
    pub root_shape: &'static str,
    /// Whether to print weights on edges with weight one (default: false)
    pub label_unit_weights: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "square",
            root_shape: "rect",
            label_unit_weights: false,
        }
    }
}

impl Qdd {
    /// Converts the DD rooted at `e` to DOT (Graphviz) format.
    pub fn to_dot(&self, e: Edge) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(e, &DotConfig::default())
    }

    /// Converts the DD rooted at `e` to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, e: Edge, config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}, fixedsize=true];", config.node_shape)?;

        // Terminal node
        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape={}, label=\"1\"];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        // Collect all reachable non-terminal nodes, numbered in visit order.
        let mut ids: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut order: Vec<NodeId> = Vec::new();
        if !e.is_zero() && !e.is_terminal() {
            let mut queue = vec![e.node];
            while let Some(node) = queue.pop() {
                if ids.contains_key(&node) {
                    continue;
                }
                ids.insert(node, ids.len() + 1);
                order.push(node);
                for c in self.children(node) {
                    if !c.is_zero() && !c.is_terminal() {
                        queue.push(c.node);
                    }
                }
            }
        }

        // Group nodes by level for proper ranking (top level first).
        let mut levels = BTreeMap::<i32, Vec<NodeId>>::new();
        for &node in order.iter() {
            levels.entry(-self.level(node)).or_default().push(node);
        }
        for level in levels.values() {
            writeln!(dot, "{{ rank=same")?;
            for &node in level.iter() {
                writeln!(dot, "{} [label=\"q{}\"];", ids[&node], self.level(node))?;
            }
            writeln!(dot, "}}")?;
        }

        // Branch edges, labeled with the branch index and weight.
        for &node in order.iter() {
            for (branch, c) in self.children(node).into_iter().enumerate() {
                if c.is_zero() {
                    continue;
                }
                let to = if c.is_terminal() { 0 } else { ids[&c.node] };
                writeln!(
                    dot,
                    "{} -> {} [label=\"{}{}\"];",
                    ids[&node],
                    to,
                    branch,
                    self.edge_weight_label(c.w, config)
                )?;
            }
        }

        // Root marker at the top.
        writeln!(dot, "{{ rank=source")?;
        writeln!(dot, "r [shape={}, label=\"{}\"];", config.root_shape, e)?;
        writeln!(dot, "}}")?;
        if !e.is_zero() {
            let to = if e.is_terminal() { 0 } else { ids[&e.node] };
            writeln!(dot, "r -> {} [label=\"{}\"];", to, fmt_weight(self, e.w))?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    fn edge_weight_label(&self, w: Weight, config: &DotConfig) -> String {
        if w == Weight::ONE && !config.label_unit_weights {
            String::new()
        } else {
            format!(" {}", fmt_weight(self, w))
        }
    }
}

fn fmt_weight(dd: &Qdd, w: Weight) -> String {
    let (re, im) = dd.weight_value(w);
    fmt_complex(re, im)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::gate::Gate;

    #[test]
    fn test_to_dot_basic() {
        let dd = Qdd::default();
        let h = dd.make_gate_dd(&Gate::H.matrix(), 2, &[], 0);

        let dot = dd.to_dot(h).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("q1"));
        assert!(dot.contains("0.7071067811865476"));
    }

    #[test]
    fn test_to_dot_terminal_and_zero() {
        let dd = Qdd::default();
        assert!(dd.to_dot(dd.one()).unwrap().starts_with("digraph {"));
        assert!(dd.to_dot(Edge::ZERO).unwrap().starts_with("digraph {"));
    }

    #[test]
    fn test_to_dot_with_config() {
        let dd = Qdd::default();
        let x = dd.make_gate_dd(&Gate::X.matrix(), 1, &[], 0);

        let config = DotConfig {
            label_unit_weights: true,
            ..DotConfig::default()
        };
        let dot = dd.to_dot_with_config(x, &config).unwrap();
        assert!(dot.contains("label=\"1 1\"") || dot.contains("label=\"2 1\""));
    }
}
