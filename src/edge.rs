//! Edge and node references.
//!
//! A [`NodeId`] is a lightweight handle into the engine's unique table; its
//! validity is tied to the table that produced it. An [`Edge`] is the unit of
//! reference passed between operations: a node handle plus a canonical
//! [`Weight`]. Because nodes are hash-consed and weights interned, two edges
//! are canonically equal iff they are equal as plain values, which is exactly
//! what the derived `PartialEq` checks.

use std::fmt::{Display, Formatter};

use crate::complex::Weight;

/// Handle of a node in the unique table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The distinguished terminal node representing the scalar 1.
    /// It is allocated first by the engine and always has index 1.
    pub const TERMINAL: NodeId = NodeId(1);

    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 == Self::TERMINAL.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// `(node, weight)` pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Edge {
    pub node: NodeId,
    pub w: Weight,
}

impl Edge {
    /// The canonical zero edge. Every edge whose weight is 0 is rewritten to
    /// this one, so the zero check is a plain equality test.
    pub const ZERO: Edge = Edge {
        node: NodeId::TERMINAL,
        w: Weight::ZERO,
    };

    pub const fn terminal(w: Weight) -> Edge {
        Edge {
            node: NodeId::TERMINAL,
            w,
        }
    }

    pub fn is_zero(self) -> bool {
        self.w.is_zero()
    }

    pub fn is_terminal(self) -> bool {
        self.node.is_terminal()
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{},{}]", self.node, self.w.re, self.w.im)
    }
}
