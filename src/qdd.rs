//! The QMDD engine.
//!
//! [`Qdd`] is the manager every operation goes through: it owns the unique
//! table of nodes, the complex value table, and the computed-result cache.
//! All canonical-form invariants are enforced in [`Qdd::make_node`], the
//! single gateway through which every node in the system is created.
//!
//! A node has level `v >= 0` (one level per qubit) and four children, one per
//! 2x2 submatrix position in row-major order; a state vector stores its two
//! successors at positions 0 and 2 (column 0). The distinguished terminal
//! node at index 1 represents the scalar 1 and has level -1.
//!
//! # Reference counting
//!
//! `inc_ref`/`dec_ref` adjust only the edge's node count and its two weight
//! entries; they never recurse, so hot-path decrements are O(1). Reclamation
//! happens only in [`Qdd::garbage_collect`], which marks from every node with
//! a positive count, sweeps the rest, and discards the whole computed cache
//! (cached results key on node handles that collection may recycle).
//! Collection is never triggered from inside `multiply` or the constructors;
//! callers decide when it is safe.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::HashSet;
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::complex::{ComplexTable, Weight};
use crate::edge::{Edge, NodeId};
use crate::table::{MyHash, UniqueTable};
use crate::utils::pairing2;

/// A 2x2 elementary gate matrix, entries as `(re, im)` pairs.
pub type GateMatrix = [[(f64, f64); 2]; 2];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub level: i32,
    pub children: [Edge; 4],
}

impl Default for Node {
    fn default() -> Self {
        Self {
            level: -1,
            children: [Edge::ZERO; 4],
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        fxhash::hash64(self)
    }
}

/// Key of a memoized operation over canonical operand identities.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OpKey {
    /// Multiply keys on node handles only: top weights are factored out
    /// before the recursion, so structurally equal products share one entry.
    Mul(NodeId, NodeId),
    /// Add keys on full edge identities.
    Add(Edge, Edge),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        match self {
            // Two 32-bit handles pair injectively into one u64, so two
            // distinct multiply keys can never share a cache entry.
            OpKey::Mul(x, y) => pairing2(x.index() as u64, y.index() as u64),
            // A full edge pair exceeds 64 bits; this one stays lossy.
            OpKey::Add(x, y) => fxhash::hash64(&(x, y)),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Line {
    None,
    Control,
    Target,
}

pub struct Qdd {
    storage: RefCell<UniqueTable<Node>>,
    values: RefCell<ComplexTable>,
    cache: RefCell<Cache<OpKey, Edge>>,
    /// Node count below which a non-forced collection is skipped.
    gc_limit: usize,
}

impl Qdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let cache_bits = min(storage_bits, 16);

        let mut storage = UniqueTable::new(storage_bits);

        // Allocate the terminal node. Its cell keeps the default value
        // (level -1, zero children).
        let terminal = storage.alloc();
        assert_eq!(terminal, NodeId::TERMINAL.index());

        Self {
            storage: RefCell::new(storage),
            values: RefCell::new(ComplexTable::new()),
            cache: RefCell::new(Cache::new(cache_bits)),
            gc_limit: (1 << storage_bits) / 2,
        }
    }
}

impl Default for Qdd {
    fn default() -> Self {
        Qdd::new(20)
    }
}

impl Debug for Qdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Qdd")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("real_size", &storage.real_size())
            .field("values", &self.values.borrow().live_count())
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl Qdd {
    /// Canonical equality: identical node handles and equal interned weights.
    /// Never a structural traversal -- canonicalization makes the plain value
    /// comparison sufficient, and a traversal would mask sharing violations
    /// instead of surfacing them.
    pub fn equals(a: Edge, b: Edge) -> bool {
        a == b
    }

    /// The edge representing the scalar 1.
    pub fn one(&self) -> Edge {
        Edge::terminal(Weight::ONE)
    }

    pub fn level(&self, id: NodeId) -> i32 {
        self.storage.borrow().value(id.index()).level
    }

    pub fn children(&self, id: NodeId) -> [Edge; 4] {
        self.storage.borrow().value(id.index()).children
    }

    /// Number of qubits an edge spans (its level plus one).
    pub fn qubits(&self, e: Edge) -> u16 {
        (self.level(e.node) + 1) as u16
    }

    pub fn weight_value(&self, w: Weight) -> (f64, f64) {
        self.values.borrow().weight_value(w)
    }

    /// Intern a raw complex scalar.
    pub fn weight(&self, re: f64, im: f64) -> Weight {
        self.values.borrow_mut().weight(re, im)
    }

    pub fn mul_weights(&self, a: Weight, b: Weight) -> Weight {
        self.values.borrow_mut().mul(a, b)
    }

    /// Live entries in the complex value table (pinned constants included).
    pub fn complex_count(&self) -> usize {
        self.values.borrow().live_count()
    }

    /// Occupied slots in the computed-result cache.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Live nodes in the unique table (terminal included).
    pub fn node_count(&self) -> usize {
        self.storage.borrow().real_size()
    }

    fn edge(node: NodeId, w: Weight) -> Edge {
        if w.is_zero() {
            Edge::ZERO
        } else {
            Edge { node, w }
        }
    }

    /// Create (or find) the canonical node for `(level, children)`.
    ///
    /// Applies redundant-node elimination, then weight normalization, then
    /// hash-consing. The normalization policy is fixed: the child with the
    /// largest squared magnitude (earliest index on ties) becomes the
    /// reference; its weight moves to the returned edge and every child is
    /// divided by it. Mathematically identical diagrams therefore produce
    /// bit-identical weight references regardless of construction order.
    pub fn make_node(&self, level: i32, children: [Edge; 4]) -> Edge {
        debug!(
            "make_node(level = {}, children = [{}, {}, {}, {}])",
            level, children[0], children[1], children[2], children[3]
        );

        assert!(level >= 0, "Node level should be non-negative");
        for c in &children {
            debug_assert!(
                self.level(c.node) < level,
                "Child level must be below the node level"
            );
        }

        // Redundant node: all four children are the same edge.
        if children.iter().all(|&c| c == children[0]) {
            debug!("make_node: redundant, returning {}", children[0]);
            return children[0];
        }

        // Normalize child weights against the reference magnitude.
        let mut values = self.values.borrow_mut();
        let mut argmax = usize::MAX;
        let mut max = 0.0;
        for (i, c) in children.iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            let m = values.mag2(c.w);
            if argmax == usize::MAX || m > max {
                argmax = i;
                max = m;
            }
        }
        // All-zero children are pairwise equal and were handled above.
        assert_ne!(argmax, usize::MAX, "Unreachable: no nonzero child");

        let top = children[argmax].w;
        let mut normalized = [Edge::ZERO; 4];
        for (i, c) in children.iter().enumerate() {
            normalized[i] = if c.is_zero() {
                Edge::ZERO
            } else if i == argmax {
                Edge {
                    node: c.node,
                    w: Weight::ONE,
                }
            } else {
                Self::edge(c.node, values.div(c.w, top))
            };
        }
        drop(values);

        let (index, inserted) = self.storage.borrow_mut().put(Node {
            level,
            children: normalized,
        });
        if inserted {
            // The node now holds its child weights alive.
            let mut values = self.values.borrow_mut();
            for c in &normalized {
                values.inc_ref(c.w.re);
                values.inc_ref(c.w.im);
            }
        }

        Edge {
            node: NodeId::new(index as u32),
            w: top,
        }
    }

    /// Identity operator spanning levels `lo..=hi` (scalar 1 when `hi < lo`).
    pub fn make_identity(&self, lo: i32, hi: i32) -> Edge {
        let mut e = self.one();
        for z in lo..=hi {
            e = self.make_node(z, [e, Edge::ZERO, Edge::ZERO, e]);
        }
        e
    }

    /// The state |0...0> over `nqubits` qubits.
    pub fn make_zero_state(&self, nqubits: u16) -> Edge {
        let mut e = self.one();
        for z in 0..nqubits as i32 {
            e = self.make_node(z, [e, Edge::ZERO, Edge::ZERO, Edge::ZERO]);
        }
        e
    }

    /// Build the DD of one elementary gate directly from its 2x2 matrix,
    /// with any number of positive controls, without recursing over a
    /// circuit. Routed entirely through [`Qdd::make_node`].
    pub fn make_gate_dd(
        &self,
        mat: &GateMatrix,
        nqubits: u16,
        controls: &[u16],
        target: u16,
    ) -> Edge {
        assert!(target < nqubits, "Target qubit out of range");

        let mut line = vec![Line::None; nqubits as usize];
        line[target as usize] = Line::Target;
        for &c in controls {
            assert!(c < nqubits, "Control qubit out of range");
            assert_ne!(c, target, "Control coincides with target");
            line[c as usize] = Line::Control;
        }

        let mut em = [Edge::ZERO; 4];
        {
            let mut values = self.values.borrow_mut();
            for r in 0..2 {
                for c in 0..2 {
                    let (re, im) = mat[r][c];
                    em[r * 2 + c] = Edge::terminal(values.weight(re, im));
                }
            }
        }

        // Levels below the target: expand each of the four target blocks.
        let mut z = 0usize;
        while line[z] != Line::Target {
            for i1 in 0..2 {
                for i2 in 0..2 {
                    let i = i1 * 2 + i2;
                    em[i] = match line[z] {
                        Line::None => {
                            self.make_node(z as i32, [em[i], Edge::ZERO, Edge::ZERO, em[i]])
                        }
                        Line::Control => {
                            // Control clear: the block is identity on the
                            // diagonal and vanishes off it.
                            let diag = if i1 == i2 {
                                self.make_identity(0, z as i32 - 1)
                            } else {
                                Edge::ZERO
                            };
                            self.make_node(z as i32, [diag, Edge::ZERO, Edge::ZERO, em[i]])
                        }
                        Line::Target => unreachable!(),
                    };
                }
            }
            z += 1;
        }

        let mut e = self.make_node(z as i32, em);
        z += 1;

        // Levels above the target.
        while z < nqubits as usize {
            e = match line[z] {
                Line::None => self.make_node(z as i32, [e, Edge::ZERO, Edge::ZERO, e]),
                Line::Control => {
                    let id = self.make_identity(0, z as i32 - 1);
                    self.make_node(z as i32, [id, Edge::ZERO, Edge::ZERO, e])
                }
                Line::Target => unreachable!("Exactly one target line"),
            };
            z += 1;
        }

        e
    }

    /// Product of the operators/states represented by `x` and `y` (`x`
    /// applied to `y`). Memoized; see [`OpKey::Mul`].
    pub fn multiply(&self, x: Edge, y: Edge) -> Edge {
        if x.is_zero() || y.is_zero() {
            return Edge::ZERO;
        }

        let w = self.values.borrow_mut().mul(x.w, y.w);
        if x.is_terminal() && y.is_terminal() {
            return Self::edge(NodeId::TERMINAL, w);
        }
        if w.is_zero() {
            return Edge::ZERO;
        }

        let r = self.multiply_nodes(x.node, y.node);
        if r.is_zero() {
            return Edge::ZERO;
        }
        let rw = self.values.borrow_mut().mul(r.w, w);
        Self::edge(r.node, rw)
    }

    /// Multiply with both top weights factored out by the caller.
    fn multiply_nodes(&self, x: NodeId, y: NodeId) -> Edge {
        let key = OpKey::Mul(x, y);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: multiply({}, {}) -> {}", x, y, res);
            return res;
        }

        let xl = self.level(x);
        let yl = self.level(y);
        let var = xl.max(yl);
        debug_assert!(var >= 0);

        let mut r = [Edge::ZERO; 4];
        for i in [0usize, 2] {
            for j in 0..2usize {
                let mut e = Edge::ZERO;
                for k in 0..2usize {
                    // An operand below the governing level is skipped: it
                    // stands for a node with four identical children.
                    let e1 = if xl == var {
                        self.children(x)[i + k]
                    } else {
                        Edge {
                            node: x,
                            w: Weight::ONE,
                        }
                    };
                    let e2 = if yl == var {
                        self.children(y)[2 * k + j]
                    } else {
                        Edge {
                            node: y,
                            w: Weight::ONE,
                        }
                    };
                    let m = self.multiply(e1, e2);
                    e = self.add(e, m);
                }
                r[i + j] = e;
            }
        }

        let res = self.make_node(var, r);
        debug!("computed: multiply({}, {}) -> {}", x, y, res);
        self.cache.borrow_mut().insert(&key, res);
        res
    }

    /// Sum of two DDs of the same shape. Memoized on full edge identities.
    pub fn add(&self, x: Edge, y: Edge) -> Edge {
        if x.is_zero() {
            return y;
        }
        if y.is_zero() {
            return x;
        }
        if x.is_terminal() && y.is_terminal() {
            let w = self.values.borrow_mut().add(x.w, y.w);
            return Self::edge(NodeId::TERMINAL, w);
        }

        // Addition is commutative; order the operands so both argument
        // orders hit the same cache entry.
        let swap = (y.node.index(), y.w.re.index(), y.w.im.index())
            < (x.node.index(), x.w.re.index(), x.w.im.index());
        let (x, y) = if swap { (y, x) } else { (x, y) };

        let key = OpKey::Add(x, y);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: add({}, {}) -> {}", x, y, res);
            return res;
        }

        let xl = self.level(x.node);
        let yl = self.level(y.node);
        let var = xl.max(yl);

        let mut r = [Edge::ZERO; 4];
        for (i, slot) in r.iter_mut().enumerate() {
            let e1 = if xl == var {
                let c = self.children(x.node)[i];
                let w = self.values.borrow_mut().mul(x.w, c.w);
                Self::edge(c.node, w)
            } else {
                x
            };
            let e2 = if yl == var {
                let c = self.children(y.node)[i];
                let w = self.values.borrow_mut().mul(y.w, c.w);
                Self::edge(c.node, w)
            } else {
                y
            };
            *slot = self.add(e1, e2);
        }

        let res = self.make_node(var, r);
        debug!("computed: add({}, {}) -> {}", x, y, res);
        self.cache.borrow_mut().insert(&key, res);
        res
    }

    /// Acquire one caller-owned reference to `e`.
    pub fn inc_ref(&self, e: Edge) {
        {
            let mut values = self.values.borrow_mut();
            values.inc_ref(e.w.re);
            values.inc_ref(e.w.im);
        }
        if !e.is_terminal() {
            self.storage.borrow_mut().inc_ref(e.node.index());
        }
    }

    /// Release one caller-owned reference to `e`. Does not recurse into
    /// children; they stay until the next collection pass.
    pub fn dec_ref(&self, e: Edge) {
        {
            let mut values = self.values.borrow_mut();
            values.dec_ref(e.w.re);
            values.dec_ref(e.w.im);
        }
        if !e.is_terminal() {
            self.storage.borrow_mut().dec_ref(e.node.index());
        }
    }

    /// Reclaim every node and value entry that is dead: zero count and not
    /// reachable from any node with a positive count. Clears the whole
    /// computed-result cache. A non-forced pass is skipped while the table
    /// is small.
    pub fn garbage_collect(&self, force: bool) {
        {
            let storage = self.storage.borrow();
            if !force && storage.real_size() < self.gc_limit {
                return;
            }
        }
        debug!("Collecting garbage...");

        self.cache.borrow_mut().clear();

        let mut storage = self.storage.borrow_mut();
        let mut values = self.values.borrow_mut();

        // Mark: every positively referenced node is a root.
        let mut alive = HashSet::new();
        alive.insert(NodeId::TERMINAL.index());
        let mut queue = Vec::new();
        for i in NodeId::TERMINAL.index() + 1..=storage.size() {
            if storage.is_occupied(i) && storage.ref_count(i) > 0 {
                queue.push(i);
            }
        }
        while let Some(i) = queue.pop() {
            if alive.insert(i) {
                for c in storage.value(i).children {
                    if !c.node.is_terminal() {
                        queue.push(c.node.index());
                    }
                }
            }
        }

        // Sweep bucket chains, unlinking and dropping dead cells.
        for b in 0..storage.num_buckets() {
            let mut index = storage.bucket(b);
            if index == 0 {
                continue;
            }

            while index != 0 && !alive.contains(&index) {
                let next = storage.next(index);
                debug!("Dropping node {}, next = {}", index, next);
                Self::release_node(&mut storage, &mut values, index);
                index = next;
            }
            storage.set_bucket(b, index);

            let mut prev = index;
            while prev != 0 {
                let mut cur = storage.next(prev);
                while cur != 0 && !alive.contains(&cur) {
                    let next = storage.next(cur);
                    debug!("Dropping node {}, prev = {}, next = {}", cur, prev, next);
                    Self::release_node(&mut storage, &mut values, cur);
                    cur = next;
                }
                if storage.next(prev) != cur {
                    storage.set_next(prev, cur);
                }
                prev = cur;
            }
        }

        values.collect();
        debug!(
            "{} nodes, {} value entries live after collection",
            storage.real_size(),
            values.live_count()
        );
    }

    fn release_node(storage: &mut UniqueTable<Node>, values: &mut ComplexTable, index: usize) {
        let children = storage.value(index).children;
        for c in children {
            values.dec_ref(c.w.re);
            values.dec_ref(c.w.im);
        }
        storage.drop(index);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const X_MAT: GateMatrix = [[(0.0, 0.0), (1.0, 0.0)], [(1.0, 0.0), (0.0, 0.0)]];
    const H_MAT: GateMatrix = [
        [
            (std::f64::consts::FRAC_1_SQRT_2, 0.0),
            (std::f64::consts::FRAC_1_SQRT_2, 0.0),
        ],
        [
            (std::f64::consts::FRAC_1_SQRT_2, 0.0),
            (-std::f64::consts::FRAC_1_SQRT_2, 0.0),
        ],
    ];

    #[test]
    fn test_terminal() {
        let dd = Qdd::default();
        assert_eq!(dd.level(NodeId::TERMINAL), -1);
        assert!(dd.one().is_terminal());
        assert!(!dd.one().is_zero());
        assert!(Qdd::equals(dd.one(), dd.one()));
        assert_eq!(dd.node_count(), 1);
    }

    #[test]
    fn test_redundant_node_eliminated() {
        let dd = Qdd::default();
        let e = dd.make_identity(0, 0);
        let r = dd.make_node(1, [e; 4]);
        assert_eq!(r, e);
        let z = dd.make_node(1, [Edge::ZERO; 4]);
        assert!(z.is_zero());
    }

    #[test]
    fn test_identity_shared() {
        let dd = Qdd::default();
        let a = dd.make_identity(0, 3);
        let b = dd.make_identity(0, 3);
        assert!(Qdd::equals(a, b));
        assert_eq!(dd.level(a.node), 3);
        assert!(a.w.is_one());
    }

    #[test]
    fn test_zero_state() {
        let dd = Qdd::default();
        let e = dd.make_zero_state(3);
        assert_eq!(dd.level(e.node), 2);
        assert!(e.w.is_one());
        let c = dd.children(e.node);
        assert!(c[1].is_zero());
        assert!(c[2].is_zero());
        assert!(c[3].is_zero());
    }

    #[test]
    fn test_normalization_h() {
        let dd = Qdd::default();
        let h = dd.make_gate_dd(&H_MAT, 1, &[], 0);
        // All children have magnitude 1/sqrt(2); the first becomes the
        // reference, so the top weight is the pinned 1/sqrt(2) entry.
        let (re, im) = dd.weight_value(h.w);
        assert!((re - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(im, 0.0);
        let c = dd.children(h.node);
        assert!(c[0].w.is_one());
        assert!(c[1].w.is_one());
        assert!(c[2].w.is_one());
        let (re, im) = dd.weight_value(c[3].w);
        assert_eq!((re, im), (-1.0, 0.0));
    }

    #[test]
    fn test_multiply_zero_short_circuit() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, 1);
        assert!(dd.multiply(Edge::ZERO, ident).is_zero());
        assert!(dd.multiply(ident, Edge::ZERO).is_zero());
    }

    #[test]
    fn test_multiply_identity_absorbing() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, 1);
        let e = dd.multiply(ident, ident);
        assert!(Qdd::equals(e, ident));

        let x = dd.make_gate_dd(&X_MAT, 2, &[], 0);
        assert!(Qdd::equals(dd.multiply(ident, x), x));
        assert!(Qdd::equals(dd.multiply(x, ident), x));
    }

    #[test]
    fn test_x_involution() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, 1);
        let x = dd.make_gate_dd(&X_MAT, 2, &[], 1);
        let e = dd.multiply(x, x);
        assert!(Qdd::equals(e, ident));
    }

    #[test]
    fn test_h_involution() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, 2);
        let h = dd.make_gate_dd(&H_MAT, 3, &[], 1);
        let e = dd.multiply(h, h);
        assert!(Qdd::equals(e, ident));
    }

    #[test]
    fn test_controlled_x_on_state() {
        let dd = Qdd::default();
        // CX(control 1 -> target 0) on |00> does nothing.
        let cx = dd.make_gate_dd(&X_MAT, 2, &[1], 0);
        let zero = dd.make_zero_state(2);
        let e = dd.multiply(cx, zero);
        assert!(Qdd::equals(e, zero));

        // X(1) then CX(1 -> 0) flips qubit 0 as well.
        let x1 = dd.make_gate_dd(&X_MAT, 2, &[], 1);
        let one1 = dd.multiply(x1, zero);
        let flipped = dd.multiply(cx, one1);
        let x0 = dd.make_gate_dd(&X_MAT, 2, &[], 0);
        let expected = dd.multiply(x0, one1);
        assert!(Qdd::equals(flipped, expected));
    }

    #[test]
    fn test_add_vectors() {
        let dd = Qdd::default();
        let zero = dd.make_zero_state(1);
        let x = dd.make_gate_dd(&X_MAT, 1, &[], 0);
        let one = dd.multiply(x, zero);
        // |0> + |1> is sqrt(2) * H|0>: same node, weight rescaled to 1.
        let sum = dd.add(zero, one);
        let h = dd.make_gate_dd(&H_MAT, 1, &[], 0);
        let plus = dd.multiply(h, zero);
        assert_eq!(sum.node, plus.node);
        assert!(Qdd::equals(
            sum,
            Edge {
                node: plus.node,
                w: Weight::ONE
            }
        ));
        // Adding the zero edge is the identity of add.
        assert!(Qdd::equals(dd.add(sum, Edge::ZERO), sum));
    }

    #[test]
    fn test_garbage_collect_reclaims_everything() {
        let dd = Qdd::default();
        let initial_complex = dd.complex_count();
        let initial_cache = dd.cache_len();

        let h = dd.make_gate_dd(&H_MAT, 3, &[], 0);
        let ident = dd.make_identity(0, 2);
        let e = dd.multiply(h, ident);
        dd.inc_ref(e);
        assert!(dd.node_count() > 1);

        dd.garbage_collect(true);
        // The held root and its descendants survive.
        assert!(Qdd::equals(dd.multiply(e, e), dd.make_identity(0, 2)));

        dd.dec_ref(e);
        dd.garbage_collect(true);
        assert_eq!(dd.node_count(), 1);
        assert_eq!(dd.complex_count(), initial_complex);
        assert_eq!(dd.cache_len(), initial_cache);
    }

    #[test]
    fn test_gc_clears_cache() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, 1);
        dd.inc_ref(ident);
        let _ = dd.multiply(ident, ident);
        assert!(dd.cache_len() > 0);
        dd.garbage_collect(true);
        assert_eq!(dd.cache_len(), 0);
    }

    #[test]
    fn test_multiply_cache_keys_distinct() {
        // Every pair of node handles must map to its own cache key; a
        // shared key would let one product silently answer for another.
        let mut seen = std::collections::HashSet::new();
        for a in 1..=64u32 {
            for b in 1..=64u32 {
                let h = OpKey::Mul(NodeId::new(a), NodeId::new(b)).hash();
                assert!(seen.insert(h), "key collision for ({}, {})", a, b);
            }
        }
    }

    #[test]
    #[should_panic(expected = "Refcount underflow")]
    fn test_dec_ref_underflow() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, 0);
        dd.dec_ref(ident);
    }
}
