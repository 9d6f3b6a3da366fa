//! Circuit-side collaborators of the engine.
//!
//! An [`Operation`] knows how to produce the DD (or inverse DD) of one
//! elementary step; a [`Circuit`] folds a sequence of them into a single
//! functionality DD, or applies them to a state vector. Non-unitary
//! operations (measurement, reset) have no DD representation and always fail
//! with [`Error::NotUnitary`]; callers must route those through a different
//! execution path.

use fxhash::FxHashMap;
use log::debug;

use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::gate::Gate;
use crate::qdd::Qdd;

/// Optional output permutation: logical qubit -> DD level.
/// Qubits absent from the map stay at their own level.
pub type LevelMap = FxHashMap<u16, u16>;

#[derive(Debug, Clone)]
pub enum Operation {
    /// A (possibly multi-controlled) single-target gate.
    Standard {
        gate: Gate,
        controls: Vec<u16>,
        target: u16,
    },
    /// Exchange of two qubits, built from three CNOTs.
    Swap(u16, u16),
    /// Exchange of two qubits with a phase of i on the swapped-in
    /// amplitudes, built from S, H and CNOT pairs.
    ISwap(u16, u16),
    /// Peres gate: CCX(control, middle -> target) followed by
    /// CX(control -> middle).
    Peres {
        control: u16,
        middle: u16,
        target: u16,
    },
    Measure {
        qubits: Vec<u16>,
        bits: Vec<u16>,
    },
    Reset {
        qubits: Vec<u16>,
    },
}

impl Operation {
    pub fn is_unitary(&self) -> bool {
        !matches!(self, Operation::Measure { .. } | Operation::Reset { .. })
    }

    /// The DD of this operation over `nqubits` qubits.
    pub fn dd(&self, dd: &Qdd, nqubits: u16, level_map: Option<&LevelMap>) -> Result<Edge> {
        self.build(dd, nqubits, level_map, false)
    }

    /// The DD of the inverse operation (conjugate-transposed matrix,
    /// controls unchanged).
    pub fn inverse_dd(
        &self,
        dd: &Qdd,
        nqubits: u16,
        level_map: Option<&LevelMap>,
    ) -> Result<Edge> {
        self.build(dd, nqubits, level_map, true)
    }

    fn build(
        &self,
        dd: &Qdd,
        nqubits: u16,
        level_map: Option<&LevelMap>,
        inverse: bool,
    ) -> Result<Edge> {
        let map = |q: u16| level_map.and_then(|m| m.get(&q).copied()).unwrap_or(q);
        match self {
            Operation::Standard {
                gate,
                controls,
                target,
            } => {
                let mat = if inverse {
                    gate.inverse_matrix()
                } else {
                    gate.matrix()
                };
                let controls: Vec<u16> = controls.iter().map(|&c| map(c)).collect();
                Ok(dd.make_gate_dd(&mat, nqubits, &controls, map(*target)))
            }
            Operation::Swap(a, b) => {
                let (a, b) = (map(*a), map(*b));
                let xm = Gate::X.matrix();
                let cx_ab = dd.make_gate_dd(&xm, nqubits, &[a], b);
                let cx_ba = dd.make_gate_dd(&xm, nqubits, &[b], a);
                let inner = dd.multiply(cx_ba, cx_ab);
                Ok(dd.multiply(cx_ab, inner))
            }
            Operation::ISwap(a, b) => {
                let (a, b) = (map(*a), map(*b));
                let (ca, cb) = ([a], [b]);
                let steps: [(Gate, &[u16], u16); 6] = [
                    (Gate::S, &[], a),
                    (Gate::S, &[], b),
                    (Gate::H, &[], a),
                    (Gate::X, &ca, b),
                    (Gate::X, &cb, a),
                    (Gate::H, &[], b),
                ];
                let mut e = dd.make_identity(0, nqubits as i32 - 1);
                for (gate, controls, target) in steps {
                    e = if inverse {
                        let g = dd.make_gate_dd(&gate.inverse_matrix(), nqubits, controls, target);
                        dd.multiply(e, g)
                    } else {
                        let g = dd.make_gate_dd(&gate.matrix(), nqubits, controls, target);
                        dd.multiply(g, e)
                    };
                }
                Ok(e)
            }
            Operation::Peres {
                control,
                middle,
                target,
            } => {
                let (c, m, t) = (map(*control), map(*middle), map(*target));
                let xm = Gate::X.matrix();
                let ccx = dd.make_gate_dd(&xm, nqubits, &[c, m], t);
                let cx = dd.make_gate_dd(&xm, nqubits, &[c], m);
                Ok(if inverse {
                    dd.multiply(ccx, cx)
                } else {
                    dd.multiply(cx, ccx)
                })
            }
            Operation::Measure { .. } => Err(Error::NotUnitary("measure")),
            Operation::Reset { .. } => Err(Error::NotUnitary("reset")),
        }
    }
}

/// An ordered gate list over a fixed number of qubits.
#[derive(Debug, Default)]
pub struct Circuit {
    pub nqubits: u16,
    ops: Vec<Operation>,
}

impl Circuit {
    pub fn new(nqubits: u16) -> Self {
        Self {
            nqubits,
            ops: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn apply(&mut self, gate: Gate, target: u16) {
        self.push(Operation::Standard {
            gate,
            controls: Vec::new(),
            target,
        });
    }

    pub fn apply_controlled(&mut self, gate: Gate, controls: Vec<u16>, target: u16) {
        self.push(Operation::Standard {
            gate,
            controls,
            target,
        });
    }

    pub fn swap(&mut self, a: u16, b: u16) {
        self.push(Operation::Swap(a, b));
    }

    /// Fold the whole gate sequence into one functionality DD via repeated
    /// multiplication. The returned edge carries one caller-owned reference;
    /// intermediate results are released as the fold advances, with a
    /// non-forced collection between steps.
    pub fn build_functionality(&self, dd: &Qdd) -> Result<Edge> {
        assert!(self.nqubits > 0, "Circuit has no qubits");
        let mut e = dd.make_identity(0, self.nqubits as i32 - 1);
        dd.inc_ref(e);
        for op in &self.ops {
            let g = match op.dd(dd, self.nqubits, None) {
                Ok(g) => g,
                Err(err) => {
                    dd.dec_ref(e);
                    return Err(err);
                }
            };
            let next = dd.multiply(g, e);
            dd.inc_ref(next);
            dd.dec_ref(e);
            e = next;
            dd.garbage_collect(false);
        }
        debug!("build_functionality: {} ops -> {}", self.ops.len(), e);
        Ok(e)
    }

    /// Apply the gate sequence to `initial` (a state DD). The returned edge
    /// carries one caller-owned reference; `initial` itself is not released.
    pub fn simulate(&self, initial: Edge, dd: &Qdd) -> Result<Edge> {
        let mut e = initial;
        dd.inc_ref(e);
        for op in &self.ops {
            let g = match op.dd(dd, self.nqubits, None) {
                Ok(g) => g,
                Err(err) => {
                    dd.dec_ref(e);
                    return Err(err);
                }
            };
            let next = dd.multiply(g, e);
            dd.inc_ref(next);
            dd.dec_ref(e);
            e = next;
            dd.garbage_collect(false);
        }
        debug!("simulate: {} ops -> {}", self.ops.len(), e);
        Ok(e)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use test_log::test;

    use super::*;

    const NQUBITS: u16 = 4;

    fn single(gate: Gate) -> Operation {
        Operation::Standard {
            gate,
            controls: Vec::new(),
            target: 0,
        }
    }

    #[test]
    fn test_standard_op_build_inverse_build() {
        let mut rng = rand::thread_rng();
        let mut angle = || rng.gen_range(0.0..std::f64::consts::TAU);

        let ops = vec![
            single(Gate::I),
            single(Gate::H),
            single(Gate::X),
            single(Gate::Y),
            single(Gate::Z),
            single(Gate::S),
            single(Gate::Sdg),
            single(Gate::T),
            single(Gate::Tdg),
            single(Gate::V),
            single(Gate::Vdg),
            single(Gate::Phase(angle())),
            single(Gate::Rx(angle())),
            single(Gate::Ry(angle())),
            single(Gate::Rz(angle())),
            single(Gate::U2(angle(), angle())),
            single(Gate::U3(angle(), angle(), angle())),
            Operation::Swap(0, 1),
            Operation::ISwap(0, 1),
            Operation::Peres {
                control: 0,
                middle: 1,
                target: 2,
            },
            Operation::Standard {
                gate: Gate::X,
                controls: vec![0],
                target: 1,
            },
            Operation::Standard {
                gate: Gate::X,
                controls: vec![3, 2],
                target: 0,
            },
        ];

        for op in &ops {
            let dd = Qdd::default();
            let ident = dd.make_identity(0, NQUBITS as i32 - 1);
            let forward = op.dd(&dd, NQUBITS, None).unwrap();
            let backward = op.inverse_dd(&dd, NQUBITS, None).unwrap();
            let e = dd.multiply(forward, backward);
            assert!(Qdd::equals(ident, e), "g * g^-1 != I for {:?}", op);
        }
    }

    fn mirror_circuit() -> Circuit {
        let mut qc = Circuit::new(NQUBITS);
        qc.apply(Gate::X, 0);
        qc.swap(0, 1);
        qc.apply(Gate::H, 0);
        qc.apply(Gate::S, 3);
        qc.apply(Gate::Sdg, 2);
        qc.apply(Gate::V, 0);
        qc.apply(Gate::T, 1);
        qc.apply_controlled(Gate::X, vec![0], 1);
        qc.apply_controlled(Gate::X, vec![3], 2);
        qc.apply_controlled(Gate::X, vec![3, 2], 0);

        qc.apply_controlled(Gate::X, vec![3, 2], 0);
        qc.apply_controlled(Gate::X, vec![3], 2);
        qc.apply_controlled(Gate::X, vec![0], 1);
        qc.apply(Gate::Tdg, 1);
        qc.apply(Gate::Vdg, 0);
        qc.apply(Gate::S, 2);
        qc.apply(Gate::Sdg, 3);
        qc.apply(Gate::H, 0);
        qc.swap(0, 1);
        qc.apply(Gate::X, 0);
        qc
    }

    #[test]
    fn test_build_circuit() {
        let dd = Qdd::default();
        let ident = dd.make_identity(0, NQUBITS as i32 - 1);
        dd.inc_ref(ident);

        let mut qc = mirror_circuit();

        let f = qc.build_functionality(&dd).unwrap();
        let e = dd.multiply(f, ident);
        assert!(Qdd::equals(ident, e));

        // One extra non-cancelling gate breaks the equality.
        qc.apply(Gate::X, 0);
        let f2 = qc.build_functionality(&dd).unwrap();
        let e2 = dd.multiply(f2, e);
        assert!(!Qdd::equals(ident, e2));
    }

    #[test]
    fn test_iswap_action() {
        let dd = Qdd::default();
        let zero = dd.make_zero_state(2);
        let x0 = dd.make_gate_dd(&Gate::X.matrix(), 2, &[], 0);
        let x1 = dd.make_gate_dd(&Gate::X.matrix(), 2, &[], 1);

        let iswap = Operation::ISwap(0, 1).dd(&dd, 2, None).unwrap();

        // iSWAP swaps the two qubits and multiplies the moved amplitude by i.
        let from = dd.multiply(x0, zero);
        let moved = dd.multiply(iswap, from);
        let swapped = dd.multiply(x1, zero);
        let i = dd.weight(0.0, 1.0);
        let expected = Edge {
            node: swapped.node,
            w: dd.mul_weights(i, swapped.w),
        };
        assert!(Qdd::equals(moved, expected));

        // |00> and |11> are untouched.
        assert!(Qdd::equals(dd.multiply(iswap, zero), zero));
        let both = dd.multiply(x1, dd.multiply(x0, zero));
        assert!(Qdd::equals(dd.multiply(iswap, both), both));
    }

    #[test]
    fn test_peres_action() {
        let dd = Qdd::default();
        let zero = dd.make_zero_state(3);
        let xm = Gate::X.matrix();
        let x0 = dd.make_gate_dd(&xm, 3, &[], 0);
        let x1 = dd.make_gate_dd(&xm, 3, &[], 1);
        let x2 = dd.make_gate_dd(&xm, 3, &[], 2);

        let op = Operation::Peres {
            control: 0,
            middle: 1,
            target: 2,
        };
        let peres = op.dd(&dd, 3, None).unwrap();

        // Control and middle set: the target flips, then the middle clears.
        let from = dd.multiply(x1, dd.multiply(x0, zero));
        let to = dd.multiply(peres, from);
        let expected = dd.multiply(x2, dd.multiply(x0, zero));
        assert!(Qdd::equals(to, expected));

        // Control clear: nothing happens.
        let idle = dd.multiply(x1, zero);
        assert!(Qdd::equals(dd.multiply(peres, idle), idle));

        // The inverse undoes the composite.
        let back = op.inverse_dd(&dd, 3, None).unwrap();
        assert!(Qdd::equals(dd.multiply(back, to), from));
    }

    #[test]
    fn test_non_unitary() {
        let dd = Qdd::default();
        let dummy_map = LevelMap::default();
        let op = Operation::Measure {
            qubits: vec![0, 1, 2, 3],
            bits: vec![0, 1, 2, 3],
        };
        assert!(!op.is_unitary());

        assert!(matches!(
            op.dd(&dd, NQUBITS, None),
            Err(Error::NotUnitary(_))
        ));
        assert!(matches!(
            op.inverse_dd(&dd, NQUBITS, None),
            Err(Error::NotUnitary(_))
        ));
        assert!(matches!(
            op.dd(&dd, NQUBITS, Some(&dummy_map)),
            Err(Error::NotUnitary(_))
        ));
        assert!(matches!(
            op.inverse_dd(&dd, NQUBITS, Some(&dummy_map)),
            Err(Error::NotUnitary(_))
        ));

        let reset = Operation::Reset { qubits: vec![0] };
        assert!(!reset.is_unitary());
        assert!(matches!(
            reset.dd(&dd, NQUBITS, None),
            Err(Error::NotUnitary(_))
        ));
    }

    #[test]
    fn test_level_map_relocates_gate() {
        let dd = Qdd::default();
        let op = single(Gate::X);
        let mut map = LevelMap::default();
        map.insert(0, 2);

        let moved = op.dd(&dd, NQUBITS, Some(&map)).unwrap();
        let direct = Operation::Standard {
            gate: Gate::X,
            controls: Vec::new(),
            target: 2,
        };
        let expected = direct.dd(&dd, NQUBITS, None).unwrap();
        assert!(Qdd::equals(moved, expected));
    }

    #[test]
    fn test_simulate_flips_state() {
        let dd = Qdd::default();
        let mut qc = Circuit::new(2);
        qc.apply(Gate::X, 0);
        qc.apply(Gate::X, 0);

        let zero = dd.make_zero_state(2);
        dd.inc_ref(zero);
        let e = qc.simulate(zero, &dd).unwrap();
        assert!(Qdd::equals(e, zero));

        qc.apply(Gate::X, 1);
        let e2 = qc.simulate(zero, &dd).unwrap();
        assert!(!Qdd::equals(e2, zero));
    }

    #[test]
    fn test_no_leaks_after_collection() {
        let dd = Qdd::default();
        let initial_complex = dd.complex_count();
        let initial_cache = dd.cache_len();

        let ident = dd.make_identity(0, NQUBITS as i32 - 1);
        dd.inc_ref(ident);

        let qc = mirror_circuit();
        let f = qc.build_functionality(&dd).unwrap();
        let e = dd.multiply(f, ident);
        dd.inc_ref(e);

        dd.dec_ref(f);
        dd.dec_ref(e);
        dd.dec_ref(ident);
        dd.garbage_collect(true);

        assert_eq!(dd.node_count(), 1);
        assert_eq!(dd.complex_count(), initial_complex);
        assert_eq!(dd.cache_len(), initial_cache);
    }
}
