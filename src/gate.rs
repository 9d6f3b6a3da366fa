//! Elementary 2x2 gate matrices.
//!
//! Matrix entries follow the conventions of the usual quantum gate zoo; the
//! engine turns them into DDs via [`Qdd::make_gate_dd`][crate::qdd::Qdd].

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};

use crate::qdd::GateMatrix;

/// A single-qubit gate, possibly parameterized by an angle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Gate {
    I,
    H,
    X,
    Y,
    Z,
    S,
    Sdg,
    T,
    Tdg,
    V,
    Vdg,
    /// Phase gate diag(1, e^{i lambda}).
    Phase(f64),
    Rx(f64),
    Ry(f64),
    Rz(f64),
    /// U2(phi, lambda) = U3(pi/2, phi, lambda).
    U2(f64, f64),
    /// Generic single-qubit rotation U3(theta, phi, lambda).
    U3(f64, f64, f64),
}

impl Gate {
    pub fn matrix(&self) -> GateMatrix {
        let h = FRAC_1_SQRT_2;
        match *self {
            Gate::I => [[(1.0, 0.0), (0.0, 0.0)], [(0.0, 0.0), (1.0, 0.0)]],
            Gate::H => [[(h, 0.0), (h, 0.0)], [(h, 0.0), (-h, 0.0)]],
            Gate::X => [[(0.0, 0.0), (1.0, 0.0)], [(1.0, 0.0), (0.0, 0.0)]],
            Gate::Y => [[(0.0, 0.0), (0.0, -1.0)], [(0.0, 1.0), (0.0, 0.0)]],
            Gate::Z => [[(1.0, 0.0), (0.0, 0.0)], [(0.0, 0.0), (-1.0, 0.0)]],
            Gate::S => [[(1.0, 0.0), (0.0, 0.0)], [(0.0, 0.0), (0.0, 1.0)]],
            Gate::Sdg => [[(1.0, 0.0), (0.0, 0.0)], [(0.0, 0.0), (0.0, -1.0)]],
            Gate::T => Gate::Phase(FRAC_PI_4).matrix(),
            Gate::Tdg => Gate::Phase(-FRAC_PI_4).matrix(),
            // V is the square root of X up to phase: (1/sqrt(2)) [[1, -i], [-i, 1]].
            Gate::V => [[(h, 0.0), (0.0, -h)], [(0.0, -h), (h, 0.0)]],
            Gate::Vdg => [[(h, 0.0), (0.0, h)], [(0.0, h), (h, 0.0)]],
            Gate::Phase(lambda) => [
                [(1.0, 0.0), (0.0, 0.0)],
                [(0.0, 0.0), (lambda.cos(), lambda.sin())],
            ],
            Gate::Rx(theta) => {
                let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                [[(c, 0.0), (0.0, -s)], [(0.0, -s), (c, 0.0)]]
            }
            Gate::Ry(theta) => {
                let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                [[(c, 0.0), (-s, 0.0)], [(s, 0.0), (c, 0.0)]]
            }
            Gate::Rz(theta) => {
                let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                [[(c, -s), (0.0, 0.0)], [(0.0, 0.0), (c, s)]]
            }
            Gate::U2(phi, lambda) => Gate::U3(FRAC_PI_2, phi, lambda).matrix(),
            Gate::U3(theta, phi, lambda) => {
                let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                [
                    [(c, 0.0), (-lambda.cos() * s, -lambda.sin() * s)],
                    [
                        (phi.cos() * s, phi.sin() * s),
                        ((phi + lambda).cos() * c, (phi + lambda).sin() * c),
                    ],
                ]
            }
        }
    }

    /// Conjugate transpose of [`Gate::matrix`]; the matrix of the inverse
    /// gate, since every gate here is unitary.
    pub fn inverse_matrix(&self) -> GateMatrix {
        let m = self.matrix();
        let conj = |(re, im): (f64, f64)| (re, -im);
        [
            [conj(m[0][0]), conj(m[1][0])],
            [conj(m[0][1]), conj(m[1][1])],
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gate::I => "i",
            Gate::H => "h",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::S => "s",
            Gate::Sdg => "sdg",
            Gate::T => "t",
            Gate::Tdg => "tdg",
            Gate::V => "v",
            Gate::Vdg => "vdg",
            Gate::Phase(_) => "p",
            Gate::Rx(_) => "rx",
            Gate::Ry(_) => "ry",
            Gate::Rz(_) => "rz",
            Gate::U2(..) => "u2",
            Gate::U3(..) => "u3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_mul(a: &GateMatrix, b: &GateMatrix) -> GateMatrix {
        let mut r = [[(0.0, 0.0); 2]; 2];
        for i in 0..2 {
            for j in 0..2 {
                let mut acc = (0.0, 0.0);
                for k in 0..2 {
                    let (ar, ai) = a[i][k];
                    let (br, bi) = b[k][j];
                    acc.0 += ar * br - ai * bi;
                    acc.1 += ar * bi + ai * br;
                }
                r[i][j] = acc;
            }
        }
        r
    }

    fn assert_identity(m: &GateMatrix) {
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((m[i][j].0 - expected).abs() < 1e-12, "{:?}", m);
                assert!(m[i][j].1.abs() < 1e-12, "{:?}", m);
            }
        }
    }

    #[test]
    fn test_all_gates_unitary() {
        let gates = [
            Gate::I,
            Gate::H,
            Gate::X,
            Gate::Y,
            Gate::Z,
            Gate::S,
            Gate::Sdg,
            Gate::T,
            Gate::Tdg,
            Gate::V,
            Gate::Vdg,
            Gate::Phase(0.3),
            Gate::Rx(1.1),
            Gate::Ry(2.2),
            Gate::Rz(0.7),
            Gate::U2(0.4, 1.9),
            Gate::U3(1.3, 0.6, 2.5),
        ];
        for gate in gates {
            let product = mat_mul(&gate.matrix(), &gate.inverse_matrix());
            assert_identity(&product);
        }
    }

    #[test]
    fn test_adjoint_pairs() {
        assert_eq!(Gate::S.inverse_matrix(), Gate::Sdg.matrix());
        assert_eq!(Gate::V.inverse_matrix(), Gate::Vdg.matrix());
    }

    #[test]
    fn test_u3_specializations() {
        let assert_close = |a: &GateMatrix, b: &GateMatrix| {
            for i in 0..2 {
                for j in 0..2 {
                    assert!((a[i][j].0 - b[i][j].0).abs() < 1e-12, "{:?} vs {:?}", a, b);
                    assert!((a[i][j].1 - b[i][j].1).abs() < 1e-12, "{:?} vs {:?}", a, b);
                }
            }
        };
        assert_close(
            &Gate::U3(std::f64::consts::PI, 0.0, std::f64::consts::PI).matrix(),
            &Gate::X.matrix(),
        );
        assert_close(&Gate::U2(0.0, std::f64::consts::PI).matrix(), &Gate::H.matrix());
        assert_close(&Gate::U3(0.0, 0.0, 0.3).matrix(), &Gate::Phase(0.3).matrix());
    }
}
