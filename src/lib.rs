//! # qdd-rs: Quantum Multiple-Valued Decision Diagrams in Rust
//!
//! **`qdd-rs`** is a manager-centric library for representing quantum states
//! and operators as **Quantum Multiple-valued Decision Diagrams (QMDDs)**.
//! It is designed for circuit simulation, functionality construction, and
//! equivalence checking.
//!
//! ## What is a QMDD?
//!
//! A QMDD represents a complex vector or matrix over qubits as a directed
//! acyclic graph: each node stands for one qubit and has four outgoing edges
//! (the four blocks of a 2x2 partition, row-major), and every edge carries a
//! complex weight. With a fixed normalization rule the representation is
//! **canonical** --- two functions are equal exactly when their root edges
//! are identical --- so equivalence checking is a pointer comparison.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All construction goes through the
//!   [`Qdd`][crate::qdd::Qdd] manager. Hash consing and weight normalization
//!   maintain the canonical form invariant.
//! - **Tolerance-Aware Complex Values**: Edge weights live in a shared
//!   interning table that snaps numerically-close values together, so gate
//!   sequences that are algebraically inverse compose to the exact identity.
//! - **Operation Caching**: Multiplication and addition are memoized in a
//!   computed table; repeated subproblems are looked up, not recomputed.
//! - **Explicit Lifetimes**: Root edges are reference-counted in O(1);
//!   garbage collection runs only when the caller asks for it.
//!
//! ## Basic Usage
//!
//! ```rust
//! use qdd_rs::circuit::Circuit;
//! use qdd_rs::gate::Gate;
//! use qdd_rs::qdd::Qdd;
//!
//! // 1. Initialize the manager
//! let dd = Qdd::default();
//!
//! // 2. Describe a circuit: a Bell pair on two qubits
//! let mut qc = Circuit::new(2);
//! qc.apply(Gate::H, 0);
//! qc.apply_controlled(Gate::X, vec![0], 1);
//!
//! // 3. Build its functionality and simulate it
//! let f = qc.build_functionality(&dd).unwrap();
//! let state = qc.simulate(dd.make_zero_state(2), &dd).unwrap();
//!
//! // 4. Equivalence is identity of root edges
//! let applied = dd.multiply(f, dd.make_zero_state(2));
//! assert!(Qdd::equals(applied, state));
//! ```
//!
//! ## Core Components
//!
//! - **[`qdd`]**: The heart of the library. Contains the
//!   [`Qdd`][crate::qdd::Qdd] manager and the multiply/add engine.
//! - **[`circuit`]**: Circuit description, functionality construction, and
//!   simulation.
//! - **[`gate`]**: Elementary gate matrices.
//! - **[`serialize`]**: Canonical text serialization with exact round-trip.
//! - **[`dot`]**: Utilities for visualizing DDs using Graphviz.

pub mod cache;
pub mod circuit;
pub mod complex;
pub mod dot;
pub mod edge;
pub mod error;
pub mod gate;
pub mod qdd;
pub mod serialize;
pub mod table;
pub mod utils;
