//! Two-party secure function evaluation via Yao's garbled circuits with
//! 1-of-2 oblivious transfer.
//!
//! The garbler (component `garbler`) builds one garbled table per gate
//! from per-wire labels (`label`) over a circuit (`circuit`). The
//! evaluator (`evaluator`) walks those tables using labels it either
//! receives directly (its own input wires transmitted by the garbler) or
//! obtains via oblivious transfer (`ot`, built on the group arithmetic in
//! `group`). `protocol` drives both roles over a real channel; `local`
//! runs both in one process for testing and truth-table printing.

pub mod circuit;
pub mod constants;
pub mod error;
pub mod evaluator;
pub mod garbler;
pub mod group;
pub mod label;
pub mod local;
pub mod ot;
pub mod protocol;

pub use circuit::{Assignment, Circuit, CircuitFile, Gate, GateType, WireId};
pub use error::{GcError, Result};
pub use garbler::GarblerState;
