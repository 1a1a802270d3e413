//! In-process tester: garbler and evaluator resident in the same address
//! space, with no channel or OT in between. Two modes: dump the garbled
//! tables, or enumerate every input assignment and print the resulting
//! truth table.

use std::collections::HashMap;
use std::fmt::Write as _;

use rand::RngCore;

use crate::circuit::{Assignment, Circuit, WireId};
use crate::error::{GcError, Result};
use crate::evaluator::{decode_outputs, evaluate_gates};
use crate::garbler::GarblerState;

/// Garble `circuit` and render every gate's garbled table as hex rows,
/// one gate per line — the `table` print mode.
pub fn dump_tables(circuit: Circuit, rng: &mut impl RngCore) -> Result<String> {
    let state = GarblerState::garble(circuit, rng)?;
    let mut out = String::new();
    for gate in &state.circuit().gates {
        let table = state
            .table(gate.id)
            .ok_or_else(|| GcError::ProtocolViolation(format!("missing table for gate {}", gate.id)))?;
        writeln!(out, "gate {} ({:?}):", gate.id, gate.gate_type).ok();
        for row in table.rows_hex() {
            writeln!(out, "  {row}").ok();
        }
    }
    Ok(out)
}

/// Garble `circuit` once, then evaluate it against every one of the
/// `2^(|alice| + |bob|)` input assignments, returning each assignment's
/// inputs alongside its outputs — the `circuit` print mode.
pub fn truth_table(
    circuit: Circuit,
    rng: &mut impl RngCore,
) -> Result<Vec<(Assignment, Assignment)>> {
    let state = GarblerState::garble(circuit.clone(), rng)?;
    let input_wires: Vec<WireId> = circuit
        .alice
        .iter()
        .chain(circuit.bob.iter())
        .copied()
        .collect();

    let mut rows = Vec::with_capacity(1 << input_wires.len().min(20));
    for mask in 0u64..(1u64 << input_wires.len()) {
        let mut inputs = Assignment::with_capacity(input_wires.len());
        for (i, &w) in input_wires.iter().enumerate() {
            inputs.insert(w, (mask >> i) & 1 == 1);
        }

        let mut input_tags = HashMap::with_capacity(input_wires.len());
        for (&w, &bit) in &inputs {
            let tag = state
                .tag(w, bit)
                .ok_or_else(|| GcError::ProtocolViolation(format!("no label for wire {w}")))?;
            input_tags.insert(w, tag);
        }

        let tagged = evaluate_gates(&circuit, state.tables(), &input_tags)?;
        let outputs = decode_outputs(&tagged, state.pbits_out())?;

        let expected = reference_eval(&circuit, &inputs)?;
        for (&w, &bit) in &outputs {
            if expected[&w] != bit {
                return Err(GcError::LogicMismatch {
                    wire: w,
                    expected: expected[&w],
                    actual: bit,
                });
            }
        }

        rows.push((inputs, outputs));
    }
    Ok(rows)
}

/// Evaluate `circuit` directly on cleartext bits, with no garbling at
/// all — the oracle `truth_table` checks every row against.
pub fn reference_eval(circuit: &Circuit, inputs: &Assignment) -> Result<Assignment> {
    let mut values: HashMap<WireId, bool> = inputs.clone();
    for gate in &circuit.gates {
        let a = *values.get(&gate.inputs[0]).ok_or_else(|| {
            GcError::MalformedCircuit(format!("gate {} missing input wire value", gate.id))
        })?;
        let b = if gate.inputs.len() > 1 {
            *values.get(&gate.inputs[1]).ok_or_else(|| {
                GcError::MalformedCircuit(format!("gate {} missing input wire value", gate.id))
            })?
        } else {
            false
        };
        values.insert(gate.id, gate.gate_type.eval(a, b));
    }
    let mut out = Assignment::with_capacity(circuit.out.len());
    for &w in &circuit.out {
        out.insert(w, values[&w]);
    }
    Ok(out)
}
