//! Circuit evaluation: given one tagged label per input wire, decrypt
//! exactly one row per gate and recover the output bits.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::circuit::{Assignment, Circuit, WireId};
use crate::error::{GcError, Result};
use crate::garbler::{gate_decryption_key, GarbledTable};
use crate::label::{Pbit, WireLabel};

/// A label together with the signal bit it carries at evaluation time.
pub type TaggedLabel = (WireLabel, bool);

/// Evaluate every gate of `circuit`, in the order the circuit lists them
/// (a valid topological order), starting from one tagged label per input
/// wire. Returns the tagged label held for every output wire — not yet
/// the cleartext bit, since only the garbler knows the output p-bits.
pub fn evaluate_gates(
    circuit: &Circuit,
    tables: &HashMap<WireId, GarbledTable>,
    input_tags: &HashMap<WireId, TaggedLabel>,
) -> Result<HashMap<WireId, TaggedLabel>> {
    let mut active: HashMap<WireId, TaggedLabel> = input_tags.clone();

    let pb = ProgressBar::new(circuit.gates.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("Evaluating gates...");

    for (i, gate) in circuit.gates.iter().enumerate() {
        let table = tables.get(&gate.id).ok_or_else(|| {
            GcError::ProtocolViolation(format!("missing garbled table for gate {}", gate.id))
        })?;

        let mut labels = Vec::with_capacity(gate.inputs.len());
        let mut tags = Vec::with_capacity(gate.inputs.len());
        for &w in &gate.inputs {
            let (label, signal) = *active.get(&w).ok_or_else(|| {
                GcError::ProtocolViolation(format!(
                    "gate {} evaluated before its input wire {} was available",
                    gate.id, w
                ))
            })?;
            labels.push(label);
            tags.push(signal);
        }

        let key = gate_decryption_key(gate.id, &labels);
        let output = table.decrypt(&tags, &key)?;
        active.insert(gate.id, output);

        if i % 1000 == 0 {
            pb.set_position(i as u64);
        }
    }
    pb.finish_with_message(format!("✓ evaluated {} gates", circuit.gates.len()));

    let mut outputs = HashMap::with_capacity(circuit.out.len());
    for &w in &circuit.out {
        let tagged = *active.get(&w).ok_or_else(|| {
            GcError::ProtocolViolation(format!("output wire {w} was never produced"))
        })?;
        outputs.insert(w, tagged);
    }
    debug!(circuit = %circuit.id, "evaluation complete");
    Ok(outputs)
}

/// Turn the tagged output labels into cleartext bits using the output
/// p-bits the garbler sent alongside the garbled tables: `bit = signal_bit
/// ^ p_w`.
pub fn decode_outputs(
    tagged_outputs: &HashMap<WireId, TaggedLabel>,
    pbits_out: &HashMap<WireId, Pbit>,
) -> Result<Assignment> {
    let mut result = Assignment::with_capacity(tagged_outputs.len());
    for (&w, &(_, signal)) in tagged_outputs {
        let pbit = pbits_out
            .get(&w)
            .ok_or_else(|| GcError::ProtocolViolation(format!("no output p-bit for wire {w}")))?;
        result.insert(w, *pbit ^ signal);
    }
    Ok(result)
}
