//! Garbled-table construction and the `GarblerState` that holds the
//! per-circuit material a garbler needs. `GarblerState` is a plain value
//! consumed by either the network driver (`protocol::GarblerSession`) or
//! the local tester (`local`) — composition over a shared base class.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use tracing::debug;

use crate::circuit::{Circuit, WireId};
use crate::constants::{GATE_HASH_DOMAIN, LABEL_BYTES};
use crate::error::{GcError, Result};
use crate::label::{LabelPair, Pbit, WireLabel};

/// One ciphertext row's length: a label plus its one signal bit, packed
/// into `LABEL_BYTES + 1` bytes. Fixed independently of any serialized
/// payload size.
const ROW_BYTES: usize = LABEL_BYTES + 1;

/// `H(L_u [|| L_v] || gate_id)`, expanded to exactly `ROW_BYTES` bytes via
/// SHAKE256, domain-separated by `gate_id` so rows never collide across
/// gates.
fn gate_hash(gate_id: WireId, input_labels: &[WireLabel]) -> [u8; ROW_BYTES] {
    let mut hasher = Shake256::default();
    hasher.update(GATE_HASH_DOMAIN);
    hasher.update(&gate_id.to_le_bytes());
    for label in input_labels {
        hasher.update(label.as_bytes());
    }
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; ROW_BYTES];
    reader.read(&mut out);
    out
}

fn xor_row(key: &[u8; ROW_BYTES], label: &WireLabel, signal_bit: bool) -> [u8; ROW_BYTES] {
    let mut row = [0u8; ROW_BYTES];
    for i in 0..LABEL_BYTES {
        row[i] = key[i] ^ label.as_bytes()[i];
    }
    row[LABEL_BYTES] = key[LABEL_BYTES] ^ (signal_bit as u8);
    row
}

fn unxor_row(key: &[u8; ROW_BYTES], row: &[u8]) -> Result<(WireLabel, bool)> {
    if row.len() != ROW_BYTES {
        return Err(GcError::ProtocolViolation(format!(
            "garbled-table row has {} bytes, expected {}",
            row.len(),
            ROW_BYTES
        )));
    }
    let mut label_bytes = [0u8; LABEL_BYTES];
    for i in 0..LABEL_BYTES {
        label_bytes[i] = key[i] ^ row[i];
    }
    let signal_bit = (key[LABEL_BYTES] ^ row[LABEL_BYTES]) & 1 == 1;
    Ok((WireLabel::new(label_bytes), signal_bit))
}

/// The garbled truth table for one gate: ciphertext rows indexed by the
/// tagged-input tuple `(sig_u, sig_v)` (or just `sig_u` for `NOT`), never
/// by the semantic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarbledTable {
    /// Row `r` holds the ciphertext for tag index `r` (`2*sig_u + sig_v`
    /// for binary gates, `sig_u` for `NOT`).
    rows: Vec<Vec<u8>>,
}

impl GarbledTable {
    fn row_index(tags: &[bool]) -> usize {
        tags.iter().fold(0usize, |acc, &b| (acc << 1) | b as usize)
    }

    /// Decrypt the row selected by the evaluator's tagged input labels,
    /// given the decryption key derived from those same labels.
    pub fn decrypt(&self, tags: &[bool], key: &[u8; ROW_BYTES]) -> Result<(WireLabel, bool)> {
        let idx = Self::row_index(tags);
        let row = self.rows.get(idx).ok_or_else(|| {
            GcError::ProtocolViolation(format!("garbled table has no row {idx}"))
        })?;
        unxor_row(key, row)
    }

    /// Render every ciphertext row as a hex string, for the local
    /// tester's table-dump mode.
    pub fn rows_hex(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|b| format!("{b:02x}")).collect())
            .collect()
    }
}

/// Build the garbled table for one gate, given the already-generated
/// label pairs for its input wire(s) and its output wire.
pub fn build_gate_table(
    gate_id: WireId,
    gate_type: crate::circuit::GateType,
    input_pairs: &[&LabelPair],
    output_pair: &LabelPair,
) -> GarbledTable {
    use crate::circuit::GateType::Not;

    if gate_type == Not {
        let u = input_pairs[0];
        let mut rows = vec![Vec::new(); 2];
        for a in [false, true] {
            let c = gate_type.eval(a, false);
            let key = gate_hash(gate_id, &[u.label(a)]);
            let row = xor_row(&key, &output_pair.label(c), output_pair.signal_bit(c));
            rows[GarbledTable::row_index(&[u.signal_bit(a)])] = row.to_vec();
        }
        GarbledTable { rows }
    } else {
        let u = input_pairs[0];
        let v = input_pairs[1];
        let mut rows = vec![Vec::new(); 4];
        for a in [false, true] {
            for b in [false, true] {
                let c = gate_type.eval(a, b);
                let key = gate_hash(gate_id, &[u.label(a), v.label(b)]);
                let row = xor_row(&key, &output_pair.label(c), output_pair.signal_bit(c));
                rows[GarbledTable::row_index(&[u.signal_bit(a), v.signal_bit(b)])] = row.to_vec();
            }
        }
        GarbledTable { rows }
    }
}

/// The decryption key for a gate, computed from the tagged labels the
/// evaluator actually holds. Exposed so `evaluator` can share the exact
/// same derivation as the builder above.
pub fn gate_decryption_key(gate_id: WireId, input_labels: &[WireLabel]) -> [u8; ROW_BYTES] {
    gate_hash(gate_id, input_labels)
}

/// All the per-circuit material a garbler needs for one session: the
/// label/p-bit pair for every wire, the garbled table for every gate, and
/// the output p-bits. Generated once with fresh randomness and consumed
/// exactly once by either `protocol::GarblerSession` or
/// `local::LocalTester`.
#[derive(Debug)]
pub struct GarblerState {
    circuit: Circuit,
    labels: HashMap<WireId, LabelPair>,
    tables: HashMap<WireId, GarbledTable>,
    pbits_out: HashMap<WireId, Pbit>,
}

impl GarblerState {
    /// Garble `circuit` with fresh randomness from `rng`.
    pub fn garble(circuit: Circuit, rng: &mut impl RngCore) -> Result<Self> {
        circuit.validate()?;

        let mut labels = HashMap::new();
        for w in circuit.wire_ids() {
            labels.insert(w, LabelPair::random(rng));
        }

        let pb = ProgressBar::new(circuit.gates.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb.set_message("Garbling gates...");

        let mut tables = HashMap::with_capacity(circuit.gates.len());
        for (i, gate) in circuit.gates.iter().enumerate() {
            let input_pairs: Vec<&LabelPair> = gate
                .inputs
                .iter()
                .map(|w| {
                    labels.get(w).ok_or_else(|| {
                        GcError::MalformedCircuit(format!(
                            "gate {} references undefined wire {}",
                            gate.id, w
                        ))
                    })
                })
                .collect::<Result<_>>()?;
            let output_pair = &labels[&gate.id];
            let table = build_gate_table(gate.id, gate.gate_type, &input_pairs, output_pair);
            tables.insert(gate.id, table);
            if i % 1000 == 0 {
                pb.set_position(i as u64);
            }
        }
        pb.finish_with_message(format!("✓ garbled {} gates", circuit.gates.len()));

        let pbits_out = circuit
            .out
            .iter()
            .map(|&w| (w, labels[&w].pbit()))
            .collect();

        debug!(circuit = %circuit.id, gates = circuit.gates.len(), "garbling complete");

        Ok(GarblerState {
            circuit,
            labels,
            tables,
            pbits_out,
        })
    }

    /// The circuit this state was garbled for.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The garbled table for a gate.
    pub fn table(&self, gate_id: WireId) -> Option<&GarbledTable> {
        self.tables.get(&gate_id)
    }

    /// All garbled tables, keyed by gate id.
    pub fn tables(&self) -> &HashMap<WireId, GarbledTable> {
        &self.tables
    }

    /// The output p-bits, sent to the evaluator alongside the tables.
    pub fn pbits_out(&self) -> &HashMap<WireId, Pbit> {
        &self.pbits_out
    }

    /// The label pair for any wire (input or gate output).
    pub fn label_pair(&self, wire: WireId) -> Option<&LabelPair> {
        self.labels.get(&wire)
    }

    /// The tagged label `(L_w^v, sig_w^v)` for a wire's semantic value
    /// `v` — the garbler's own input-wire tags, and the OT sender
    /// messages for the evaluator's wires, are both built from this.
    pub fn tag(&self, wire: WireId, v: bool) -> Option<(WireLabel, bool)> {
        self.labels
            .get(&wire)
            .map(|lp| (lp.label(v), lp.signal_bit(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{CircuitFile, GateType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn and_circuit() -> Circuit {
        let file = CircuitFile::from_json(
            r#"{ "name": "t", "circuits": [
                { "id": "and", "alice": [1], "bob": [2], "out": [3],
                  "gates": [{ "id": 3, "type": "AND", "in": [1,2] }] } ] }"#,
        )
        .unwrap();
        file.circuit("and").unwrap().clone()
    }

    #[test]
    fn round_trip_every_row_for_and_gate() {
        let mut rng = ChaCha12Rng::from_seed([3; 32]);
        let u = LabelPair::random(&mut rng);
        let v = LabelPair::random(&mut rng);
        let w = LabelPair::random(&mut rng);
        let table = build_gate_table(3, GateType::And, &[&u, &v], &w);

        for a in [false, true] {
            for b in [false, true] {
                let tags = [u.signal_bit(a), v.signal_bit(b)];
                let key = gate_decryption_key(3, &[u.label(a), v.label(b)]);
                let (label, signal) = table.decrypt(&tags, &key).unwrap();
                let expected_c = GateType::And.eval(a, b);
                assert_eq!(label.as_bytes(), w.label(expected_c).as_bytes());
                assert_eq!(signal, w.signal_bit(expected_c));
            }
        }
    }

    #[test]
    fn not_gate_has_two_rows() {
        let mut rng = ChaCha12Rng::from_seed([4; 32]);
        let u = LabelPair::random(&mut rng);
        let w = LabelPair::random(&mut rng);
        let table = build_gate_table(2, GateType::Not, &[&u], &w);
        assert_eq!(table.rows.len(), 2);
        for a in [false, true] {
            let tags = [u.signal_bit(a)];
            let key = gate_decryption_key(2, &[u.label(a)]);
            let (label, _) = table.decrypt(&tags, &key).unwrap();
            assert_eq!(label.as_bytes(), w.label(!a).as_bytes());
        }
    }

    #[test]
    fn two_garblings_of_same_circuit_are_disjoint() {
        let circuit = and_circuit();
        let mut rng1 = ChaCha12Rng::from_seed([10; 32]);
        let mut rng2 = ChaCha12Rng::from_seed([11; 32]);
        let g1 = GarblerState::garble(circuit.clone(), &mut rng1).unwrap();
        let g2 = GarblerState::garble(circuit, &mut rng2).unwrap();

        for w in g1.circuit().wire_ids() {
            let l1 = g1.label_pair(w).unwrap();
            let l2 = g2.label_pair(w).unwrap();
            assert_ne!(l1.label(false).as_bytes(), l2.label(false).as_bytes());
            assert_ne!(l1.label(true).as_bytes(), l2.label(true).as_bytes());
        }
    }
}
