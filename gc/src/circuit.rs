//! The circuit data model and its JSON file format.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GcError, Result};

/// A wire identifier, unique within one circuit.
pub type WireId = u32;

/// The boolean operator a gate computes. `NOT` takes one input; every
/// other variant takes exactly two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateType {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// Logical XOR.
    Xor,
    /// Logical NAND.
    Nand,
    /// Logical NOR.
    Nor,
    /// Logical XNOR.
    Xnor,
    /// Logical NOT (single input).
    Not,
}

impl GateType {
    /// Number of input wires this gate type takes.
    pub fn arity(self) -> usize {
        if self == GateType::Not { 1 } else { 2 }
    }

    /// Evaluate the gate's truth table on the semantic inputs. `b` is
    /// ignored for `NOT`.
    pub fn eval(self, a: bool, b: bool) -> bool {
        match self {
            GateType::And => a && b,
            GateType::Or => a || b,
            GateType::Xor => a ^ b,
            GateType::Nand => !(a && b),
            GateType::Nor => !(a || b),
            GateType::Xnor => !(a ^ b),
            GateType::Not => !a,
        }
    }
}

/// A single gate: its id (= its output wire), type, and ordered inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    /// The gate's id; also the id of its (sole) output wire.
    pub id: WireId,
    #[serde(rename = "type")]
    /// The operator this gate computes.
    pub gate_type: GateType,
    /// Ordered input wire ids: length 1 for `NOT`, 2 otherwise.
    #[serde(rename = "in")]
    pub inputs: Vec<WireId>,
}

/// One named circuit: Alice's input wires, Bob's input wires, the output
/// wires, and gates in a valid topological (evaluation) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    /// Circuit name, unique within a `CircuitFile`.
    pub id: String,
    /// Alice's (the garbler's) input wire ids.
    #[serde(default)]
    pub alice: Vec<WireId>,
    /// Bob's (the evaluator's) input wire ids.
    #[serde(default)]
    pub bob: Vec<WireId>,
    /// Output wire ids.
    pub out: Vec<WireId>,
    /// Gates, listed in a valid evaluation order.
    pub gates: Vec<Gate>,
}

impl Circuit {
    /// Total number of wires a garbler/evaluator needs label material for:
    /// every Alice/Bob input plus every gate output.
    pub fn wire_ids(&self) -> impl Iterator<Item = WireId> + '_ {
        self.alice
            .iter()
            .copied()
            .chain(self.bob.iter().copied())
            .chain(self.gates.iter().map(|g| g.id))
    }

    /// Validate the circuit's structural invariants:
    /// - every gate's inputs are either declared circuit inputs or the
    ///   output of an earlier gate (so the listed order is topological);
    /// - every non-input wire is produced by exactly one gate;
    /// - every input wire referenced by a gate is declared in `alice` or
    ///   `bob`;
    /// - gate arity matches its type.
    pub fn validate(&self) -> Result<()> {
        let mut declared_inputs: HashSet<WireId> =
            self.alice.iter().chain(self.bob.iter()).copied().collect();
        if declared_inputs.len() != self.alice.len() + self.bob.len() {
            return Err(GcError::MalformedCircuit(format!(
                "circuit {}: a wire id is declared as both an alice and a bob input",
                self.id
            )));
        }

        let mut produced: HashSet<WireId> = HashSet::new();
        for gate in &self.gates {
            if gate.inputs.len() != gate.gate_type.arity() {
                return Err(GcError::MalformedCircuit(format!(
                    "circuit {}: gate {} has {} inputs, expected {} for {:?}",
                    self.id,
                    gate.id,
                    gate.inputs.len(),
                    gate.gate_type.arity(),
                    gate.gate_type
                )));
            }
            for &input in &gate.inputs {
                if !declared_inputs.contains(&input) && !produced.contains(&input) {
                    return Err(GcError::MalformedCircuit(format!(
                        "circuit {}: gate {} references wire {} before it is an input or a prior gate's output",
                        self.id, gate.id, input
                    )));
                }
            }
            if !produced.insert(gate.id) {
                return Err(GcError::MalformedCircuit(format!(
                    "circuit {}: wire {} is produced by more than one gate",
                    self.id, gate.id
                )));
            }
            if declared_inputs.contains(&gate.id) {
                return Err(GcError::MalformedCircuit(format!(
                    "circuit {}: gate {} reuses a declared input wire id as its output",
                    self.id, gate.id
                )));
            }
        }
        declared_inputs.extend(produced.iter().copied());

        for &w in &self.out {
            if !declared_inputs.contains(&w) {
                return Err(GcError::MalformedCircuit(format!(
                    "circuit {}: output wire {} is never produced",
                    self.id, w
                )));
            }
        }

        Ok(())
    }

    /// Look up a gate by its id (linear scan; circuits in this system are
    /// small enough that building an index is not worth the complexity).
    pub fn gate(&self, id: WireId) -> Option<&Gate> {
        self.gates.iter().find(|g| g.id == id)
    }
}

/// A circuit file: a named collection of one or more `Circuit`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitFile {
    /// Human-readable name of the file's contents.
    pub name: String,
    /// The circuits defined in this file.
    pub circuits: Vec<Circuit>,
}

impl CircuitFile {
    /// Load and validate a circuit file from a JSON path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| GcError::MalformedCircuit(format!("could not read circuit file: {e}")))?;
        Self::from_json(&data)
    }

    /// Parse and validate a circuit file from a JSON string.
    pub fn from_json(data: &str) -> Result<Self> {
        let file: CircuitFile = serde_json::from_str(data)
            .map_err(|e| GcError::MalformedCircuit(format!("invalid circuit JSON: {e}")))?;
        for circuit in &file.circuits {
            circuit.validate()?;
        }
        Ok(file)
    }

    /// Look up one circuit by id.
    pub fn circuit(&self, id: &str) -> Option<&Circuit> {
        self.circuits.iter().find(|c| c.id == id)
    }
}

/// A mapping from wire id to a cleartext bit, used for Alice/Bob's
/// declared inputs and for the final output.
pub type Assignment = HashMap<WireId, bool>;
