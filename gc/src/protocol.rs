//! The wire protocol driver: length-prefixed, tagged messages over a
//! blocking `Channel`, and the garbler/evaluator session loops that drive
//! a circuit plus its oblivious transfers to completion.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::circuit::{Assignment, Circuit, WireId};
use crate::error::{GcError, Result};
use crate::evaluator::{decode_outputs, evaluate_gates, TaggedLabel};
use crate::garbler::{GarbledTable, GarblerState};
use crate::label::Pbit;
use crate::ot;

/// Sends and receives whole, length-prefixed messages. The only channel
/// this crate ships is `TcpChannel`; tests use an in-process pair built
/// on `std::sync::mpsc` so the session loops run with no sockets at all.
pub trait Channel {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()>;
    fn recv_bytes(&mut self) -> Result<Vec<u8>>;

    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let bytes = bincode::serialize(message)?;
        self.send_bytes(&bytes)
    }

    fn recv<T: for<'de> Deserialize<'de>>(&mut self) -> Result<T> {
        let bytes = self.recv_bytes()?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// A `Channel` over a raw TCP stream: a 4-byte big-endian length prefix
/// followed by the bincode-encoded payload.
pub struct TcpChannel {
    stream: TcpStream,
}

impl TcpChannel {
    pub fn new(stream: TcpStream) -> Self {
        TcpChannel { stream }
    }
}

impl Channel for TcpChannel {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| GcError::ProtocolViolation("message too large to frame".into()))?;
        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn recv_bytes(&mut self) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Everything the garbler ships the evaluator up front: the circuit, its
/// garbled tables, and the output permutation bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitMessage {
    pub circuit: Circuit,
    pub tables: HashMap<WireId, GarbledTable>,
    pub pbits_out: HashMap<WireId, Pbit>,
}

/// Acknowledges receipt of an `InitMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack;

/// The garbler's input-wire tags for one assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarblerInputs {
    pub tags: HashMap<WireId, TaggedLabel>,
}

/// Requests the start of an oblivious transfer for one evaluator wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorWireRequest {
    pub wire: WireId,
}

/// The cleartext outputs for one assignment, sent back by the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputBits {
    pub assignment: Assignment,
}

/// Marks the end of the session: no more assignments follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Done;

/// Both labels for one evaluator wire, sent in the clear. Only used when
/// oblivious transfer is disabled for local debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlainPair {
    pub m0: Vec<u8>,
    pub m1: Vec<u8>,
}

/// Drives one circuit's garbler side: send the garbled tables once, then
/// one round per assignment, alternating OT with the evaluator for each
/// of its wires.
pub struct GarblerSession<'a, C: Channel> {
    channel: &'a mut C,
    state: GarblerState,
    disable_ot: bool,
}

impl<'a, C: Channel> GarblerSession<'a, C> {
    pub fn new(channel: &'a mut C, state: GarblerState, disable_ot: bool) -> Self {
        GarblerSession {
            channel,
            state,
            disable_ot,
        }
    }

    /// Ship the circuit, tables, and output p-bits; block for the
    /// evaluator's acknowledgement.
    pub fn init(&mut self) -> Result<()> {
        self.channel.send(&InitMessage {
            circuit: self.state.circuit().clone(),
            tables: self.state.tables().clone(),
            pbits_out: self.state.pbits_out().clone(),
        })?;
        let _: Ack = self.channel.recv()?;
        info!(circuit = %self.state.circuit().id, "sent garbled tables, evaluator acknowledged");
        Ok(())
    }

    /// Run one assignment: send the garbler's own input tags, then serve
    /// one OT per evaluator wire the evaluator asks for, then receive the
    /// cleartext outputs.
    pub fn run_assignment(
        &mut self,
        alice_bits: &Assignment,
        rng: &mut impl RngCore,
    ) -> Result<Assignment> {
        let circuit = self.state.circuit().clone();
        let mut tags = HashMap::with_capacity(circuit.alice.len());
        for &w in &circuit.alice {
            let bit = *alice_bits
                .get(&w)
                .ok_or_else(|| GcError::ProtocolViolation(format!("missing alice bit for wire {w}")))?;
            let tag = self
                .state
                .tag(w, bit)
                .ok_or_else(|| GcError::ProtocolViolation(format!("no label for wire {w}")))?;
            tags.insert(w, tag);
        }
        self.channel.send(&GarblerInputs { tags })?;

        for _ in &circuit.bob {
            let request: EvaluatorWireRequest = self.channel.recv()?;
            let pair = self
                .state
                .label_pair(request.wire)
                .ok_or_else(|| {
                    GcError::ProtocolViolation(format!("no label pair for wire {}", request.wire))
                })?
                .encrypted_bit_pair();
            let m0 = bincode::serialize(&pair.get(false))?;
            let m1 = bincode::serialize(&pair.get(true))?;

            if self.disable_ot {
                self.channel.send(&PlainPair { m0, m1 })?;
            } else {
                let (sender_state, challenge) = ot::sender_challenge(rng);
                self.channel.send(&challenge)?;
                let response: ot::OtResponse = self.channel.recv()?;
                let payload = ot::sender_finish(sender_state, &response, (&m0, &m1), rng)?;
                self.channel.send(&payload)?;
            }
        }

        let outputs: OutputBits = self.channel.recv()?;
        debug!(circuit = %circuit.id, "assignment complete");
        Ok(outputs.assignment)
    }

    /// Tell the evaluator no further assignments are coming.
    pub fn finish(&mut self) -> Result<()> {
        self.channel.send(&Done)
    }
}

/// Drives one circuit's evaluator side: receive the garbled tables once,
/// then one round per assignment, requesting OT for each of its wires.
pub struct EvaluatorSession<'a, C: Channel> {
    channel: &'a mut C,
    disable_ot: bool,
}

impl<'a, C: Channel> EvaluatorSession<'a, C> {
    pub fn new(channel: &'a mut C, disable_ot: bool) -> Self {
        EvaluatorSession { channel, disable_ot }
    }

    /// Receive the circuit, tables, and output p-bits; acknowledge.
    pub fn init(&mut self) -> Result<InitMessage> {
        let init: InitMessage = self.channel.recv()?;
        init.circuit.validate()?;
        self.channel.send(&Ack)?;
        info!(circuit = %init.circuit.id, "received garbled tables");
        Ok(init)
    }

    /// Run one assignment against an already-received `InitMessage`,
    /// given this evaluator's own cleartext input bits.
    pub fn run_assignment(
        &mut self,
        init: &InitMessage,
        bob_bits: &Assignment,
        rng: &mut impl RngCore,
    ) -> Result<Assignment> {
        let garbler_tags: GarblerInputs = self.channel.recv()?;
        let mut input_tags = garbler_tags.tags;

        for &w in &init.circuit.bob {
            let bit = *bob_bits
                .get(&w)
                .ok_or_else(|| GcError::ProtocolViolation(format!("missing bob bit for wire {w}")))?;
            self.channel.send(&EvaluatorWireRequest { wire: w })?;

            let bytes = if self.disable_ot {
                let plain: PlainPair = self.channel.recv()?;
                if bit {
                    plain.m1
                } else {
                    plain.m0
                }
            } else {
                let challenge: ot::OtChallenge = self.channel.recv()?;
                let (receiver_state, response) = ot::receiver_respond(&challenge, bit, rng)?;
                self.channel.send(&response)?;
                let payload: ot::OtPayload = self.channel.recv()?;
                ot::receiver_finish(receiver_state, &payload)?
            };

            let (label, signal): TaggedLabel = bincode::deserialize(&bytes)?;
            input_tags.insert(w, (label, signal));
        }

        let tagged = evaluate_gates(&init.circuit, &init.tables, &input_tags)?;
        let assignment = decode_outputs(&tagged, &init.pbits_out)?;
        self.channel.send(&OutputBits {
            assignment: assignment.clone(),
        })?;
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitFile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::sync::mpsc::{Receiver, Sender};

    /// An in-process duplex channel backed by two `mpsc` queues, used to
    /// exercise the session state machines without any sockets.
    struct DuplexChannel {
        tx: Sender<Vec<u8>>,
        rx: Receiver<Vec<u8>>,
    }

    fn duplex_pair() -> (DuplexChannel, DuplexChannel) {
        let (tx_a, rx_a) = std::sync::mpsc::channel();
        let (tx_b, rx_b) = std::sync::mpsc::channel();
        (
            DuplexChannel { tx: tx_a, rx: rx_b },
            DuplexChannel { tx: tx_b, rx: rx_a },
        )
    }

    impl Channel for DuplexChannel {
        fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
            self.tx
                .send(bytes.to_vec())
                .map_err(|_| GcError::ProtocolViolation("peer hung up".into()))
        }

        fn recv_bytes(&mut self) -> Result<Vec<u8>> {
            self.rx
                .recv()
                .map_err(|_| GcError::ProtocolViolation("peer hung up".into()))
        }
    }

    #[test]
    fn full_session_round_trip_for_and_gate() {
        let json = r#"{ "name": "t", "circuits": [
            { "id": "and", "alice": [1], "bob": [2], "out": [3],
              "gates": [{ "id": 3, "type": "AND", "in": [1,2] }] } ] }"#;
        let file = CircuitFile::from_json(json).unwrap();
        let circuit = file.circuit("and").unwrap().clone();

        let (mut garbler_chan, mut evaluator_chan) = duplex_pair();

        let garbler_thread = std::thread::spawn(move || {
            let mut rng = ChaCha12Rng::from_seed([50; 32]);
            let state = GarblerState::garble(circuit, &mut rng).unwrap();
            let mut session = GarblerSession::new(&mut garbler_chan, state, false);
            session.init().unwrap();
            let mut alice_bits = Assignment::new();
            alice_bits.insert(1, true);
            session.run_assignment(&alice_bits, &mut rng).unwrap();
            session.finish().unwrap();
        });

        let mut rng = ChaCha12Rng::from_seed([51; 32]);
        let mut session = EvaluatorSession::new(&mut evaluator_chan, false);
        let init = session.init().unwrap();
        let mut bob_bits = Assignment::new();
        bob_bits.insert(2, true);
        let result = session.run_assignment(&init, &bob_bits, &mut rng).unwrap();
        assert_eq!(result[&3], true);

        garbler_thread.join().unwrap();
    }
}
