//! Error taxonomy for the garbled-circuits core.
//!
//! Every fallible operation in `gc` returns `Result<T, GcError>`. The binary
//! front-end (`gc-cli`) wraps these in `anyhow::Context` for display; the
//! library itself never downgrades a specific failure into a string.

use thiserror::Error;

/// Errors raised by circuit loading, garbling, evaluation, OT and the
/// protocol driver.
#[derive(Debug, Error)]
pub enum GcError {
    /// A circuit file is missing fields, references an unknown gate type,
    /// has a dangling wire, or contains a cycle. Fatal at load time.
    #[error("malformed circuit: {0}")]
    MalformedCircuit(String),

    /// A received message had an unexpected type, length, or a group
    /// element outside `[1, p-1]`. Fatal: the session is aborted.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The RNG was exhausted or a hash/XOF produced fewer bytes than
    /// requested. Fatal.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// The peer disconnected or a read/write on the channel failed.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] std::io::Error),

    /// Local-test-mode only: an evaluated output disagreed with the
    /// reference semantic evaluation of the circuit.
    #[error("logic mismatch on wire {wire}: expected {expected}, got {actual}")]
    LogicMismatch {
        /// The output wire whose bit did not match.
        wire: crate::circuit::WireId,
        /// The semantically-correct bit.
        expected: bool,
        /// The bit the evaluator actually produced.
        actual: bool,
    },

    /// Wire-format (de)serialization failure, surfaced as a protocol
    /// violation since an untrusted peer is the only source of bad bytes.
    #[error("wire encoding error: {0}")]
    Encoding(#[from] Box<bincode::ErrorKind>),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GcError>;
