//! 1-of-2 oblivious transfer (Smart's Diffie-Hellman construction) over
//! the group fixed in `group`.
//!
//! The protocol is split into four step functions rather than one
//! blocking call so that `protocol` can interleave each step with a real
//! network round trip, while tests here can run both sides back-to-back
//! in the same process with no channel at all.

use num_bigint::BigUint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::constants::OT_HASH_DOMAIN;
use crate::error::{GcError, Result};
use crate::group::PrimeGroup;

/// First message from the garbler: the group and its challenge `c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtChallenge {
    pub group: PrimeGroup,
    pub c: BigUint,
}

/// The garbler's half of the transfer state, held between sending the
/// challenge and receiving the evaluator's response.
pub struct OtSenderState {
    group: PrimeGroup,
    c: BigUint,
}

/// Draw a random challenge `c` in the fixed group and the state needed to
/// finish the transfer once the evaluator responds.
pub fn sender_challenge(rng: &mut impl RngCore) -> (OtSenderState, OtChallenge) {
    let group = PrimeGroup::fixed();
    let c = group.gen_pow(&group.rand_int(rng));
    (
        OtSenderState {
            group: group.clone(),
            c: c.clone(),
        },
        OtChallenge { group, c },
    )
}

/// The evaluator's response: the group element matching its selection bit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtResponse {
    pub h_recv: BigUint,
}

/// The evaluator's half of the transfer state, held between responding to
/// the challenge and receiving the sender's ciphertexts.
pub struct OtReceiverState {
    group: PrimeGroup,
    x: BigUint,
    selection_bit: bool,
}

/// Respond to a sender's challenge with the selection bit `b`'s half of
/// the pair `(h0, h1)`: `h_b = g^x`, `h_{1-b} = c * (g^x)^-1`.
pub fn receiver_respond(
    challenge: &OtChallenge,
    selection_bit: bool,
    rng: &mut impl RngCore,
) -> Result<(OtReceiverState, OtResponse)> {
    challenge.group.validate_element(&challenge.c)?;
    let x = challenge.group.rand_int(rng);
    let x_pow = challenge.group.gen_pow(&x);
    let h_recv = if selection_bit {
        challenge.group.mul(&challenge.c, &challenge.group.inv(&x_pow))
    } else {
        x_pow
    };
    Ok((
        OtReceiverState {
            group: challenge.group.clone(),
            x,
            selection_bit,
        },
        OtResponse { h_recv },
    ))
}

/// The sender's final message: `c1 = g^k` plus the two masked messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtPayload {
    pub c1: BigUint,
    pub e0: Vec<u8>,
    pub e1: Vec<u8>,
}

/// Finish the transfer on the sender side: derive `h1` as the complement
/// of whatever was received, then mask `m0` under `h_recv^k` and `m1`
/// under `h1^k`.
pub fn sender_finish(
    state: OtSenderState,
    response: &OtResponse,
    messages: (&[u8], &[u8]),
    rng: &mut impl RngCore,
) -> Result<OtPayload> {
    state.group.validate_element(&response.h_recv)?;
    let (m0, m1) = messages;
    if m0.len() != m1.len() {
        return Err(GcError::ProtocolViolation(
            "oblivious-transfer messages must be the same length".into(),
        ));
    }
    let h_other = state
        .group
        .mul(&state.c, &state.group.inv(&response.h_recv));
    let k = state.group.rand_int(rng);
    let c1 = state.group.gen_pow(&k);

    let e0 = xor_bytes(m0, &ot_hash(&state.group.pow(&response.h_recv, &k), m0.len()));
    let e1 = xor_bytes(m1, &ot_hash(&state.group.pow(&h_other, &k), m1.len()));
    Ok(OtPayload { c1, e0, e1 })
}

/// Finish the transfer on the evaluator side: recover `m_b` from the
/// payload using the discrete log of `h_b` the evaluator alone knows.
pub fn receiver_finish(state: OtReceiverState, payload: &OtPayload) -> Result<Vec<u8>> {
    state.group.validate_element(&payload.c1)?;
    let key = state.group.pow(&payload.c1, &state.x);
    let chosen = if state.selection_bit {
        &payload.e1
    } else {
        &payload.e0
    };
    let mask = ot_hash(&key, chosen.len());
    Ok(xor_bytes(chosen, &mask))
}

/// `H'(domain || element-bytes)`, expanded via SHAKE256 to exactly
/// `out_len` bytes.
fn ot_hash(element: &BigUint, out_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();
    hasher.update(OT_HASH_DOMAIN);
    hasher.update(&element.to_bytes_be());
    let mut reader = hasher.finalize_xof();
    let mut out = vec![0u8; out_len];
    reader.read(&mut out);
    out
}

fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Run a full transfer with both halves resident in the same process —
/// used by the local tester and by the tests below. Real sessions drive
/// the same four functions through `protocol::Channel` instead.
pub fn transfer_in_process(
    messages: (&[u8], &[u8]),
    selection_bit: bool,
    rng: &mut impl RngCore,
) -> Result<Vec<u8>> {
    let (sender_state, challenge) = sender_challenge(rng);
    let (receiver_state, response) = receiver_respond(&challenge, selection_bit, rng)?;
    let payload = sender_finish(sender_state, &response, messages, rng)?;
    receiver_finish(receiver_state, &payload)
}

/// The insecure stand-in used when OT is disabled for local debugging:
/// the sender just hands over both messages in the clear.
pub fn disabled_transfer(messages: (&[u8], &[u8]), selection_bit: bool) -> Vec<u8> {
    if selection_bit {
        messages.1.to_vec()
    } else {
        messages.0.to_vec()
    }
}
