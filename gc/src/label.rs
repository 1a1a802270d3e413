//! Per-wire labels and permutation bits.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::LABEL_BYTES;

/// A uniformly random 128-bit wire label standing in for one semantic
/// value (0 or 1) on some wire, for the duration of a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireLabel([u8; LABEL_BYTES]);

impl WireLabel {
    /// Wrap raw bytes as a label.
    pub fn new(bytes: [u8; LABEL_BYTES]) -> Self {
        WireLabel(bytes)
    }

    /// Draw a fresh uniform label.
    pub fn random(rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; LABEL_BYTES];
        rng.fill_bytes(&mut bytes);
        WireLabel(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; LABEL_BYTES] {
        &self.0
    }
}

/// The permutation bit of a wire: a random bit that tags `label_0` with
/// `p` and `label_1` with `p ^ 1`. Revealed as part of the signal bit
/// during evaluation, but independent of the semantic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbit(bool);

impl Pbit {
    /// Draw a fresh uniform p-bit.
    pub fn random(rng: &mut impl RngCore) -> Self {
        Pbit((rng.next_u32() & 1) == 1)
    }

    /// The bit value.
    pub fn value(self) -> bool {
        self.0
    }
}

impl std::ops::BitXor<bool> for Pbit {
    type Output = bool;
    fn bitxor(self, rhs: bool) -> bool {
        self.0 ^ rhs
    }
}

/// The two labels and the permutation bit generated for one wire.
/// `label(0)`/`label(1)` pick out the label for a semantic value;
/// `signal_bit(v)` is `p ^ v`, i.e. the tag travelling with that label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LabelPair {
    label0: WireLabel,
    label1: WireLabel,
    pbit: Pbit,
}

impl LabelPair {
    /// Generate a fresh, independent pair of labels and a p-bit for one
    /// wire. Every wire in a circuit gets its own independently-drawn
    /// pair — no free-XOR sharing.
    pub fn random(rng: &mut impl RngCore) -> Self {
        LabelPair {
            label0: WireLabel::random(rng),
            label1: WireLabel::random(rng),
            pbit: Pbit::random(rng),
        }
    }

    /// The label for semantic value `v`.
    pub fn label(&self, v: bool) -> WireLabel {
        if v { self.label1 } else { self.label0 }
    }

    /// The p-bit for this wire.
    pub fn pbit(&self) -> Pbit {
        self.pbit
    }

    /// The signal bit tagging the label for semantic value `v`: `p ^ v`.
    pub fn signal_bit(&self, v: bool) -> bool {
        self.pbit ^ v
    }

    /// The `((L0, p), (L1, p^1))` pair used directly as the two OT sender
    /// messages for this wire.
    pub fn encrypted_bit_pair(&self) -> EncryptedBitPair {
        EncryptedBitPair {
            zero: (self.label0, self.signal_bit(false)),
            one: (self.label1, self.signal_bit(true)),
        }
    }
}

/// The OT payload for one Bob input wire: the label+signal-bit pair for
/// semantic 0 and for semantic 1, in that fixed order so the OT
/// selection bit can index directly into it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EncryptedBitPair {
    zero: (WireLabel, bool),
    one: (WireLabel, bool),
}

impl EncryptedBitPair {
    /// The pair indexed by semantic bit `v` (0 or 1).
    pub fn get(&self, v: bool) -> (WireLabel, bool) {
        if v { self.one } else { self.zero }
    }
}
