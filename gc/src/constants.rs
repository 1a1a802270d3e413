//! Shared constants for the garbled circuits library.

/// Security parameter: label length in bytes (128-bit labels).
pub const LABEL_BYTES: usize = 16;

/// Domain separator prefixed to every garbled-table hash input.
pub const GATE_HASH_DOMAIN: &[u8] = b"gc-key";

/// Domain separator prefixed to every OT mask hash input.
pub const OT_HASH_DOMAIN: &[u8] = b"gc-ot";

/// Progress update interval - update progress bar/spinner every N operations.
pub const PROGRESS_UPDATE_INTERVAL: u32 = 1000;
