//! Random hex id generation shared by agent sessions and trace entries.

use rand::RngCore;

/// Generate `n` random bytes and render them as lowercase hex.
fn random_hex(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a session id: a fixed prefix plus 8 hex characters (4 random
/// bytes), e.g. `agt-a1b2c3d4`.
#[must_use]
pub fn session_id() -> String {
    format!("agt-{}", random_hex(4))
}

/// Generate a v4-style random 128-bit hex id (32 hex characters, no
/// hyphens) for trace entries. This intentionally does not claim full
/// RFC 4122 compliance — only the "random 128 bits, hex-rendered" shape
/// a trace entry id needs.
#[must_use]
pub fn trace_id() -> String {
    random_hex(16)
}
