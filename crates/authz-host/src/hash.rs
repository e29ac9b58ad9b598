//! Rule set fingerprints.

use sha2::{Digest, Sha256};

/// SHA-256 of the rendered rule set, hex encoded with an `r:` prefix.
pub fn compute_fingerprint(rendered: &str) -> String {
    format!("r:{}", hex::encode(Sha256::digest(rendered.as_bytes())))
}
