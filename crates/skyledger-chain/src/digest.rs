//! Block fingerprinting

use ring::digest::{Context, SHA256};
use std::fmt::Write;

/// Number of hex characters kept from the SHA-256 output.
pub const DIGEST_LEN: usize = 16;

/// SHA-256 of `content`, lower-case hex, truncated to [`DIGEST_LEN`].
pub fn digest(content: &str) -> String {
    let mut ctx = Context::new(&SHA256);
    ctx.update(content.as_bytes());
    let out = ctx.finish();

    let mut hex = String::with_capacity(DIGEST_LEN);
    for byte in out.as_ref().iter().take(DIGEST_LEN / 2) {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(digest("abc"), "ba7816bf8f01cfea");
        assert_eq!(digest(""), "e3b0c44298fc1c14");
    }

    #[test]
    fn fixed_length_hex() {
        for input in ["", "x", "a much longer input with unicode: 東京 ☀"] {
            let d = digest(input);
            assert_eq!(d.len(), DIGEST_LEN);
            assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn deterministic() {
        assert_eq!(digest("same input"), digest("same input"));
        assert_ne!(digest("input a"), digest("input b"));
    }
}
