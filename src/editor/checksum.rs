//! Byte-image checksums for the diff report.
//!
//! Two digests per image: a cheap additive SUM-32 and SHA-256, keyed by
//! algorithm name with lowercase hex values.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Algorithm name -> lowercase hex digest.
pub type Checksums = BTreeMap<String, String>;

/// 32-bit wrapping byte sum, rendered as 8 hex digits.
pub const SUM32: &str = "SUM-32";
/// SHA-256 digest.
pub const SHA256: &str = "SHA-256";

/// Compute all checksums of `bytes`.
pub fn compute_checksums(bytes: &[u8]) -> Checksums {
    let mut result = Checksums::new();

    let sum = bytes
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)));
    result.insert(SUM32.to_string(), format!("{sum:08x}"));

    let digest = Sha256::digest(bytes);
    result.insert(SHA256.to_string(), hex::encode(digest));

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum32() {
        let checksums = compute_checksums(&[0x01, 0x02, 0x03]);
        assert_eq!(checksums[SUM32], "00000006");
    }

    #[test]
    fn test_sha256_known_vector() {
        let checksums = compute_checksums(b"test data");
        assert_eq!(
            checksums[SHA256],
            "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9"
        );
    }

    #[test]
    fn test_empty_input() {
        let checksums = compute_checksums(&[]);
        assert_eq!(checksums[SUM32], "00000000");
        assert_eq!(
            checksums[SHA256],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
