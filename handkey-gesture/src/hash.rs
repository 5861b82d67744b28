use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::quantize::QuantizedVector;

/// Salt characters folded into a rolling credential.
pub const ROLLING_SALT_TERMS: usize = 3;
/// Hex characters kept from the unsalted SHA-256 feature digest.
pub const FEATURE_DIGEST_LEN: usize = 12;

/// How a quantized vector becomes a credential string. Enrollment and
/// verification of one user must use the same profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashProfile {
    /// 32-bit polynomial fold, 8 hex characters.
    #[default]
    Rolling,
    /// SHA-256 over the `|`-joined buckets, re-hashed with the salt.
    Sha256,
}

impl HashProfile {
    pub fn digest(self, quantized: &QuantizedVector, salt: Option<&str>) -> String {
        let salt = salt.filter(|s| !s.is_empty());
        match (self, salt) {
            (HashProfile::Rolling, None) => rolling_hash(quantized.iter()),
            (HashProfile::Rolling, Some(salt)) => {
                rolling_hash(quantized.iter().chain(salt_terms(salt)))
            }
            (HashProfile::Sha256, None) => feature_digest(quantized),
            (HashProfile::Sha256, Some(salt)) => {
                sha256_hex(&format!("{}{}", feature_digest(quantized), salt))
            }
        }
    }

    /// Length of the hex digest this profile produces.
    pub fn digest_len(self, salted: bool) -> usize {
        match (self, salted) {
            (HashProfile::Rolling, _) => 8,
            (HashProfile::Sha256, false) => FEATURE_DIGEST_LEN,
            (HashProfile::Sha256, true) => 64,
        }
    }
}

/// `acc = acc * 31 + v (mod 2^32)` from the left, seeded with 0.
pub fn rolling_hash(values: impl IntoIterator<Item = u32>) -> String {
    let acc = values
        .into_iter()
        .fold(0u32, |acc, v| acc.wrapping_mul(31).wrapping_add(v));
    format!("{acc:08x}")
}

/// Extra terms mixed into a rolling credential: `ord(c) mod 5` for the first salt characters.
pub fn salt_terms(salt: &str) -> impl Iterator<Item = u32> + '_ {
    salt.chars().take(ROLLING_SALT_TERMS).map(|c| u32::from(c) % 5)
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Truncated SHA-256 of the buckets rendered as `b0|b1|...`.
pub fn feature_digest(quantized: &QuantizedVector) -> String {
    let joined = quantized
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join("|");
    let mut digest = sha256_hex(&joined);
    digest.truncate(FEATURE_DIGEST_LEN);
    digest
}

/// Fraction of equal bits between two hex strings, each character read as 4 bits.
///
/// Strings of different length, empty strings, or non-hex input score 0.
pub fn bit_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut matching = 0u32;
    let mut total = 0u32;
    for (ca, cb) in a.chars().zip(b.chars()) {
        let (Some(x), Some(y)) = (ca.to_digit(16), cb.to_digit(16)) else {
            return 0.0;
        };
        matching += 4 - (x ^ y).count_ones();
        total += 4;
    }

    f64::from(matching) / f64::from(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(values: &[u32]) -> QuantizedVector {
        QuantizedVector::from(values.to_vec())
    }

    #[test]
    fn rolling_matches_reference_values() {
        assert_eq!(rolling_hash([1, 2, 3]), "00000402");
        assert_eq!(rolling_hash([0xFFFF; 5]), "8fb2703f");
        assert_eq!(rolling_hash(std::iter::empty::<u32>()), "00000000");
    }

    #[test]
    fn rolling_salt_uses_first_three_chars() {
        let fist = q(&[0; 13]);
        assert_eq!(HashProfile::Rolling.digest(&fist, None), "00000000");
        assert_eq!(HashProfile::Rolling.digest(&fist, Some("alice")), "000007df");
        assert_eq!(HashProfile::Rolling.digest(&fist, Some("ali")), "000007df");
        assert_eq!(HashProfile::Rolling.digest(&fist, Some("bob")), "00000b65");
    }

    #[test]
    fn empty_salt_is_unsalted() {
        let open = q(&[0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        for profile in [HashProfile::Rolling, HashProfile::Sha256] {
            assert_eq!(profile.digest(&open, Some("")), profile.digest(&open, None));
        }
    }

    #[test]
    fn sha256_matches_reference_values() {
        assert_eq!(feature_digest(&q(&[1, 2, 3])), "7ee74ca6db4b");
        let fist = q(&[0; 13]);
        assert_eq!(HashProfile::Sha256.digest(&fist, None), "dfef87ca8eb3");
        assert_eq!(
            HashProfile::Sha256.digest(&fist, Some("alice")),
            "b451ad3b5f52ed011defd7c7f6711af14af64c8dd3d2620cfa8ba0f63978f0e1"
        );
    }

    #[test]
    fn digest_lengths() {
        let v = q(&[2, 0, 1]);
        for profile in [HashProfile::Rolling, HashProfile::Sha256] {
            assert_eq!(profile.digest(&v, None).len(), profile.digest_len(false));
            assert_eq!(profile.digest(&v, Some("carol")).len(), profile.digest_len(true));
        }
    }

    #[test]
    fn similarity_counts_bits() {
        assert_eq!(bit_similarity("00000000", "00000000"), 1.0);
        assert_eq!(bit_similarity("0000", "ffff"), 0.0);
        // 0x1 vs 0x0 differs in one of four bits
        assert_eq!(bit_similarity("1", "0"), 0.75);
        assert_eq!(bit_similarity("ABCD", "abcd"), 1.0);
    }

    #[test]
    fn similarity_rejects_incomparable_input() {
        assert_eq!(bit_similarity("", ""), 0.0);
        assert_eq!(bit_similarity("00", "000"), 0.0);
        assert_eq!(bit_similarity("zz", "zz"), 0.0);
    }
}
