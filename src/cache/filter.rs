//! Bloom filter over cache keys.
//!
//! Positions come from double hashing: one SHA-256 digest of the key is split
//! into two 64-bit halves `h1` and `h2`, and probe `i` sets bit
//! `(h1 + i * h2) mod m`. A key that was inserted always reports present. A
//! key that was not may still collide on every probe.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::f64::consts::LN_2;

/// Smallest bit array a filter will allocate.
const MIN_BITS: u64 = 64;

/// Append-only probabilistic set of keys.
#[derive(Debug, Clone)]
pub struct MembershipFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    inserted: u64,
}

impl MembershipFilter {
    /// Sizes a filter for `capacity` keys at the given false-positive rate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `capacity` is zero or the rate is
    /// not strictly between 0 and 1.
    pub fn with_rate(capacity: usize, false_positive_rate: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidInput(
                "filter capacity must be positive".to_string(),
            ));
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(Error::InvalidInput(format!(
                "filter false-positive rate must be in (0, 1), got {false_positive_rate}"
            )));
        }

        #[allow(clippy::cast_precision_loss)]
        let n = capacity as f64;
        let m = (-n * false_positive_rate.ln() / (LN_2 * LN_2)).ceil();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_bits = (m as u64).max(MIN_BITS);
        #[allow(clippy::cast_precision_loss)]
        let k = (num_bits as f64 / n * LN_2).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_hashes = (k as u32).clamp(1, 32);

        Ok(Self::with_dimensions(num_bits, num_hashes))
    }

    /// Creates a filter with an explicit bit count and probe count.
    #[must_use]
    pub fn with_dimensions(num_bits: u64, num_hashes: u32) -> Self {
        let num_bits = num_bits.max(MIN_BITS);
        let words = usize::try_from(num_bits.div_ceil(64)).unwrap_or(usize::MAX);
        Self {
            bits: vec![0; words],
            num_bits,
            num_hashes: num_hashes.max(1),
            inserted: 0,
        }
    }

    /// Records `key`.
    pub fn insert(&mut self, key: &str) {
        for position in self.positions(key) {
            let (word, mask) = Self::locate(position);
            self.bits[word] |= mask;
        }
        self.inserted += 1;
    }

    /// Returns `false` only if `key` was never inserted.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.positions(key).all(|position| {
            let (word, mask) = Self::locate(position);
            self.bits[word] & mask != 0
        })
    }

    /// Size of the bit array.
    #[must_use]
    pub const fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of probes per key.
    #[must_use]
    pub const fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Number of insertions, counting repeats.
    #[must_use]
    pub const fn inserted(&self) -> u64 {
        self.inserted
    }

    /// Estimated false-positive rate at the current fill.
    #[must_use]
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let set: u32 = self.bits.iter().map(|word| word.count_ones()).sum();
        #[allow(clippy::cast_precision_loss)]
        let fill = f64::from(set) / self.num_bits as f64;
        fill.powi(i32::try_from(self.num_hashes).unwrap_or(i32::MAX))
    }

    fn positions(&self, key: &str) -> impl Iterator<Item = u64> + use<> {
        let digest = Sha256::digest(key.as_bytes());
        let mut first = [0_u8; 8];
        let mut second = [0_u8; 8];
        first.copy_from_slice(&digest[..8]);
        second.copy_from_slice(&digest[8..16]);
        let h1 = u64::from_le_bytes(first);
        // odd step so probes never collapse onto one bit
        let h2 = u64::from_le_bytes(second) | 1;
        let num_bits = self.num_bits;

        (0..u64::from(self.num_hashes))
            .map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }

    fn locate(position: u64) -> (usize, u64) {
        let word = usize::try_from(position / 64).unwrap_or(usize::MAX);
        (word, 1_u64 << (position % 64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_keys_are_present() {
        let mut filter = MembershipFilter::with_rate(1_000, 0.01).expect("valid sizing");
        for i in 0..1_000 {
            filter.insert(&format!("latestNews:language:{i}"));
        }
        for i in 0..1_000 {
            assert!(filter.contains(&format!("latestNews:language:{i}")));
        }
        assert_eq!(filter.inserted(), 1_000);
    }

    #[test]
    fn test_empty_filter_contains_nothing() {
        let filter = MembershipFilter::with_rate(100, 0.01).expect("valid sizing");
        assert!(!filter.contains("sources:en"));
        assert!(filter.estimated_false_positive_rate() < f64::EPSILON);
    }

    #[test]
    fn test_false_positive_rate_is_near_target() {
        let mut filter = MembershipFilter::with_rate(2_000, 0.01).expect("valid sizing");
        for i in 0..2_000 {
            filter.insert(&format!("present:{i}"));
        }
        let false_positives = (0..10_000)
            .filter(|i| filter.contains(&format!("absent:{i}")))
            .count();
        assert!(false_positives < 300, "observed {false_positives} false positives");
    }

    #[test]
    fn test_sizing_follows_standard_formula() {
        let filter = MembershipFilter::with_rate(10_000, 0.01).expect("valid sizing");
        assert_eq!(filter.num_bits(), 95_851);
        assert_eq!(filter.num_hashes(), 7);
    }

    #[test]
    fn test_rejects_invalid_sizing() {
        assert!(MembershipFilter::with_rate(0, 0.01).is_err());
        assert!(MembershipFilter::with_rate(10, 0.0).is_err());
        assert!(MembershipFilter::with_rate(10, 1.0).is_err());
        assert!(MembershipFilter::with_rate(10, f64::NAN).is_err());
    }

    #[test]
    fn test_tiny_dimensions_are_clamped() {
        let mut filter = MembershipFilter::with_dimensions(1, 0);
        assert_eq!(filter.num_bits(), MIN_BITS);
        assert_eq!(filter.num_hashes(), 1);
        filter.insert("k");
        assert!(filter.contains("k"));
    }
}
