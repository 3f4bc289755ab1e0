//! # Hashing
//!
//! Seeded 64-bit byte-string hash and the MSI probe sequence shared by every
//! open-addressing table in this crate.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

/// Fixed hash key. Tables must hash identically across runs and platforms.
pub const HASH_SEED: u64 = 0x00C0_DE15_D474;

/// Hashes a byte string with SipHash-1-3 keyed by [`HASH_SEED`].
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(HASH_SEED, 0);
    hasher.write(bytes);
    hasher.finish()
}

/// Open-addressing probe sequence over a `2^exp`-slot table.
///
/// The step is the hash's top `exp` bits forced odd. An odd step is coprime
/// with the table size, so the sequence yields every slot exactly once.
///
/// # Example
///
/// ```rust,ignore
/// for slot in MsiProbe::new(hash_bytes(b"main.lua"), 10) {
///     // first empty or matching slot wins
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MsiProbe {
    index: u64,
    step: u64,
    mask: u64,
    remaining: usize,
}

impl MsiProbe {
    /// Starts a probe for `hash` over `2^exp` slots.
    ///
    /// # Panics
    ///
    /// Panics if `exp > 31`.
    #[must_use]
    pub fn new(hash: u64, exp: u32) -> Self {
        assert!(exp <= 31, "probe exponent {exp} exceeds 31");
        let step = hash.checked_shr(64 - exp).unwrap_or(0) | 1;
        Self {
            index: hash,
            step,
            mask: (1u64 << exp) - 1,
            remaining: 1usize << exp,
        }
    }
}

impl Iterator for MsiProbe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.index = self.index.wrapping_add(self.step) & self.mask;
        // mask < 2^31, fits any supported usize.
        Some(self.index as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for MsiProbe {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_bytes(b"main.lua"), hash_bytes(b"main.lua"));
        assert_ne!(hash_bytes(b"main.lua"), hash_bytes(b"other.lua"));
        assert_ne!(hash_bytes(b""), hash_bytes(b"\0"));
    }

    #[test]
    fn test_probe_visits_every_slot_once() {
        for exp in 0..=12 {
            for hash in [0, 1, 0xDEAD_BEEF, u64::MAX, hash_bytes(b"w")] {
                let mut seen = vec![false; 1 << exp];
                for slot in MsiProbe::new(hash, exp) {
                    assert!(!seen[slot], "slot {slot} visited twice (exp {exp})");
                    seen[slot] = true;
                }
                assert!(seen.iter().all(|&s| s));
            }
        }
    }

    #[test]
    fn test_step_is_odd_top_bits() {
        let hash = 0xF000_0000_0000_0000;
        let mut probe = MsiProbe::new(hash, 4);
        assert_eq!(probe.step, 0xF);
        // Starting from hash, the first slot is (hash + step) & mask.
        assert_eq!(probe.next(), Some(0xF));
        assert_eq!(probe.len(), 15);
    }
}
