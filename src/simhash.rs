use std::collections::HashMap;

/// Default band count and fingerprint width, matching
/// `Config::simhash_bands`/`Config::simhash_bits`'s documented
/// defaults. `SimHashIndex::new()` uses these; `with_params` takes
/// them from a `Config` instead.
const DEFAULT_BANDS: u32 = 4;
const DEFAULT_BITS: u32 = 64;
const DEFAULT_THRESHOLD: f64 = 0.95;

/// Computes the 64-bit SimHash fingerprint of a token stream.
///
/// Each token contributes the low 64 bits of its MD5 digest to a
/// per-bit vote vector; the final fingerprint sets bit `i` wherever
/// the vote is non-negative. An empty token stream yields the
/// all-ones fingerprint, since every vote starts and stays at zero.
pub fn simhash(tokens: &[String]) -> u64 {
    let mut votes = [0i64; 64];

    for token in tokens {
        let digest = md5::compute(token.as_bytes()).0;
        let low64 = u64::from_be_bytes(digest[8..16].try_into().expect("8 bytes"));
        for (i, vote) in votes.iter_mut().enumerate() {
            if low64 & (1 << i) != 0 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }

    let mut fingerprint: u64 = 0;
    for (i, vote) in votes.iter().enumerate() {
        if *vote >= 0 {
            fingerprint |= 1 << i;
        }
    }
    fingerprint
}

fn band(fingerprint: u64, i: u32, band_bits: u32) -> u64 {
    (fingerprint >> (band_bits * i)) & ((1u64 << band_bits) - 1)
}

/// Converts a similarity threshold (e.g. `0.95`) over a fingerprint
/// width into the maximum Hamming distance still counted as a
/// near-duplicate: `floor((1 - threshold) * bits)`. The canonical
/// 0.95/64 pair yields 3, matching spec.md's worked example exactly.
fn max_distance(bits: u32, threshold: f64) -> u32 {
    (((1.0 - threshold) * bits as f64).floor()).max(0.0) as u32
}

/// Banded locality-sensitive index over SimHash fingerprints. Not
/// internally synchronized — callers hold it behind the same lock
/// that guards the rest of the page index, since a lookup-then-insert
/// must be atomic to avoid two mutually-near-duplicate pages both
/// being admitted.
pub struct SimHashIndex {
    buckets: HashMap<(u32, u64), Vec<u64>>,
    bands: u32,
    band_bits: u32,
    max_distance: u32,
}

impl Default for SimHashIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHashIndex {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_BANDS, DEFAULT_BITS, DEFAULT_THRESHOLD)
    }

    /// Builds an index parameterized by `Config::simhash_bands`,
    /// `Config::simhash_bits`, and `Config::duplicate_threshold`.
    pub fn with_params(bands: u32, bits: u32, threshold: f64) -> Self {
        Self {
            buckets: HashMap::new(),
            bands,
            band_bits: bits / bands,
            max_distance: max_distance(bits, threshold),
        }
    }

    /// Returns true if `fingerprint` is within the configured maximum
    /// Hamming distance of any previously stored fingerprint.
    /// Short-circuits on the first hit.
    pub fn is_near_duplicate(&self, fingerprint: u64) -> bool {
        for i in 0..self.bands {
            let Some(candidates) = self.buckets.get(&(i, band(fingerprint, i, self.band_bits)))
            else {
                continue;
            };
            for &candidate in candidates {
                let distance = (fingerprint ^ candidate).count_ones();
                if distance <= self.max_distance {
                    return true;
                }
            }
        }
        false
    }

    /// Inserts `fingerprint` into all of its band buckets.
    pub fn store(&mut self, fingerprint: u64) {
        for i in 0..self.bands {
            self.buckets
                .entry((i, band(fingerprint, i, self.band_bits)))
                .or_default()
                .push(fingerprint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_stream_is_all_ones() {
        assert_eq!(simhash(&[]), u64::MAX);
    }

    #[test]
    fn identical_token_streams_hash_identically() {
        let tokens = vec!["foo".to_string(), "bar".to_string(), "baz".to_string()];
        assert_eq!(simhash(&tokens), simhash(&tokens));
    }

    #[test]
    fn store_then_query_is_near_duplicate() {
        let mut idx = SimHashIndex::new();
        let f = simhash(&["alpha".to_string(), "beta".to_string()]);
        idx.store(f);
        assert!(idx.is_near_duplicate(f));
    }

    #[test]
    fn hamming_distance_three_is_duplicate_four_is_not() {
        let mut idx = SimHashIndex::new();
        let base: u64 = 0;
        idx.store(base);

        let dist3 = base ^ 0b111;
        assert!(idx.is_near_duplicate(dist3));

        let mut idx2 = SimHashIndex::new();
        idx2.store(base);
        let dist4 = base ^ 0b1111;
        assert!(!idx2.is_near_duplicate(dist4));
    }

    #[test]
    fn with_params_derives_max_distance_from_threshold() {
        // threshold=0.95 over 64 bits: floor(0.05*64) = 3, same as the
        // canonical default.
        let mut idx = SimHashIndex::with_params(4, 64, 0.95);
        idx.store(0);
        assert!(idx.is_near_duplicate(0b111));
        assert!(!idx.is_near_duplicate(0b1111));
    }

    #[test]
    fn with_params_tighter_threshold_shrinks_max_distance() {
        // threshold=0.99 over 64 bits: floor(0.01*64) = 0, only exact
        // matches count as near-duplicates.
        let mut idx = SimHashIndex::with_params(4, 64, 0.99);
        idx.store(0);
        assert!(idx.is_near_duplicate(0));
        assert!(!idx.is_near_duplicate(1));
    }

    #[test]
    fn unrelated_fingerprint_is_not_duplicate() {
        let mut idx = SimHashIndex::new();
        idx.store(simhash(&["completely".to_string(), "different".to_string()]));
        assert!(!idx.is_near_duplicate(simhash(&[
            "totally".to_string(),
            "unrelated".to_string(),
            "tokens".to_string(),
            "here".to_string()
        ])));
    }
}
