//! Component A: a probabilistic recent-set membership filter with bounded
//! memory that forgets its oldest entries instead of growing forever.
//!
//! Capacity and false-positive rate are configured once; three "generations"
//! of roughly `capacity / 2` insertions each are kept live at a time, so the
//! most recent `capacity` insertions are always present, insertions between
//! `capacity` and `2 * capacity` ago may or may not still be present, and
//! anything older is gone. See SPEC_FULL.md section 9 for why the hashing
//! scheme below (two independent SipHash lanes, Kirsch-Mitzenmacher combined
//! into `n_hash_funcs` positions) stands in for the source's bespoke rolling
//! filter.

use std::f64::consts::LN_2;

use siphasher::sip::SipHasher13;
use std::hash::Hasher;

use crate::config::RollingFilterParams;
use crate::types::Hash256;

const GENERATIONS: u32 = 3;

/// A rolling Bloom filter over 256-bit hashes.
pub struct RollingBloomFilter {
    n_hash_funcs: u32,
    n_entries_per_generation: u32,
    n_bits: usize,
    // two bits per slot, encoded across two parallel words: generation = (b1<<1)|b0.
    b0: Vec<u64>,
    b1: Vec<u64>,
    generation: u8,
    insertions_this_generation: u32,
    seed_k0: u64,
    seed_k1: u64,
}

impl RollingBloomFilter {
    pub fn new(params: RollingFilterParams) -> Self {
        Self::with_seed(params, 0xDEAD_BEEF_CAFE_F00D, 0x0BAD_C0DE_1337_BEEF)
    }

    pub fn with_seed(params: RollingFilterParams, seed_k0: u64, seed_k1: u64) -> Self {
        let capacity = params.capacity.max(1);
        let fp_rate = params.false_positive_rate.clamp(1e-9, 0.999);

        let n_hash_funcs = (((-1.0f64 * fp_rate.ln()) / LN_2).round() as u32).clamp(1, 50);
        let n_entries_per_generation = (capacity + 1) / 2;
        let max_elements = n_entries_per_generation * GENERATIONS;
        let n_bits = ((-1.0f64 * (max_elements as f64) * fp_rate.ln()) / (LN_2 * LN_2)).ceil() as usize;
        let n_bits = n_bits.max(64);
        let n_words = n_bits.div_ceil(64);

        RollingBloomFilter {
            n_hash_funcs,
            n_entries_per_generation,
            n_bits: n_words * 64,
            b0: vec![0u64; n_words],
            b1: vec![0u64; n_words],
            generation: 1,
            insertions_this_generation: 0,
            seed_k0,
            seed_k1,
        }
    }

    fn hash_pair(&self, hash: &Hash256) -> (u64, u64) {
        let mut h1 = SipHasher13::new_with_keys(self.seed_k0, self.seed_k1);
        h1.write(&hash.0);
        let first = h1.finish();
        let mut h2 = SipHasher13::new_with_keys(self.seed_k1, self.seed_k0 ^ 0x5555_5555_5555_5555);
        h2.write(&hash.0);
        let second = h2.finish();
        (first, second)
    }

    fn positions(&self, hash: &Hash256) -> impl Iterator<Item = usize> + '_ {
        let (h1, h2) = self.hash_pair(hash);
        (0..self.n_hash_funcs).map(move |i| {
            let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
            (combined as usize) % self.n_bits
        })
    }

    fn get_bit(words: &[u64], pos: usize) -> bool {
        (words[pos / 64] >> (pos % 64)) & 1 == 1
    }

    fn set_bit(words: &mut [u64], pos: usize, value: bool) {
        if value {
            words[pos / 64] |= 1 << (pos % 64);
        } else {
            words[pos / 64] &= !(1u64 << (pos % 64));
        }
    }

    fn generation_at(&self, pos: usize) -> u8 {
        let hi = Self::get_bit(&self.b1, pos) as u8;
        let lo = Self::get_bit(&self.b0, pos) as u8;
        (hi << 1) | lo
    }

    fn set_generation_at(&mut self, pos: usize, generation: u8) {
        Self::set_bit(&mut self.b1, pos, (generation >> 1) & 1 == 1);
        Self::set_bit(&mut self.b0, pos, generation & 1 == 1);
    }

    fn next_generation(current: u8) -> u8 {
        // cycle through 1, 2, 3, never landing on the "empty" marker 0.
        match current {
            1 => 2,
            2 => 3,
            _ => 1,
        }
    }

    /// Insert a hash. Amortized O(`n_hash_funcs`).
    pub fn insert(&mut self, hash: &Hash256) {
        self.insertions_this_generation += 1;
        if self.insertions_this_generation > self.n_entries_per_generation {
            self.insertions_this_generation = 0;
            let retiring = Self::next_generation(self.generation);
            self.generation = retiring;
            // the generation we're about to start writing was last used two
            // rotations ago; clear it so its stale entries read as absent.
            for pos in 0..self.n_bits {
                if self.generation_at(pos) == retiring {
                    self.set_generation_at(pos, 0);
                }
            }
        }
        let generation = self.generation;
        let positions: Vec<usize> = self.positions(hash).collect();
        for pos in positions {
            self.set_generation_at(pos, generation);
        }
    }

    /// Test membership. O(`n_hash_funcs`); may false-positive once the filter
    /// is near capacity, never false-negatives an item inserted within the
    /// last `capacity` insertions.
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.positions(hash).all(|pos| self.generation_at(pos) != 0)
    }

    /// Empty the filter in O(size of the bit array).
    pub fn reset(&mut self) {
        self.b0.iter_mut().for_each(|w| *w = 0);
        self.b1.iter_mut().for_each(|w| *w = 0);
        self.generation = 1;
        self.insertions_this_generation = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollingFilterParams;

    fn hash_of(n: u64) -> Hash256 {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Hash256(bytes)
    }

    #[test]
    fn recently_inserted_always_present() {
        let params = RollingFilterParams::new(1000, 0.000_001);
        let mut filter = RollingBloomFilter::new(params);
        for i in 0..1000u64 {
            filter.insert(&hash_of(i));
        }
        for i in 0..1000u64 {
            assert!(filter.contains(&hash_of(i)), "missing recent item {i}");
        }
    }

    #[test]
    fn very_old_entries_forgotten() {
        let params = RollingFilterParams::new(1000, 0.000_001);
        let mut filter = RollingBloomFilter::new(params);
        filter.insert(&hash_of(999_999));
        for i in 0..5000u64 {
            filter.insert(&hash_of(i));
        }
        assert!(!filter.contains(&hash_of(999_999)));
    }

    #[test]
    fn reset_empties_filter() {
        let params = RollingFilterParams::new(100, 0.000_001);
        let mut filter = RollingBloomFilter::new(params);
        filter.insert(&hash_of(1));
        assert!(filter.contains(&hash_of(1)));
        filter.reset();
        assert!(!filter.contains(&hash_of(1)));
    }

    #[test]
    fn never_inserted_usually_absent() {
        let params = RollingFilterParams::new(1000, 0.000_001);
        let mut filter = RollingBloomFilter::new(params);
        for i in 0..500u64 {
            filter.insert(&hash_of(i));
        }
        let mut false_positives = 0u32;
        for i in 1_000_000..1_001_000u64 {
            if filter.contains(&hash_of(i)) {
                false_positives += 1;
            }
        }
        assert!(false_positives < 10, "false positive rate too high: {false_positives}/1000");
    }
}
