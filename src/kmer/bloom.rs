// src/kmer/bloom.rs
//! Bloom filter used as a negative pre-filter for k-mer existence queries.
//!
//! Classification probes eight candidate neighbours per vertex and most of
//! them are absent from the k-mer set. The filter answers "definitely absent"
//! for the bulk of those probes before the exact lookup runs.

use ahash::AHasher;
use std::hash::{Hash, Hasher};

/// Probabilistic membership filter (false positives possible, no false negatives)
pub struct BloomFilter {
    /// Bit vector storing the filter state
    bits: Vec<u64>,
    /// Number of bits in the filter
    num_bits: usize,
    /// Number of probe positions per item
    num_hashes: usize,
    seed: u64,
}

impl BloomFilter {
    /// Size the filter for `expected_items` at false positive rate `fp_rate`.
    ///
    /// Uses m = -n ln(p) / ln(2)^2 bits and k = (m / n) ln(2) probes.
    pub fn with_fp_rate(expected_items: usize, fp_rate: f64) -> Self {
        let expected_items = expected_items.max(1);
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let num_bits = (-(expected_items as f64) * fp_rate.ln() / ln2_sq).ceil() as usize;
        let num_hashes = ((num_bits as f64 / expected_items as f64) * std::f64::consts::LN_2)
            .ceil() as usize;

        Self::new(num_bits, num_hashes)
    }

    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        // Round up to whole words, never empty.
        let num_bits = num_bits.max(64).div_ceil(64) * 64;

        Self {
            bits: vec![0u64; num_bits / 64],
            num_bits,
            num_hashes: num_hashes.max(1),
            seed: 0x517c_c1b7_2722_0a95,
        }
    }

    #[inline]
    pub fn insert<T: Hash>(&mut self, item: &T) {
        let hash = self.hash_item(item);
        for i in 0..self.num_hashes {
            let bit_idx = self.bit_index(hash, i);
            self.bits[bit_idx / 64] |= 1u64 << (bit_idx % 64);
        }
    }

    /// `false` means the item was never inserted
    #[inline]
    pub fn may_contain<T: Hash>(&self, item: &T) -> bool {
        let hash = self.hash_item(item);
        (0..self.num_hashes).all(|i| {
            let bit_idx = self.bit_index(hash, i);
            self.bits[bit_idx / 64] & (1u64 << (bit_idx % 64)) != 0
        })
    }

    /// Double hashing: h(i) = h1 + i * h2 mod m
    #[inline]
    fn bit_index(&self, hash: u64, i: usize) -> usize {
        let h1 = hash as u32 as u64;
        let h2 = (hash >> 32) as u32 as u64;
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % self.num_bits as u64) as usize
    }

    #[inline]
    fn hash_item<T: Hash>(&self, item: &T) -> u64 {
        let mut hasher = AHasher::default();
        item.hash(&mut hasher);
        hasher.finish() ^ self.seed
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn memory_bytes(&self) -> usize {
        self.bits.len() * 8
    }

    /// Fill ratio raised to the probe count
    pub fn estimated_fp_rate(&self) -> f64 {
        let bits_set: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        let fill_ratio = bits_set as f64 / self.num_bits as f64;
        fill_ratio.powi(self.num_hashes as i32)
    }
}
