//! In-memory existence predicate over the database's k-mers.

use crate::database::KmerDatabase;
use crate::error::{CdbgError, Result};
use crate::kmer::bloom::BloomFilter;
use crate::kmer::kmer::{Kmer, KmerWord};
use tracing::debug;

const BLOOM_FP_RATE: f64 = 0.01;

/// Sorted canonical k-mer words behind a Bloom pre-filter.
///
/// Read-only after loading, so any number of threads may query it.
pub struct KmerSet<W: KmerWord> {
    k: usize,
    words: Vec<W>,
    bloom: BloomFilter,
}

impl<W: KmerWord> KmerSet<W> {
    pub(crate) fn load(db: &KmerDatabase<W>) -> Result<Self> {
        let k = db.kmer_length();
        let mut words = Vec::with_capacity(db.total_kmer_count() as usize);
        let mut bloom = BloomFilter::with_fp_rate(db.total_kmer_count() as usize, BLOOM_FP_RATE);

        for kmer in db.buf_iter()? {
            let kmer = kmer?;
            if !kmer.is_canonical() {
                return Err(CdbgError::database(
                    db.path(),
                    format!("k-mer {} is not in canonical form", kmer),
                ));
            }
            if words.last().is_some_and(|&last| last >= kmer.encoded()) {
                return Err(CdbgError::database(
                    db.path(),
                    format!("k-mer {} is out of order or duplicated", kmer),
                ));
            }

            bloom.insert(&kmer.encoded());
            words.push(kmer.encoded());
        }

        debug!(
            "Loaded {} k-mers; bloom pre-filter uses {} bytes (estimated fp rate {:.4})",
            words.len(),
            bloom.memory_bytes(),
            bloom.estimated_fp_rate()
        );

        Ok(Self { k, words, bloom })
    }

    /// Build a set directly from k-mers of any orientation
    pub fn from_kmers<I: IntoIterator<Item = Kmer<W>>>(k: usize, kmers: I) -> Self {
        let mut words: Vec<W> = kmers.into_iter().map(|km| km.canonical().encoded()).collect();
        words.sort_unstable();
        words.dedup();

        let mut bloom = BloomFilter::with_fp_rate(words.len(), BLOOM_FP_RATE);
        for w in &words {
            bloom.insert(w);
        }

        Self { k, words, bloom }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether `kmer`, in either orientation, is in the set
    #[inline]
    pub fn contains(&self, kmer: &Kmer<W>) -> bool {
        self.contains_canonical(kmer.canonical().encoded())
    }

    #[inline]
    pub fn contains_canonical(&self, word: W) -> bool {
        self.bloom.may_contain(&word) && self.words.binary_search(&word).is_ok()
    }

    /// Canonical encodings in increasing order
    pub fn words(&self) -> &[W] {
        &self.words
    }

    pub fn memory_bytes(&self) -> usize {
        self.words.len() * W::BYTES + self.bloom.memory_bytes()
    }
}
