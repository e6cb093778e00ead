//! Vertex index: a minimal perfect hash over the canonical k-mers plus one
//! state byte per vertex.
//!
//! The hash function stores no keys, so `slot_for` is only meaningful for
//! k-mers known to be in the set. Existence questions go to the `KmerSet`.

use crate::database::KmerSet;
use crate::error::{CdbgError, Result};
use crate::graph::state::{VertexState, VISITED_BIT};
use crate::kmer::kmer::{Kmer, KmerWord};
use boomphf::Mphf;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Space/time trade-off of the hash construction (bits per key grows with it)
const MPHF_GAMMA: f64 = 1.7;

pub struct Vertices<W: KmerWord> {
    k: usize,
    mphf: Option<Mphf<W>>,
    states: Vec<AtomicU8>,
}

impl<W: KmerWord> Vertices<W> {
    /// Build (or load from `mph_path`) the hash function and allocate the state table.
    ///
    /// A freshly built function is saved to `mph_path` when one is given.
    pub fn build(
        set: &KmerSet<W>,
        k: usize,
        thread_count: usize,
        mph_path: Option<&Path>,
    ) -> Result<Self> {
        if set.k() != k {
            return Err(CdbgError::config(format!(
                "Expected k value {}, but the k-mer source holds {}-mers",
                k,
                set.k()
            )));
        }

        let kmer_count = set.len();
        let mphf = if kmer_count == 0 {
            None
        } else {
            let loaded = match mph_path {
                Some(path) if path.exists() => load_mphf::<W>(path, k, kmer_count)?,
                _ => None,
            };

            match loaded {
                Some(mphf) => Some(mphf),
                None => {
                    let mphf = build_mphf(set, thread_count)?;
                    if let Some(path) = mph_path {
                        save_mphf(path, k, kmer_count, &mphf)?;
                    }
                    Some(mphf)
                }
            }
        };

        let states = (0..kmer_count).map(|_| AtomicU8::new(0)).collect();

        Ok(Self { k, mphf, states })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Dense slot of a canonical k-mer that is present in the set
    #[inline]
    pub fn slot_for(&self, kmer: &Kmer<W>) -> Option<usize> {
        debug_assert!(kmer.is_canonical());
        let slot = self.mphf.as_ref()?.try_hash(&kmer.encoded())? as usize;
        (slot < self.states.len()).then_some(slot)
    }

    #[inline]
    pub fn state(&self, slot: usize) -> VertexState {
        VertexState::from_bits(self.states[slot].load(Ordering::Relaxed))
    }

    /// Record the classification of a vertex; each vertex is classified once
    pub fn classify(&self, slot: usize, state: VertexState) -> Result<()> {
        let previous = VertexState::from_bits(self.states[slot].swap(state.bits(), Ordering::Relaxed));
        if previous.is_classified() {
            return Err(CdbgError::invariant(format!(
                "vertex slot {} classified twice",
                slot
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn is_visited(&self, slot: usize) -> bool {
        self.states[slot].load(Ordering::Acquire) & VISITED_BIT != 0
    }

    /// Atomically set the visited flag; true only for the first caller
    #[inline]
    pub fn try_claim(&self, slot: usize) -> bool {
        self.states[slot].fetch_or(VISITED_BIT, Ordering::AcqRel) & VISITED_BIT == 0
    }

    #[inline]
    pub fn mark_visited(&self, slot: usize) {
        self.states[slot].fetch_or(VISITED_BIT, Ordering::Release);
    }

    /// Release the hash function and the state table
    pub fn clear(&mut self) {
        self.mphf = None;
        self.states = Vec::new();
    }
}

fn build_mphf<W: KmerWord>(set: &KmerSet<W>, thread_count: usize) -> Result<Mphf<W>> {
    let start = Instant::now();
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count.max(1))
        .thread_name(|i| format!("mphf-{}", i))
        .build()?;

    let mphf = pool.install(|| Mphf::new_parallel(MPHF_GAMMA, set.words(), None));
    info!(
        "Built the minimal perfect hash over {} k-mers in {:.2}s",
        set.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(mphf)
}

/// Saved as `(k, kmer_count, mphf)`
fn save_mphf<W: KmerWord>(path: &Path, k: usize, kmer_count: usize, mphf: &Mphf<W>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &(k as u16, kmer_count as u64, mphf))?;
    writer.flush()?;
    info!("Saved the hash function to {}", path.display());
    Ok(())
}

/// `None` when the saved function belongs to a different k-mer set
fn load_mphf<W: KmerWord>(path: &Path, k: usize, kmer_count: usize) -> Result<Option<Mphf<W>>> {
    let reader = BufReader::new(File::open(path)?);
    let (saved_k, saved_count, mphf): (u16, u64, Mphf<W>) = bincode::deserialize_from(reader)?;

    if saved_k as usize != k || saved_count as usize != kmer_count {
        warn!(
            "Hash function at {} was built for {} {}-mers, not {} {}-mers; rebuilding",
            path.display(),
            saved_count,
            saved_k,
            kmer_count,
            k
        );
        return Ok(None);
    }

    info!("Loaded the hash function from {}", path.display());
    Ok(Some(mphf))
}
