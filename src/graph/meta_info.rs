//! Unitig and DCC statistics.
//!
//! Each extraction worker owns one accumulator; the driver merges them once
//! every worker has finished. Merging is a field-wise sum/min/max, so the
//! order and shape of the reduction does not matter.

use serde::{Serialize, Serializer};
use tracing::info;

/// Statistics over one category of emitted sequences
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LengthStats {
    pub count: u64,
    /// K-mers spanned: `len - (k - 1)` per sequence
    pub kmer_count: u64,
    #[serde(serialize_with = "zero_if_empty")]
    pub min_len: Option<u64>,
    pub max_len: u64,
    pub sum_len: u64,
}

fn zero_if_empty<S: Serializer>(min_len: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(min_len.unwrap_or(0))
}

impl LengthStats {
    fn add(&mut self, len: u64, k: u64) {
        self.count += 1;
        self.kmer_count += len + 1 - k;
        self.min_len = Some(self.min_len.map_or(len, |m| m.min(len)));
        self.max_len = self.max_len.max(len);
        self.sum_len += len;
    }

    fn merge(&mut self, other: &LengthStats) {
        self.count += other.count;
        self.kmer_count += other.kmer_count;
        self.min_len = match (self.min_len, other.min_len) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_len = self.max_len.max(other.max_len);
        self.sum_len += other.sum_len;
    }

    pub fn avg_len(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_len as f64 / self.count as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnipathsMetaInfo {
    pub k: u16,
    pub unitigs: LengthStats,
    pub dccs: LengthStats,
}

impl UnipathsMetaInfo {
    pub fn new(k: usize) -> Self {
        Self {
            k: k as u16,
            unitigs: LengthStats::default(),
            dccs: LengthStats::default(),
        }
    }

    /// Record a maximal unitig of `len` bases
    pub fn add_unitig(&mut self, len: usize) {
        debug_assert!(len >= self.k as usize);
        self.unitigs.add(len as u64, self.k as u64);
    }

    /// Record a detached chordless cycle spelled with `len` bases
    pub fn add_cycle(&mut self, len: usize) {
        debug_assert!(len >= self.k as usize);
        self.dccs.add(len as u64, self.k as u64);
    }

    pub fn aggregate(&mut self, other: &UnipathsMetaInfo) {
        debug_assert_eq!(self.k, other.k);
        self.unitigs.merge(&other.unitigs);
        self.dccs.merge(&other.dccs);
    }

    pub fn unipath_count(&self) -> u64 {
        self.unitigs.count
    }

    pub fn kmer_count(&self) -> u64 {
        self.unitigs.kmer_count
    }

    pub fn min_len(&self) -> u64 {
        self.unitigs.min_len.unwrap_or(0)
    }

    pub fn max_len(&self) -> u64 {
        self.unitigs.max_len
    }

    pub fn sum_len(&self) -> u64 {
        self.unitigs.sum_len
    }

    pub fn avg_len(&self) -> f64 {
        self.unitigs.avg_len()
    }

    pub fn dcc_count(&self) -> u64 {
        self.dccs.count
    }

    pub fn dcc_kmer_count(&self) -> u64 {
        self.dccs.kmer_count
    }

    pub fn dcc_min_len(&self) -> u64 {
        self.dccs.min_len.unwrap_or(0)
    }

    pub fn dcc_max_len(&self) -> u64 {
        self.dccs.max_len
    }

    pub fn dcc_sum_len(&self) -> u64 {
        self.dccs.sum_len
    }

    /// Every k-mer is on exactly one unitig or DCC
    pub fn total_kmer_count(&self) -> u64 {
        self.unitigs.kmer_count + self.dccs.kmer_count
    }

    pub fn log_summary(&self) {
        info!("Maximal unitigs: {}", self.unipath_count());
        info!("  k-mers covered: {}", self.kmer_count());
        info!(
            "  length min/max/avg: {}/{}/{:.2} (total {} bp)",
            self.min_len(),
            self.max_len(),
            self.avg_len(),
            self.sum_len()
        );

        if self.dcc_count() > 0 {
            info!("Detached chordless cycles: {}", self.dcc_count());
            info!("  k-mers covered: {}", self.dcc_kmer_count());
            info!(
                "  length min/max/avg: {}/{}/{:.2} (total {} bp)",
                self.dcc_min_len(),
                self.dcc_max_len(),
                self.dccs.avg_len(),
                self.dcc_sum_len()
            );
        } else {
            info!("No detached chordless cycles");
        }
    }
}
