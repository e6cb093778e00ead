//! Placeholder-aware scanning of raw sequence text.
//!
//! K-mers never span a placeholder base (`N` or any other non-ACGT byte), so
//! raw sequences are cut into maximal valid runs first. Runs shorter than k
//! contribute nothing.

use crate::kmer::kmer::{encode_base, is_placeholder, Kmer, KmerWord};
use std::ops::Range;

/// Start index of the first window of `k` valid bases that begins inside
/// `[left_end, right_end]`, or `right_end + 1` if there is none.
///
/// The window may extend past `right_end` (up to `right_end + k - 1`).
pub fn search_valid_kmer(seq: &[u8], left_end: usize, right_end: usize, k: usize) -> usize {
    if k == 0 || seq.len() < k {
        return right_end + 1;
    }

    let right = right_end.min(seq.len() - k);
    let mut idx = left_end;
    while idx <= right {
        // Skip the placeholder stretch.
        while idx <= right && is_placeholder(seq[idx]) {
            idx += 1;
        }

        if idx > right {
            break;
        }

        let valid_start = idx;
        let mut base_count = 0;
        while idx < seq.len() && !is_placeholder(seq[idx]) {
            idx += 1;
            base_count += 1;
            if base_count == k {
                return valid_start;
            }
        }
    }

    right_end + 1
}

/// Iterator over maximal placeholder-free runs of length at least k
pub struct ValidRuns<'a> {
    seq: &'a [u8],
    k: usize,
    pos: usize,
}

impl<'a> ValidRuns<'a> {
    pub fn new(seq: &'a [u8], k: usize) -> Self {
        Self { seq, k: k.max(1), pos: 0 }
    }
}

impl Iterator for ValidRuns<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.seq.len();
        if self.pos >= len {
            return None;
        }

        let start = search_valid_kmer(self.seq, self.pos, len - 1, self.k);
        if start >= len {
            self.pos = len;
            return None;
        }

        // The first k bases are valid; extend to the next placeholder.
        let mut end = start + self.k;
        while end < len && !is_placeholder(self.seq[end]) {
            end += 1;
        }
        self.pos = end;
        Some(start..end)
    }
}

struct RunCursor<W: KmerWord> {
    kmer: Kmer<W>,
    next: usize,
    end: usize,
}

/// Canonical k-mers of every valid run of a sequence, in sequence order
pub struct CanonicalKmers<'a, W: KmerWord> {
    seq: &'a [u8],
    k: usize,
    runs: ValidRuns<'a>,
    cursor: Option<RunCursor<W>>,
}

impl<'a, W: KmerWord> CanonicalKmers<'a, W> {
    pub fn new(seq: &'a [u8], k: usize) -> Self {
        Self {
            seq,
            k,
            runs: ValidRuns::new(seq, k),
            cursor: None,
        }
    }
}

impl<W: KmerWord> Iterator for CanonicalKmers<'_, W> {
    type Item = Kmer<W>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(cursor) = self.cursor.as_mut() {
            if cursor.next < cursor.end {
                // Bases inside a run are valid by construction.
                let code = encode_base(self.seq[cursor.next])?;
                cursor.kmer = cursor.kmer.push_back(code);
                cursor.next += 1;
                return Some(cursor.kmer.canonical());
            }
            self.cursor = None;
        }

        let run = self.runs.next()?;
        let kmer = Kmer::from_bytes(&self.seq[run.start..run.start + self.k])?;
        self.cursor = Some(RunCursor {
            kmer,
            next: run.start + self.k,
            end: run.end,
        });
        Some(kmer.canonical())
    }
}
