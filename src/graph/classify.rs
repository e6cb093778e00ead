//! Vertex classification.
//!
//! Every canonical k-mer probes its four predecessor and four successor
//! candidates against the k-mer set and stores the resulting side classes in
//! its state slot. Workers pull disjoint batches from the SPMC cursor, so each
//! slot is written by exactly one thread.

use crate::database::{KmerDatabase, KmerSet, SpmcConsumer};
use crate::error::{CdbgError, Result};
use crate::graph::state::{SideClass, VertexState};
use crate::graph::vertices::Vertices;
use crate::kmer::kmer::{Kmer, KmerWord};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// Vertex counts by kind, tallied while classifying
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub vertices: u64,
    /// Unique extension on both sides
    pub both_unique: u64,
    /// At least one side with zero or several extensions
    pub branching_or_tip: u64,
    /// No extension at all
    pub isolated: u64,
}

impl ClassificationSummary {
    fn record(&mut self, state: VertexState) {
        self.vertices += 1;
        if state.both_unique() {
            self.both_unique += 1;
        } else {
            self.branching_or_tip += 1;
        }
        if state.is_isolated() {
            self.isolated += 1;
        }
    }

    pub fn merge(&mut self, other: &ClassificationSummary) {
        self.vertices += other.vertices;
        self.both_unique += other.both_unique;
        self.branching_or_tip += other.branching_or_tip;
        self.isolated += other.isolated;
    }
}

fn side_class<W, F>(set: &KmerSet<W>, candidate: F) -> SideClass
where
    W: KmerWord,
    F: Fn(u8) -> Kmer<W>,
{
    let mut count = 0;
    let mut base = 0;
    for code in 0..4u8 {
        if set.contains(&candidate(code)) {
            count += 1;
            base = code;
        }
    }
    SideClass::from_count(count, base)
}

/// Side classes of one canonical k-mer
pub fn classify_kmer<W: KmerWord>(set: &KmerSet<W>, kmer: &Kmer<W>) -> VertexState {
    let front = side_class(set, |code| kmer.push_front(code));
    let back = side_class(set, |code| kmer.push_back(code));
    VertexState::classified(front, back)
}

fn classify_worker<W: KmerWord>(
    consumer: SpmcConsumer<W>,
    set: &KmerSet<W>,
    vertices: &Vertices<W>,
) -> Result<ClassificationSummary> {
    let mut summary = ClassificationSummary::default();

    for batch in consumer {
        for kmer in &batch {
            let slot = vertices.slot_for(kmer).ok_or_else(|| {
                CdbgError::invariant(format!("k-mer {} has no vertex slot", kmer))
            })?;
            let state = classify_kmer(set, kmer);
            vertices.classify(slot, state)?;
            summary.record(state);
        }
    }

    Ok(summary)
}

/// Classify every vertex of the database using `thread_count` workers
pub fn classify_vertices<W: KmerWord>(
    db: &KmerDatabase<W>,
    set: &KmerSet<W>,
    vertices: &Vertices<W>,
    thread_count: usize,
    batch_size: usize,
) -> Result<ClassificationSummary> {
    let start = Instant::now();
    let thread_count = thread_count.max(1);
    let spmc = db.spmc_iter(thread_count, batch_size)?;

    let results: Vec<Result<ClassificationSummary>> = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let consumer = spmc.consumer();
                s.spawn(move |_| classify_worker(consumer, set, vertices))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(CdbgError::concurrency("classification worker panicked")))
            })
            .collect()
    })
    .map_err(|_| CdbgError::concurrency("classification scope panicked"))?;

    let produced = spmc.finish()?;

    let mut summary = ClassificationSummary::default();
    for (worker, result) in results.into_iter().enumerate() {
        let partial = result?;
        debug!("Classifier {} handled {} vertices", worker, partial.vertices);
        summary.merge(&partial);
    }

    // Together with the classified-once check this means every slot is set.
    if produced != vertices.len() as u64 || summary.vertices != produced {
        return Err(CdbgError::invariant(format!(
            "classified {} of {} vertices ({} streamed)",
            summary.vertices,
            vertices.len(),
            produced
        )));
    }

    info!(
        "Classified {} vertices in {:.2}s: {} unique on both sides, {} branching or tips, {} isolated",
        summary.vertices,
        start.elapsed().as_secs_f32(),
        summary.both_unique,
        summary.branching_or_tip,
        summary.isolated
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::write_database;
    use crate::graph::state::Side;
    use tempfile::NamedTempFile;

    fn kmer(s: &str) -> Kmer<u64> {
        Kmer::from_bytes(s.as_bytes()).unwrap()
    }

    #[test]
    fn test_classify_kmer_sides() {
        let set = KmerSet::from_kmers(3, vec![kmer("AAC"), kmer("ACG")]);

        let aac = classify_kmer(&set, &kmer("AAC"));
        assert_eq!(aac.side(Side::Front), SideClass::None);
        assert_eq!(aac.side(Side::Back), SideClass::Unique(2));

        // ACG -> CGT is ACG again on the other strand
        let acg = classify_kmer(&set, &kmer("ACG"));
        assert_eq!(acg.side(Side::Front), SideClass::Unique(0));
        assert_eq!(acg.side(Side::Back), SideClass::Unique(3));
    }

    #[test]
    fn test_classify_kmer_branching() {
        // CAC, GAC and AAC all precede ACT
        let set = KmerSet::from_kmers(
            3,
            vec![kmer("AAC"), kmer("CAC"), kmer("GAC"), kmer("ACT")],
        );
        let act = classify_kmer(&set, &kmer("ACT"));
        assert_eq!(act.side(Side::Front), SideClass::Branching);
        assert!(!act.both_unique());
    }

    #[test]
    fn test_classify_vertices_in_parallel() {
        let file = NamedTempFile::new().unwrap();
        let k = 7;
        let seq = b"ACGGTCATTGCCAGTTAGGCTAACCGTAGGATCCATTGACAGTCCAAGTTTAGC";
        let kmers = crate::kmer::valid_run::CanonicalKmers::<u64>::new(seq, k);
        write_database(file.path(), k, 1, kmers).unwrap();

        let db = KmerDatabase::<u64>::open(file.path(), k).unwrap();
        let set = db.load_set().unwrap();
        let vertices = Vertices::build(&set, k, 2, None).unwrap();

        let summary = classify_vertices(&db, &set, &vertices, 3, 4).unwrap();
        assert_eq!(summary.vertices, set.len() as u64);
        assert_eq!(summary.both_unique + summary.branching_or_tip, summary.vertices);

        for &word in set.words() {
            let km = Kmer::from_encoded(word, k);
            let slot = vertices.slot_for(&km).unwrap();
            assert_eq!(vertices.state(slot), classify_kmer(&set, &km));
        }
    }

    #[test]
    fn test_single_isolated_vertex() {
        let file = NamedTempFile::new().unwrap();
        write_database(file.path(), 5, 1, vec![kmer("AAAAC")]).unwrap();
        let db = KmerDatabase::<u64>::open(file.path(), 5).unwrap();
        let set = db.load_set().unwrap();
        let vertices = Vertices::build(&set, 5, 1, None).unwrap();

        let summary = classify_vertices(&db, &set, &vertices, 1, 16).unwrap();
        assert_eq!(summary.isolated, 1);
        assert_eq!(summary.vertices, 1);
    }
}
