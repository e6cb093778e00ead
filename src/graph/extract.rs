//! Maximal unitig and DCC extraction.
//!
//! Runs after classification, in two passes over the k-mer stream:
//!
//! 1. Every unvisited vertex with a closed side starts a walk along open sides
//!    until another closed side is reached. Both endpoints of a unitig may
//!    start the same walk on different workers; the walk belongs to whoever
//!    claims the endpoint with the smaller canonical encoding.
//! 2. Vertices still unvisited are interior to detached chordless cycles. The
//!    loop belongs to whoever claims its smallest canonical vertex.
//!
//! A side is *open* when it has a unique extension to a different canonical
//! k-mer whose facing side is unique as well. Only the state table is read;
//! the k-mer set is not needed here.

use crate::database::{KmerDatabase, SpmcConsumer};
use crate::error::{CdbgError, Result};
use crate::graph::meta_info::UnipathsMetaInfo;
use crate::graph::state::{Side, SideClass};
use crate::graph::vertices::Vertices;
use crate::io::sink::{PathKind, SinkBuffer, UnitigSink};
use crate::kmer::kmer::{complement_code, decode_base, reverse_complement_seq, Kmer, KmerWord};
use std::time::Instant;
use tracing::{debug, info};

/// A vertex as read along a walk
#[derive(Clone, Copy, Debug)]
struct Oriented<W: KmerWord> {
    /// The k-mer as spelled in walk direction
    kmer: Kmer<W>,
    canonical: Kmer<W>,
    slot: usize,
}

impl<W: KmerWord> Oriented<W> {
    #[inline]
    fn is_forward(&self) -> bool {
        self.kmer == self.canonical
    }

    fn flip(&self) -> Self {
        Self {
            kmer: self.kmer.reverse_complement(),
            ..*self
        }
    }

    /// Side the walk leaves through
    #[inline]
    fn exit_side(&self) -> Side {
        if self.is_forward() {
            Side::Back
        } else {
            Side::Front
        }
    }
}

struct Walker<'a, W: KmerWord> {
    vertices: &'a Vertices<W>,
}

impl<'a, W: KmerWord> Walker<'a, W> {
    fn orient(&self, kmer: Kmer<W>) -> Result<Oriented<W>> {
        let canonical = kmer.canonical();
        let slot = self.vertices.slot_for(&canonical).ok_or_else(|| {
            CdbgError::invariant(format!("k-mer {} has no vertex slot", canonical))
        })?;
        Ok(Oriented {
            kmer,
            canonical,
            slot,
        })
    }

    /// Next vertex through the exit side, or `None` if that side is closed
    fn step(&self, cur: &Oriented<W>) -> Result<Option<Oriented<W>>> {
        let base = match self.vertices.state(cur.slot).side(cur.exit_side()) {
            SideClass::Unique(base) => base,
            _ => return Ok(None),
        };

        let code = if cur.is_forward() {
            base
        } else {
            complement_code(base)
        };
        let next = self.orient(cur.kmer.push_back(code))?;

        // Hairpins and self-loops end the walk.
        if next.canonical == cur.canonical {
            return Ok(None);
        }

        let entry = next.exit_side().opposite();
        if !self.vertices.state(next.slot).side(entry).is_unique() {
            return Ok(None);
        }

        Ok(Some(next))
    }

    fn walk_from(&self, start: Oriented<W>) -> Result<Vec<Oriented<W>>> {
        let mut path = vec![start];
        let mut cur = start;

        while let Some(next) = self.step(&cur)? {
            path.push(next);
            if path.len() > self.vertices.len() {
                return Err(CdbgError::invariant(format!(
                    "walk from {} does not terminate",
                    start.canonical
                )));
            }
            cur = next;
        }

        Ok(path)
    }

    /// Spell the maximal unitig through `canonical` if its closed side makes
    /// it an endpoint and this worker wins the claim
    fn unitig_from(&self, canonical: Kmer<W>) -> Result<Option<Vec<u8>>> {
        let fwd = self.orient(canonical)?;
        let front_closed = self.step(&fwd.flip())?.is_none();
        let start = if front_closed {
            fwd
        } else if self.step(&fwd)?.is_none() {
            fwd.flip()
        } else {
            // Interior vertex; reached from an endpoint or left for the cycle pass.
            return Ok(None);
        };

        let path = self.walk_from(start)?;
        let last = path[path.len() - 1];
        let arbiter = if last.canonical < start.canonical {
            last
        } else {
            start
        };

        if !self.vertices.try_claim(arbiter.slot) {
            return Ok(None);
        }
        for v in &path {
            self.vertices.mark_visited(v.slot);
        }

        let seq = spell(&path);
        let rc = reverse_complement_seq(&seq);
        Ok(Some(if rc < seq { rc } else { seq }))
    }

    /// Spell the detached cycle through `canonical`, rotated to start at its
    /// smallest vertex, if this worker wins the claim
    fn cycle_from(&self, canonical: Kmer<W>) -> Result<Option<Vec<u8>>> {
        let start = self.orient(canonical)?;
        if self.step(&start.flip())?.is_none() {
            return Err(CdbgError::invariant(format!(
                "vertex {} has a closed side but was not placed on a unitig",
                canonical
            )));
        }

        let mut path = vec![start];
        let mut cur = start;
        loop {
            let next = self.step(&cur)?.ok_or_else(|| {
                CdbgError::invariant(format!(
                    "cycle through {} reaches the closed side of {}",
                    canonical, cur.canonical
                ))
            })?;
            if next.canonical == start.canonical {
                break;
            }
            path.push(next);
            if path.len() > self.vertices.len() {
                return Err(CdbgError::invariant(format!(
                    "cycle through {} does not close",
                    canonical
                )));
            }
            cur = next;
        }

        let (min_idx, arbiter) = path
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.canonical)
            .map(|(i, v)| (i, *v))
            .ok_or_else(|| CdbgError::invariant("empty cycle"))?;

        if !self.vertices.try_claim(arbiter.slot) {
            return Ok(None);
        }
        for v in &path {
            self.vertices.mark_visited(v.slot);
        }

        let m = path.len();
        let rotated: Vec<Oriented<W>> = if arbiter.is_forward() {
            (0..m).map(|j| path[(min_idx + j) % m]).collect()
        } else {
            (0..m).map(|j| path[(min_idx + m - j) % m].flip()).collect()
        };

        Ok(Some(spell(&rotated)))
    }
}

/// First k-mer in full, then one base per further vertex
fn spell<W: KmerWord>(path: &[Oriented<W>]) -> Vec<u8> {
    let mut seq = Vec::new();
    if let Some(first) = path.first() {
        seq.reserve(first.kmer.k() + path.len() - 1);
        first.kmer.append_bases(&mut seq);
        seq.extend(path[1..].iter().map(|v| decode_base(v.kmer.last_base())));
    }
    seq
}

fn unitig_worker<W: KmerWord>(
    consumer: SpmcConsumer<W>,
    walker: &Walker<'_, W>,
    sink: &dyn UnitigSink,
) -> Result<UnipathsMetaInfo> {
    let mut meta = UnipathsMetaInfo::new(walker.vertices.k());
    let mut out = SinkBuffer::new(sink);

    for batch in consumer {
        for kmer in batch {
            let slot = walker.orient(kmer)?.slot;
            if walker.vertices.is_visited(slot) {
                continue;
            }
            if let Some(seq) = walker.unitig_from(kmer)? {
                meta.add_unitig(seq.len());
                out.push(PathKind::Unitig, seq)?;
            }
        }
    }

    out.flush()?;
    Ok(meta)
}

fn cycle_worker<W: KmerWord>(
    consumer: SpmcConsumer<W>,
    walker: &Walker<'_, W>,
    sink: &dyn UnitigSink,
) -> Result<UnipathsMetaInfo> {
    let mut meta = UnipathsMetaInfo::new(walker.vertices.k());
    let mut out = SinkBuffer::new(sink);

    for batch in consumer {
        for kmer in batch {
            let slot = walker.orient(kmer)?.slot;
            if walker.vertices.is_visited(slot) {
                continue;
            }
            if let Some(seq) = walker.cycle_from(kmer)? {
                meta.add_cycle(seq.len());
                out.push(PathKind::Dcc, seq)?;
            }
        }
    }

    out.flush()?;
    Ok(meta)
}

/// One full pass of `worker` over the database; returns when every worker is done
fn run_pass<W, F>(
    db: &KmerDatabase<W>,
    thread_count: usize,
    batch_size: usize,
    pass: &str,
    worker: F,
) -> Result<UnipathsMetaInfo>
where
    W: KmerWord,
    F: Fn(SpmcConsumer<W>) -> Result<UnipathsMetaInfo> + Sync,
{
    let start = Instant::now();
    let spmc = db.spmc_iter(thread_count, batch_size)?;
    let worker = &worker;

    let results: Vec<Result<UnipathsMetaInfo>> = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let consumer = spmc.consumer();
                s.spawn(move |_| worker(consumer))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(CdbgError::concurrency(format!("{} worker panicked", pass))))
            })
            .collect()
    })
    .map_err(|_| CdbgError::concurrency(format!("{} scope panicked", pass)))?;

    spmc.finish()?;

    let mut meta = UnipathsMetaInfo::new(db.kmer_length());
    for (i, result) in results.into_iter().enumerate() {
        let partial = result?;
        debug!(
            "{} worker {}: {} unitigs, {} DCCs",
            pass,
            i,
            partial.unipath_count(),
            partial.dcc_count()
        );
        meta.aggregate(&partial);
    }

    info!("{} pass finished in {:.2}s", pass, start.elapsed().as_secs_f32());
    Ok(meta)
}

/// Emit every maximal unitig and DCC of the classified graph to `sink`
pub fn extract_unipaths<W: KmerWord>(
    db: &KmerDatabase<W>,
    vertices: &Vertices<W>,
    thread_count: usize,
    batch_size: usize,
    sink: &dyn UnitigSink,
) -> Result<UnipathsMetaInfo> {
    let thread_count = thread_count.max(1);
    let walker = Walker { vertices };

    let mut meta = run_pass(db, thread_count, batch_size, "Unitig", |consumer| {
        unitig_worker(consumer, &walker, sink)
    })?;
    info!("Extracted {} maximal unitigs", meta.unipath_count());

    let cycles = run_pass(db, thread_count, batch_size, "Cycle", |consumer| {
        cycle_worker(consumer, &walker, sink)
    })?;
    meta.aggregate(&cycles);

    if meta.total_kmer_count() != vertices.len() as u64 {
        return Err(CdbgError::invariant(format!(
            "emitted paths cover {} k-mers, expected {}",
            meta.total_kmer_count(),
            vertices.len()
        )));
    }

    Ok(meta)
}
