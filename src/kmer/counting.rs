//! Disk-bucketed k-mer counting.
//!
//! Builds a k-mer database from FASTA/FASTQ reads in two passes:
//! 1. Every canonical k-mer of every valid run is appended to one of
//!    `num_buckets` files chosen by its low bits
//! 2. Buckets are sorted and counted in parallel; k-mers seen at least
//!    `min_count` times are merged into the database
//!
//! Memory is bounded by the largest bucket rather than by the input size.

use crate::config::CountParams;
use crate::database::{DatabaseHeader, DatabaseWriter};
use crate::error::Result;
use crate::io::fasta::for_each_sequence;
use crate::kmer::kmer::{Kmer, KmerWord};
use crate::kmer::valid_run::CanonicalKmers;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// A bucket file storing encoded k-mers
struct KmerBucket {
    path: PathBuf,
    writer: BufWriter<File>,
    count: u64,
    buf: Vec<u8>,
}

impl KmerBucket {
    fn new(path: PathBuf, buffer_size: usize) -> std::io::Result<Self> {
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::with_capacity(buffer_size, file),
            count: 0,
            buf: Vec::with_capacity(16),
        })
    }

    fn add<W: KmerWord>(&mut self, encoded: W) -> std::io::Result<()> {
        self.buf.clear();
        encoded.write_le(&mut self.buf);
        self.writer.write_all(&self.buf)?;
        self.count += 1;
        Ok(())
    }

    fn finalize(self) -> std::io::Result<(PathBuf, u64)> {
        let mut writer = self.writer;
        writer.flush()?;
        Ok((self.path, self.count))
    }
}

/// Counter over k-mers held in words of type `W`
pub struct KmerCounter<W: KmerWord> {
    params: CountParams,
    work_dir: TempDir,
    buckets: Vec<KmerBucket>,
    total_kmers: u64,
    _word: PhantomData<W>,
}

impl<W: KmerWord> KmerCounter<W> {
    pub fn new(params: CountParams) -> Result<Self> {
        std::fs::create_dir_all(&params.temp_dir)?;
        let work_dir = tempfile::Builder::new()
            .prefix("kestrel-count-")
            .tempdir_in(&params.temp_dir)?;

        let buckets = (0..params.num_buckets)
            .map(|i| {
                let path = work_dir.path().join(format!("bucket_{:05}.bin", i));
                KmerBucket::new(path, params.write_buffer_size)
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Self {
            params,
            work_dir,
            buckets,
            total_kmers: 0,
            _word: PhantomData,
        })
    }

    /// Pass 1: distribute the canonical k-mers of one input file to the buckets
    pub fn distribute(&mut self, path: &Path) -> Result<u64> {
        let k = self.params.k;
        let mask = (self.buckets.len() - 1) as u64;
        let buckets = &mut self.buckets;
        let mut added = 0u64;

        let records = for_each_sequence(path, |seq| {
            for kmer in CanonicalKmers::<W>::new(seq, k) {
                let encoded = kmer.encoded();
                buckets[(encoded.low_u64() & mask) as usize].add(encoded)?;
                added += 1;
            }
            Ok(())
        })?;

        self.total_kmers += added;
        info!(
            "Read {} records ({} k-mers) from {}",
            records,
            added,
            path.display()
        );
        Ok(added)
    }

    /// Pass 2: count every bucket; returns the surviving k-mers in increasing order
    pub fn count_all(self) -> Result<Vec<W>> {
        let Self {
            params,
            work_dir,
            buckets,
            ..
        } = self;

        let bucket_files = buckets
            .into_iter()
            .map(|b| b.finalize())
            .collect::<std::io::Result<Vec<_>>>()?;

        let min_count = params.min_count;
        let per_bucket: Vec<Vec<W>> = bucket_files
            .par_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(path, count)| count_bucket::<W>(path, *count as usize, min_count))
            .collect::<std::io::Result<Vec<_>>>()?;

        let total_unique: usize = per_bucket.iter().map(|b| b.len()).sum();
        let mut merged = Vec::with_capacity(total_unique);
        for bucket in per_bucket {
            merged.extend(bucket);
        }
        merged.par_sort_unstable();

        debug!("Removing bucket directory {}", work_dir.path().display());
        work_dir.close()?;
        Ok(merged)
    }

    pub fn total_kmers(&self) -> u64 {
        self.total_kmers
    }
}

fn count_bucket<W: KmerWord>(path: &Path, num_kmers: usize, min_count: u32) -> std::io::Result<Vec<W>> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(4 * 1024 * 1024, file);
    let mut kmers = Vec::with_capacity(num_kmers);
    let mut buf = vec![0u8; W::BYTES];

    for _ in 0..num_kmers {
        reader.read_exact(&mut buf)?;
        kmers.push(W::read_le(&buf));
    }

    // Sort for counting
    kmers.sort_unstable();

    let mut kept = Vec::new();
    let mut iter = kmers.into_iter();
    let Some(mut current) = iter.next() else {
        return Ok(kept);
    };
    let mut count = 1u32;

    for kmer in iter {
        if kmer == current {
            count = count.saturating_add(1);
        } else {
            if count >= min_count {
                kept.push(current);
            }
            current = kmer;
            count = 1;
        }
    }

    if count >= min_count {
        kept.push(current);
    }

    Ok(kept)
}

/// Count the inputs of `params` into a k-mer database of `W` words
pub fn count_kmers<W: KmerWord>(params: &CountParams) -> Result<DatabaseHeader> {
    params.validate()?;
    let start = Instant::now();
    let pool = ThreadPoolBuilder::new()
        .num_threads(params.thread_count)
        .build()?;

    let mut counter = KmerCounter::<W>::new(params.clone())?;
    for input in &params.inputs {
        counter.distribute(input)?;
    }
    let total = counter.total_kmers();
    let words = pool.install(|| counter.count_all())?;

    let mut writer = DatabaseWriter::<W>::create(&params.output_path, params.k, params.min_count)?;
    for word in words {
        writer.push(Kmer::from_encoded(word, params.k))?;
    }
    let header = writer.finish()?;

    info!(
        "Counted {} k-mers, kept {} distinct with count >= {} in {:.2}s",
        total,
        header.kmer_count,
        params.min_count,
        start.elapsed().as_secs_f32()
    );
    Ok(header)
}
