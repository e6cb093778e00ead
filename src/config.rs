//! Run parameters for the counting and construction stages.

use crate::database::spmc::DEFAULT_BATCH_SIZE;
use crate::error::{CdbgError, Result};
use crate::kmer::kmer::KmerWord;
use std::path::PathBuf;

/// Largest supported k
pub const MAX_K: usize = <u128 as KmerWord>::MAX_K;

fn validate_k(k: usize) -> Result<()> {
    if k == 0 || k > MAX_K {
        return Err(CdbgError::config(format!(
            "k must be between 1 and {}, got {}",
            MAX_K, k
        )));
    }
    // An even k admits k-mers equal to their own reverse complement.
    if k % 2 == 0 {
        return Err(CdbgError::config(format!("k must be odd, got {}", k)));
    }
    Ok(())
}

fn validate_threads(thread_count: usize) -> Result<()> {
    if thread_count == 0 {
        return Err(CdbgError::config("thread count must be at least 1"));
    }
    Ok(())
}

/// Parameters of a compacted graph construction
#[derive(Clone, Debug)]
pub struct BuildParams {
    /// k-mer length; must match the database
    pub k: usize,
    /// Counted k-mer database
    pub kmer_db_path: PathBuf,
    pub thread_count: usize,
    /// FASTA output; gzip-compressed when it ends in `.gz`
    pub output_path: PathBuf,
    /// Directory for temporary files
    pub working_dir: PathBuf,
    /// Where to save (or load) the minimal perfect hash function
    pub mph_file_path: Option<PathBuf>,
    /// Optional JSON report of the run statistics
    pub report_path: Option<PathBuf>,
    /// k-mers per batch handed to a worker
    pub batch_size: usize,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            k: 31,
            kmer_db_path: PathBuf::from("kmers.kdb"),
            thread_count: num_cpus::get(),
            output_path: PathBuf::from("cdbg.fa"),
            working_dir: std::env::temp_dir(),
            mph_file_path: None,
            report_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BuildParams {
    pub fn validate(&self) -> Result<()> {
        validate_k(self.k)?;
        validate_threads(self.thread_count)?;
        if self.batch_size == 0 {
            return Err(CdbgError::config("batch size must be at least 1"));
        }
        if !self.working_dir.is_dir() {
            return Err(CdbgError::config(format!(
                "working directory {} does not exist",
                self.working_dir.display()
            )));
        }
        Ok(())
    }
}

/// Parameters of the k-mer counter
#[derive(Clone, Debug)]
pub struct CountParams {
    pub k: usize,
    /// FASTA/FASTQ inputs, optionally gzipped
    pub inputs: Vec<PathBuf>,
    pub output_path: PathBuf,
    /// k-mers seen fewer times are dropped
    pub min_count: u32,
    pub thread_count: usize,
    /// Number of on-disk buckets (power of two)
    pub num_buckets: usize,
    /// Parent directory for the bucket files
    pub temp_dir: PathBuf,
    pub write_buffer_size: usize,
}

impl Default for CountParams {
    fn default() -> Self {
        Self {
            k: 31,
            inputs: Vec::new(),
            output_path: PathBuf::from("kmers.kdb"),
            min_count: 2,
            thread_count: num_cpus::get(),
            num_buckets: 256,
            temp_dir: std::env::temp_dir(),
            write_buffer_size: 1024 * 1024,
        }
    }
}

impl CountParams {
    pub fn validate(&self) -> Result<()> {
        validate_k(self.k)?;
        validate_threads(self.thread_count)?;
        if self.inputs.is_empty() {
            return Err(CdbgError::config("no input sequence files given"));
        }
        if self.min_count == 0 {
            return Err(CdbgError::config("minimum count must be at least 1"));
        }
        if !self.num_buckets.is_power_of_two() {
            return Err(CdbgError::config(format!(
                "bucket count must be a power of two, got {}",
                self.num_buckets
            )));
        }
        Ok(())
    }
}
