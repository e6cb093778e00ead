use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about = "Compacted de Bruijn graph construction", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count the canonical k-mers of FASTA/FASTQ(.gz) reads into a k-mer database
    Count {
        /// Input sequence files
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// K-mer length (odd, at most 63)
        #[arg(short, long, default_value_t = 31)]
        k: usize,

        /// Output k-mer database
        #[arg(short, long)]
        output: PathBuf,

        /// Drop k-mers seen fewer times
        #[arg(long, default_value_t = 2)]
        min_count: u32,

        /// Number of threads
        #[arg(long, default_value_t = num_cpus::get())]
        threads: usize,

        /// Number of on-disk buckets (power of two)
        #[arg(long, default_value_t = 256)]
        buckets: usize,

        /// Directory for bucket files
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },

    /// Build the maximal unitigs and detached chordless cycles of a k-mer database
    Build {
        /// Input k-mer database
        #[arg(short = 'd', long)]
        db: PathBuf,

        /// K-mer length the database was counted with
        #[arg(short, long, default_value_t = 31)]
        k: usize,

        /// Output FASTA(.gz) file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of threads
        #[arg(long, default_value_t = num_cpus::get())]
        threads: usize,

        /// Directory for temporary files
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Save (or reuse) the minimal perfect hash function here
        #[arg(long)]
        mph: Option<PathBuf>,

        /// Optional path to write run statistics as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// K-mers per worker batch
        #[arg(long, default_value_t = kestrel::database::spmc::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Print the header of a k-mer database
    Inspect {
        /// Input k-mer database
        #[arg(short = 'd', long)]
        db: PathBuf,
    },
}
