//! Kestrel: compacted de Bruijn graph construction.
//!
//! Builds the maximal unitigs and detached chordless cycles of the de Bruijn
//! graph of a counted k-mer set without materialising the graph. Vertices are
//! indexed by a minimal perfect hash function; classification and extraction
//! run on worker threads fed by a single-producer/multi-consumer k-mer stream.

pub mod config;
pub mod database;
pub mod error;
pub mod graph;
pub mod io;
pub mod kmer;
pub mod pipeline;

pub use config::{BuildParams, CountParams};
pub use error::{CdbgError, Result};
pub use graph::meta_info::UnipathsMetaInfo;
pub use io::sink::{FastaSink, MemorySink, PathKind, UnitigSink};
pub use pipeline::construct::{build_cdbg, Cdbg, ConstructionReport};
