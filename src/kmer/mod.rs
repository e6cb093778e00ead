//! K-mer encoding, placeholder handling, and counting
pub mod bloom;
pub mod counting;
pub mod kmer;
pub mod valid_run;
