pub mod fasta;
pub mod sink;
