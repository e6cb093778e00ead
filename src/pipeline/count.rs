//! Counting and inspection entry points.

use crate::config::CountParams;
use crate::database::DatabaseHeader;
use crate::error::Result;
use crate::kmer::counting::count_kmers;
use crate::kmer::kmer::KmerWord;
use std::path::Path;

/// Count k-mers with the narrowest word that holds k
pub fn count_database(params: &CountParams) -> Result<DatabaseHeader> {
    params.validate()?;
    if params.k <= u64::MAX_K {
        count_kmers::<u64>(params)
    } else {
        count_kmers::<u128>(params)
    }
}

pub fn inspect_database(path: &Path) -> Result<DatabaseHeader> {
    DatabaseHeader::read_from(path)
}
