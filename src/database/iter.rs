//! Sequential and block-buffered cursors over a k-mer database body.

use crate::error::{CdbgError, Result};
use crate::kmer::kmer::{Kmer, KmerWord};
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::PathBuf;

/// Records fetched per read by the buffered cursor
pub const BLOCK_RECORDS: usize = 1 << 16;

/// Forward cursor yielding one k-mer per record read
pub struct KmerIterator<W: KmerWord> {
    reader: BufReader<File>,
    path: PathBuf,
    k: usize,
    remaining: u64,
    record: Vec<u8>,
    _word: PhantomData<W>,
}

impl<W: KmerWord> KmerIterator<W> {
    pub(crate) fn new(file: File, path: PathBuf, k: usize, kmer_count: u64) -> Self {
        Self {
            reader: BufReader::new(file),
            path,
            k,
            remaining: kmer_count,
            record: vec![0u8; W::BYTES],
            _word: PhantomData,
        }
    }
}

impl<W: KmerWord> Iterator for KmerIterator<W> {
    type Item = Result<Kmer<W>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.reader.read_exact(&mut self.record) {
            Ok(()) => Some(Ok(Kmer::from_encoded(W::read_le(&self.record), self.k))),
            Err(e) => {
                self.remaining = 0;
                Some(Err(CdbgError::database(
                    &self.path,
                    format!("truncated k-mer records: {}", e),
                )))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

/// Cursor that reads `BLOCK_RECORDS` records per I/O call and decodes from memory
pub struct BufferedKmerIterator<W: KmerWord> {
    file: File,
    path: PathBuf,
    k: usize,
    /// Records still on disk
    unread: u64,
    block: Vec<u8>,
    pos: usize,
    _word: PhantomData<W>,
}

impl<W: KmerWord> BufferedKmerIterator<W> {
    pub(crate) fn new(file: File, path: PathBuf, k: usize, kmer_count: u64) -> Self {
        Self {
            file,
            path,
            k,
            unread: kmer_count,
            block: Vec::new(),
            pos: 0,
            _word: PhantomData,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let records = self.unread.min(BLOCK_RECORDS as u64) as usize;
        self.block.resize(records * W::BYTES, 0);
        self.pos = 0;
        self.unread -= records as u64;

        self.file.read_exact(&mut self.block).map_err(|e| {
            self.unread = 0;
            self.block.clear();
            CdbgError::database(&self.path, format!("truncated k-mer records: {}", e))
        })
    }
}

impl<W: KmerWord> Iterator for BufferedKmerIterator<W> {
    type Item = Result<Kmer<W>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.block.len() {
            if self.unread == 0 {
                return None;
            }
            if let Err(e) = self.refill() {
                return Some(Err(e));
            }
        }

        let word = W::read_le(&self.block[self.pos..]);
        self.pos += W::BYTES;
        Some(Ok(Kmer::from_encoded(word, self.k)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.unread as usize + (self.block.len() - self.pos) / W::BYTES;
        (n, Some(n))
    }
}
