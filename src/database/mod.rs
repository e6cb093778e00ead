//! Read-only view over a counted k-mer set.
//!
//! A k-mer database is a flat binary file: a fixed header followed by the
//! canonical k-mer encodings in strictly increasing order.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "KMDB"
//! 4       1     format version (1)
//! 5       1     word width in bytes (8 or 16)
//! 6       2     k
//! 8       4     minimum count the k-mers were filtered with
//! 12      8     number of k-mers
//! 20      ...   k-mer words, little endian
//! ```
//!
//! The database offers three cursors (sequential, block-buffered and
//! single-producer/multi-consumer) and an in-memory existence predicate.

pub mod iter;
pub mod set;
pub mod spmc;

use crate::error::{CdbgError, Result};
use crate::kmer::kmer::{Kmer, KmerWord};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub use iter::{BufferedKmerIterator, KmerIterator};
pub use set::KmerSet;
pub use spmc::{SpmcConsumer, SpmcIterator};

pub const MAGIC: &[u8; 4] = b"KMDB";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 20;

/// Fixed-size database header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseHeader {
    pub word_bytes: u8,
    pub k: u16,
    pub min_count: u32,
    pub kmer_count: u64,
}

impl DatabaseHeader {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4] = FORMAT_VERSION;
        bytes[5] = self.word_bytes;
        bytes[6..8].copy_from_slice(&self.k.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.min_count.to_le_bytes());
        bytes[12..20].copy_from_slice(&self.kmer_count.to_le_bytes());
        bytes
    }

    fn decode(bytes: &[u8; HEADER_LEN], path: &Path) -> Result<Self> {
        if &bytes[0..4] != MAGIC {
            return Err(CdbgError::database(path, "not a k-mer database (bad magic)"));
        }
        if bytes[4] != FORMAT_VERSION {
            return Err(CdbgError::database(
                path,
                format!("unsupported format version {}", bytes[4]),
            ));
        }

        let header = Self {
            word_bytes: bytes[5],
            k: u16::from_le_bytes([bytes[6], bytes[7]]),
            min_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            kmer_count: u64::from_le_bytes([
                bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18],
                bytes[19],
            ]),
        };

        if header.word_bytes != 8 && header.word_bytes != 16 {
            return Err(CdbgError::database(
                path,
                format!("unsupported word width of {} bytes", header.word_bytes),
            ));
        }
        if header.k == 0 || header.k as usize > header.word_bytes as usize * 4 {
            return Err(CdbgError::database(
                path,
                format!("k = {} does not fit {}-byte words", header.k, header.word_bytes),
            ));
        }

        Ok(header)
    }

    /// Read and validate the header of the database at `path`
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| CdbgError::database(path, format!("cannot open: {}", e)))?;
        let mut bytes = [0u8; HEADER_LEN];
        file.read_exact(&mut bytes)
            .map_err(|_| CdbgError::database(path, "file too short for a header"))?;

        let header = Self::decode(&bytes, path)?;

        let expected_len =
            HEADER_LEN as u64 + header.kmer_count * header.word_bytes as u64;
        let actual_len = file
            .metadata()
            .map_err(|e| CdbgError::database(path, format!("cannot stat: {}", e)))?
            .len();
        if actual_len != expected_len {
            return Err(CdbgError::database(
                path,
                format!(
                    "expected {} bytes for {} k-mers, found {}",
                    expected_len, header.kmer_count, actual_len
                ),
            ));
        }

        Ok(header)
    }
}

/// Handle on a k-mer database whose words are `W`
pub struct KmerDatabase<W: KmerWord> {
    path: PathBuf,
    header: DatabaseHeader,
    _word: PhantomData<W>,
}

impl<W: KmerWord> KmerDatabase<W> {
    /// Open the database and check it was counted with the configured `k`
    pub fn open(path: impl AsRef<Path>, k: usize) -> Result<Self> {
        let path = path.as_ref();
        let header = DatabaseHeader::read_from(path)?;

        if header.k as usize != k {
            return Err(CdbgError::KmerLengthMismatch {
                expected: k,
                found: header.k as usize,
                path: path.to_path_buf(),
            });
        }
        if header.word_bytes as usize != W::BYTES {
            return Err(CdbgError::database(
                path,
                format!(
                    "holds {}-byte k-mer words, expected {}",
                    header.word_bytes,
                    W::BYTES
                ),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            header,
            _word: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    pub fn kmer_length(&self) -> usize {
        self.header.k as usize
    }

    pub fn total_kmer_count(&self) -> u64 {
        self.header.kmer_count
    }

    pub fn min_count(&self) -> u32 {
        self.header.min_count
    }

    /// File positioned at the first k-mer record
    fn open_body(&self) -> Result<File> {
        let mut file = File::open(&self.path)
            .map_err(|e| CdbgError::database(&self.path, format!("cannot open: {}", e)))?;
        file.seek(SeekFrom::Start(HEADER_LEN as u64))?;
        Ok(file)
    }

    /// Simple forward cursor
    pub fn iter(&self) -> Result<KmerIterator<W>> {
        Ok(KmerIterator::new(
            self.open_body()?,
            self.path.clone(),
            self.kmer_length(),
            self.total_kmer_count(),
        ))
    }

    /// Cursor reading whole blocks of records per I/O call
    pub fn buf_iter(&self) -> Result<BufferedKmerIterator<W>> {
        Ok(BufferedKmerIterator::new(
            self.open_body()?,
            self.path.clone(),
            self.kmer_length(),
            self.total_kmer_count(),
        ))
    }

    /// Launch a producer thread that feeds batches to `consumer_count` workers
    pub fn spmc_iter(&self, consumer_count: usize, batch_size: usize) -> Result<SpmcIterator<W>> {
        SpmcIterator::launch(self.buf_iter()?, consumer_count, batch_size)
    }

    /// Load the existence predicate into memory
    pub fn load_set(&self) -> Result<KmerSet<W>> {
        KmerSet::load(self)
    }
}

/// Streaming writer for a k-mer database
pub struct DatabaseWriter<W: KmerWord> {
    path: PathBuf,
    writer: BufWriter<File>,
    header: DatabaseHeader,
    last: Option<W>,
    buf: Vec<u8>,
}

impl<W: KmerWord> DatabaseWriter<W> {
    pub fn create(path: impl AsRef<Path>, k: usize, min_count: u32) -> Result<Self> {
        let path = path.as_ref();
        if k == 0 || k > W::BYTES * 4 {
            return Err(CdbgError::config(format!(
                "k = {} does not fit {}-byte words",
                k,
                W::BYTES
            )));
        }

        let file = File::create(path)
            .map_err(|e| CdbgError::database(path, format!("cannot create: {}", e)))?;
        let header = DatabaseHeader {
            word_bytes: W::BYTES as u8,
            k: k as u16,
            min_count,
            kmer_count: 0,
        };

        let mut writer = BufWriter::new(file);
        writer.write_all(&header.encode())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            header,
            last: None,
            buf: Vec::with_capacity(W::BYTES),
        })
    }

    /// Append a canonical k-mer; records must arrive in strictly increasing order
    pub fn push(&mut self, kmer: Kmer<W>) -> Result<()> {
        if kmer.k() != self.header.k as usize || !kmer.is_canonical() {
            return Err(CdbgError::database(
                &self.path,
                format!("refusing non-canonical or mis-sized k-mer {}", kmer),
            ));
        }
        if self.last.is_some_and(|last| last >= kmer.encoded()) {
            return Err(CdbgError::database(
                &self.path,
                format!("k-mer {} written out of order", kmer),
            ));
        }

        self.buf.clear();
        kmer.encoded().write_le(&mut self.buf);
        self.writer.write_all(&self.buf)?;
        self.last = Some(kmer.encoded());
        self.header.kmer_count += 1;
        Ok(())
    }

    /// Flush the records and patch the final count into the header
    pub fn finish(self) -> Result<DatabaseHeader> {
        let Self {
            mut writer, header, ..
        } = self;

        writer.flush()?;
        let mut file = writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.sync_all()?;

        Ok(header)
    }
}

/// Write `kmers` (any orientation, any order, duplicates allowed) as a database
pub fn write_database<W, I>(
    path: impl AsRef<Path>,
    k: usize,
    min_count: u32,
    kmers: I,
) -> Result<DatabaseHeader>
where
    W: KmerWord,
    I: IntoIterator<Item = Kmer<W>>,
{
    let mut words: Vec<W> = kmers.into_iter().map(|km| km.canonical().encoded()).collect();
    words.sort_unstable();
    words.dedup();

    let mut writer = DatabaseWriter::create(path, k, min_count)?;
    for word in words {
        writer.push(Kmer::from_encoded(word, k))?;
    }
    writer.finish()
}
