// src/io/fasta.rs
use crate::error::{CdbgError, Result};
use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub enum FastaWriter {
    Plain(BufWriter<File>),
    Compressed(BufWriter<GzEncoder<File>>),
}

/// Whether a path names a gzip file
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Open a sequence file for reading, handles gzipped files automatically
pub fn open_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Call `f` on every sequence of a FASTA or FASTQ file (optionally gzipped).
///
/// The format is taken from the first byte of the content. Returns the
/// number of records read.
pub fn for_each_sequence<F>(path: &Path, mut f: F) -> Result<u64>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut reader = open_reader(path)
        .map_err(|e| CdbgError::sequence(path, format!("cannot open: {}", e)))?;
    let first = reader
        .fill_buf()
        .map_err(|e| CdbgError::sequence(path, e.to_string()))?
        .first()
        .copied();

    let mut records = 0u64;
    match first {
        None => {}
        Some(b'>') => {
            for record in fasta::Reader::from_bufread(reader).records() {
                let record = record.map_err(|e| CdbgError::sequence(path, e.to_string()))?;
                f(record.seq())?;
                records += 1;
            }
        }
        Some(b'@') => {
            for record in fastq::Reader::from_bufread(reader).records() {
                let record = record.map_err(|e| CdbgError::sequence(path, e.to_string()))?;
                f(record.seq())?;
                records += 1;
            }
        }
        Some(other) => {
            return Err(CdbgError::sequence(
                path,
                format!("expected FASTA ('>') or FASTQ ('@'), found {:?}", other as char),
            ));
        }
    }

    Ok(records)
}

impl FastaWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::from_file(File::create(path)?, is_gzipped(path)))
    }

    /// Wrap an already open file, e.g. a temporary file persisted later
    pub fn from_file(file: File, compressed: bool) -> Self {
        if compressed {
            let encoder = GzEncoder::new(file, Compression::default());
            FastaWriter::Compressed(BufWriter::new(encoder))
        } else {
            FastaWriter::Plain(BufWriter::new(file))
        }
    }

    pub fn write_record(&mut self, header: &str, sequence: &[u8]) -> io::Result<()> {
        match self {
            FastaWriter::Plain(writer) => {
                writeln!(writer, ">{}", header)?;
                writer.write_all(sequence)?;
                writer.write_all(b"\n")?;
            }
            FastaWriter::Compressed(writer) => {
                writeln!(writer, ">{}", header)?;
                writer.write_all(sequence)?;
                writer.write_all(b"\n")?;
            }
        };
        Ok(())
    }

    /// Flush everything, writing the gzip trailer if compressed
    pub fn finish(self) -> io::Result<()> {
        match self {
            FastaWriter::Plain(mut writer) => writer.flush(),
            FastaWriter::Compressed(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?.flush()
            }
        }
    }
}
