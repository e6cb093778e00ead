//! Destinations for emitted unitigs and DCCs.
//!
//! Extraction workers buffer their sequences in a `SinkBuffer` and hand them to
//! the shared sink in blocks, so the sink lock is taken once per block rather
//! than once per sequence.

use crate::error::{CdbgError, Result};
use crate::io::fasta::FastaWriter;
use std::sync::Mutex;

/// Bases a worker buffers before flushing to the sink
pub const FLUSH_BASES: usize = 1 << 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathKind {
    Unitig,
    Dcc,
}

pub type Block = Vec<(PathKind, Vec<u8>)>;

/// Shared output for every extraction worker
pub trait UnitigSink: Send + Sync {
    fn write_block(&self, block: &[(PathKind, Vec<u8>)]) -> Result<()>;
}

struct FastaSinkState {
    writer: FastaWriter,
    unitigs: u64,
    dccs: u64,
}

/// Writes `>unitig_<n> len=<L>` and `>dcc_<n> len=<L>` records
pub struct FastaSink {
    state: Mutex<FastaSinkState>,
}

impl FastaSink {
    pub fn new(writer: FastaWriter) -> Self {
        Self {
            state: Mutex::new(FastaSinkState {
                writer,
                unitigs: 0,
                dccs: 0,
            }),
        }
    }

    /// Flush and close the underlying writer; returns (unitigs, dccs) written
    pub fn finish(self) -> Result<(u64, u64)> {
        let state = self
            .state
            .into_inner()
            .map_err(|_| CdbgError::concurrency("FASTA sink lock poisoned"))?;
        state.writer.finish()?;
        Ok((state.unitigs, state.dccs))
    }
}

impl UnitigSink for FastaSink {
    fn write_block(&self, block: &[(PathKind, Vec<u8>)]) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| CdbgError::concurrency("FASTA sink lock poisoned"))?;
        let state = &mut *guard;

        for (kind, seq) in block {
            let header = match kind {
                PathKind::Unitig => {
                    state.unitigs += 1;
                    format!("unitig_{} len={}", state.unitigs - 1, seq.len())
                }
                PathKind::Dcc => {
                    state.dccs += 1;
                    format!("dcc_{} len={}", state.dccs - 1, seq.len())
                }
            };
            state.writer.write_record(&header, seq)?;
        }
        Ok(())
    }
}

/// Keeps every sequence in memory
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Block>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Block {
        self.records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sorted(&self, wanted: PathKind) -> Vec<String> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut seqs: Vec<String> = records
            .iter()
            .filter(|(kind, _)| *kind == wanted)
            .map(|(_, seq)| String::from_utf8_lossy(seq).into_owned())
            .collect();
        seqs.sort();
        seqs
    }

    /// Unitig sequences in lexicographic order
    pub fn unitigs(&self) -> Vec<String> {
        self.sorted(PathKind::Unitig)
    }

    pub fn dccs(&self) -> Vec<String> {
        self.sorted(PathKind::Dcc)
    }
}

impl UnitigSink for MemorySink {
    fn write_block(&self, block: &[(PathKind, Vec<u8>)]) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| CdbgError::concurrency("memory sink lock poisoned"))?
            .extend_from_slice(block);
        Ok(())
    }
}

/// Per-worker output buffer in front of a shared sink
pub struct SinkBuffer<'a> {
    sink: &'a dyn UnitigSink,
    block: Block,
    bases: usize,
}

impl<'a> SinkBuffer<'a> {
    pub fn new(sink: &'a dyn UnitigSink) -> Self {
        Self {
            sink,
            block: Vec::new(),
            bases: 0,
        }
    }

    pub fn push(&mut self, kind: PathKind, seq: Vec<u8>) -> Result<()> {
        self.bases += seq.len();
        self.block.push((kind, seq));
        if self.bases >= FLUSH_BASES {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.block.is_empty() {
            self.sink.write_block(&self.block)?;
            self.block.clear();
            self.bases = 0;
        }
        Ok(())
    }
}
