//! Single-producer/multi-consumer batch streaming over a k-mer database.
//!
//! One background thread scans the database once and pushes fixed-size batches
//! into a bounded channel. Any number of consumers pull whole batches; each
//! batch is received by exactly one consumer, so the consumers partition the
//! k-mer set between them without further coordination.

use crate::database::iter::BufferedKmerIterator;
use crate::error::{CdbgError, Result};
use crate::kmer::kmer::{Kmer, KmerWord};
use crossbeam::channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Default number of k-mers per batch
pub const DEFAULT_BATCH_SIZE: usize = 1 << 14;

/// Batches kept in flight per consumer
const QUEUE_DEPTH_PER_CONSUMER: usize = 2;

pub struct SpmcIterator<W: KmerWord> {
    receiver: Receiver<Vec<Kmer<W>>>,
    producer: JoinHandle<Result<u64>>,
}

impl<W: KmerWord> SpmcIterator<W> {
    pub(crate) fn launch(
        source: BufferedKmerIterator<W>,
        consumer_count: usize,
        batch_size: usize,
    ) -> Result<Self> {
        let (sender, receiver) = bounded(consumer_count.max(1) * QUEUE_DEPTH_PER_CONSUMER);
        let batch_size = batch_size.max(1);

        let producer = thread::Builder::new()
            .name("kmer-producer".to_string())
            .spawn(move || produce(source, sender, batch_size))?;

        Ok(Self { receiver, producer })
    }

    /// Handle for one worker thread
    pub fn consumer(&self) -> SpmcConsumer<W> {
        SpmcConsumer {
            receiver: self.receiver.clone(),
        }
    }

    /// Wait for the producer and return how many k-mers it handed out.
    ///
    /// Must be called after every consumer is done; a read error hit by the
    /// producer surfaces here.
    pub fn finish(self) -> Result<u64> {
        let Self { receiver, producer } = self;
        // Unblocks a producer stuck on a full queue if the consumers bailed out early.
        drop(receiver);

        producer
            .join()
            .map_err(|_| CdbgError::concurrency("k-mer producer thread panicked"))?
    }
}

fn produce<W: KmerWord>(
    mut source: BufferedKmerIterator<W>,
    sender: Sender<Vec<Kmer<W>>>,
    batch_size: usize,
) -> Result<u64> {
    let mut produced = 0u64;

    loop {
        let mut batch = Vec::with_capacity(batch_size);
        for kmer in source.by_ref().take(batch_size) {
            batch.push(kmer?);
        }

        if batch.is_empty() {
            break;
        }

        produced += batch.len() as u64;
        if sender.send(batch).is_err() {
            debug!("All k-mer consumers hung up; stopping producer early");
            break;
        }
    }

    Ok(produced)
}

/// One consumer's view: an iterator over the batches it claims
pub struct SpmcConsumer<W: KmerWord> {
    receiver: Receiver<Vec<Kmer<W>>>,
}

impl<W: KmerWord> Iterator for SpmcConsumer<W> {
    type Item = Vec<Kmer<W>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}
