//! Construction driver.
//!
//! Ties the stages together: load the k-mer set, build the vertex index,
//! classify, extract, report. The word width is picked from k once, up front.

use crate::config::BuildParams;
use crate::database::KmerDatabase;
use crate::error::{CdbgError, Result};
use crate::graph::classify::{classify_vertices, ClassificationSummary};
use crate::graph::extract::extract_unipaths;
use crate::graph::meta_info::UnipathsMetaInfo;
use crate::graph::vertices::Vertices;
use crate::io::fasta::{is_gzipped, FastaWriter};
use crate::io::sink::{FastaSink, UnitigSink};
use crate::kmer::kmer::KmerWord;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::info;

/// Summary of one construction, written as the JSON report
#[derive(Clone, Debug, Serialize)]
pub struct ConstructionReport {
    pub k: usize,
    pub kmer_db_path: PathBuf,
    pub vertex_count: u64,
    pub thread_count: usize,
    pub classification: ClassificationSummary,
    pub unipaths: UnipathsMetaInfo,
    pub elapsed_secs: f64,
}

/// Compacted de Bruijn graph of one k-mer database
pub struct Cdbg<W: KmerWord> {
    params: BuildParams,
    db: KmerDatabase<W>,
}

impl<W: KmerWord> Cdbg<W> {
    pub fn new(params: BuildParams) -> Result<Self> {
        params.validate()?;
        if params.k > W::MAX_K {
            return Err(CdbgError::config(format!(
                "k = {} needs wider k-mer words than {} bytes",
                params.k,
                W::BYTES
            )));
        }

        let db = KmerDatabase::open(&params.kmer_db_path, params.k)?;
        Ok(Self { params, db })
    }

    pub fn params(&self) -> &BuildParams {
        &self.params
    }

    /// Emit every maximal unitig and DCC to `sink`
    pub fn construct(&mut self, sink: &dyn UnitigSink) -> Result<ConstructionReport> {
        let start = Instant::now();
        let k = self.params.k;
        let threads = self.params.thread_count;
        let batch_size = self.params.batch_size;
        info!(
            "Constructing the compacted de Bruijn graph of {} ({} {}-mers) with {} threads",
            self.db.path().display(),
            self.db.total_kmer_count(),
            k,
            threads
        );

        let set = self.db.load_set()?;
        let mut vertices = Vertices::build(&set, k, threads, self.params.mph_file_path.as_deref())?;
        let classification = classify_vertices(&self.db, &set, &vertices, threads, batch_size)?;
        // Extraction only reads the state table.
        drop(set);

        let unipaths = extract_unipaths(&self.db, &vertices, threads, batch_size, sink)?;
        let vertex_count = vertices.len() as u64;
        vertices.clear();

        unipaths.log_summary();
        let elapsed_secs = start.elapsed().as_secs_f64();
        info!("Construction finished in {:.2}s", elapsed_secs);

        Ok(ConstructionReport {
            k,
            kmer_db_path: self.db.path().to_path_buf(),
            vertex_count,
            thread_count: threads,
            classification,
            unipaths,
            elapsed_secs,
        })
    }
}

/// Build the graph described by `params`, writing FASTA and the optional report.
///
/// The FASTA is written to a temporary file in the working directory and
/// only moved to the output path once construction succeeded.
pub fn build_cdbg(params: &BuildParams) -> Result<ConstructionReport> {
    params.validate()?;
    if params.k <= u64::MAX_K {
        build_with::<u64>(params)
    } else {
        build_with::<u128>(params)
    }
}

fn build_with<W: KmerWord>(params: &BuildParams) -> Result<ConstructionReport> {
    let mut cdbg = Cdbg::<W>::new(params.clone())?;

    let temp = NamedTempFile::new_in(&params.working_dir)?;
    let writer = FastaWriter::from_file(temp.reopen()?, is_gzipped(&params.output_path));
    let sink = FastaSink::new(writer);
    let report = cdbg.construct(&sink)?;
    let (unitigs, dccs) = sink.finish()?;

    persist_output(temp, &params.output_path)?;
    info!(
        "Wrote {} unitigs and {} DCCs to {}",
        unitigs,
        dccs,
        params.output_path.display()
    );

    if let Some(path) = &params.report_path {
        write_report(path, &report)?;
        info!("Wrote report to {}", path.display());
    }

    Ok(report)
}

fn persist_output(temp: NamedTempFile, output: &Path) -> Result<()> {
    match temp.persist(output) {
        Ok(_) => Ok(()),
        // Rename fails across file systems.
        Err(e) => {
            std::fs::copy(e.file.path(), output)?;
            Ok(())
        }
    }
}

pub fn write_report(path: &Path, report: &ConstructionReport) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}
