mod common;

use common::{kmers_of, Oracle};
use kestrel::io::fasta::for_each_sequence;
use kestrel::pipeline::count::{count_database, inspect_database};
use kestrel::{build_cdbg, BuildParams, CountParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

fn read_fasta(path: &Path) -> Vec<String> {
    let mut seqs = Vec::new();
    for_each_sequence(path, |seq| {
        seqs.push(String::from_utf8(seq.to_vec()).unwrap());
        Ok(())
    })
    .unwrap();
    seqs
}

/// Reads tiled over a random genome, some with an N
fn simulated_reads(rng: &mut StdRng) -> (String, Vec<String>) {
    let genome: String = (0..1500).map(|_| b"ACGT"[rng.gen_range(0..4)] as char).collect();
    let mut reads = Vec::new();
    let mut start = 0;
    while start + 100 <= genome.len() {
        let mut read = genome[start..start + 100].to_string();
        if start % 150 == 0 {
            read.replace_range(50..51, "N");
        }
        reads.push(read);
        start += 25;
    }
    (genome, reads)
}

#[test]
fn test_count_then_build_gzip() {
    let mut rng = StdRng::seed_from_u64(11);
    let (_, reads) = simulated_reads(&mut rng);
    let dir = TempDir::new().unwrap();

    let mut fastq = NamedTempFile::new_in(dir.path()).unwrap();
    for (i, read) in reads.iter().enumerate() {
        writeln!(fastq, "@read{}\n{}\n+\n{}", i, read, "I".repeat(read.len())).unwrap();
    }
    fastq.flush().unwrap();

    let k = 25;
    let db_path = dir.path().join("reads.kdb");
    let header = count_database(&CountParams {
        k,
        inputs: vec![fastq.path().to_path_buf()],
        output_path: db_path.clone(),
        min_count: 1,
        thread_count: 2,
        num_buckets: 8,
        temp_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(inspect_database(&db_path).unwrap(), header);

    let output = dir.path().join("graph.fa.gz");
    let report = build_cdbg(&BuildParams {
        k,
        kmer_db_path: db_path,
        thread_count: 3,
        output_path: output.clone(),
        working_dir: dir.path().to_path_buf(),
        batch_size: 64,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(report.vertex_count, header.kmer_count);

    let seqs = read_fasta(&output);
    let mut unitigs = seqs.clone();
    unitigs.sort();

    let kmers: Vec<String> = reads
        .iter()
        .flat_map(|r| r.split('N').filter(|p| p.len() >= k).flat_map(|p| kmers_of(p, k, false)))
        .collect();
    let oracle = Oracle::new(k, &kmers);
    assert_eq!(oracle.len() as u64, header.kmer_count);
    oracle.assert_valid(&unitigs, &[]);
    assert_eq!(report.unipaths.unipath_count() as usize, seqs.len());
}

#[test]
fn test_min_count_drops_singletons() {
    let dir = TempDir::new().unwrap();
    let fasta = dir.path().join("reads.fa");
    // The first read is seen twice, the second once.
    std::fs::write(
        &fasta,
        ">a\nACGGTCATTGCCAGT\n>b\nACGGTCATTGCCAGT\n>c\nTTTAGGCTAACCGTAGG\n",
    )
    .unwrap();

    let db_path = dir.path().join("reads.kdb");
    count_database(&CountParams {
        k: 7,
        inputs: vec![fasta],
        output_path: db_path.clone(),
        min_count: 2,
        thread_count: 1,
        num_buckets: 4,
        temp_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();

    let output = dir.path().join("graph.fa");
    build_cdbg(&BuildParams {
        k: 7,
        kmer_db_path: db_path,
        thread_count: 2,
        output_path: output.clone(),
        working_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();

    let seqs = read_fasta(&output);
    assert_eq!(seqs.len(), 1);
    let read = "ACGGTCATTGCCAGT";
    assert!(seqs[0] == read || seqs[0] == common::rc(read));
}

#[test]
fn test_cli_count_build_inspect() {
    let dir = TempDir::new().unwrap();
    let fasta = dir.path().join("reads.fa");
    std::fs::write(&fasta, ">a\nAACTCCAGC\n>b\nGCGGTCAGGCGG\n").unwrap();
    let db = dir.path().join("reads.kdb");
    let out = dir.path().join("graph.fa");
    let report = dir.path().join("report.json");
    let exe = env!("CARGO_BIN_EXE_kestrel");

    let status = Command::new(exe)
        .args(["count", "-k", "5", "--min-count", "1", "--threads", "2"])
        .arg("-i")
        .arg(&fasta)
        .arg("-o")
        .arg(&db)
        .arg("--temp-dir")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let build = Command::new(exe)
        .args(["build", "-k", "5", "--threads", "2"])
        .arg("-d")
        .arg(&db)
        .arg("-o")
        .arg(&out)
        .arg("--work-dir")
        .arg(dir.path())
        .arg("--report")
        .arg(&report)
        .output()
        .unwrap();
    assert!(build.status.success());
    // Logs go to stderr, stdout stays clean
    assert!(build.stdout.is_empty());
    assert!(String::from_utf8_lossy(&build.stderr).contains("Done in"));

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text, ">unitig_0 len=9\nAACTCCAGC\n>dcc_0 len=12\nACCGCCTGACCG\n");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["unipaths"]["dccs"]["kmer_count"], 8);

    let inspect = Command::new(exe).arg("inspect").arg("-d").arg(&db).output().unwrap();
    assert!(inspect.status.success());
    let header: serde_json::Value = serde_json::from_slice(&inspect.stdout).unwrap();
    assert_eq!(header["k"], 5);
    assert_eq!(header["kmer_count"], 13);

    // Mismatched k exits non-zero and writes no output
    let missing = dir.path().join("other.fa");
    let status = Command::new(exe)
        .args(["build", "-k", "7"])
        .arg("-d")
        .arg(&db)
        .arg("-o")
        .arg(&missing)
        .arg("--work-dir")
        .arg(dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(!missing.exists());
}
