mod common;

use common::{construct, kmers_of, params, write_kmers, Oracle};
use kestrel::CdbgError;
use kestrel::Cdbg;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

fn random_seq(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)] as char).collect()
}

fn strings(kmers: &[&str]) -> Vec<String> {
    kmers.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_linear_path_and_detached_cycle() {
    let dir = TempDir::new().unwrap();
    let k = 5;
    let mut kmers = kmers_of("AACTCCAGC", k, false);
    kmers.extend(kmers_of("GCGGTCAG", k, true));

    let db = write_kmers(dir.path(), k, &kmers);
    let (unitigs, dccs, report) = construct(params(db, k, 3, dir.path()));

    assert_eq!(unitigs, vec!["AACTCCAGC"]);
    // Read on the reverse strand, starting at the smallest k-mer ACCGC
    assert_eq!(dccs, vec!["ACCGCCTGACCG"]);

    let meta = &report.unipaths;
    assert_eq!(meta.unipath_count(), 1);
    assert_eq!(meta.kmer_count(), 5);
    assert_eq!(meta.dcc_count(), 1);
    assert_eq!(meta.dcc_kmer_count(), 8);
    assert_eq!(meta.dcc_min_len(), 12);
    assert_eq!(report.vertex_count, 13);
}

#[test]
fn test_cycle_on_forward_strand() {
    let dir = TempDir::new().unwrap();
    let kmers = kmers_of("AATCTCTG", 5, true);
    let db = write_kmers(dir.path(), 5, &kmers);

    let (unitigs, dccs, report) = construct(params(db, 5, 2, dir.path()));
    assert!(unitigs.is_empty());
    assert_eq!(dccs, vec!["AATCTCTGAATC"]);
    assert_eq!(report.unipaths.dcc_kmer_count(), 8);
    assert_eq!(report.unipaths.min_len(), 0);
}

#[test]
fn test_hairpin_path() {
    // CGT and ACG are one vertex, so the path folds back onto itself
    let dir = TempDir::new().unwrap();
    let db = write_kmers(dir.path(), 3, &strings(&["AAC", "ACG", "CGT"]));

    let (unitigs, dccs, report) = construct(params(db, 3, 1, dir.path()));
    assert_eq!(unitigs, vec!["AACG"]);
    assert!(dccs.is_empty());
    assert_eq!(report.unipaths.unipath_count(), 1);
    assert_eq!(report.unipaths.kmer_count(), 2);
}

#[test]
fn test_isolated_vertex() {
    let dir = TempDir::new().unwrap();
    let k = 31;
    let kmer = "ACGTTGCAAGCTTAGGCATCGATCGGATCCA";
    let db = write_kmers(dir.path(), k, &strings(&[kmer]));

    let (unitigs, dccs, report) = construct(params(db, k, 4, dir.path()));
    assert_eq!(unitigs.len(), 1);
    assert_eq!(unitigs[0], common::canonical(kmer));
    assert!(dccs.is_empty());
    assert_eq!(report.unipaths.unipath_count(), 1);
    assert_eq!(report.unipaths.min_len(), 31);
    assert_eq!(report.unipaths.max_len(), 31);
}

#[test]
fn test_empty_database() {
    let dir = TempDir::new().unwrap();
    let db = write_kmers(dir.path(), 7, &[]);

    let (unitigs, dccs, report) = construct(params(db, 7, 2, dir.path()));
    assert!(unitigs.is_empty() && dccs.is_empty());
    assert_eq!(report.vertex_count, 0);
}

#[test]
fn test_dense_small_k_graphs() {
    // Small k forces branching, hairpins, self-loops and palindromic overlaps.
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let k = [3, 5, 7][seed as usize % 3];
        let len = rng.gen_range(20..300);
        let mut kmers = kmers_of(&random_seq(&mut rng, len), k, false);
        if seed % 2 == 0 {
            kmers.extend(kmers_of(&random_seq(&mut rng, 40), k, true));
        }

        let dir = TempDir::new().unwrap();
        let db = write_kmers(dir.path(), k, &kmers);
        let (unitigs, dccs, report) = construct(params(db, k, 4, dir.path()));

        let oracle = Oracle::new(k, &kmers);
        oracle.assert_valid(&unitigs, &dccs);
        assert_eq!(report.vertex_count as usize, oracle.len());
        assert_eq!(report.unipaths.total_kmer_count() as usize, oracle.len());
    }
}

#[test]
fn test_genome_with_repeats_and_cycles() {
    let mut rng = StdRng::seed_from_u64(42);
    let repeat = random_seq(&mut rng, 80);
    let mut genome = String::new();
    for _ in 0..4 {
        genome.push_str(&random_seq(&mut rng, 700));
        genome.push_str(&repeat);
    }
    genome.push_str(&common::rc(&repeat));
    genome.push_str(&random_seq(&mut rng, 500));

    for k in [31, 33] {
        let mut kmers = kmers_of(&genome, k, false);
        kmers.extend(kmers_of(&random_seq(&mut rng, 150), k, true));
        kmers.extend(kmers_of(&random_seq(&mut rng, 90), k, true));

        let dir = TempDir::new().unwrap();
        let db = write_kmers(dir.path(), k, &kmers);
        let (unitigs, dccs, report) = construct(params(db.clone(), k, 4, dir.path()));

        let oracle = Oracle::new(k, &kmers);
        oracle.assert_valid(&unitigs, &dccs);
        assert_eq!(dccs.len(), 2);
        assert!(unitigs.len() > 4);

        let meta = &report.unipaths;
        assert_eq!(meta.unipath_count() as usize, unitigs.len());
        let spanned: usize = unitigs.iter().map(|u| u.len() - (k - 1)).sum();
        assert_eq!(meta.kmer_count() as usize, spanned);
        assert_eq!(meta.sum_len() as usize, unitigs.iter().map(|u| u.len()).sum::<usize>());
        assert_eq!(meta.dcc_kmer_count(), 240);
        assert_eq!(meta.max_len() as usize, unitigs.iter().map(|u| u.len()).max().unwrap());

        // Same graph regardless of how the work is split.
        let (single, single_dccs, _) = construct(params(db, k, 1, dir.path()));
        assert_eq!(single, unitigs);
        assert_eq!(single_dccs, dccs);
    }
}

#[test]
fn test_saved_hash_function_gives_same_graph() {
    let mut rng = StdRng::seed_from_u64(7);
    let k = 21;
    let kmers = kmers_of(&random_seq(&mut rng, 2000), k, false);
    let dir = TempDir::new().unwrap();
    let db = write_kmers(dir.path(), k, &kmers);
    let mph = dir.path().join("graph.mph");

    let mut first = params(db.clone(), k, 2, dir.path());
    first.mph_file_path = Some(mph.clone());
    let (unitigs, dccs, _) = construct(first.clone());
    assert!(mph.exists());

    let (again, again_dccs, _) = construct(first);
    assert_eq!(unitigs, again);
    assert_eq!(dccs, again_dccs);
    Oracle::new(k, &kmers).assert_valid(&again, &again_dccs);
}

#[test]
fn test_k_mismatch_is_config_error() {
    let dir = TempDir::new().unwrap();
    let db = write_kmers(dir.path(), 5, &kmers_of("ACGTTGCA", 5, false));

    let err = Cdbg::<u64>::new(params(db.clone(), 7, 1, dir.path())).err().unwrap();
    assert!(err.is_config_error());
    assert!(matches!(err, CdbgError::KmerLengthMismatch { expected: 7, found: 5, .. }));

    let err = Cdbg::<u64>::new(params(db, 4, 1, dir.path())).err().unwrap();
    assert!(matches!(err, CdbgError::Config(_)));
}
