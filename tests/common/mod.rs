#![allow(dead_code)]

use kestrel::database::write_database;
use kestrel::kmer::kmer::{Kmer, KmerWord};
use kestrel::{Cdbg, BuildParams, ConstructionReport, MemorySink};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub fn rc(s: &str) -> String {
    s.bytes()
        .rev()
        .map(|b| match b {
            b'A' => 'T',
            b'C' => 'G',
            b'G' => 'C',
            _ => 'A',
        })
        .collect()
}

pub fn canonical(s: &str) -> String {
    let r = rc(s);
    if r.as_str() < s {
        r
    } else {
        s.to_string()
    }
}

/// All k-mers of `seq`, wrapping around when `circular`
pub fn kmers_of(seq: &str, k: usize, circular: bool) -> Vec<String> {
    let s = if circular {
        format!("{}{}", seq, &seq[..k - 1])
    } else {
        seq.to_string()
    };
    (0..=s.len() - k).map(|i| s[i..i + k].to_string()).collect()
}

fn write_words<W: KmerWord>(path: &Path, k: usize, kmers: &[String]) {
    let kmers: Vec<Kmer<W>> = kmers
        .iter()
        .map(|s| Kmer::from_bytes(s.as_bytes()).unwrap())
        .collect();
    write_database(path, k, 1, kmers).unwrap();
}

/// Write a database with the word width k needs
pub fn write_kmers(dir: &Path, k: usize, kmers: &[String]) -> PathBuf {
    let path = dir.join(format!("k{}.kdb", k));
    if k <= 31 {
        write_words::<u64>(&path, k, kmers);
    } else {
        write_words::<u128>(&path, k, kmers);
    }
    path
}

pub fn params(db: PathBuf, k: usize, threads: usize, work_dir: &Path) -> BuildParams {
    BuildParams {
        k,
        kmer_db_path: db,
        thread_count: threads,
        working_dir: work_dir.to_path_buf(),
        batch_size: 16,
        ..Default::default()
    }
}

/// Construct into memory; returns (sorted unitigs, sorted DCCs, report)
pub fn construct(params: BuildParams) -> (Vec<String>, Vec<String>, ConstructionReport) {
    let sink = MemorySink::new();
    let report = if params.k <= 31 {
        Cdbg::<u64>::new(params).unwrap().construct(&sink).unwrap()
    } else {
        Cdbg::<u128>::new(params).unwrap().construct(&sink).unwrap()
    };
    (sink.unitigs(), sink.dccs(), report)
}

/// Naive string-based graph used to check the construction
pub struct Oracle {
    k: usize,
    set: HashSet<String>,
}

impl Oracle {
    pub fn new(k: usize, kmers: &[String]) -> Self {
        Self {
            k,
            set: kmers.iter().map(|s| canonical(s)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    fn present(&self, s: &str) -> bool {
        self.set.contains(&canonical(s))
    }

    fn succs(&self, x: &str) -> Vec<String> {
        ["A", "C", "G", "T"]
            .iter()
            .map(|b| format!("{}{}", &x[1..], b))
            .filter(|y| self.present(y))
            .collect()
    }

    fn preds(&self, x: &str) -> Vec<String> {
        ["A", "C", "G", "T"]
            .iter()
            .map(|b| format!("{}{}", b, &x[..x.len() - 1]))
            .filter(|y| self.present(y))
            .collect()
    }

    /// Next k-mer through an open side
    pub fn step(&self, x: &str) -> Option<String> {
        let succs = self.succs(x);
        if succs.len() != 1 {
            return None;
        }
        let y = succs.into_iter().next()?;
        if canonical(&y) == canonical(x) || self.preds(&y).len() != 1 {
            return None;
        }
        Some(y)
    }

    /// Every k-mer on exactly one path, paths connected through open sides,
    /// unitigs maximal, cycles closed and rotated to their smallest k-mer
    pub fn assert_valid(&self, unitigs: &[String], dccs: &[String]) {
        let k = self.k;
        let mut seen: HashMap<String, usize> = HashMap::new();

        for u in unitigs {
            assert!(u.len() >= k, "unitig {} shorter than k", u);
            assert!(u.as_str() <= rc(u).as_str(), "unitig {} not in canonical orientation", u);
            let ks = kmers_of(u, k, false);
            for pair in ks.windows(2) {
                assert_eq!(self.step(&pair[0]).as_deref(), Some(pair[1].as_str()), "unitig {}", u);
            }
            assert!(self.step(&ks[ks.len() - 1]).is_none(), "unitig {} extends right", u);
            assert!(self.step(&rc(&ks[0])).is_none(), "unitig {} extends left", u);
            for km in ks {
                *seen.entry(canonical(&km)).or_default() += 1;
            }
        }

        for d in dccs {
            let ks = kmers_of(d, k, false);
            for pair in ks.windows(2) {
                assert_eq!(self.step(&pair[0]).as_deref(), Some(pair[1].as_str()), "cycle {}", d);
            }
            assert_eq!(self.step(&ks[ks.len() - 1]).as_deref(), Some(ks[0].as_str()), "cycle {} not closed", d);
            let smallest = ks.iter().map(|s| canonical(s)).min().unwrap();
            assert_eq!(ks[0], smallest, "cycle {} not rotated to its smallest k-mer", d);
            for km in ks {
                *seen.entry(canonical(&km)).or_default() += 1;
            }
        }

        assert_eq!(seen.len(), self.set.len(), "emitted k-mers differ from the input set");
        for (km, count) in seen {
            assert!(self.set.contains(&km), "{} was never an input k-mer", km);
            assert_eq!(count, 1, "{} emitted {} times", km, count);
        }
    }
}
