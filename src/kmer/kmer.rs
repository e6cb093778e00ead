//! Fixed-width 2-bit k-mer encoding.
//!
//! Bases are packed two bits each (A=0, C=1, G=2, T=3) with the first base in
//! the most significant occupied bits, so numeric order of encodings equals
//! lexicographic order of the strings. The storage word is generic: `u64`
//! serves k <= 31 and `u128` serves k <= 63. A run picks one width up front and
//! every k-mer in it shares the same length.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use std::ops::{BitAnd, BitOr, BitXor, Not, Shl, Shr};

/// Nucleotides in encoding order
pub const BASES: [u8; 4] = *b"ACGT";

/// Machine word backing a k-mer encoding
pub trait KmerWord:
    Copy
    + Default
    + Eq
    + Ord
    + Hash
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + Serialize
    + DeserializeOwned
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    /// Size of the word on disk
    const BYTES: usize;
    /// Largest odd k this word supports
    const MAX_K: usize;

    fn from_code(code: u8) -> Self;

    /// The two least significant bits, i.e. the last base
    fn low_code(self) -> u8;

    /// The low 64 bits, for bucketing
    fn low_u64(self) -> u64;

    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from the first `Self::BYTES` bytes of `bytes`
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_kmer_word {
    ($word:ty, $max_k:expr) => {
        impl KmerWord for $word {
            const BYTES: usize = std::mem::size_of::<$word>();
            const MAX_K: usize = $max_k;

            #[inline]
            fn from_code(code: u8) -> Self {
                code as $word
            }

            #[inline]
            fn low_code(self) -> u8 {
                (self & 0b11) as u8
            }

            #[inline]
            fn low_u64(self) -> u64 {
                self as u64
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$word>()];
                buf.copy_from_slice(&bytes[..Self::BYTES]);
                <$word>::from_le_bytes(buf)
            }
        }
    };
}

impl_kmer_word!(u64, 31);
impl_kmer_word!(u128, 63);

/// 2-bit code of a nucleotide, `None` for placeholders such as `N`
#[inline]
pub fn encode_base(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

#[inline]
pub fn decode_base(code: u8) -> u8 {
    BASES[(code & 0b11) as usize]
}

#[inline]
pub fn complement_code(code: u8) -> u8 {
    code ^ 0b11
}

/// True for any byte that cannot start or continue a k-mer
#[inline]
pub fn is_placeholder(base: u8) -> bool {
    encode_base(base).is_none()
}

/// Reverse complement of an ACGT sequence; placeholders are kept as `N`
pub fn reverse_complement_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match encode_base(b) {
            Some(code) => decode_base(complement_code(code)),
            None => b'N',
        })
        .collect()
}

/// A k-mer held in a single word
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Kmer<W: KmerWord> {
    encoded: W,
    len: u8,
}

impl<W: KmerWord> Kmer<W> {
    /// Wrap an encoding; bits above `2k` must be clear
    #[inline]
    pub fn from_encoded(encoded: W, k: usize) -> Self {
        debug_assert!(k >= 1 && k <= W::BYTES * 4);
        Self {
            encoded,
            len: k as u8,
        }
    }

    /// Encode a slice of bases; `None` if it is empty, too long, or holds a placeholder
    pub fn from_bytes(seq: &[u8]) -> Option<Self> {
        if seq.is_empty() || seq.len() > W::BYTES * 4 {
            return None;
        }

        let mut encoded = W::default();
        for &b in seq {
            encoded = (encoded << 2) | W::from_code(encode_base(b)?);
        }

        Some(Self {
            encoded,
            len: seq.len() as u8,
        })
    }

    #[inline]
    pub fn encoded(&self) -> W {
        self.encoded
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.len as usize
    }

    /// Mask covering the low `2k` bits
    #[inline]
    pub fn mask(k: usize) -> W {
        !W::default() >> (W::BYTES * 8 - 2 * k)
    }

    pub fn reverse_complement(&self) -> Self {
        let mut fwd = self.encoded;
        let mut rc = W::default();
        for _ in 0..self.len {
            rc = (rc << 2) | W::from_code(complement_code(fwd.low_code()));
            fwd = fwd >> 2;
        }

        Self {
            encoded: rc,
            len: self.len,
        }
    }

    /// The smaller of this k-mer and its reverse complement
    #[inline]
    pub fn canonical(&self) -> Self {
        let rc = self.reverse_complement();
        if rc.encoded < self.encoded {
            rc
        } else {
            *self
        }
    }

    #[inline]
    pub fn is_canonical(&self) -> bool {
        self.encoded <= self.reverse_complement().encoded
    }

    /// Successor candidate: drop the first base and append `code`
    #[inline]
    pub fn push_back(&self, code: u8) -> Self {
        let k = self.k();
        Self {
            encoded: ((self.encoded << 2) | W::from_code(code)) & Self::mask(k),
            len: self.len,
        }
    }

    /// Predecessor candidate: drop the last base and prepend `code`
    #[inline]
    pub fn push_front(&self, code: u8) -> Self {
        let k = self.k();
        Self {
            encoded: (self.encoded >> 2) | (W::from_code(code) << (2 * (k - 1))),
            len: self.len,
        }
    }

    /// Code of the base at position `idx` (0 = first)
    #[inline]
    pub fn base_at(&self, idx: usize) -> u8 {
        (self.encoded >> (2 * (self.k() - 1 - idx))).low_code()
    }

    #[inline]
    pub fn first_base(&self) -> u8 {
        self.base_at(0)
    }

    #[inline]
    pub fn last_base(&self) -> u8 {
        self.encoded.low_code()
    }

    /// Append the decoded bases to `out`
    pub fn append_bases(&self, out: &mut Vec<u8>) {
        out.extend((0..self.k()).map(|i| decode_base(self.base_at(i))));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.k());
        self.append_bases(&mut out);
        out
    }
}

impl<W: KmerWord> fmt::Display for Kmer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ACGT bytes are always valid UTF-8
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}
