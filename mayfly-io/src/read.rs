//! Read records: single and paired nucleotide sequences.

use serde::{Deserialize, Serialize};

/// Complement of a single nucleotide; ambiguity symbols map to `N`.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        _ => b'N',
    }
}

/// True for the four unambiguous nucleotide letters.
pub fn is_nucl(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T' | b'a' | b'c' | b'g' | b't')
}

/// One sequencing read: name, nucleotide string, optional quality string.
///
/// Quality values are stored already rebased to Phred+0 (raw score, not an
/// ASCII encoding); see [`crate::stream::PhredOffset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRead {
    pub name: String,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl SingleRead {
    pub fn new(name: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        SingleRead {
            name: name.into(),
            seq: seq.into(),
            qual: None,
        }
    }

    pub fn with_quality(
        name: impl Into<String>,
        seq: impl Into<Vec<u8>>,
        qual: Vec<u8>,
    ) -> Self {
        SingleRead {
            name: name.into(),
            seq: seq.into(),
            qual: Some(qual),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// A read is valid when it carries no ambiguity symbols.
    pub fn is_valid(&self) -> bool {
        self.seq.iter().copied().all(is_nucl)
    }

    /// Reverse complement; the quality string (if any) is reversed alongside.
    pub fn reverse_complement(&self) -> SingleRead {
        SingleRead {
            name: self.name.clone(),
            seq: self.seq.iter().rev().copied().map(complement).collect(),
            qual: self.qual.as_ref().map(|q| q.iter().rev().copied().collect()),
        }
    }

    /// Longest substring free of ambiguity symbols, as a new read.
    /// Returns `None` when no valid symbol exists at all.
    pub fn longest_valid(&self) -> Option<SingleRead> {
        let mut best: Option<(usize, usize)> = None;
        let mut run_start = 0usize;
        let mut i = 0usize;
        while i <= self.seq.len() {
            let valid = i < self.seq.len() && is_nucl(self.seq[i]);
            if !valid {
                if i > run_start {
                    let len = i - run_start;
                    if best.map_or(true, |(s, e)| e - s < len) {
                        best = Some((run_start, i));
                    }
                }
                run_start = i + 1;
            }
            i += 1;
        }
        best.map(|(s, e)| SingleRead {
            name: self.name.clone(),
            seq: self.seq[s..e].to_vec(),
            qual: self.qual.as_ref().map(|q| q[s..e].to_vec()),
        })
    }
}

/// A read pair plus the library insert size it was sequenced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedRead {
    pub first: SingleRead,
    pub second: SingleRead,
    pub insert_size: usize,
}

impl PairedRead {
    pub fn new(first: SingleRead, second: SingleRead, insert_size: usize) -> Self {
        PairedRead {
            first,
            second,
            insert_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_complement_round_trip() {
        let r = SingleRead::new("r", b"ACGTTGCA".to_vec());
        assert_eq!(r.reverse_complement().seq, b"TGCAACGT");
        assert_eq!(r.reverse_complement().reverse_complement(), r);
    }

    #[test]
    fn longest_valid_picks_longest_run() {
        let r = SingleRead::new("r", b"ACNNACGTNA".to_vec());
        let lv = r.longest_valid().unwrap();
        assert_eq!(lv.seq, b"ACGT");
    }

    #[test]
    fn longest_valid_keeps_quality_in_step() {
        let r = SingleRead::with_quality("r", b"NNACGN".to_vec(), vec![1, 2, 3, 4, 5, 6]);
        let lv = r.longest_valid().unwrap();
        assert_eq!(lv.seq, b"ACG");
        assert_eq!(lv.qual, Some(vec![3, 4, 5]));
    }

    #[test]
    fn longest_valid_all_ambiguous() {
        let r = SingleRead::new("r", b"NNNN".to_vec());
        assert!(r.longest_valid().is_none());
    }
}
