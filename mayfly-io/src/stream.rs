//! File-backed read streams: FASTA and FASTQ.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mayfly_common::{Error, Result};

use crate::read::SingleRead;

/// ASCII offset of the quality encoding in a FASTQ file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PhredOffset {
    Phred33,
    Phred64,
}

impl PhredOffset {
    fn value(self) -> u8 {
        match self {
            PhredOffset::Phred33 => 33,
            PhredOffset::Phred64 => 64,
        }
    }
}

/// Boxed stream type returned by the composition helpers.
pub type ReadStreamBox = Box<dyn Iterator<Item = Result<SingleRead>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Fasta,
    Fastq,
}

/// Streams FASTA or FASTQ records off disk; the format is sniffed from the
/// first record byte (`>` vs `@`).
pub struct FileReadStream {
    reader: BufReader<File>,
    format: Format,
    offset: PhredOffset,
    /// FASTA header line carried over from the previous record.
    pending_header: Option<String>,
    done: bool,
}

impl FileReadStream {
    pub fn open(path: impl AsRef<Path>, offset: PhredOffset) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let first = {
            let buf = reader.fill_buf()?;
            buf.first().copied()
        };
        let format = match first {
            Some(b'>') => Format::Fasta,
            Some(b'@') => Format::Fastq,
            None => Format::Fasta, // empty file: an immediately exhausted stream
            Some(other) => {
                return Err(Error::MalformedRecord {
                    format: "fasta/fastq",
                    name: path.as_ref().display().to_string(),
                    reason: format!("unexpected leading byte 0x{other:02x}"),
                })
            }
        };
        Ok(FileReadStream {
            reader,
            format,
            offset,
            pending_header: None,
            done: false,
        })
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn next_fasta(&mut self) -> Result<Option<SingleRead>> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match self.read_line()? {
                Some(h) => h,
                None => return Ok(None),
            },
        };
        let name = header
            .strip_prefix('>')
            .ok_or_else(|| Error::MalformedRecord {
                format: "fasta",
                name: header.clone(),
                reason: "header does not start with '>'".to_string(),
            })?
            .to_string();
        let mut seq = Vec::new();
        loop {
            match self.read_line()? {
                None => break,
                Some(line) if line.starts_with('>') => {
                    self.pending_header = Some(line);
                    break;
                }
                Some(line) => seq.extend(line.bytes().filter(|b| !b.is_ascii_whitespace())),
            }
        }
        Ok(Some(SingleRead::new(name, seq)))
    }

    fn next_fastq(&mut self) -> Result<Option<SingleRead>> {
        let header = match self.read_line()? {
            Some(h) => h,
            None => return Ok(None),
        };
        let name = header
            .strip_prefix('@')
            .ok_or_else(|| Error::MalformedRecord {
                format: "fastq",
                name: header.clone(),
                reason: "header does not start with '@'".to_string(),
            })?
            .to_string();
        let seq: Vec<u8> = self
            .read_line()?
            .ok_or_else(|| truncated("fastq", &name))?
            .into_bytes();
        let plus = self.read_line()?.ok_or_else(|| truncated("fastq", &name))?;
        if !plus.starts_with('+') {
            return Err(Error::MalformedRecord {
                format: "fastq",
                name,
                reason: "separator line does not start with '+'".to_string(),
            });
        }
        let qual_line = self.read_line()?.ok_or_else(|| truncated("fastq", &name))?;
        if qual_line.len() != seq.len() {
            return Err(Error::MalformedRecord {
                format: "fastq",
                name,
                reason: "quality line length differs from sequence".to_string(),
            });
        }
        let off = self.offset.value();
        let qual = qual_line.bytes().map(|q| q.saturating_sub(off)).collect();
        Ok(Some(SingleRead::with_quality(name, seq, qual)))
    }
}

fn truncated(format: &'static str, name: &str) -> Error {
    Error::MalformedRecord {
        format,
        name: name.to_string(),
        reason: "truncated record".to_string(),
    }
}

impl Iterator for FileReadStream {
    type Item = Result<SingleRead>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = match self.format {
            Format::Fasta => self.next_fasta(),
            Format::Fastq => self.next_fastq(),
        };
        match next {
            Ok(Some(read)) => Some(Ok(read)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tmp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn fasta_multi_line_records() {
        let f = write_tmp(">r1\nACGT\nACGT\n>r2\nTTTT\n");
        let reads: Vec<_> = FileReadStream::open(f.path(), PhredOffset::Phred33)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].seq, b"ACGTACGT");
        assert_eq!(reads[1].name, "r2");
    }

    #[test]
    fn fastq_quality_rebased() {
        let f = write_tmp("@r1\nACG\n+\nIII\n");
        let reads: Vec<_> = FileReadStream::open(f.path(), PhredOffset::Phred33)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].qual, Some(vec![40, 40, 40]));
    }

    #[test]
    fn fastq_length_mismatch_is_error() {
        let f = write_tmp("@r1\nACGT\n+\nII\n");
        let mut stream = FileReadStream::open(f.path(), PhredOffset::Phred33).unwrap();
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn empty_file_is_empty_stream() {
        let f = write_tmp("");
        let mut stream = FileReadStream::open(f.path(), PhredOffset::Phred33).unwrap();
        assert!(stream.next().is_none());
    }
}
