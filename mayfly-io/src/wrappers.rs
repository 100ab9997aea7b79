//! Stream wrappers: validity splitting, reverse-complement doubling,
//! paired-read composition and orientation fix-up.

use std::path::Path;

use mayfly_common::{Error, Result};

use crate::prefetch::AsyncReadStream;
use crate::read::{PairedRead, SingleRead};
use crate::stream::{FileReadStream, PhredOffset, ReadStreamBox};

/// Replaces each read with its longest substring free of ambiguity symbols.
/// Reads with no valid symbols at all are dropped silently.
pub struct LongestValidWrap<S> {
    inner: S,
}

impl<S> LongestValidWrap<S> {
    pub fn new(inner: S) -> Self {
        LongestValidWrap { inner }
    }
}

impl<S: Iterator<Item = Result<SingleRead>>> Iterator for LongestValidWrap<S> {
    type Item = Result<SingleRead>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Err(e) => return Some(Err(e)),
                Ok(read) => match read.longest_valid() {
                    Some(valid) => return Some(Ok(valid)),
                    None => {
                        log::debug!("dropping read '{}': no unambiguous symbols", read.name);
                        continue;
                    }
                },
            }
        }
    }
}

/// Emits each read followed immediately by its reverse complement.
pub struct RcWrap<S> {
    inner: S,
    pending: Option<SingleRead>,
}

impl<S> RcWrap<S> {
    pub fn new(inner: S) -> Self {
        RcWrap {
            inner,
            pending: None,
        }
    }
}

impl<S: Iterator<Item = Result<SingleRead>>> Iterator for RcWrap<S> {
    type Item = Result<SingleRead>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(rc) = self.pending.take() {
            return Some(Ok(rc));
        }
        match self.inner.next()? {
            Err(e) => Some(Err(e)),
            Ok(read) => {
                self.pending = Some(read.reverse_complement());
                Some(Ok(read))
            }
        }
    }
}

/// Relative orientation of the two mates in a paired library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LibraryOrientation {
    /// forward / reverse - the second mate is flipped to the forward strand
    FR,
    /// reverse / forward - the first mate is flipped
    RF,
    /// forward / forward - both mates kept as read
    FF,
    /// unknown - pairs pass through untouched
    Undefined,
}

/// Normalises paired reads to forward/forward orientation.
pub struct OrientationChangingWrapper<S> {
    inner: S,
    orientation: LibraryOrientation,
}

impl<S> OrientationChangingWrapper<S> {
    pub fn new(inner: S, orientation: LibraryOrientation) -> Self {
        OrientationChangingWrapper { inner, orientation }
    }
}

impl<S: Iterator<Item = Result<PairedRead>>> Iterator for OrientationChangingWrapper<S> {
    type Item = Result<PairedRead>;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = match self.inner.next()? {
            Ok(p) => p,
            Err(e) => return Some(Err(e)),
        };
        let pair = match self.orientation {
            LibraryOrientation::FR => PairedRead {
                second: pair.second.reverse_complement(),
                ..pair
            },
            LibraryOrientation::RF => PairedRead {
                first: pair.first.reverse_complement(),
                ..pair
            },
            LibraryOrientation::FF | LibraryOrientation::Undefined => pair,
        };
        Some(Ok(pair))
    }
}

/// Pairs consecutive records of one interleaved stream.
pub struct InterleavingPairedReadStream<S> {
    inner: S,
    insert_size: usize,
}

impl<S> InterleavingPairedReadStream<S> {
    pub fn new(inner: S, insert_size: usize) -> Self {
        InterleavingPairedReadStream { inner, insert_size }
    }
}

impl<S: Iterator<Item = Result<SingleRead>>> Iterator for InterleavingPairedReadStream<S> {
    type Item = Result<PairedRead>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.inner.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        match self.inner.next() {
            None => Some(Err(Error::PairedDesync(format!(
                "interleaved stream ended after unpaired read '{}'",
                first.name
            )))),
            Some(Err(e)) => Some(Err(e)),
            Some(Ok(second)) => Some(Ok(PairedRead::new(first, second, self.insert_size))),
        }
    }
}

/// Pairs two parallel single streams record-by-record.
pub struct SeparatePairedReadStream<L, R> {
    left: L,
    right: R,
    insert_size: usize,
}

impl<L, R> SeparatePairedReadStream<L, R> {
    pub fn new(left: L, right: R, insert_size: usize) -> Self {
        SeparatePairedReadStream {
            left,
            right,
            insert_size,
        }
    }
}

impl<L, R> Iterator for SeparatePairedReadStream<L, R>
where
    L: Iterator<Item = Result<SingleRead>>,
    R: Iterator<Item = Result<SingleRead>>,
{
    type Item = Result<PairedRead>;

    fn next(&mut self) -> Option<Self::Item> {
        match (self.left.next(), self.right.next()) {
            (None, None) => None,
            (Some(Ok(first)), Some(Ok(second))) => {
                Some(Ok(PairedRead::new(first, second, self.insert_size)))
            }
            (Some(Err(e)), _) | (_, Some(Err(e))) => Some(Err(e)),
            (Some(Ok(r)), None) | (None, Some(Ok(r))) => Some(Err(Error::PairedDesync(format!(
                "mate missing for read '{}'",
                r.name
            )))),
        }
    }
}

/// Opens a single-read stream with the canonical wrapper composition:
/// file -> longest-valid (when `handle_ns`) -> reverse-complement doubling
/// (when `followed_by_rc`). With `prefetch` the file parsing runs on a
/// background thread feeding a bounded channel.
pub fn easy_stream(
    path: impl AsRef<Path>,
    followed_by_rc: bool,
    handle_ns: bool,
    offset: PhredOffset,
    prefetch: bool,
) -> Result<ReadStreamBox> {
    let file = FileReadStream::open(path, offset)?;
    let mut stream: ReadStreamBox = if prefetch {
        Box::new(AsyncReadStream::spawn(file))
    } else {
        Box::new(file)
    };
    if handle_ns {
        stream = Box::new(LongestValidWrap::new(stream));
    }
    if followed_by_rc {
        stream = Box::new(RcWrap::new(stream));
    }
    Ok(stream)
}

/// Boxed paired-stream type returned by [`paired_easy_stream`].
pub type PairedStreamBox = Box<dyn Iterator<Item = Result<PairedRead>> + Send>;

/// Opens two parallel files as an orientation-normalised paired stream.
pub fn paired_easy_stream(
    left: impl AsRef<Path>,
    right: impl AsRef<Path>,
    insert_size: usize,
    orientation: LibraryOrientation,
    offset: PhredOffset,
) -> Result<PairedStreamBox> {
    let l = FileReadStream::open(left, offset)?;
    let r = FileReadStream::open(right, offset)?;
    let paired = SeparatePairedReadStream::new(l, r, insert_size);
    Ok(Box::new(OrientationChangingWrapper::new(paired, orientation)))
}
