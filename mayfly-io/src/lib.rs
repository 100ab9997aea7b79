//! Sequence read streams for mayfly-asm
//!
//! The input surface of the aligner:
//! - `FileReadStream` - FASTA/FASTQ records off disk
//! - wrappers - longest-valid splitting, reverse-complement doubling,
//!   paired-read composition, orientation fix-up
//! - `AsyncReadStream` - background-thread prefetch over a bounded channel
//!
//! Streams are plain `Iterator`s over `Result<SingleRead>`; composition order
//! matters and `easy_stream` applies the canonical one
//! (file -> longest-valid -> reverse-complement).

pub mod prefetch;
pub mod read;
pub mod stream;
pub mod wrappers;

pub use prefetch::AsyncReadStream;
pub use read::{PairedRead, SingleRead};
pub use stream::{FileReadStream, PhredOffset, ReadStreamBox};
pub use wrappers::{
    easy_stream, paired_easy_stream, InterleavingPairedReadStream, LibraryOrientation,
    LongestValidWrap, OrientationChangingWrapper, PairedStreamBox, RcWrap,
    SeparatePairedReadStream,
};
