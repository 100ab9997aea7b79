//! Background-thread prefetch for file-backed streams.
//!
//! The aligner core is synchronous; the only asynchrony in the pipeline is
//! this optional stage, which moves file parsing onto its own thread and
//! hands records over a bounded channel so a slow disk cannot stall workers.

use std::sync::mpsc::{sync_channel, Receiver};
use std::thread::JoinHandle;

use mayfly_common::Result;

use crate::read::SingleRead;

/// Records buffered ahead of the consumer.
const CHANNEL_CAPACITY: usize = 256;

/// Wraps any `Send` read stream, draining it on a background thread.
pub struct AsyncReadStream {
    rx: Receiver<Result<SingleRead>>,
    handle: Option<JoinHandle<()>>,
}

impl AsyncReadStream {
    pub fn spawn<S>(stream: S) -> Self
    where
        S: Iterator<Item = Result<SingleRead>> + Send + 'static,
    {
        let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
        let handle = std::thread::spawn(move || {
            for item in stream {
                // Receiver dropped: stop reading.
                if tx.send(item).is_err() {
                    break;
                }
            }
        });
        AsyncReadStream {
            rx,
            handle: Some(handle),
        }
    }
}

impl Iterator for AsyncReadStream {
    type Item = Result<SingleRead>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

impl Drop for AsyncReadStream {
    fn drop(&mut self) {
        // Dropping the receiver makes the producer's next send fail, so the
        // thread exits and can be reaped.
        if let Some(handle) = self.handle.take() {
            let (_tx, dummy) = sync_channel(1);
            drop(std::mem::replace(&mut self.rx, dummy));
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefetch_preserves_order() {
        let reads: Vec<Result<SingleRead>> = (0..1000)
            .map(|i| Ok(SingleRead::new(format!("r{i}"), b"ACGT".to_vec())))
            .collect();
        let out: Vec<_> = AsyncReadStream::spawn(reads.into_iter())
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(out.len(), 1000);
        assert_eq!(out[17].name, "r17");
        assert_eq!(out[999].name, "r999");
    }

    #[test]
    fn dropping_consumer_stops_producer() {
        let reads: Vec<Result<SingleRead>> = (0..100_000)
            .map(|i| Ok(SingleRead::new(format!("r{i}"), b"A".to_vec())))
            .collect();
        let mut stream = AsyncReadStream::spawn(reads.into_iter());
        let _ = stream.next();
        drop(stream); // must not deadlock
    }
}
