//! Driver-owned store buffer.
//!
//! The producer side collects encoded result words into a conversion frame
//! and, once the frame is complete, moves it into an `rtrb` ring buffer and
//! fires the conversion-done callback. When the ring has no room the frame is
//! dropped and an overflow flag is raised for the next read to report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rtrb::{Consumer, Producer, RingBuffer};

use super::{ConvDoneCallback, ConvDoneEvent, ReadOutcome, ReadStatus};

pub(crate) struct StoreWriter {
    producer: Producer<u8>,
    overflow: Arc<AtomicBool>,
    frame: Vec<u8>,
    conv_frame_size: usize,
    capacity: usize,
    callback: Option<ConvDoneCallback>,
}

pub(crate) struct StoreReader {
    consumer: Consumer<u8>,
    overflow: Arc<AtomicBool>,
}

/// Creates a store holding `capacity` bytes, delivered in `conv_frame_size`
/// byte conversion frames.
pub(crate) fn store(
    capacity: usize,
    conv_frame_size: usize,
    callback: Option<ConvDoneCallback>,
) -> (StoreWriter, StoreReader) {
    let (producer, consumer) = RingBuffer::new(capacity);
    let overflow = Arc::new(AtomicBool::new(false));
    (
        StoreWriter {
            producer,
            overflow: overflow.clone(),
            frame: Vec::with_capacity(conv_frame_size),
            conv_frame_size,
            capacity,
            callback,
        },
        StoreReader { consumer, overflow },
    )
}

impl StoreWriter {
    /// Appends one encoded word; publishes the conversion frame when full.
    pub fn push_word(&mut self, word: &[u8]) {
        self.frame.extend_from_slice(word);
        if self.frame.len() >= self.conv_frame_size {
            self.publish();
        }
    }

    /// Free space in the ring, in bytes.
    pub fn free(&self) -> usize {
        self.producer.slots()
    }

    pub fn conv_frame_size(&self) -> usize {
        self.conv_frame_size
    }

    /// Bytes published and not yet read.
    pub fn pending(&self) -> usize {
        self.capacity - self.producer.slots()
    }

    /// Fires the callback again for data already in the ring, the way the
    /// converter keeps interrupting while its store holds unread results.
    pub fn raise(&self) {
        let pending = self.pending();
        if pending == 0 {
            return;
        }
        if let Some(callback) = &self.callback {
            callback(ConvDoneEvent { size: pending });
        }
    }

    fn publish(&mut self) {
        let len = self.frame.len();
        match self.producer.write_chunk(len) {
            Ok(mut chunk) => {
                let (first, second) = chunk.as_mut_slices();
                let split = first.len();
                first.copy_from_slice(&self.frame[..split]);
                second.copy_from_slice(&self.frame[split..]);
                chunk.commit_all();
            }
            Err(_) => {
                // Ring full: this conversion frame is lost.
                self.overflow.store(true, Ordering::Release);
            }
        }
        self.frame.clear();
        if let Some(callback) = &self.callback {
            callback(ConvDoneEvent { size: len });
        }
    }
}

impl StoreReader {
    pub fn read(&mut self, out: &mut [u8]) -> ReadOutcome {
        let n = self.consumer.slots().min(out.len());
        let overflowed = self.overflow.swap(false, Ordering::AcqRel);

        let copied = if n == 0 {
            0
        } else {
            match self.consumer.read_chunk(n) {
                Ok(chunk) => {
                    let (first, second) = chunk.as_slices();
                    out[..first.len()].copy_from_slice(first);
                    out[first.len()..n].copy_from_slice(second);
                    chunk.commit_all();
                    n
                }
                Err(_) => 0,
            }
        };

        let status = if overflowed {
            ReadStatus::BufferFull
        } else if copied == 0 && !out.is_empty() {
            ReadStatus::Timeout
        } else {
            ReadStatus::Ok
        };
        ReadOutcome::new(copied, status)
    }
}
