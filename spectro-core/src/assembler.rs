//! # Frame Assembler
//!
//! Collects decoded samples into one fixed-length frame across however many
//! partial deliveries the driver hands out. The assembler is the consumer
//! side of the buffer-ready notification:
//!
//! 1. wait for the notification
//! 2. `read` exactly the bytes still missing into the staging buffer
//! 3. decode every complete result word, drop foreign-channel samples
//! 4. carry a trailing partial word over to the next read
//!
//! The notification is only a hint. Any number of interrupts may have fired
//! before a wake, and a wake may find nothing to read; the byte count returned
//! by `read` is the only thing that advances the frame.
//!
//! Samples carrying the wrong channel tag are discarded *and replaced*: the
//! assembler keeps reading until it holds N valid samples, so no slot of the
//! frame ever keeps a value from the previous iteration.

use tracing::{debug, trace, warn};

use crate::acquisition::{AcquisitionChannel, ReadStatus, SampleFormat};
use crate::error::AssembleError;
use crate::notify::Notification;

/// Running counters, kept across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub frames: u64,
    /// Samples discarded for carrying a foreign channel tag.
    pub dropped_samples: u64,
    /// Reads that reported a store overflow.
    pub overflows: u64,
    /// Reads that found no data.
    pub timeouts: u64,
    /// Wakes whose read returned zero bytes.
    pub empty_wakes: u64,
}

/// Result of a bounded fill attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillProgress {
    Complete,
    /// The wake budget ran out; `filled` samples are kept for the next call.
    Incomplete { filled: usize },
}

pub struct FrameAssembler {
    format: SampleFormat,
    channel: u8,
    frame: Box<[f32]>,
    filled: usize,
    /// Raw bytes of up to one frame, including a carried partial word.
    staging: Box<[u8]>,
    carried: usize,
    stats: AssemblerStats,
}

impl FrameAssembler {
    /// Allocates the frame and staging buffers for `frame_length` samples.
    pub fn new(frame_length: usize, format: SampleFormat, channel: u8) -> Self {
        Self {
            format,
            channel,
            frame: vec![0.0; frame_length].into_boxed_slice(),
            filled: 0,
            staging: vec![0; frame_length * format.width()].into_boxed_slice(),
            carried: 0,
            stats: AssemblerStats::default(),
        }
    }

    pub fn frame_length(&self) -> usize {
        self.frame.len()
    }

    /// Samples collected so far for the frame in progress.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Blocks until a full frame is assembled and returns it.
    ///
    /// # Returns
    /// A slice of exactly `frame_length` samples, valid until the next fill,
    /// or an error when the channel stops or every notifier is dropped.
    pub fn fill<C>(
        &mut self,
        channel: &mut C,
        notification: &Notification,
    ) -> Result<&[f32], AssembleError>
    where
        C: AcquisitionChannel + ?Sized,
    {
        loop {
            if let FillProgress::Complete = self.fill_bounded(channel, notification, usize::MAX)? {
                return Ok(self.take_frame());
            }
        }
    }

    /// Like [`fill`](Self::fill) but gives up after `max_wakes` notifications.
    ///
    /// # Arguments
    /// * `channel` - Channel to read from; every wake is followed by one read.
    /// * `notification` - Wake source, waited on before each read.
    /// * `max_wakes` - Upper bound on waits for this call.
    ///
    /// # Returns
    /// [`FillProgress::Complete`] once `frame_length` valid samples are held;
    /// the frame is then available from [`take_frame`](Self::take_frame).
    /// [`FillProgress::Incomplete`] when the budget runs out; progress is kept
    /// for the next call.
    pub fn fill_bounded<C>(
        &mut self,
        channel: &mut C,
        notification: &Notification,
        max_wakes: usize,
    ) -> Result<FillProgress, AssembleError>
    where
        C: AcquisitionChannel + ?Sized,
    {
        let n = self.frame.len();
        let width = self.format.width();
        let mut wakes = 0;

        while self.filled < n {
            if wakes == max_wakes {
                return Ok(FillProgress::Incomplete {
                    filled: self.filled,
                });
            }
            notification.wait()?;
            wakes += 1;

            let wanted = (n - self.filled) * width - self.carried;
            let outcome = channel.read(&mut self.staging[self.carried..self.carried + wanted]);
            match outcome.status {
                ReadStatus::Ok => {}
                ReadStatus::BufferFull => {
                    self.stats.overflows += 1;
                    warn!("converter store overflowed, samples were lost");
                }
                ReadStatus::Timeout => {
                    self.stats.timeouts += 1;
                    warn!("converter reports no data available");
                }
                ReadStatus::InvalidState => return Err(AssembleError::ChannelNotRunning),
            }
            if outcome.bytes == 0 {
                self.stats.empty_wakes += 1;
                continue;
            }
            trace!(bytes = outcome.bytes, filled = self.filled, "read");
            self.decode(self.carried + outcome.bytes);
        }
        Ok(FillProgress::Complete)
    }

    /// Hands out the completed frame and starts the next one.
    ///
    /// Only meaningful right after [`FillProgress::Complete`]; the frame
    /// contents stay valid until the next fill call.
    pub fn take_frame(&mut self) -> &[f32] {
        debug_assert_eq!(self.filled, self.frame.len());
        self.filled = 0;
        self.stats.frames += 1;
        debug!(
            frame = self.stats.frames,
            dropped = self.stats.dropped_samples,
            "frame assembled"
        );
        &self.frame
    }

    /// Decodes the first `available` staging bytes into the frame.
    fn decode(&mut self, available: usize) {
        let width = self.format.width();
        let whole = available - available % width;

        for word in self.staging[..whole].chunks_exact(width) {
            let sample = self.format.decode(word);
            if sample.channel != self.channel {
                self.stats.dropped_samples += 1;
                warn!(
                    expected = self.channel,
                    got = sample.channel,
                    "dropping sample with foreign channel tag"
                );
                continue;
            }
            self.frame[self.filled] = f32::from(sample.code);
            self.filled += 1;
        }

        self.carried = available - whole;
        self.staging.copy_within(whole..available, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{ChannelConfig, ConvDoneCallback, ReadOutcome, Sample};
    use crate::error::AcquisitionError;
    use crate::notify::{self, Notifier};
    use std::collections::VecDeque;

    /// Serves a fixed byte stream in scripted chunk sizes and re-raises the
    /// notification on every read, like a converter that keeps interrupting.
    struct ScriptedChannel {
        config: ChannelConfig,
        bytes: Vec<u8>,
        pos: usize,
        chunks: VecDeque<usize>,
        notifier: Notifier,
        reads: usize,
    }

    impl ScriptedChannel {
        fn new(config: ChannelConfig, bytes: Vec<u8>, chunks: &[usize], notifier: Notifier) -> Self {
            notifier.signal();
            Self {
                config,
                bytes,
                pos: 0,
                chunks: chunks.iter().copied().collect(),
                notifier,
                reads: 0,
            }
        }
    }

    impl AcquisitionChannel for ScriptedChannel {
        fn config(&self) -> &ChannelConfig {
            &self.config
        }

        fn register_callback(&mut self, _: ConvDoneCallback) -> Result<(), AcquisitionError> {
            Ok(())
        }

        fn start(&mut self) -> Result<(), AcquisitionError> {
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AcquisitionError> {
            Ok(())
        }

        fn read(&mut self, out: &mut [u8]) -> ReadOutcome {
            self.reads += 1;
            self.notifier.signal();
            let chunk = self.chunks.pop_front().unwrap_or(usize::MAX);
            let n = chunk.min(out.len()).min(self.bytes.len() - self.pos);
            out[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            let status = if n == 0 {
                ReadStatus::Timeout
            } else {
                ReadStatus::Ok
            };
            ReadOutcome::new(n, status)
        }
    }

    fn encode(format: SampleFormat, samples: &[Sample]) -> Vec<u8> {
        let mut out = vec![0; samples.len() * format.width()];
        for (s, word) in samples.iter().zip(out.chunks_exact_mut(format.width())) {
            format.encode(*s, word);
        }
        out
    }

    fn ramp(len: usize, channel: u8) -> Vec<Sample> {
        (0..len)
            .map(|i| Sample {
                channel,
                code: (i * 37 % 4096) as u16,
            })
            .collect()
    }

    fn assemble(format: SampleFormat, bytes: Vec<u8>, chunks: &[usize], n: usize) -> Vec<f32> {
        let config = ChannelConfig {
            sample_format: format,
            ..Default::default()
        };
        let (notifier, notification) = notify::pair();
        let mut channel = ScriptedChannel::new(config, bytes, chunks, notifier);
        let mut assembler = FrameAssembler::new(n, format, 2);
        assembler.fill(&mut channel, &notification).unwrap().to_vec()
    }

    #[test]
    fn any_chunking_yields_identical_frame() {
        let n = 64;
        for format in [SampleFormat::Type1, SampleFormat::Type2] {
            let bytes = encode(format, &ramp(n, 2));
            let whole = assemble(format, bytes.clone(), &[], n);
            let expected: Vec<f32> = ramp(n, 2).iter().map(|s| f32::from(s.code)).collect();
            assert_eq!(whole, expected);

            // zero-length reads, single bytes, partial words, uneven sizes
            let chunked = assemble(format, bytes, &[0, 1, 0, 3, 5, 0, 0, 7, 1, 2, 13, 64], n);
            assert_eq!(chunked, whole);
        }
    }

    #[test]
    fn foreign_samples_are_replaced_not_left_stale() {
        let n = 16;
        let format = SampleFormat::Type2;
        let mut samples = ramp(n, 2);
        samples.insert(3, Sample { channel: 7, code: 4000 });
        samples.insert(9, Sample { channel: 0, code: 4001 });
        let bytes = encode(format, &samples);

        let (notifier, notification) = notify::pair();
        let config = ChannelConfig::default();
        let mut channel = ScriptedChannel::new(config, bytes, &[], notifier);
        let mut assembler = FrameAssembler::new(n, format, 2);

        let frame = assembler.fill(&mut channel, &notification).unwrap().to_vec();
        let expected: Vec<f32> = ramp(n, 2).iter().map(|s| f32::from(s.code)).collect();
        assert_eq!(frame, expected);
        assert_eq!(assembler.stats().dropped_samples, 2);
        assert_eq!(assembler.stats().frames, 1);
    }

    #[test]
    fn never_completes_when_reads_stay_empty() {
        let (notifier, notification) = notify::pair();
        let mut channel = ScriptedChannel::new(ChannelConfig::default(), vec![], &[], notifier);
        let mut assembler = FrameAssembler::new(32, SampleFormat::Type2, 2);

        let progress = assembler
            .fill_bounded(&mut channel, &notification, 100)
            .unwrap();
        assert_eq!(progress, FillProgress::Incomplete { filled: 0 });
        // one read per wake: no spinning between notifications
        assert_eq!(channel.reads, 100);
        assert_eq!(assembler.stats().empty_wakes, 100);
        assert_eq!(assembler.stats().timeouts, 100);
    }

    #[test]
    fn progress_survives_an_exhausted_budget() {
        let n = 8;
        let format = SampleFormat::Type1;
        let bytes = encode(format, &ramp(n, 2));
        let (notifier, notification) = notify::pair();
        let mut channel =
            ScriptedChannel::new(ChannelConfig::default(), bytes, &[4, 3, 0, 9], notifier);
        let mut assembler = FrameAssembler::new(n, format, 2);

        let first = assembler.fill_bounded(&mut channel, &notification, 2).unwrap();
        // 7 bytes: three whole words plus one carried byte
        assert_eq!(first, FillProgress::Incomplete { filled: 3 });
        assert_eq!(assembler.filled(), 3);

        let second = assembler.fill_bounded(&mut channel, &notification, 10).unwrap();
        assert_eq!(second, FillProgress::Complete);
        let frame = assembler.take_frame().to_vec();
        let expected: Vec<f32> = ramp(n, 2).iter().map(|s| f32::from(s.code)).collect();
        assert_eq!(frame, expected);
        assert_eq!(assembler.filled(), 0);
    }

    #[test]
    fn stopped_channel_is_fatal() {
        struct Stopped(ChannelConfig);
        impl AcquisitionChannel for Stopped {
            fn config(&self) -> &ChannelConfig {
                &self.0
            }
            fn register_callback(&mut self, _: ConvDoneCallback) -> Result<(), AcquisitionError> {
                Ok(())
            }
            fn start(&mut self) -> Result<(), AcquisitionError> {
                Ok(())
            }
            fn stop(&mut self) -> Result<(), AcquisitionError> {
                Ok(())
            }
            fn read(&mut self, _: &mut [u8]) -> ReadOutcome {
                ReadOutcome::new(0, ReadStatus::InvalidState)
            }
        }

        let (notifier, notification) = notify::pair();
        notifier.signal();
        let mut channel = Stopped(ChannelConfig::default());
        let mut assembler = FrameAssembler::new(4, SampleFormat::Type2, 2);
        assert!(matches!(
            assembler.fill(&mut channel, &notification),
            Err(AssembleError::ChannelNotRunning)
        ));
    }
}
