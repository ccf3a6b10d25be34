//! Producer side of the pipeline: pulls source bytes into ring frames.

use super::ring::FrameRing;
use log::debug;
use std::fs::File;
use std::io::{self, Read};
use std::time::{Duration, Instant};

/// Bound on one readiness wait, matching the short poll the source
/// descriptor gets per loop iteration.
pub const READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Closed classification of read failures. Transient conditions are retried
/// in place with the frame claim released; fatal ones end the producer.
#[derive(Debug)]
pub enum ReadError {
    Transient,
    Fatal(io::Error),
}

/// A byte source with a bounded-wait read. `Ok(0)` signals end of stream.
///
/// `timeout` caps how long the call may wait for readability on sources that
/// can stall (pipes, capture devices); regular files are always ready and
/// ignore it.
pub trait ChunkSource {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, ReadError>;
}

impl ChunkSource for File {
    fn read_chunk(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, ReadError> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) => match e.kind() {
                io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::TimedOut => Err(ReadError::Transient),
                _ => Err(ReadError::Fatal(e)),
            },
        }
    }
}

/// What the producer did before it stopped.
#[derive(Debug, Default)]
pub struct ReaderReport {
    pub bytes_read: u64,
    pub frames: u64,
    pub read_time: Duration,
    /// Set when the producer stopped on a fatal read error rather than EOF.
    pub error: Option<io::Error>,
}

/// Fill frames in ring order until EOF, a fatal read error, or cancellation.
/// Always leaves the ring draining and the consumer awake on exit.
pub fn run(source: &mut (dyn ChunkSource + Send), ring: &FrameRing) -> ReaderReport {
    let mut report = ReaderReport::default();
    let mut head = 0;

    loop {
        let Some(mut slot) = ring.begin_fill(head) else {
            break; // cancelled
        };

        let started = Instant::now();
        match source.read_chunk(slot.buf_mut(), READ_TIMEOUT) {
            Ok(0) => {
                slot.abort();
                break;
            }
            Ok(n) => {
                report.read_time += started.elapsed();
                slot.commit(n);
                report.bytes_read += n as u64;
                report.frames += 1;
                head = (head + 1) % ring.capacity();
            }
            Err(ReadError::Transient) => {
                // Nothing was claimed as finished, so nothing is lost.
                slot.abort();
            }
            Err(ReadError::Fatal(e)) => {
                slot.abort();
                report.error = Some(e);
                break;
            }
        }
    }

    ring.finish_fill();
    debug!(
        "reader finished: {} frames, {} bytes, occupancy {}",
        report.frames,
        report.bytes_read,
        ring.occupancy()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ring::PipelineStatus;
    use std::collections::VecDeque;
    use std::thread;

    /// Source driven by a script of read outcomes; exhausted script = EOF.
    struct ScriptedSource {
        script: VecDeque<Result<Vec<u8>, ReadError>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<u8>, ReadError>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl ChunkSource for ScriptedSource {
        fn read_chunk(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, ReadError> {
            match self.script.pop_front() {
                Some(Ok(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn transient_errors_lose_no_frames() {
        let ring = FrameRing::with_frame_capacity(4, 16);
        let mut source = ScriptedSource::new(vec![
            Ok(vec![1, 2, 3]),
            Err(ReadError::Transient),
            Err(ReadError::Transient),
            Ok(vec![4, 5]),
        ]);

        let report = run(&mut source, &ring);
        assert_eq!(report.frames, 2);
        assert_eq!(report.bytes_read, 5);
        assert!(report.error.is_none());
        assert_eq!(ring.status(), PipelineStatus::Draining);

        // Frames arrive in read order with the transient gaps invisible.
        let slot = ring.begin_consume(0).unwrap();
        assert_eq!(slot.bytes(), &[1, 2, 3]);
        slot.release();
        let slot = ring.begin_consume(1).unwrap();
        assert_eq!(slot.bytes(), &[4, 5]);
        slot.release();
        assert!(ring.begin_consume(2).is_none());
    }

    #[test]
    fn empty_source_drains_immediately() {
        let ring = FrameRing::with_frame_capacity(4, 16);
        let mut source = ScriptedSource::new(vec![]);

        let report = run(&mut source, &ring);
        assert_eq!(report.frames, 0);
        assert_eq!(ring.occupancy(), 0);
        assert!(ring.begin_consume(0).is_none());
    }

    #[test]
    fn fatal_error_reports_and_drains() {
        let ring = FrameRing::with_frame_capacity(4, 16);
        let mut source = ScriptedSource::new(vec![
            Ok(vec![7; 16]),
            Err(ReadError::Fatal(io::Error::other("bad sector"))),
        ]);

        let report = run(&mut source, &ring);
        assert!(report.error.is_some());
        assert_eq!(report.frames, 1);

        // The filled frame is still served before the consumer stops.
        let slot = ring.begin_consume(0).unwrap();
        assert_eq!(slot.len(), 16);
        slot.release();
        assert!(ring.begin_consume(1).is_none());
    }

    #[test]
    fn wraps_the_ring_under_backpressure() {
        let ring = FrameRing::with_frame_capacity(2, 16);
        let chunks: Vec<_> = (0..6u8).map(|i| Ok(vec![i; 4])).collect();
        let mut source = ScriptedSource::new(chunks);

        thread::scope(|scope| {
            let producer = scope.spawn(|| run(&mut source, &ring));

            for i in 0..6u8 {
                let slot = ring.begin_consume(i as usize % 2).unwrap();
                assert_eq!(slot.bytes(), &[i; 4]);
                slot.release();
            }
            assert!(ring.begin_consume(0).is_none());

            let report = producer.join().unwrap();
            assert_eq!(report.frames, 6);
        });
    }
}
