//! Two-task descrambling pipeline.
//!
//! A dedicated reader thread fills ring frames from the source while the
//! host thread drives the descrambling engine and the destination file. The
//! ring is the only shared mutable state; the source descriptor belongs to
//! the reader, the engine and destination descriptor to the writer.

mod reader;
mod ring;
mod writer;

pub use ring::{DEFAULT_RING_FRAMES, FRAME_CAPACITY};

use crate::progress::Progress;
use anyhow::{Context, Result};
use log::debug;
use reader::ChunkSource;
use ring::FrameRing;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arib_b25::Descrambler;

/// Aggregate accounting for one run, reported after the pipeline ends.
/// Purely observational; nothing here feeds back into control flow.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Scrambled bytes consumed by the writer, in source order.
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub frames: u64,
    pub read_time: Duration,
    pub decode_time: Duration,
    pub write_time: Duration,
    /// The run was stopped by a [`Canceller`] before end of stream.
    pub cancelled: bool,
}

/// Cancellation handle; safe to trigger from a signal handler.
#[derive(Clone)]
pub struct Canceller(Arc<FrameRing>);

impl Canceller {
    pub fn cancel(&self) {
        self.0.cancel();
    }
}

pub struct Pipeline {
    ring: Arc<FrameRing>,
    verbose: bool,
}

impl Pipeline {
    pub fn new(frames: usize) -> Self {
        Self {
            ring: Arc::new(FrameRing::new(frames)),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn canceller(&self) -> Canceller {
        Canceller(Arc::clone(&self.ring))
    }

    /// Descramble `src` into `dst` through `engine`.
    ///
    /// Both files are opened before any task starts, so a setup failure
    /// leaves no partial pipeline behind. Every other failure still joins
    /// the reader and runs the engine flush before surfacing.
    pub fn run(&self, src: &Path, dst: &Path, engine: &mut dyn Descrambler) -> Result<RunStats> {
        let mut source = File::open(src)
            .with_context(|| format!("failed to open {} [src]", src.display()))?;
        let total = source
            .metadata()
            .with_context(|| format!("failed to stat {} [src]", src.display()))?
            .len();
        let mut dest = File::create(dst)
            .with_context(|| format!("failed to create {} [dst]", dst.display()))?;

        self.run_io(&mut source, total, &mut dest, engine)
    }

    fn run_io(
        &self,
        source: &mut (dyn ChunkSource + Send),
        total: u64,
        dest: &mut dyn Write,
        engine: &mut dyn Descrambler,
    ) -> Result<RunStats> {
        let ring = &*self.ring;
        let mut progress = self.verbose.then(|| Progress::new(total));

        let (write_result, reader_report, was_cancelled) = thread::scope(|scope| {
            let producer = scope.spawn(|| reader::run(source, ring));

            let write_result = writer::run(ring, engine, dest, progress.as_mut());

            // Record external cancellation before unblocking the reader,
            // which reuses the same flag.
            let was_cancelled = ring.cancelled();
            ring.cancel();
            let reader_report = producer.join().expect("reader thread panicked");

            (write_result, reader_report, was_cancelled)
        });

        let report = write_result?;

        // Force out whatever the engine still buffers, even after a reader
        // failure or cancellation.
        engine.flush()?;
        let clear = engine.get()?;
        let mut bytes_written = report.bytes_out;
        if !clear.is_empty() {
            dest.write_all(&clear)
                .context("failed to write output while flushing")?;
            bytes_written += clear.len() as u64;
        }
        ring.finish();
        debug!("pipeline finished: status {:?}", ring.status());

        if let Some(pb) = progress.as_mut() {
            pb.finish();
        }

        if let Some(e) = reader_report.error {
            return Err(anyhow::Error::new(e).context("failed to read source"));
        }

        Ok(RunStats {
            bytes_read: report.bytes_in,
            bytes_written,
            frames: report.frames,
            read_time: reader_report.read_time,
            decode_time: report.decode_time,
            write_time: report.write_time,
            cancelled: was_cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arib_b25::passthrough::PassthroughDescrambler;
    use arib_b25::{B25Config, B25Error, ProgramInfo};
    use std::fs;
    use tempfile::TempDir;

    fn engine() -> PassthroughDescrambler {
        PassthroughDescrambler::new(B25Config::default())
    }

    /// Pseudo transport stream, deterministic and larger than the ring so
    /// every slot gets reused several times.
    fn sample_stream(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn round_trips_bytes_in_order() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scrambled.m2t");
        let dst = dir.path().join("clear.m2t");

        // Not a multiple of the packet size, so the flush path runs too.
        let input = sample_stream(DEFAULT_RING_FRAMES * FRAME_CAPACITY * 3 + 1000);
        fs::write(&src, &input).unwrap();

        let mut engine = engine();
        let pipeline = Pipeline::new(DEFAULT_RING_FRAMES);
        let stats = pipeline.run(&src, &dst, &mut engine).unwrap();

        assert_eq!(stats.bytes_read, input.len() as u64);
        assert_eq!(stats.bytes_written, input.len() as u64);
        assert!(!stats.cancelled);
        assert_eq!(fs::read(&dst).unwrap(), input);
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scrambled.m2t");
        fs::write(&src, sample_stream(40_000)).unwrap();

        let outputs: Vec<_> = (0..2)
            .map(|i| {
                let dst = dir.path().join(format!("clear-{i}.m2t"));
                let mut engine = engine();
                Pipeline::new(4).run(&src, &dst, &mut engine).unwrap();
                fs::read(&dst).unwrap()
            })
            .collect();
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn empty_source_finishes_cleanly() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("empty.m2t");
        let dst = dir.path().join("clear.m2t");
        fs::write(&src, b"").unwrap();

        let mut engine = engine();
        let stats = Pipeline::new(DEFAULT_RING_FRAMES)
            .run(&src, &dst, &mut engine)
            .unwrap();

        assert_eq!(stats.frames, 0);
        assert_eq!(stats.bytes_written, 0);
        assert_eq!(fs::read(&dst).unwrap(), b"");
    }

    #[test]
    fn unwritable_destination_fails_during_setup() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scrambled.m2t");
        fs::write(&src, sample_stream(1000)).unwrap();
        let dst = dir.path().join("missing-dir").join("clear.m2t");

        let mut engine = engine();
        let err = Pipeline::new(DEFAULT_RING_FRAMES)
            .run(&src, &dst, &mut engine)
            .unwrap_err();
        assert!(err.to_string().contains("[dst]"));
        assert!(!dst.exists());
    }

    #[test]
    fn missing_source_fails_during_setup() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine();
        let err = Pipeline::new(DEFAULT_RING_FRAMES)
            .run(
                &dir.path().join("nope.m2t"),
                &dir.path().join("clear.m2t"),
                &mut engine,
            )
            .unwrap_err();
        assert!(err.to_string().contains("[src]"));
    }

    struct FailingEngine;

    impl Descrambler for FailingEngine {
        fn put(&mut self, _data: &[u8]) -> Result<(), B25Error> {
            Err(B25Error::descramble("put", -2))
        }

        fn get(&mut self) -> Result<Vec<u8>, B25Error> {
            Ok(Vec::new())
        }

        fn flush(&mut self) -> Result<(), B25Error> {
            Ok(())
        }

        fn programs(&self) -> Vec<ProgramInfo> {
            Vec::new()
        }
    }

    #[test]
    fn engine_failure_aborts_and_unblocks_the_reader() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scrambled.m2t");
        let dst = dir.path().join("clear.m2t");
        // Enough data to park the reader on a full ring.
        fs::write(&src, sample_stream(DEFAULT_RING_FRAMES * FRAME_CAPACITY * 2)).unwrap();

        let mut engine = FailingEngine;
        let err = Pipeline::new(DEFAULT_RING_FRAMES)
            .run(&src, &dst, &mut engine)
            .unwrap_err();
        assert!(err.to_string().contains("put"));
    }

    // Cancellation has no EOF or error counterpart; it must stop the run
    // early without turning into a failure.
    #[test]
    fn cancelled_pipeline_stops_without_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("scrambled.m2t");
        let dst = dir.path().join("clear.m2t");
        fs::write(&src, sample_stream(FRAME_CAPACITY * 4)).unwrap();

        let pipeline = Pipeline::new(DEFAULT_RING_FRAMES);
        pipeline.canceller().cancel();

        let mut engine = engine();
        let stats = pipeline.run(&src, &dst, &mut engine).unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.frames, 0);
    }
}
