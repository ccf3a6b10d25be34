//! Consumer side of the pipeline: feeds frames to the descrambling engine
//! and writes out whatever clear bytes it emits.

use super::ring::FrameRing;
use crate::progress::Progress;
use anyhow::{Context, Result};
use arib_b25::Descrambler;
use std::io::Write;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct WriterReport {
    /// Scrambled bytes handed to the engine, in source order.
    pub bytes_in: u64,
    /// Clear bytes written to the destination.
    pub bytes_out: u64,
    pub frames: u64,
    pub decode_time: Duration,
    pub write_time: Duration,
}

/// Consume frames in ring order until the ring drains or is cancelled.
///
/// An engine failure or a short write is fatal and aborts the loop with the
/// frame still claimed; the caller is expected to cancel the ring so the
/// producer cannot stay parked.
pub fn run(
    ring: &FrameRing,
    engine: &mut dyn Descrambler,
    dest: &mut dyn Write,
    mut progress: Option<&mut Progress>,
) -> Result<WriterReport> {
    let mut report = WriterReport::default();
    let mut tail = 0;

    while let Some(slot) = ring.begin_consume(tail) {
        let started = Instant::now();
        engine.put(slot.bytes())?;
        let consumed = slot.len() as u64;

        // The engine has taken the bytes; give the frame back before the
        // write so the producer can refill it in parallel.
        slot.release();

        // An empty result just means the engine is still buffering.
        let clear = engine.get()?;
        report.decode_time += started.elapsed();

        if !clear.is_empty() {
            let started = Instant::now();
            dest.write_all(&clear).context("failed to write output")?;
            report.write_time += started.elapsed();
            report.bytes_out += clear.len() as u64;
        }

        report.frames += 1;
        report.bytes_in += consumed;
        if let Some(pb) = &mut progress {
            pb.update(report.bytes_in);
        }
        tail = (tail + 1) % ring.capacity();
    }

    Ok(report)
}
