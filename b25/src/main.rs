mod args;
mod logger;
mod pipeline;
mod progress;
mod report;

use anyhow::Result;
use args::Args;
use arib_b25::passthrough::PassthroughDescrambler;
use arib_b25::{B25Config, NullCard};
use clap::Parser;
use colored::Colorize;
use log::warn;
use pipeline::{DEFAULT_RING_FRAMES, Pipeline};
use std::process;

fn run() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose != 0);

    // Engine and card stand-ins; a card-backed engine slots in behind the
    // same traits.
    let card = NullCard;
    let mut engine = PassthroughDescrambler::new(B25Config {
        round: args.round,
        strip: args.strip != 0,
        emm: args.emm != 0,
    });

    let pipeline = Pipeline::new(DEFAULT_RING_FRAMES).verbose(args.verbose != 0);

    let canceller = pipeline.canceller();
    ctrlc::set_handler(move || {
        warn!("interrupt received, stopping after the ring drains.");
        canceller.cancel();
    })?;

    let stats = pipeline.run(&args.src, &args.dst, &mut engine)?;

    if stats.cancelled {
        warn!("run stopped before end of stream");
    }

    report::warn_unpurchased(&engine);
    if args.power_ctrl != 0 {
        report::show_power_on_control(&card)?;
    }
    report::timing_summary(&stats);

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".bold().red(), e);
        process::exit(1);
    }
}
