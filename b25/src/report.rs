//! Post-run reporting: entitlement warnings, power-on control info and
//! timing statistics.

use crate::pipeline::RunStats;
use anyhow::Result;
use arib_b25::{CardReader, Descrambler, PowerOnControlEntry};
use log::{info, warn};

/// One warning block per program the engine could not fully descramble.
pub fn warn_unpurchased(engine: &dyn Descrambler) {
    for pgrm in engine.programs() {
        if pgrm.ecm_unpurchased_count > 0 {
            warn!("unpurchased ECM is detected");
            warn!("  channel:               {}", pgrm.program_number);
            warn!("  unpurchased ECM count: {}", pgrm.ecm_unpurchased_count);
            warn!("  last ECM error code:   {:04x}", pgrm.last_ecm_error_code);
            warn!("  undecrypted TS packet: {}", pgrm.undecrypted_packet_count);
            warn!("  total TS packet:       {}", pgrm.total_packet_count);
        }
    }
}

/// EMM receiving requests stored on the card, printed to stdout.
pub fn show_power_on_control(card: &dyn CardReader) -> Result<()> {
    let entries = card.power_on_control_info()?;

    if entries.is_empty() {
        println!("no EMM receiving request");
        return Ok(());
    }

    println!("total {} EMM receiving request", entries.len());
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "+ [{}] : tune {} between {:04} {:02}/{:02} to {:04} {:02}/{:02} least {} hours",
            i,
            tune_label(entry),
            entry.start.0,
            entry.start.1,
            entry.start.2,
            entry.end.0,
            entry.end.1,
            entry.end.2,
            entry.hold_time,
        );
    }

    Ok(())
}

pub fn timing_summary(stats: &RunStats) {
    info!("descramble time: {:.3}s", stats.decode_time.as_secs_f64());
    info!("read time:       {:.3}s", stats.read_time.as_secs_f64());
    info!("write time:      {:.3}s", stats.write_time.as_secs_f64());
    info!("frames descrambled: {}", stats.frames);
}

fn tune_label(entry: &PowerOnControlEntry) -> String {
    match entry.network_id {
        4 => format!(
            "BS-{}/TS-{}",
            (entry.transport_id >> 4) & 0x1f,
            entry.transport_id & 7
        ),
        6 | 7 => format!(
            "ND-{}/TS-{}",
            (entry.transport_id >> 4) & 0x1f,
            entry.transport_id & 7
        ),
        _ => format!(
            "unknown(b:0x{:02x},n:0x{:04x},t:0x{:04x})",
            entry.broadcaster_group_id, entry.network_id, entry.transport_id
        ),
    }
}
