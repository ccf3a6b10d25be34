//! Service contracts for ARIB STD-B25 descrambling.
//!
//! The descrambling engine (MULTI2 cipher, ECM/EMM handling) and the physical
//! B-CAS card driver live behind the [`Descrambler`] and [`CardReader`] traits.
//! This crate only defines the request/response surface the pipeline talks to,
//! plus a software [`PassthroughDescrambler`](passthrough::PassthroughDescrambler)
//! that forwards transport-stream packets unmodified when no card-backed engine
//! is available.

mod card;
mod error;
pub mod passthrough;

pub use card::{CardReader, NullCard, PowerOnControlEntry};
pub use error::B25Error;

/// Length of one MPEG transport-stream packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Engine configuration collected from the command line.
#[derive(Debug, Clone, Copy)]
pub struct B25Config {
    /// MULTI2 descramble round count.
    pub round: i32,
    /// Strip null (padding) packets from the output.
    pub strip: bool,
    /// Forward EMM messages to the card.
    pub emm: bool,
}

impl Default for B25Config {
    fn default() -> Self {
        Self {
            round: 4,
            strip: false,
            emm: false,
        }
    }
}

/// Per-program statistics reported by the engine after a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramInfo {
    pub program_number: i32,
    pub ecm_unpurchased_count: i32,
    pub last_ecm_error_code: u16,
    pub undecrypted_packet_count: i64,
    pub total_packet_count: i64,
}

/// A stateful, order-sensitive descrambling engine.
///
/// `put` accepts scrambled transport-stream bytes in file order; `get` drains
/// whatever clear bytes the engine has finished with. The two run on different
/// cadences: the engine may buffer across several puts before a get returns
/// anything, and an empty `get` result is not an error. `flush` forces out the
/// residue at end of stream. Releasing the engine is `Drop`.
pub trait Descrambler {
    fn put(&mut self, data: &[u8]) -> Result<(), B25Error>;
    fn get(&mut self) -> Result<Vec<u8>, B25Error>;
    fn flush(&mut self) -> Result<(), B25Error>;

    /// Statistics for every program seen so far, diagnostic only.
    fn programs(&self) -> Vec<ProgramInfo>;
}
