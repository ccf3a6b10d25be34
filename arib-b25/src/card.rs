use crate::B25Error;

/// One EMM receiving request stored on the card.
#[derive(Debug, Clone, Copy)]
pub struct PowerOnControlEntry {
    pub broadcaster_group_id: u8,
    pub network_id: u16,
    pub transport_id: u16,
    /// Validity window start, (year, month, day).
    pub start: (u16, u8, u8),
    /// Validity window end, (year, month, day).
    pub end: (u16, u8, u8),
    /// Minimum power-on hold time in hours.
    pub hold_time: u8,
}

/// A B-CAS card service.
///
/// Construction performs card initialization; release is `Drop`. The engine
/// holds the card for ECM/EMM exchanges internally, the pipeline only queries
/// the power-on control report after a run.
pub trait CardReader {
    fn power_on_control_info(&self) -> Result<Vec<PowerOnControlEntry>, B25Error>;
}

/// Card service stand-in used when no reader hardware is attached.
#[derive(Debug, Default)]
pub struct NullCard;

impl CardReader for NullCard {
    fn power_on_control_info(&self) -> Result<Vec<PowerOnControlEntry>, B25Error> {
        Ok(Vec::new())
    }
}
