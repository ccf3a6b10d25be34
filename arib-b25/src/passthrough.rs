//! Software engine that forwards transport-stream bytes unmodified.
//!
//! It keeps the contract of a real engine: input is consumed in arbitrary
//! chunk sizes but output is released only on whole packet boundaries, so a
//! `get` right after a `put` may legitimately return nothing. The partial
//! packet tail stays buffered until `flush`.

use crate::{B25Config, B25Error, Descrambler, ProgramInfo, TS_PACKET_SIZE};

pub struct PassthroughDescrambler {
    config: B25Config,
    pending: Vec<u8>,
    ready: Vec<u8>,
    total_packets: i64,
    flushed: bool,
}

impl PassthroughDescrambler {
    pub fn new(config: B25Config) -> Self {
        Self {
            config,
            pending: Vec::new(),
            ready: Vec::new(),
            total_packets: 0,
            flushed: false,
        }
    }

    pub fn config(&self) -> &B25Config {
        &self.config
    }

    /// Move every complete packet from `pending` into `ready`.
    fn repack(&mut self) {
        let whole = (self.pending.len() / TS_PACKET_SIZE) * TS_PACKET_SIZE;
        if whole > 0 {
            self.total_packets += (whole / TS_PACKET_SIZE) as i64;
            self.ready.extend(self.pending.drain(..whole));
        }
    }
}

impl Descrambler for PassthroughDescrambler {
    fn put(&mut self, data: &[u8]) -> Result<(), B25Error> {
        if self.flushed {
            return Err(B25Error::descramble("put", -1));
        }
        self.pending.extend_from_slice(data);
        self.repack();
        Ok(())
    }

    fn get(&mut self) -> Result<Vec<u8>, B25Error> {
        Ok(std::mem::take(&mut self.ready))
    }

    fn flush(&mut self) -> Result<(), B25Error> {
        self.repack();
        self.ready.append(&mut self.pending);
        self.flushed = true;
        Ok(())
    }

    fn programs(&self) -> Vec<ProgramInfo> {
        vec![ProgramInfo {
            program_number: 0,
            ecm_unpurchased_count: 0,
            last_ecm_error_code: 0,
            undecrypted_packet_count: 0,
            total_packet_count: self.total_packets,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_releases_whole_packets_only() {
        let mut engine = PassthroughDescrambler::new(B25Config::default());

        engine.put(&[0x47; 100]).unwrap();
        assert!(engine.get().unwrap().is_empty());

        engine.put(&[0x47; 100]).unwrap();
        assert_eq!(engine.get().unwrap().len(), TS_PACKET_SIZE);
        assert!(engine.get().unwrap().is_empty());
    }

    #[test]
    fn flush_releases_partial_tail() {
        let mut engine = PassthroughDescrambler::new(B25Config::default());

        engine.put(&[0x47; TS_PACKET_SIZE + 17]).unwrap();
        assert_eq!(engine.get().unwrap().len(), TS_PACKET_SIZE);

        engine.flush().unwrap();
        assert_eq!(engine.get().unwrap().len(), 17);
        assert!(engine.put(&[0x47]).is_err());
    }

    #[test]
    fn counts_packets_across_puts() {
        let mut engine = PassthroughDescrambler::new(B25Config::default());

        for _ in 0..5 {
            engine.put(&[0x47; TS_PACKET_SIZE]).unwrap();
        }
        engine.get().unwrap();

        let programs = engine.programs();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].total_packet_count, 5);
    }
}
