//! Bounded ring of fixed-size frames shared by the reader and writer tasks.
//!
//! Each slot cycles through Empty -> Filling -> Filled -> Consuming -> Empty.
//! The producer claims slots in ring order and may not leave Empty while the
//! ring is full; the consumer claims slots in the same order, so bytes leave
//! in the order they arrived. All state transitions happen under one mutex,
//! but a claim guard moves the slot's buffer out first, so the lock is never
//! held across the read or write that touches the bytes.
//!
//! Waking discipline: `notify_one` on normal handoffs (each condvar has at
//! most one waiter, the peer task), `notify_all` on terminal transitions
//! (drain, cancel) so a parked peer can never miss shutdown.

use std::sync::{Condvar, Mutex, MutexGuard};

/// Bytes held by one frame.
pub const FRAME_CAPACITY: usize = 8 * 1024;

/// Frames in the ring unless overridden.
pub const DEFAULT_RING_FRAMES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Empty,
    Filling,
    Filled,
    Consuming,
}

/// Where the pipeline is in its lifecycle. `Draining` means the producer is
/// done (EOF or fatal read error) and the consumer should stop once the ring
/// empties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Running,
    Draining,
    Finished,
}

struct Slot {
    state: SlotState,
    len: usize,
    /// Empty while a claim guard holds the real buffer.
    buf: Box<[u8]>,
}

struct RingState {
    slots: Vec<Slot>,
    occupancy: usize,
    status: PipelineStatus,
    cancelled: bool,
}

pub struct FrameRing {
    state: Mutex<RingState>,
    /// Producer parks here while the ring is full.
    space_free: Condvar,
    /// Consumer parks here while no frame is ready.
    data_ready: Condvar,
    capacity: usize,
}

impl FrameRing {
    pub fn new(frames: usize) -> Self {
        Self::with_frame_capacity(frames, FRAME_CAPACITY)
    }

    /// All frame buffers are allocated here, once; the hand-off protocol
    /// never allocates.
    pub fn with_frame_capacity(frames: usize, frame_capacity: usize) -> Self {
        assert!(frames >= 2, "ring needs at least two frames");

        let slots = (0..frames)
            .map(|_| Slot {
                state: SlotState::Empty,
                len: 0,
                buf: vec![0u8; frame_capacity].into_boxed_slice(),
            })
            .collect();

        Self {
            state: Mutex::new(RingState {
                slots,
                occupancy: 0,
                status: PipelineStatus::Running,
                cancelled: false,
            }),
            space_free: Condvar::new(),
            data_ready: Condvar::new(),
            capacity: frames,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames currently not Empty. Always within `0..=capacity`.
    pub fn occupancy(&self) -> usize {
        self.lock().occupancy
    }

    pub fn status(&self) -> PipelineStatus {
        self.lock().status
    }

    pub fn cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Claim the slot at `index` for filling, blocking while it is still in
    /// use. A full ring keeps the slot non-Empty, so this is also the
    /// backpressure point. Returns `None` once the ring is cancelled.
    pub fn begin_fill(&self, index: usize) -> Option<FillSlot<'_>> {
        let mut st = self.lock();

        while !st.cancelled && st.slots[index].state != SlotState::Empty {
            st = self.space_free.wait(st).unwrap();
        }
        if st.cancelled {
            return None;
        }

        st.slots[index].state = SlotState::Filling;
        st.occupancy += 1;
        let buf = std::mem::take(&mut st.slots[index].buf);

        Some(FillSlot {
            ring: self,
            index,
            buf,
        })
    }

    /// Claim the slot at `index` for consuming, blocking until the producer
    /// fills it. Returns `None` when the pipeline has drained (terminal
    /// status and nothing left in the ring) or was cancelled.
    pub fn begin_consume(&self, index: usize) -> Option<ConsumeSlot<'_>> {
        let mut st = self.lock();

        loop {
            if st.cancelled {
                return None;
            }
            if st.slots[index].state == SlotState::Filled {
                break;
            }
            if st.status != PipelineStatus::Running && st.occupancy == 0 {
                return None;
            }
            st = self.data_ready.wait(st).unwrap();
        }

        st.slots[index].state = SlotState::Consuming;
        let len = st.slots[index].len;
        let buf = std::mem::take(&mut st.slots[index].buf);

        Some(ConsumeSlot {
            ring: self,
            index,
            buf,
            len,
        })
    }

    /// Producer is done; let the consumer run the ring dry and stop.
    pub fn finish_fill(&self) {
        let mut st = self.lock();
        if st.status == PipelineStatus::Running {
            st.status = PipelineStatus::Draining;
        }
        drop(st);
        self.data_ready.notify_all();
    }

    /// Consumer observed the drain and stopped.
    pub fn finish(&self) {
        self.lock().status = PipelineStatus::Finished;
    }

    /// Unblock both tasks and make further claims fail.
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.space_free.notify_all();
        self.data_ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap()
    }
}

/// Write authority over one Filling slot. Must end in `commit` or `abort`.
pub struct FillSlot<'a> {
    ring: &'a FrameRing,
    index: usize,
    buf: Box<[u8]>,
}

impl FillSlot<'_> {
    pub fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// The read produced `len` bytes; publish the frame and wake the consumer.
    pub fn commit(self, len: usize) {
        debug_assert!(len > 0 && len <= self.buf.len());

        let mut st = self.ring.lock();
        let slot = &mut st.slots[self.index];
        slot.buf = self.buf;
        slot.len = len;
        slot.state = SlotState::Filled;
        drop(st);
        self.ring.data_ready.notify_one();
    }

    /// The read yielded nothing; release the claim with no data loss.
    pub fn abort(self) {
        let mut st = self.ring.lock();
        let slot = &mut st.slots[self.index];
        slot.buf = self.buf;
        slot.state = SlotState::Empty;
        st.occupancy -= 1;
    }
}

/// Read authority over one Consuming slot.
pub struct ConsumeSlot<'a> {
    ring: &'a FrameRing,
    index: usize,
    buf: Box<[u8]>,
    len: usize,
}

impl ConsumeSlot<'_> {
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Hand the frame back to the producer and wake it.
    pub fn release(self) {
        let mut st = self.ring.lock();
        let slot = &mut st.slots[self.index];
        slot.buf = self.buf;
        slot.state = SlotState::Empty;
        st.occupancy -= 1;
        drop(st);
        self.ring.space_free.notify_one();
    }
}
