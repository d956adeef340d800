use core::cell::RefCell;

use critical_section::Mutex;

use crate::critical::CriticalSection;
use crate::error::{ChannelError, Result};

pub mod sample_buffer;
pub mod snapshot;
pub mod trigger;

pub use sample_buffer::{SampleBuffer, BUFFER_LEN, EXTRA_SPACE, SAMPLE_SIZE};
pub use snapshot::{Snapshot, SnapshotPool, SNAPSHOT_BLOCKS};
pub use trigger::{Slope, TriggerConfig};

/// Acquisition state of one channel, shared between the ADC interrupt and the foreground.
///
/// Every access goes through a critical section. The interrupt side only ever calls
/// [`Acquisition::store_sample`]; the foreground keeps its sections to a copy or a flag read.
pub struct Acquisition {
    buffer: Mutex<RefCell<SampleBuffer>>,
}

impl Acquisition {
    pub const fn new() -> Self {
        Self {
            buffer: Mutex::new(RefCell::new(SampleBuffer::new())),
        }
    }

    /// Feeds one raw reading. Interrupt context.
    #[inline(always)]
    pub fn store_sample(&self, sample: u8) {
        let cs = CriticalSection::enter();
        self.buffer.borrow_ref_mut(cs.token()).store_sample(sample);
    }

    pub fn trigger(&self) -> TriggerConfig {
        let cs = CriticalSection::enter();
        let trigger = self.buffer.borrow_ref(cs.token()).trigger();
        trigger
    }

    pub fn set_trigger(&self, trigger: TriggerConfig) {
        let cs = CriticalSection::enter();
        self.buffer.borrow_ref_mut(cs.token()).set_trigger(trigger);
    }

    /// Read-modify-write of the trigger configuration in a single critical section.
    pub fn update_trigger(&self, f: impl FnOnce(TriggerConfig) -> TriggerConfig) {
        let cs = CriticalSection::enter();
        let mut buffer = self.buffer.borrow_ref_mut(cs.token());
        let trigger = f(buffer.trigger());
        buffer.set_trigger(trigger);
    }

    /// A completed window can be copied right now.
    pub fn is_done(&self) -> bool {
        let cs = CriticalSection::enter();
        let done = self.buffer.borrow_ref(cs.token()).is_done();
        done
    }

    pub fn is_triggered(&self) -> bool {
        let cs = CriticalSection::enter();
        let triggered = self.buffer.borrow_ref(cs.token()).is_triggered();
        triggered
    }

    /// Copies the completed window into a block of `pool`.
    ///
    /// The readiness test and the copy share one critical section, so a window that wrapped
    /// since the caller last looked is reported as [`ChannelError::NotReady`] instead of
    /// being copied half overwritten.
    pub fn snapshot<'p>(&self, pool: &'p SnapshotPool) -> Result<Snapshot<'p>> {
        let mut snapshot = pool.claim().ok_or(ChannelError::OutOfMemory)?;

        let cs = CriticalSection::enter();
        let buffer = self.buffer.borrow_ref(cs.token());
        if !buffer.is_done() {
            return Err(ChannelError::NotReady);
        }
        snapshot.fill(buffer.window());

        Ok(snapshot)
    }

    /// Runs `f` on the buffer inside a critical section.
    pub fn inspect<R>(&self, f: impl FnOnce(&SampleBuffer) -> R) -> R {
        let cs = CriticalSection::enter();
        let buffer = self.buffer.borrow_ref(cs.token());
        f(&buffer)
    }
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_window(acq: &Acquisition) {
        for i in 0..SAMPLE_SIZE - (EXTRA_SPACE - 1) {
            acq.store_sample(i as u8);
        }
    }

    #[test]
    fn snapshot_requires_completed_window() {
        let acq = Acquisition::new();
        let pool = SnapshotPool::new();

        assert_eq!(acq.snapshot(&pool).unwrap_err(), ChannelError::NotReady);
        assert_eq!(pool.available(), SNAPSHOT_BLOCKS);
    }

    #[test]
    fn back_to_back_snapshots_match() {
        let acq = Acquisition::new();
        let pool = SnapshotPool::new();
        fill_window(&acq);

        let first = acq.snapshot(&pool).unwrap();
        let second = acq.snapshot(&pool).unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_ne!(first.as_bytes().as_ptr(), second.as_bytes().as_ptr());
        assert_eq!(first.len(), SAMPLE_SIZE);
    }

    #[test]
    fn snapshot_survives_further_acquisition() {
        let acq = Acquisition::new();
        let pool = SnapshotPool::new();
        fill_window(&acq);

        let snapshot = acq.snapshot(&pool).unwrap();
        let copy: [u8; SAMPLE_SIZE] = snapshot.as_bytes().try_into().unwrap();

        for _ in 0..2 * BUFFER_LEN {
            acq.store_sample(0xFF);
        }
        assert_eq!(snapshot.as_bytes(), &copy[..]);
    }

    #[test]
    fn triggered_window_is_stable_until_wrap() {
        let acq = Acquisition::new();
        let pool = SnapshotPool::new();
        acq.set_trigger(TriggerConfig {
            enabled: true,
            slope: Slope::Rising,
            level: 128,
        });
        for sample in [10, 20, 30] {
            acq.store_sample(sample);
        }
        for i in 0..SAMPLE_SIZE - (EXTRA_SPACE - 1) {
            acq.store_sample(150 + i as u8);
        }

        let first = acq.snapshot(&pool).unwrap();
        for sample in [7, 3, 9, 1] {
            acq.store_sample(sample);
        }
        let second = acq.snapshot(&pool).unwrap();

        assert!(acq.is_done());
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(second[SAMPLE_SIZE - 1], 150 + (SAMPLE_SIZE - EXTRA_SPACE) as u8);
    }

    #[test]
    fn exhausted_pool_reports_out_of_memory() {
        let acq = Acquisition::new();
        let pool = SnapshotPool::new();
        fill_window(&acq);

        let _held: [Snapshot<'_>; SNAPSHOT_BLOCKS] =
            core::array::from_fn(|_| acq.snapshot(&pool).unwrap());
        assert_eq!(acq.snapshot(&pool).unwrap_err(), ChannelError::OutOfMemory);
    }
}
