extern crate std;

use core::cell::Cell;
use std::collections::BTreeMap;
use std::vec::Vec;

use crate::bus::BusTransport;
use crate::error::BusError;
use crate::motion::{InertialSensor, Magnetometer, Motion, Triple};
use crate::time::{Clock, MonotonicMicros};

/// Register file per device address, with a transaction log and fault injection.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockBus {
    regs: BTreeMap<(u8, u8), u8>,
    writes: Vec<(u8, u8, u8)>,
    reads: Vec<(u8, u8, usize)>,
    failures: u32,
    short_reads: u32,
}

impl MockBus {
    pub(crate) fn with_reg(mut self, device: u8, reg: u8, value: u8) -> Self {
        self.set_reg(device, reg, value);
        self
    }

    /// The next `count` reads deliver one byte less than requested.
    pub(crate) fn with_short_reads(mut self, count: u32) -> Self {
        self.short_reads = count;
        self
    }

    pub(crate) fn set_reg(&mut self, device: u8, reg: u8, value: u8) {
        self.regs.insert((device, reg), value);
    }

    /// The next `count` transactions of any kind fail.
    pub(crate) fn fail_next(&mut self, count: u32) {
        self.failures = count;
    }

    pub(crate) fn writes(&self) -> &[(u8, u8, u8)] {
        &self.writes
    }

    pub(crate) fn reads(&self) -> &[(u8, u8, usize)] {
        &self.reads
    }

    fn take_failure(&mut self) -> Result<(), BusError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(BusError::Transport);
        }
        Ok(())
    }
}

impl BusTransport for MockBus {
    fn write(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.take_failure()?;
        self.regs.insert((device, register), value);
        self.writes.push((device, register, value));
        Ok(())
    }

    fn read(&mut self, device: u8, register: u8, buffer: &mut [u8]) -> Result<usize, BusError> {
        self.take_failure()?;
        self.reads.push((device, register, buffer.len()));
        let mut len = buffer.len();
        if self.short_reads > 0 {
            self.short_reads -= 1;
            len = len.saturating_sub(1);
        }
        for (offset, slot) in buffer.iter_mut().take(len).enumerate() {
            let reg = register.wrapping_add(offset as u8);
            *slot = self.regs.get(&(device, reg)).copied().unwrap_or(0);
        }
        Ok(len)
    }
}

/// Microsecond clock that wraps at `max`, advanced by hand.
#[derive(Debug)]
pub(crate) struct SimClock {
    now: Cell<MonotonicMicros>,
    max: MonotonicMicros,
}

impl SimClock {
    pub(crate) fn new(start: MonotonicMicros) -> Self {
        Self::with_max(start, MonotonicMicros::MAX)
    }

    pub(crate) fn with_max(start: MonotonicMicros, max: MonotonicMicros) -> Self {
        Self {
            now: Cell::new(start),
            max,
        }
    }

    pub(crate) fn advance(&self, micros: u32) {
        let now = self.now.get();
        let next = if micros > self.max - now {
            micros - (self.max - now)
        } else {
            now + micros
        };
        self.now.set(next);
    }
}

impl Clock for SimClock {
    fn now_micros(&self) -> MonotonicMicros {
        self.now.get()
    }
}

/// Inertial sensor and magnetometer that stamp every axis with a read counter.
#[derive(Debug, Default)]
pub(crate) struct CountingMotion {
    pub(crate) reads: i16,
}

impl CountingMotion {
    fn next(&mut self) -> Triple {
        self.reads += 1;
        Triple::new(self.reads, self.reads, self.reads)
    }
}

impl InertialSensor for CountingMotion {
    fn read_raw_motion(&mut self) -> Motion {
        let accel = self.next();
        Motion { accel, gyro: accel }
    }
}

impl Magnetometer for CountingMotion {
    fn read_raw_triple(&mut self) -> Triple {
        self.next()
    }
}
