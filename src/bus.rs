//! Byte-addressed register transport shared by all sensors.

use embedded_hal::i2c::I2c;

use crate::error::BusError;

/// Blocking request/response register access on a shared bus.
pub trait BusTransport {
    /// Writes `value` to `register` of the device at `device`.
    fn write(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusError>;

    /// Reads up to `buffer.len()` bytes starting at `register`.
    ///
    /// Returns the number of bytes actually delivered.
    fn read(&mut self, device: u8, register: u8, buffer: &mut [u8]) -> Result<usize, BusError>;

    /// Reads exactly `buffer.len()` bytes, treating a short transfer as an error.
    fn read_exact(&mut self, device: u8, register: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        let received = self.read(device, register, buffer)?;
        if received < buffer.len() {
            return Err(BusError::ShortRead {
                expected: buffer.len(),
                received,
            });
        }
        Ok(())
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn write(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write(device, register, value)
    }

    fn read(&mut self, device: u8, register: u8, buffer: &mut [u8]) -> Result<usize, BusError> {
        (**self).read(device, register, buffer)
    }
}

/// [`BusTransport`] over any blocking `embedded-hal` I2C bus or bus device.
pub struct I2cBus<I2C> {
    i2c: I2C,
}

impl<I2C> I2cBus<I2C> {
    /// Wraps an I2C bus.
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Releases the underlying I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> BusTransport for I2cBus<I2C> {
    fn write(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(device, &[register, value])
            .map_err(|_| BusError::Transport)
    }

    fn read(&mut self, device: u8, register: u8, buffer: &mut [u8]) -> Result<usize, BusError> {
        if buffer.is_empty() {
            return Ok(0);
        }
        self.i2c
            .write_read(device, &[register], buffer)
            .map_err(|_| BusError::Transport)?;
        Ok(buffer.len())
    }
}
