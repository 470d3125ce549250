//! BMP085 register map and command bytes.

/// Fixed 7-bit I2C address.
pub(crate) const ADDRESS: u8 = 0x77;

/// First byte of the 22-byte calibration EEPROM.
pub(crate) const CALIBRATION: u8 = 0xAA;
/// Measurement control register.
pub(crate) const CONTROL: u8 = 0xF4;
/// Conversion result, MSB first.
pub(crate) const DATA: u8 = 0xF6;

/// Starts a temperature conversion.
pub(crate) const CMD_TEMPERATURE: u8 = 0x2E;
/// Starts a pressure conversion; OR with `oss << 6`.
pub(crate) const CMD_PRESSURE: u8 = 0x34;

/// Settle time of a temperature conversion.
pub(crate) const TEMPERATURE_WAIT_MICROS: u32 = 4_500;
