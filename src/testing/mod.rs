//! Testing infrastructure (mock bus, simulated clock, scripted sensors).

pub(crate) mod mock;

pub(crate) use mock::{CountingMotion, MockBus, SimClock};

use crate::baro::CalibrationSet;

/// Calibration set from the BMP085 datasheet's worked example.
pub(crate) const DATASHEET_CAL: CalibrationSet = CalibrationSet {
    ac1: 408,
    ac2: -72,
    ac3: -14383,
    ac4: 32741,
    ac5: 32757,
    ac6: 23153,
    b1: 6190,
    b2: 4,
    mb: -32768,
    mc: -8711,
    md: 2868,
};

/// [`DATASHEET_CAL`] as it appears in the sensor EEPROM.
pub(crate) fn datasheet_calibration_bytes() -> [u8; 22] {
    let c = DATASHEET_CAL;
    let words = [
        c.ac1.to_be_bytes(),
        c.ac2.to_be_bytes(),
        c.ac3.to_be_bytes(),
        c.ac4.to_be_bytes(),
        c.ac5.to_be_bytes(),
        c.ac6.to_be_bytes(),
        c.b1.to_be_bytes(),
        c.b2.to_be_bytes(),
        c.mb.to_be_bytes(),
        c.mc.to_be_bytes(),
        c.md.to_be_bytes(),
    ];
    let mut bytes = [0u8; 22];
    for (chunk, word) in bytes.chunks_exact_mut(2).zip(words.iter()) {
        chunk.copy_from_slice(word);
    }
    bytes
}
