//! Factory calibration constants.

/// Size of the calibration EEPROM block.
pub(crate) const CALIBRATION_LEN: usize = 22;

/// The eleven factory constants stored in the sensor EEPROM.
///
/// Read once at initialization and never modified afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSet {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl CalibrationSet {
    /// Parses the big-endian EEPROM block starting at `0xAA`.
    pub fn from_bytes(data: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |i: usize| [data[i], data[i + 1]];
        Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(2)),
            ac3: i16::from_be_bytes(word(4)),
            ac4: u16::from_be_bytes(word(6)),
            ac5: u16::from_be_bytes(word(8)),
            ac6: u16::from_be_bytes(word(10)),
            b1: i16::from_be_bytes(word(12)),
            b2: i16::from_be_bytes(word(14)),
            mb: i16::from_be_bytes(word(16)),
            mc: i16::from_be_bytes(word(18)),
            md: i16::from_be_bytes(word(20)),
        }
    }
}
