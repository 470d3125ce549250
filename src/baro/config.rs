//! Barometer configuration.

use super::register;

/// Pressure oversampling setting (precision vs. conversion time).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    /// One sample, 4.5 ms conversion.
    #[default]
    UltraLow = 0,
    /// Two samples, 7.5 ms conversion.
    Standard = 1,
    /// Four samples, 13.5 ms conversion.
    High = 2,
    /// Eight samples, 25.5 ms conversion.
    UltraHigh = 3,
}

impl Oversampling {
    /// Raw `oss` value used by the compensation algorithm.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Time to wait after starting a pressure conversion.
    pub const fn wait_micros(self) -> u32 {
        match self {
            Oversampling::UltraLow => 4_500,
            Oversampling::Standard => 7_500,
            Oversampling::High => 13_500,
            Oversampling::UltraHigh => 25_500,
        }
    }

    /// Control-register command that starts a pressure conversion.
    pub const fn command(self) -> u8 {
        register::CMD_PRESSURE | (self.bits() << 6)
    }

    /// Right shift applied to the 24-bit raw pressure reading.
    pub const fn shift(self) -> u8 {
        8 - self.bits()
    }
}

/// Barometer settings, fixed before [`initialize`](super::PressureSensor::initialize).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaroConfig {
    /// 7-bit I2C address.
    pub address: u8,
    /// Oversampling used for every acquisition cycle.
    pub oversampling: Oversampling,
    /// Consecutive failed phase operations after which the cycle restarts from idle.
    /// `None` parks the state machine until a poll succeeds.
    pub watchdog_limit: Option<u8>,
}

impl Default for BaroConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BaroConfig {
    /// Default address, ultra-low oversampling, no watchdog.
    pub const fn new() -> Self {
        Self {
            address: register::ADDRESS,
            oversampling: Oversampling::UltraLow,
            watchdog_limit: None,
        }
    }

    /// Sets the I2C address.
    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Sets the oversampling.
    #[must_use]
    pub const fn with_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Enables the missed-deadline watchdog.
    #[must_use]
    pub const fn with_watchdog_limit(mut self, limit: u8) -> Self {
        self.watchdog_limit = Some(limit);
        self
    }
}
