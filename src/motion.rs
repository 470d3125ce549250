//! Raw-sample collaborators: inertial sensor and magnetometer.
//!
//! Only the data path lives here. Register setup and unit scaling belong to
//! board bring-up; these readers assume the devices are already configured.

use crate::bus::BusTransport;

/// One signed 16-bit sample per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Triple {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Triple {
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Parses three consecutive big-endian words.
    pub const fn from_be_bytes(b: [u8; 6]) -> Self {
        Self::new(
            i16::from_be_bytes([b[0], b[1]]),
            i16::from_be_bytes([b[2], b[3]]),
            i16::from_be_bytes([b[4], b[5]]),
        )
    }
}

/// Accelerometer and gyroscope triples read in the same transaction pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Motion {
    pub accel: Triple,
    pub gyro: Triple,
}

/// Source of raw accelerometer/gyroscope samples.
///
/// There is no error channel; a failed read yields a best-effort sample.
pub trait InertialSensor {
    fn read_raw_motion(&mut self) -> Motion;
}

/// Source of raw magnetometer samples.
///
/// There is no error channel; a failed read yields a best-effort sample.
pub trait Magnetometer {
    fn read_raw_triple(&mut self) -> Triple;
}

mod mpu6050 {
    pub(crate) const ADDRESS: u8 = 0x68;
    pub(crate) const ACCEL_XOUT_H: u8 = 0x3B;
    pub(crate) const GYRO_XOUT_H: u8 = 0x43;
}

mod hmc5883l {
    pub(crate) const ADDRESS: u8 = 0x1E;
    pub(crate) const DATA_X_MSB: u8 = 0x03;
}

/// MPU6050 raw reader settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mpu6050Config {
    pub address: u8,
    /// Raw gyro offset subtracted from every reading, in LSB at the configured range.
    pub gyro_bias: Triple,
}

impl Default for Mpu6050Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Mpu6050Config {
    pub const fn new() -> Self {
        Self {
            address: mpu6050::ADDRESS,
            gyro_bias: Triple::ZERO,
        }
    }

    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub const fn with_gyro_bias(mut self, bias: Triple) -> Self {
        self.gyro_bias = bias;
        self
    }
}

/// MPU6050-class inertial sensor.
pub struct Mpu6050<B> {
    bus: B,
    config: Mpu6050Config,
}

impl<B: BusTransport> Mpu6050<B> {
    pub const fn new(bus: B, config: Mpu6050Config) -> Self {
        Self { bus, config }
    }

    fn read_triple(&mut self, register: u8) -> Triple {
        let mut buffer = [0u8; 6];
        match self.bus.read_exact(self.config.address, register, &mut buffer) {
            Ok(()) => Triple::from_be_bytes(buffer),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("mpu6050 read at {=u8:#x} failed: {}", register, _e);
                Triple::ZERO
            }
        }
    }

    pub fn release(self) -> B {
        self.bus
    }
}

impl<B: BusTransport> InertialSensor for Mpu6050<B> {
    fn read_raw_motion(&mut self) -> Motion {
        let accel = self.read_triple(mpu6050::ACCEL_XOUT_H);
        let raw = self.read_triple(mpu6050::GYRO_XOUT_H);
        let bias = self.config.gyro_bias;
        Motion {
            accel,
            gyro: Triple::new(
                raw.x.wrapping_sub(bias.x),
                raw.y.wrapping_sub(bias.y),
                raw.z.wrapping_sub(bias.z),
            ),
        }
    }
}

/// HMC5883L raw reader settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hmc5883lConfig {
    pub address: u8,
}

impl Default for Hmc5883lConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Hmc5883lConfig {
    pub const fn new() -> Self {
        Self {
            address: hmc5883l::ADDRESS,
        }
    }

    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }
}

/// HMC5883L-class magnetometer.
pub struct Hmc5883l<B> {
    bus: B,
    config: Hmc5883lConfig,
}

impl<B: BusTransport> Hmc5883l<B> {
    pub const fn new(bus: B, config: Hmc5883lConfig) -> Self {
        Self { bus, config }
    }

    pub fn release(self) -> B {
        self.bus
    }
}

impl<B: BusTransport> Magnetometer for Hmc5883l<B> {
    fn read_raw_triple(&mut self) -> Triple {
        let mut buffer = [0u8; 6];
        if let Err(_e) = self
            .bus
            .read_exact(self.config.address, hmc5883l::DATA_X_MSB, &mut buffer)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("hmc5883l read failed: {}", _e);
            return Triple::ZERO;
        }
        // Output registers are ordered X, Z, Y.
        let xzy = Triple::from_be_bytes(buffer);
        Triple::new(xzy.x, xzy.z, xzy.y)
    }
}
