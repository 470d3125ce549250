//! Sensor-fusion front end for the flight computer.
//!
//! Samples a BMP085-class barometer, an MPU6050-class inertial sensor and an
//! HMC5883L-class magnetometer over one shared I2C bus and bundles the raw
//! readings into time stamped [`FusedSample`]s.
//!
//! The barometer is driven by a non-blocking, timer-gated state machine
//! ([`PressureSensor::poll`]) so the control loop never stalls waiting for a
//! conversion. The [`Aggregator`] ticks all three sensors once per call and
//! derives roll, pitch and tilt-compensated heading from the latest sample.
//!
//! Everything here is synchronous and allocation-free. Enable the `defmt`
//! feature for logging; the `firmware` feature builds the STM32 binary.

#![no_std]

pub mod baro;
pub mod buffer;
pub mod bus;
pub mod error;
pub mod fusion;
pub mod motion;
pub mod time;

#[cfg(test)]
mod testing;

pub use baro::{
    AcquisitionState, BaroConfig, CalibrationSet, Measurement, Oversampling, PollResult,
    PressureSensor, RawPressureSample, SEA_LEVEL_PA, compensate,
};
pub use buffer::{DoubleBuffer, ReadHandle, WriteHandle};
pub use bus::{BusTransport, I2cBus};
pub use error::{BusError, DomainError, Error};
pub use fusion::{
    Aggregator, FusedSample, Orientation, TickOutcome, normalize_heading, orientation_of,
};
pub use motion::{
    Hmc5883l, Hmc5883lConfig, InertialSensor, Magnetometer, Motion, Mpu6050, Mpu6050Config,
    Triple,
};
pub use time::{Clock, MonotonicMicros, elapsed, elapsed_within};
