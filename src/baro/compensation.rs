//! Fixed-point compensation from raw ADC counts to physical units.
//!
//! Follows the integer algorithm published in the BMP085 datasheet. All
//! intermediates are `i32` except `B4`/`B7`, which are `u32`. Multiplications
//! wrap like the reference C code; extreme calibration values can overflow
//! and produce garbage, which is accepted. Zero denominators are reported.

use libm::powf;

use super::calibration::CalibrationSet;
use super::config::Oversampling;
use crate::error::DomainError;

/// Standard sea-level pressure in pascals.
pub const SEA_LEVEL_PA: i32 = 101_325;

/// Uncompensated ADC readings from one acquisition cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPressureSample {
    pub uncompensated_temperature: i32,
    pub uncompensated_pressure: i32,
}

/// Compensated temperature and pressure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Temperature in 0.1 °C.
    pub temperature_deci_celsius: i32,
    /// Pressure in Pa.
    pub pressure_pa: i32,
}

impl Measurement {
    pub fn celsius(&self) -> f32 {
        self.temperature_deci_celsius as f32 / 10.0
    }

    pub fn hectopascals(&self) -> f32 {
        self.pressure_pa as f32 / 100.0
    }

    /// Altitude in meters from the international barometric formula.
    pub fn altitude_m(&self, sea_level_pa: f32) -> f32 {
        44_330.0 * (1.0 - powf(self.pressure_pa as f32 / sea_level_pa, 1.0 / 5.255))
    }
}

/// Converts a raw sample using the factory calibration.
pub fn compensate(
    cal: &CalibrationSet,
    oversampling: Oversampling,
    raw: RawPressureSample,
) -> Result<Measurement, DomainError> {
    let oss = u32::from(oversampling.bits());
    let ut = raw.uncompensated_temperature;
    let up = raw.uncompensated_pressure;

    // Temperature
    let x1 = ut
        .wrapping_sub(i32::from(cal.ac6))
        .wrapping_mul(i32::from(cal.ac5))
        >> 15;
    let x2 = (i32::from(cal.mc) << 11)
        .checked_div(x1.wrapping_add(i32::from(cal.md)))
        .ok_or(DomainError::ZeroTemperatureDenominator)?;
    let b5 = x1.wrapping_add(x2);
    let temperature = b5.wrapping_add(8) >> 4;

    // Pressure
    let b6 = b5.wrapping_sub(4000);
    let b6_sq = b6.wrapping_mul(b6) >> 12;
    let x1 = i32::from(cal.b2).wrapping_mul(b6_sq) >> 11;
    let x2 = i32::from(cal.ac2).wrapping_mul(b6) >> 11;
    let x3 = x1.wrapping_add(x2);
    let b3 = (i32::from(cal.ac1)
        .wrapping_mul(4)
        .wrapping_add(x3)
        .wrapping_shl(oss)
        .wrapping_add(2))
        >> 2;

    let x1 = i32::from(cal.ac3).wrapping_mul(b6) >> 13;
    let x2 = i32::from(cal.b1).wrapping_mul(b6_sq) >> 16;
    let x3 = x1.wrapping_add(x2).wrapping_add(2) >> 2;
    let b4 = u32::from(cal.ac4).wrapping_mul(x3.wrapping_add(32_768) as u32) >> 15;
    if b4 == 0 {
        return Err(DomainError::ZeroPressureDenominator);
    }

    let b7 = (up.wrapping_sub(b3) as u32).wrapping_mul(50_000 >> oss);
    let p = (if b7 < 0x0800_0000 {
        (b7 * 2) / b4
    } else {
        (b7 / b4).wrapping_mul(2)
    }) as i32;

    let x1 = (p >> 8).wrapping_mul(p >> 8);
    let x1 = x1.wrapping_mul(3038) >> 16;
    let x2 = (-7357i32).wrapping_mul(p) >> 16;
    let pressure = p.wrapping_add(x1.wrapping_add(x2).wrapping_add(3791) >> 4);

    Ok(Measurement {
        temperature_deci_celsius: temperature,
        pressure_pa: pressure,
    })
}
