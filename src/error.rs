//! Error types shared by the drivers and the aggregator.

/// Failure on the shared sensor bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The transport reported a failed transaction.
    Transport,
    /// The transport delivered fewer bytes than requested.
    ShortRead {
        /// Bytes requested.
        expected: usize,
        /// Bytes actually delivered.
        received: usize,
    },
}

/// Compensation could not produce a finite result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DomainError {
    /// `X1 + md` evaluated to zero in the temperature step.
    ZeroTemperatureDenominator,
    /// `B4` evaluated to zero in the pressure step.
    ZeroPressureDenominator,
}

/// Any failure surfaced by [`Aggregator::tick`](crate::Aggregator::tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bus communication error.
    Bus(BusError),
    /// Compensation domain error.
    Domain(DomainError),
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Error::Bus(e)
    }
}

impl From<DomainError> for Error {
    fn from(e: DomainError) -> Self {
        Error::Domain(e)
    }
}
