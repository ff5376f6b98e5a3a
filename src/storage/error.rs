//! Storage error type

/// Errors reported by [`MemoryStorage`](super::MemoryStorage).
///
/// Device drivers outside the crate bring their own error type; the
/// configuration store and crash log only need `Debug`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The range `offset..offset + len` does not fit the device.
    OutOfBounds,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::OutOfBounds => f.write_str("range outside storage"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::OutOfBounds => defmt::write!(f, "OutOfBounds"),
        }
    }
}
