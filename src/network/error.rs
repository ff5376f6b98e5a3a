//! Common error types for transport adapters

/// A common error type for transport operations.
///
/// Transport adapters (the host implementations and test doubles) report their
/// failures with this enum. It carries no payload so it stays `Copy` and usable
/// in `no_std` builds.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// The host name could not be resolved.
    NameNotFound,
    /// A connection attempt was refused or could not be established.
    ConnectionRefused,
    /// A timeout occurred.
    Timeout,
    /// The connection was closed.
    ConnectionClosed,
    /// An invalid address or server name was provided.
    InvalidAddress,
    /// The TLS handshake failed.
    HandshakeFailed,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::WriteError => "write failed",
            Error::ReadError => "read failed",
            Error::NameNotFound => "name not found",
            Error::ConnectionRefused => "connection refused",
            Error::Timeout => "timed out",
            Error::ConnectionClosed => "connection closed",
            Error::InvalidAddress => "invalid address",
            Error::HandshakeFailed => "handshake failed",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::NameNotFound => defmt::write!(f, "NameNotFound"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::HandshakeFailed => defmt::write!(f, "HandshakeFailed"),
        }
    }
}
