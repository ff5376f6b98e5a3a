//! Transport abstraction for the telemetry uplink.
//!
//! The uplink never touches a socket API directly. Instead it is driven through
//! a small set of traits so that the same request/response logic runs on top of
//! an embedded TCP/IP stack, the host operating system, or an in-memory mock:
//!
//! ```text
//! ┌──────────┐   SocketAddr   ┌──────────┐  Connection  ┌──────────┐  Connection
//! │ Resolve  │──────────────▶│ Connect  │────────────▶│  Secure  │────────────▶ uplink
//! │ (DNS)    │                │ (TCP)    │              │  (TLS)   │
//! └──────────┘                └──────────┘              └──────────┘
//! ```
//!
//! Each stage has its own associated error type so that the uplink can tell a
//! resolution failure from a refused connection or a failed handshake.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::net::SocketAddr;

/// Common error types for network operations
pub mod error;

/// HTTP/1.1 request framing and response head parsing.
pub mod http;

/// URL decomposition into scheme, authority and path.
pub mod url;

/// Host (`std`) implementations of the transport traits.
#[cfg(feature = "std")]
pub mod host;

/// Maximum number of candidate addresses a resolver may return.
pub const MAX_CANDIDATES: usize = 4;

/// Candidate addresses produced by a [`Resolve`] implementation, in preference order.
pub type Candidates = heapless::Vec<SocketAddr, MAX_CANDIDATES>;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Resolve, Secure, Verify, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection. `Ok(0)` means the peer closed the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<(), WriteAllError<Self::Error>> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(WriteAllError::WriteZero),
                Ok(n) => buf = &buf[n..],
                Err(e) => return Err(WriteAllError::Other(e)),
            }
        }
        Ok(())
    }
}

/// Error returned by [`Write::write_all`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WriteAllError<E> {
    /// The connection accepted zero bytes.
    WriteZero,
    /// The underlying write failed.
    Other(E),
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// Name resolution (DNS or a static table).
pub trait Resolve {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Resolve `host` to candidate socket addresses for `port`.
    ///
    /// An empty list is treated by callers as a resolution failure.
    fn resolve(&mut self, host: &str, port: u16) -> Result<Candidates, Self::Error>;
}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection
    fn connect(&mut self, remote: SocketAddr) -> Result<Self::Connection, Self::Error>;
}

/// Server certificate policy applied during the TLS handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verify {
    /// Validate the certificate chain and the server name against trusted roots.
    Strict,
    /// Accept any certificate presented by the server.
    ///
    /// The channel is encrypted but the peer is not authenticated. Self-signed
    /// collectors are accepted.
    #[default]
    Insecure,
}

impl core::fmt::Display for Verify {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Verify::Strict => f.write_str("strict"),
            Verify::Insecure => f.write_str("insecure"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Verify {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Verify::Strict => defmt::write!(f, "strict"),
            Verify::Insecure => defmt::write!(f, "insecure"),
        }
    }
}

/// Upgrades a plain transport connection to an encrypted one.
///
/// Implementations take ownership of the transport. If the handshake fails
/// they must close (or drop) it before returning the error.
pub trait Secure<C: Connection> {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Perform the client handshake using `server_name` for SNI.
    fn secure(
        &mut self,
        transport: C,
        server_name: &str,
        verify: Verify,
    ) -> Result<Self::Connection, Self::Error>;
}
