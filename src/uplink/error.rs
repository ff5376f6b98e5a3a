//! Uplink failure taxonomy

/// Why an uplink attempt failed.
///
/// Each variant maps to one stage of [`Uplink::try_post`](super::Uplink::try_post),
/// so a crash record tells where the attempt stopped without carrying any
/// transport-specific payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The URL does not decompose into scheme, host and path, or is not `https`.
    MalformedUrl,
    /// The reading could not be serialized or the request does not fit the buffer.
    Payload,
    /// The host name did not resolve to any address.
    Resolution,
    /// The TCP connection could not be established.
    Connection,
    /// TLS negotiation failed.
    Handshake,
    /// Writing the request or reading the response failed.
    Transport,
    /// The status line is missing or its code is not numeric.
    Protocol,
    /// The response uses chunked transfer coding.
    UnsupportedEncoding,
    /// The response redirects (non-2xx with `Location`).
    UnsupportedRedirect,
}

impl Error {
    /// Short kebab-case name, as used in crash records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::MalformedUrl => "malformed-url",
            Error::Payload => "payload-error",
            Error::Resolution => "resolution-error",
            Error::Connection => "connection-error",
            Error::Handshake => "handshake-error",
            Error::Transport => "transport-error",
            Error::Protocol => "protocol-error",
            Error::UnsupportedEncoding => "unsupported-encoding",
            Error::UnsupportedRedirect => "unsupported-redirect",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}
