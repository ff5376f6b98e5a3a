//! # Telemetry uplink
//!
//! Pushes one [`Reading`] to a collector with a single HTTPS `POST`:
//!
//! 1. split the URL into host, port and path
//! 2. serialize the reading to JSON
//! 3. resolve the host and take the first candidate address
//! 4. open a TCP connection (port 443 unless the URL names one)
//! 5. run the TLS handshake with the host as server name
//! 6. write the request and read the status line and header block
//! 7. close the connection, whatever happened
//!
//! There are no retries, no redirects and no connection reuse. Each call owns
//! its connection from start to finish and shares no state with the next.
//!
//! [`Uplink::post`] is the entry point for a polling loop. It never fails: errors
//! go to a [`DiagnosticSink`] and come back as [`Outcome::Failed`], so the loop
//! just renders the outcome and carries on. [`Uplink::try_post`] is the same
//! operation with an ordinary `Result`.
//!
//! ## Certificate policy
//!
//! The default policy is [`Verify::Insecure`]: the channel is encrypted but the
//! server is not authenticated, and each insecure handshake logs a warning.
//! Use [`Uplink::with_verify`] with [`Verify::Strict`] to validate the server.

#![deny(unsafe_code)]

/// Uplink failure taxonomy
pub mod error;

pub use error::Error;

use crate::diagnostics::DiagnosticSink;
use crate::network::http::{HeadError, Request, read_head};
use crate::network::url::Endpoint;
use crate::network::{Close, Connect, Connection, Resolve, Secure, Verify, Write};
use crate::telemetry::Reading;

pub use crate::network::http::StatusLine as Status;

/// Port used when the URL does not name one.
pub const HTTPS_PORT: u16 = 443;

/// Result of one [`Uplink::post`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server answered; any status code, including 4xx and 5xx.
    Delivered(Status),
    /// The attempt failed before a status line was accepted.
    Failed(Error),
}

impl Outcome {
    /// Status code, or `0` for a failed attempt.
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Delivered(status) => status.code,
            Outcome::Failed(_) => 0,
        }
    }

    /// Reason phrase, or an empty string for a failed attempt.
    pub fn reason(&self) -> &str {
        match self {
            Outcome::Delivered(status) => status.reason.as_str(),
            Outcome::Failed(_) => "",
        }
    }

    /// `true` if a status line was received.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered(_))
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<Status, Error> {
        match self {
            Outcome::Delivered(status) => Ok(status),
            Outcome::Failed(error) => Err(error),
        }
    }
}

/// HTTPS telemetry client over pluggable resolver, connector and TLS layers.
#[derive(Debug)]
pub struct Uplink<R, C, T> {
    resolver: R,
    connector: C,
    tls: T,
    verify: Verify,
}

impl<R, C, T> Uplink<R, C, T>
where
    R: Resolve,
    C: Connect,
    T: Secure<C::Connection>,
{
    /// Create an uplink with the default [`Verify::Insecure`] policy.
    pub fn new(resolver: R, connector: C, tls: T) -> Self {
        Self {
            resolver,
            connector,
            tls,
            verify: Verify::default(),
        }
    }

    /// Set the certificate policy.
    pub fn with_verify(mut self, verify: Verify) -> Self {
        self.verify = verify;
        self
    }

    /// The certificate policy in effect.
    pub fn verify(&self) -> Verify {
        self.verify
    }

    /// Push `reading` to `url`, reporting failures to `sink` instead of returning them.
    pub fn post<D: DiagnosticSink>(&mut self, url: &str, reading: &Reading, sink: &mut D) -> Outcome {
        match self.try_post(url, reading) {
            Ok(status) => Outcome::Delivered(status),
            Err(e) => {
                error!("uplink failed: {}", e);
                sink.record(e.into());
                Outcome::Failed(e)
            }
        }
    }

    /// Push `reading` to `url`.
    pub fn try_post(&mut self, url: &str, reading: &Reading) -> Result<Status, Error> {
        let endpoint = Endpoint::parse(url).map_err(|_| Error::MalformedUrl)?;
        if !endpoint.is_https() {
            return Err(Error::MalformedUrl);
        }

        let body = reading.to_json().map_err(|_| Error::Payload)?;
        let request = Request {
            host: endpoint.authority(),
            path: endpoint.path(),
            body: body.as_bytes(),
        }
        .encode()
        .map_err(|_| Error::Payload)?;

        let port = endpoint.port().unwrap_or(HTTPS_PORT);
        let candidates = self
            .resolver
            .resolve(endpoint.host(), port)
            .map_err(|_| Error::Resolution)?;
        let remote = *candidates.first().ok_or(Error::Resolution)?;

        let transport = self
            .connector
            .connect(remote)
            .map_err(|_| Error::Connection)?;
        let mut conn = self
            .tls
            .secure(transport, endpoint.host(), self.verify)
            .map_err(|_| Error::Handshake)?;
        if self.verify == Verify::Insecure {
            warn!(
                "server certificate of {} was not validated",
                endpoint.host()
            );
        }

        let result = exchange(&mut conn, &request);
        if conn.close().is_err() {
            warn!("closing uplink connection failed");
        }

        let status = result?;
        debug!("uplink status {} {}", status.code, status.reason.as_str());
        Ok(status)
    }

    /// Give back the resolver, connector and TLS layer.
    pub fn into_parts(self) -> (R, C, T) {
        (self.resolver, self.connector, self.tls)
    }
}

fn exchange<K: Connection>(conn: &mut K, request: &[u8]) -> Result<Status, Error> {
    conn.write_all(request).map_err(|_| Error::Transport)?;
    Write::flush(conn).map_err(|_| Error::Transport)?;

    read_head(conn).map_err(|e| match e {
        HeadError::Protocol => Error::Protocol,
        HeadError::UnsupportedEncoding => Error::UnsupportedEncoding,
        HeadError::UnsupportedRedirect => Error::UnsupportedRedirect,
        HeadError::Read(_) => Error::Transport,
    })
}
