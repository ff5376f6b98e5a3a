//! Host implementations of the transport traits.
//!
//! Available with the `std` feature. Name resolution goes through the
//! operating system, TCP through `std::net`, and TLS through `rustls` with the
//! `ring` provider. Strict verification trusts the Mozilla root set from
//! `webpki-roots` plus any roots added with
//! [`RustlsConnector::with_root_certificate`].
//!
//! Unlike the embedded targets this stack bounds every blocking call with a
//! timeout ([`DEFAULT_TIMEOUT`] unless configured otherwise), so a silent peer
//! cannot stall the polling loop forever.

use super::error::Error;
use super::{
    Candidates, Close, Connect, Connection, MAX_CANDIDATES, Read, Resolve, Secure, Verify, Write,
};
use core::net::SocketAddr;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
    StreamOwned,
};
use std::io::{self, Read as _, Write as _};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use std::vec::Vec;

/// Timeout applied to connect, read and write unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves names with the operating system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl Resolve for DnsResolver {
    type Error = Error;

    fn resolve(&mut self, host: &str, port: u16) -> Result<Candidates, Self::Error> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::NameNotFound)?;
        let mut candidates = Candidates::new();
        for addr in addrs.take(MAX_CANDIDATES) {
            // `take` keeps this within capacity.
            let _ = candidates.push(addr);
        }
        Ok(candidates)
    }
}

/// Opens TCP connections with `std::net`.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    timeout: Option<Duration>,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl TcpConnector {
    /// Connector with [`DEFAULT_TIMEOUT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for connect, read and write; `None` blocks indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Connect for TcpConnector {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: SocketAddr) -> Result<Self::Connection, Self::Error> {
        let stream = match self.timeout {
            Some(timeout) => TcpStream::connect_timeout(&remote, timeout),
            None => TcpStream::connect(remote),
        }
        .map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut => Error::Timeout,
            _ => Error::ConnectionRefused,
        })?;
        stream
            .set_read_timeout(self.timeout)
            .map_err(|_| Error::ConnectionRefused)?;
        stream
            .set_write_timeout(self.timeout)
            .map_err(|_| Error::ConnectionRefused)?;
        Ok(TcpConnection { stream })
    }
}

/// A plain TCP connection.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

fn read_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout,
        _ => Error::ReadError,
    }
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream.read(buf).map_err(read_error)
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream.write(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(Error::ConnectionClosed),
            _ => Ok(()),
        }
    }
}

impl Connection for TcpConnection {}

/// TLS client built on `rustls`.
#[derive(Debug)]
pub struct RustlsConnector {
    provider: Arc<CryptoProvider>,
    extra_roots: Vec<CertificateDer<'static>>,
    strict: Option<Arc<ClientConfig>>,
    insecure: Option<Arc<ClientConfig>>,
}

impl Default for RustlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RustlsConnector {
    /// Connector using the `ring` crypto provider.
    pub fn new() -> Self {
        Self {
            provider: Arc::new(rustls::crypto::ring::default_provider()),
            extra_roots: Vec::new(),
            strict: None,
            insecure: None,
        }
    }

    /// Also trust `root` (DER) under [`Verify::Strict`], e.g. a private CA.
    pub fn with_root_certificate(mut self, root: CertificateDer<'static>) -> Self {
        self.extra_roots.push(root);
        self.strict = None;
        self
    }

    fn config(&mut self, verify: Verify) -> Result<Arc<ClientConfig>, Error> {
        let slot = match verify {
            Verify::Strict => &mut self.strict,
            Verify::Insecure => &mut self.insecure,
        };
        if let Some(config) = slot.as_ref() {
            return Ok(config.clone());
        }

        let builder = ClientConfig::builder_with_provider(self.provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|_| Error::HandshakeFailed)?;
        let config = match verify {
            Verify::Strict => {
                let mut roots = RootCertStore {
                    roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
                };
                for root in &self.extra_roots {
                    roots
                        .add(root.clone())
                        .map_err(|_| Error::HandshakeFailed)?;
                }
                builder.with_root_certificates(roots).with_no_client_auth()
            }
            Verify::Insecure => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate {
                    provider: self.provider.clone(),
                }))
                .with_no_client_auth(),
        };

        let config = Arc::new(config);
        *slot = Some(config.clone());
        Ok(config)
    }
}

impl Secure<TcpConnection> for RustlsConnector {
    type Connection = TlsConnection;
    type Error = Error;

    fn secure(
        &mut self,
        transport: TcpConnection,
        server_name: &str,
        verify: Verify,
    ) -> Result<Self::Connection, Self::Error> {
        let config = self.config(verify)?;
        let name = ServerName::try_from(server_name)
            .map_err(|_| Error::InvalidAddress)?
            .to_owned();
        let mut conn = ClientConnection::new(config, name).map_err(|_| Error::HandshakeFailed)?;

        // On failure `stream` is dropped here, which closes the socket.
        let mut stream = transport.stream;
        while conn.is_handshaking() {
            conn.complete_io(&mut stream)
                .map_err(|_| Error::HandshakeFailed)?;
        }

        Ok(TlsConnection {
            inner: StreamOwned::new(conn, stream),
        })
    }
}

/// An established TLS session over TCP.
pub struct TlsConnection {
    inner: StreamOwned<ClientConnection, TcpStream>,
}

impl core::fmt::Debug for TlsConnection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TlsConnection")
            .field("peer", &self.inner.sock.peer_addr().ok())
            .finish_non_exhaustive()
    }
}

impl Read for TlsConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            // Peers that drop TCP without close_notify still end the stream.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(read_error(e)),
        }
    }
}

impl Write for TlsConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.inner.write(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for TlsConnection {
    type Error = Error;

    fn close(mut self) -> Result<(), Self::Error> {
        self.inner.conn.send_close_notify();
        let notified = self.inner.conn.complete_io(&mut self.inner.sock);
        let shutdown = self.inner.sock.shutdown(Shutdown::Both);
        match (notified, shutdown) {
            (Ok(_), Ok(())) => Ok(()),
            (_, Err(e)) if e.kind() != io::ErrorKind::NotConnected => Err(Error::ConnectionClosed),
            _ => Ok(()),
        }
    }
}

impl Connection for TlsConnection {}

/// Certificate verifier for [`Verify::Insecure`].
///
/// Accepts any chain and any server name. Handshake signatures are still
/// checked, so the session keys belong to whoever holds the presented key.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Uplink over the host network stack.
pub type HostUplink = crate::uplink::Uplink<DnsResolver, TcpConnector, RustlsConnector>;

/// Build a [`HostUplink`] with default timeouts and the given certificate policy.
pub fn host_uplink(verify: Verify) -> HostUplink {
    crate::uplink::Uplink::new(DnsResolver, TcpConnector::new(), RustlsConnector::new())
        .with_verify(verify)
}
