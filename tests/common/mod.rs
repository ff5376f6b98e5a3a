#![allow(dead_code)]

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;

use telenode::diagnostics::{self, DiagnosticSink};
use telenode::network::error::Error;
use telenode::network::*;
use telenode::uplink::Uplink;

/// Where a scripted exchange should break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Resolve,
    NoAddress,
    Connect,
    Handshake,
    Write,
    Read,
}

/// Everything the mocks observed, shared between the mocks and the test.
#[derive(Debug, Default)]
pub struct Wire {
    pub resolved: Option<(String, u16)>,
    pub connected: Option<SocketAddr>,
    pub server_name: Option<String>,
    pub verify: Option<Verify>,
    pub written: Vec<u8>,
    pub flushed: bool,
    pub closed: bool,
}

pub type Shared = Rc<RefCell<Wire>>;

pub const MOCK_ADDR: &str = "192.0.2.10:443";

pub struct MockResolver {
    fault: Fault,
    wire: Shared,
}

impl Resolve for MockResolver {
    type Error = Error;

    fn resolve(&mut self, host: &str, port: u16) -> Result<Candidates, Self::Error> {
        self.wire.borrow_mut().resolved = Some((host.to_string(), port));
        let mut candidates = Candidates::new();
        match self.fault {
            Fault::Resolve => return Err(Error::NameNotFound),
            Fault::NoAddress => {}
            _ => {
                let mut addr: SocketAddr = MOCK_ADDR.parse().unwrap();
                addr.set_port(port);
                candidates.push(addr).unwrap();
                candidates.push("192.0.2.11:443".parse().unwrap()).unwrap();
            }
        }
        Ok(candidates)
    }
}

pub struct MockConnector {
    fault: Fault,
    response: Vec<u8>,
    wire: Shared,
}

impl Connect for MockConnector {
    type Connection = MockConnection;
    type Error = Error;

    fn connect(&mut self, remote: SocketAddr) -> Result<Self::Connection, Self::Error> {
        if self.fault == Fault::Connect {
            return Err(Error::ConnectionRefused);
        }
        self.wire.borrow_mut().connected = Some(remote);
        Ok(MockConnection {
            response: self.response.clone(),
            pos: 0,
            fault: self.fault,
            wire: self.wire.clone(),
        })
    }
}

/// Serves the scripted response in small chunks and accepts short writes.
pub struct MockConnection {
    response: Vec<u8>,
    pos: usize,
    fault: Fault,
    wire: Shared,
}

const READ_CHUNK: usize = 7;
const WRITE_CHUNK: usize = 16;

impl Read for MockConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fault == Fault::Read {
            return Err(Error::ReadError);
        }
        let n = buf
            .len()
            .min(READ_CHUNK)
            .min(self.response.len() - self.pos);
        buf[..n].copy_from_slice(&self.response[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MockConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fault == Fault::Write {
            return Err(Error::WriteError);
        }
        let n = buf.len().min(WRITE_CHUNK);
        self.wire.borrow_mut().written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().flushed = true;
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closed = true;
        Ok(())
    }
}

impl Connection for MockConnection {}

/// Pass-through "TLS" layer that records the handshake parameters.
pub struct MockTls {
    fault: Fault,
    wire: Shared,
}

impl Secure<MockConnection> for MockTls {
    type Connection = MockConnection;
    type Error = Error;

    fn secure(
        &mut self,
        transport: MockConnection,
        server_name: &str,
        verify: Verify,
    ) -> Result<Self::Connection, Self::Error> {
        {
            let mut wire = self.wire.borrow_mut();
            wire.server_name = Some(server_name.to_string());
            wire.verify = Some(verify);
        }
        if self.fault == Fault::Handshake {
            transport.close()?;
            return Err(Error::HandshakeFailed);
        }
        Ok(transport)
    }
}

pub type MockUplink = Uplink<MockResolver, MockConnector, MockTls>;

/// An uplink whose server answers with `response`, breaking at `fault`.
pub fn mock_uplink(response: &[u8], fault: Fault) -> (MockUplink, Shared) {
    let wire = Shared::default();
    let uplink = Uplink::new(
        MockResolver {
            fault,
            wire: wire.clone(),
        },
        MockConnector {
            fault,
            response: response.to_vec(),
            wire: wire.clone(),
        },
        MockTls {
            fault,
            wire: wire.clone(),
        },
    );
    (uplink, wire)
}

/// Sink that keeps every reported fault.
#[derive(Debug, Default)]
pub struct Recorder {
    pub faults: Vec<diagnostics::Fault>,
}

impl DiagnosticSink for Recorder {
    fn record(&mut self, fault: diagnostics::Fault) {
        self.faults.push(fault);
    }
}

/// Split a captured request into its head and body.
pub fn split_request(written: &[u8]) -> (String, Vec<u8>) {
    let pos = written
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("request has no header terminator");
    let head = String::from_utf8(written[..pos].to_vec()).unwrap();
    (head, written[pos + 4..].to_vec())
}
