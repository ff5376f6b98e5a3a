//! # telenode - telemetry node SDK
//!
//! Building blocks for a small sensor node that periodically pushes readings
//! to a cloud collector over HTTPS. The crate is `no_std` by default and runs
//! on microcontrollers; the `std` feature adds a host network stack.
//!
//! ## Features
//!
//! ### Telemetry Uplink
//! - **HTTPS POST**: one JSON reading per request, one connection per request
//! - **Pluggable transport**: DNS, TCP and TLS behind small traits
//! - **Certificate policy**: strict validation or encrypted-but-unverified
//!
//! ### Node Runtime
//! - Persistent configuration record with checksum
//! - Captive provisioning form for WiFi credentials and access token
//! - Persistent crash log for uplink failures
//! - Polling-loop driver over sensor, display and button traits
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! telenode = "0.1.0"
//! ```
//!
//! ### Pushing a reading
//!
//! ```rust,no_run
//! use telenode::diagnostics::Discard;
//! use telenode::telemetry::Reading;
//! use telenode::uplink::Uplink;
//! # use core::net::SocketAddr;
//! # use telenode::network::{Candidates, Close, Connect, Connection, Read, Resolve, Secure, Verify, Write};
//! # struct Net;
//! # impl Connection for Net {}
//! # impl Read for Net {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Net {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for Net {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Resolve for Net {
//! #     type Error = ();
//! #     fn resolve(&mut self, _: &str, _: u16) -> Result<Candidates, ()> { Ok(Candidates::new()) }
//! # }
//! # impl Connect for Net {
//! #     type Connection = Net;
//! #     type Error = ();
//! #     fn connect(&mut self, _: SocketAddr) -> Result<Net, ()> { Ok(Net) }
//! # }
//! # impl Secure<Net> for Net {
//! #     type Connection = Net;
//! #     type Error = ();
//! #     fn secure(&mut self, c: Net, _: &str, _: Verify) -> Result<Net, ()> { Ok(c) }
//! # }
//! # let (resolver, connector, tls) = (Net, Net, Net);
//!
//! let mut uplink = Uplink::new(resolver, connector, tls);
//!
//! let mut reading = Reading::new();
//! reading.insert("Temperatur", 21.5f32).unwrap();
//! reading.insert("Luftfeuchte", 40).unwrap();
//!
//! let outcome = uplink.post(
//!     "https://collector.example/api/v1/TOKEN/telemetry",
//!     &reading,
//!     &mut Discard,
//! );
//! println!("status {}", outcome.status_code());
//! ```
//!
//! ## Optional Features
//!
//! - `std`: host network stack over `std::net` and `rustls` (default: disabled)
//! - `log`: route internal logging to the `log` facade
//! - `defmt`: route internal logging to `defmt` for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Network abstraction layer: transport traits, URL handling and HTTP framing.
pub mod network;

/// Storage abstraction layer for flash, EEPROM and RAM.
pub mod storage;

/// Sensor readings and their JSON encoding.
pub mod telemetry;

/// HTTPS telemetry push.
pub mod uplink;

/// Persistent crash log and clock abstraction.
pub mod diagnostics;

/// Node configuration and its persistent record.
pub mod config;

/// Captive provisioning form.
pub mod provisioning;

/// Polling-loop driver and hardware traits.
pub mod node;
