//! Node configuration and its persistent record.
//!
//! [`NodeConfig`] is a plain value: the main loop owns it, hands references to
//! the uplink and display code, and replaces it wholesale when provisioning
//! produces a new one. Nothing in the crate keeps configuration in globals.
//!
//! [`ConfigStore`] persists the value to any [`Storage`] as a small record:
//!
//! ```text
//! ┌────────┬──────────┬────────────┬──────────────────────────────────────┐
//! │ "TNC1" │ len u16  │ crc32 u32  │ ssid \n password \n token \n secs \n │
//! └────────┴──────────┴────────────┴──────────────────────────────────────┘
//! ```
//!
//! Integers are little-endian and the CRC covers the payload only. Any other
//! magic (erased flash, a cleared record) reads back as "not configured".

#![allow(missing_docs)]

use crate::storage::{ReadStorage, Storage};
use core::fmt::Write;
use heapless::{String, Vec};

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;
pub const MAX_TOKEN_LEN: usize = 64;
pub const MAX_URL_LEN: usize = 256;

/// Push interval used until the node is provisioned, in seconds.
pub const DEFAULT_PUSH_INTERVAL: u32 = 20;

const MAGIC: [u8; 4] = *b"TNC1";
const HEADER_LEN: usize = 10;
const MAX_PAYLOAD_LEN: usize = 192;

/// Errors validating or persisting a configuration.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The SSID is empty.
    MissingSsid,
    /// A field exceeds its maximum length.
    TooLong,
    /// A field contains a line break.
    InvalidCharacter,
    /// The push interval is zero or not a number.
    InvalidInterval,
    /// The stored record failed its length or checksum check.
    Corrupt,
    /// The storage device reported an error.
    Storage,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::MissingSsid => "missing ssid",
            Error::TooLong => "field too long",
            Error::InvalidCharacter => "line break in field",
            Error::InvalidInterval => "invalid push interval",
            Error::Corrupt => "corrupt configuration record",
            Error::Storage => "storage error",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::MissingSsid => defmt::write!(f, "MissingSsid"),
            Error::TooLong => defmt::write!(f, "TooLong"),
            Error::InvalidCharacter => defmt::write!(f, "InvalidCharacter"),
            Error::InvalidInterval => defmt::write!(f, "InvalidInterval"),
            Error::Corrupt => defmt::write!(f, "Corrupt"),
            Error::Storage => defmt::write!(f, "Storage"),
        }
    }
}

/// WiFi credentials, collector token and push interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub ssid: String<MAX_SSID_LEN>,
    pub password: String<MAX_PASSWORD_LEN>,
    pub access_token: String<MAX_TOKEN_LEN>,
    /// Seconds between two telemetry pushes.
    pub push_interval: u32,
}

impl NodeConfig {
    /// Build a validated configuration.
    pub fn new(
        ssid: &str,
        password: &str,
        access_token: &str,
        push_interval: u32,
    ) -> Result<Self, Error> {
        if ssid.is_empty() {
            return Err(Error::MissingSsid);
        }
        if push_interval == 0 {
            return Err(Error::InvalidInterval);
        }
        Ok(Self {
            ssid: field(ssid)?,
            password: field(password)?,
            access_token: field(access_token)?,
            push_interval,
        })
    }

    /// Collector URL for this node: `base`, then the access token, then `/telemetry`.
    ///
    /// ```rust
    /// use telenode::config::NodeConfig;
    ///
    /// let config = NodeConfig::new("home", "secret", "A1B2", 20).unwrap();
    /// let url = config.telemetry_url("https://demo.thingsboard.io/api/v1/").unwrap();
    /// assert_eq!(url.as_str(), "https://demo.thingsboard.io/api/v1/A1B2/telemetry");
    /// ```
    pub fn telemetry_url(&self, base: &str) -> Result<String<MAX_URL_LEN>, Error> {
        let mut url = String::new();
        write!(url, "{}{}/telemetry", base, self.access_token).map_err(|_| Error::TooLong)?;
        Ok(url)
    }

    fn encode(&self) -> Result<Vec<u8, MAX_PAYLOAD_LEN>, Error> {
        let mut text: String<MAX_PAYLOAD_LEN> = String::new();
        write!(
            text,
            "{}\n{}\n{}\n{}\n",
            self.ssid, self.password, self.access_token, self.push_interval
        )
        .map_err(|_| Error::TooLong)?;
        Vec::from_slice(text.as_bytes()).map_err(|_| Error::TooLong)
    }

    fn decode(payload: &[u8]) -> Result<Self, Error> {
        let text = core::str::from_utf8(payload).map_err(|_| Error::Corrupt)?;
        let mut lines = text.split('\n');
        let (Some(ssid), Some(password), Some(token), Some(interval), Some(""), None) = (
            lines.next(),
            lines.next(),
            lines.next(),
            lines.next(),
            lines.next(),
            lines.next(),
        ) else {
            return Err(Error::Corrupt);
        };
        let interval = interval.parse().map_err(|_| Error::Corrupt)?;
        Self::new(ssid, password, token, interval).map_err(|_| Error::Corrupt)
    }
}

fn field<const N: usize>(value: &str) -> Result<String<N>, Error> {
    if value.contains(['\n', '\r']) {
        return Err(Error::InvalidCharacter);
    }
    String::try_from(value).map_err(|_| Error::TooLong)
}

/// Persists a [`NodeConfig`] at a fixed offset of a storage device.
#[derive(Debug)]
pub struct ConfigStore<S> {
    storage: S,
    offset: u32,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S, offset: u32) -> Self {
        Self { storage, offset }
    }

    /// Read the stored configuration.
    ///
    /// Returns `Ok(None)` when no record is present.
    pub fn load(&mut self) -> Result<Option<NodeConfig>, Error> {
        let mut header = [0u8; HEADER_LEN];
        ReadStorage::read(&mut self.storage, self.offset, &mut header)
            .map_err(|_| Error::Storage)?;
        if header[..4] != MAGIC {
            return Ok(None);
        }

        let len = u16::from_le_bytes([header[4], header[5]]) as usize;
        let crc = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
        if len > MAX_PAYLOAD_LEN {
            return Err(Error::Corrupt);
        }

        let mut payload = [0u8; MAX_PAYLOAD_LEN];
        ReadStorage::read(
            &mut self.storage,
            self.offset + HEADER_LEN as u32,
            &mut payload[..len],
        )
        .map_err(|_| Error::Storage)?;
        if crc32fast::hash(&payload[..len]) != crc {
            return Err(Error::Corrupt);
        }

        NodeConfig::decode(&payload[..len]).map(Some)
    }

    /// Write `config`, replacing any previous record.
    pub fn save(&mut self, config: &NodeConfig) -> Result<(), Error> {
        let payload = config.encode()?;

        let mut record: Vec<u8, { HEADER_LEN + MAX_PAYLOAD_LEN }> = Vec::new();
        record
            .extend_from_slice(&MAGIC)
            .map_err(|_| Error::TooLong)?;
        record
            .extend_from_slice(&(payload.len() as u16).to_le_bytes())
            .map_err(|_| Error::TooLong)?;
        record
            .extend_from_slice(&crc32fast::hash(&payload).to_le_bytes())
            .map_err(|_| Error::TooLong)?;
        record
            .extend_from_slice(&payload)
            .map_err(|_| Error::TooLong)?;

        Storage::write(&mut self.storage, self.offset, &record).map_err(|_| Error::Storage)?;
        debug!("configuration saved");
        Ok(())
    }

    /// Invalidate the stored record so the node boots unconfigured.
    pub fn clear(&mut self) -> Result<(), Error> {
        Storage::write(&mut self.storage, self.offset, &[0u8; 4]).map_err(|_| Error::Storage)?;
        info!("configuration cleared");
        Ok(())
    }

    /// Give back the storage device.
    pub fn release(self) -> S {
        self.storage
    }
}
