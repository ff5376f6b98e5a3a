//! Diagnostic sink for failures that must not stop the node.
//!
//! The uplink never propagates an error into the polling loop. Instead it
//! reports the error to a [`DiagnosticSink`]. Sinks that persist failures turn
//! it into a [`CrashRecord`]: a timestamp (when a [`Clock`] can provide one)
//! and the [`Fault`] that was reported.
//!
//! The node also reports a failed clock synchronisation after joining WiFi, so
//! a [`Fault`] is either an uplink error or [`Fault::TimeSync`].
//!
//! [`StorageLog`] keeps the most recent record in a storage region, overwriting
//! the previous one, as a small persistent crash log.

#![allow(missing_docs)]

use crate::storage::{ReadStorage, Storage};
use crate::uplink::Error;
use core::fmt::Write;
use heapless::String;

/// Calendar time as reported by the real-time clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Source of wall-clock time.
pub trait Clock {
    /// Current time, or `None` while the clock has not been synchronised.
    fn now(&self) -> Option<Timestamp>;
}

/// Network time synchronisation of the real-time clock.
pub trait TimeSync {
    type Error: core::fmt::Debug;
    /// Set the clock from a time server. Called once the station is associated.
    fn sync(&mut self) -> Result<(), Self::Error>;
}

/// A failure reported to a [`DiagnosticSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// An uplink attempt ended in this error.
    Uplink(Error),
    /// The clock could not be synchronised after joining WiFi.
    TimeSync,
}

impl From<Error> for Fault {
    fn from(error: Error) -> Self {
        Fault::Uplink(error)
    }
}

impl core::fmt::Display for Fault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Fault::Uplink(error) => write!(f, "{}", error),
            Fault::TimeSync => f.write_str("time-sync-error"),
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrashRecord {
    pub timestamp: Option<Timestamp>,
    pub fault: Fault,
}

impl core::fmt::Display for CrashRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.timestamp {
            Some(ts) => writeln!(f, "{}", ts)?,
            None => writeln!(f, "unsynchronised")?,
        }
        writeln!(f, "{}", self.fault)
    }
}

/// Receiver of crash records.
pub trait DiagnosticSink {
    /// Record a failure. Sinks must not panic; a sink that cannot store the
    /// record drops it.
    fn record(&mut self, fault: Fault);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &mut T {
    fn record(&mut self, fault: Fault) {
        (**self).record(fault)
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl DiagnosticSink for Discard {
    fn record(&mut self, _fault: Fault) {}
}

/// Size of the storage region used by [`StorageLog`].
pub const LOG_REGION_LEN: usize = 128;

/// Keeps the latest crash record as text in a fixed storage region.
///
/// The region holds the UTF-8 text of the record padded with zero bytes.
#[derive(Debug)]
pub struct StorageLog<S, C> {
    storage: S,
    clock: C,
    offset: u32,
}

impl<S: Storage, C: Clock> StorageLog<S, C> {
    /// Log into `storage` at `offset`, stamping records with `clock`.
    pub fn new(storage: S, clock: C, offset: u32) -> Self {
        Self {
            storage,
            clock,
            offset,
        }
    }

    /// Read back the stored record text, if any.
    pub fn last(&mut self) -> Result<Option<String<LOG_REGION_LEN>>, S::Error> {
        let mut region = [0u8; LOG_REGION_LEN];
        ReadStorage::read(&mut self.storage, self.offset, &mut region)?;
        let len = region.iter().position(|&b| b == 0).unwrap_or(region.len());
        let text = match core::str::from_utf8(&region[..len]) {
            Ok(text) if !text.is_empty() => text,
            _ => return Ok(None),
        };
        Ok(String::try_from(text).ok())
    }

    /// Give back the storage and clock.
    pub fn release(self) -> (S, C) {
        (self.storage, self.clock)
    }
}

impl<S: Storage, C: Clock> DiagnosticSink for StorageLog<S, C> {
    fn record(&mut self, fault: Fault) {
        let record = CrashRecord {
            timestamp: self.clock.now(),
            fault,
        };

        let mut text: String<LOG_REGION_LEN> = String::new();
        // Records are short; an overflow only truncates the text.
        let _ = write!(text, "{}", record);

        let mut region = [0u8; LOG_REGION_LEN];
        region[..text.len()].copy_from_slice(text.as_bytes());
        if Storage::write(&mut self.storage, self.offset, &region).is_err() {
            error!("crash log write failed");
        }
    }
}
