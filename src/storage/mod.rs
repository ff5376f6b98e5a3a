//! # Storage abstraction for node state
//!
//! A telemetry node persists very little: its configuration record and the
//! latest crash record. Both are written through the traits in this module so
//! the same code runs against on-chip flash, an EEPROM, a file on a host, or
//! the in-memory [`MemoryStorage`] used in tests.
//!
//! - [`ReadStorage`]: read bytes at an offset
//! - [`Storage`]: read and write
//! - [`BlockingErase`]: erase a range back to the erased state
//!
//! ```rust
//! use telenode::storage::{MemoryStorage, ReadStorage, Storage};
//!
//! let mut storage: MemoryStorage<64> = MemoryStorage::new();
//! storage.write(8, &[1, 2, 3]).unwrap();
//!
//! let mut buf = [0u8; 3];
//! storage.read(8, &mut buf).unwrap();
//! assert_eq!(buf, [1, 2, 3]);
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for storage operations
pub mod error;

#[cfg(test)]
mod tests;

use error::Error;

/// Value of an erased byte, matching NOR flash.
pub const ERASED_BYTE: u8 = 0xFF;

/// Re-exports of common traits for convenient importing
pub mod prelude {
    pub use super::{BlockingErase, ReadStorage, Storage};
}

/// Trait for reading data from storage devices.
pub trait ReadStorage {
    /// Associated error type for read operations
    type Error: core::fmt::Debug;

    /// Read data from the storage device.
    ///
    /// Fills the whole buffer from `offset` or fails.
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if offset + buffer length exceeds device capacity
    /// - a device-specific error if the hardware read fails
    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error>;

    /// Get the total capacity of the storage device in bytes.
    fn capacity(&self) -> usize;
}

/// Trait for storage devices that support both read and write operations.
pub trait Storage: ReadStorage {
    /// Write data to the storage device at `offset`.
    ///
    /// Devices that need an erase before programming handle it themselves.
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Trait for storage devices that support explicit erase operations.
pub trait BlockingErase: Storage {
    /// Erase the byte range `[from, to)`.
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error>;
}

impl<T: ReadStorage + ?Sized> ReadStorage for &mut T {
    type Error = T::Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

impl<T: Storage + ?Sized> Storage for &mut T {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(offset, bytes)
    }
}

impl<T: BlockingErase + ?Sized> BlockingErase for &mut T {
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        (**self).erase(from, to)
    }
}

/// RAM-backed storage of `N` bytes, initialised to [`ERASED_BYTE`].
#[derive(Debug, Clone)]
pub struct MemoryStorage<const N: usize> {
    memory: [u8; N],
}

impl<const N: usize> Default for MemoryStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MemoryStorage<N> {
    pub fn new() -> Self {
        Self {
            memory: [ERASED_BYTE; N],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.memory
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, Error> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > N {
            return Err(Error::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const N: usize> ReadStorage for MemoryStorage<N> {
    type Error = Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Storage for MemoryStorage<N> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.memory[range].copy_from_slice(bytes);
        Ok(())
    }
}

impl<const N: usize> BlockingErase for MemoryStorage<N> {
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to {
            return Err(Error::OutOfBounds);
        }
        let range = self.range(from, (to - from) as usize)?;
        self.memory[range].fill(ERASED_BYTE);
        Ok(())
    }
}
