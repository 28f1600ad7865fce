//! Byte transport for the navigation receiver

use crate::error::Result;

mod serial;
pub use serial::SerialTransport;

#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// Inbound byte stream from a receiver port
///
/// The navigation receiver only talks at us; there is no write side.
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read (0 when idle)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0) // Default implementation
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }
}
