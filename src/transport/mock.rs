//! Mock transport for testing

use super::Transport;
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for unit testing
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<VecDeque<u8>>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.extend(data);
    }

    /// Clear any unread data
    pub fn clear_read(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let available = inner.len().min(buffer.len());

        for item in buffer.iter_mut().take(available) {
            *item = inner.pop_front().unwrap();
        }

        Ok(available)
    }

    fn available(&mut self) -> Result<usize> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.len())
    }
}
