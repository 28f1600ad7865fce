//! Mock link peer for testing and the simulation backend

use super::transport::{Channel, LinkEvent, LinkTransport};
use crate::error::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Mock wireless link.
///
/// Events are injected through a channel the way a real stack's callbacks
/// would deliver them from its own context; notified payloads are recorded
/// per channel for inspection. Clones share the same underlying link.
#[derive(Clone)]
pub struct MockLink {
    events_tx: Sender<LinkEvent>,
    events_rx: Receiver<LinkEvent>,
    inner: Arc<Mutex<MockLinkInner>>,
}

#[derive(Default)]
struct MockLinkInner {
    connected: bool,
    notified: Vec<(Channel, Vec<u8>)>,
    offline_channels: HashSet<Channel>,
    advertise_count: usize,
}

impl MockLink {
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        MockLink {
            events_tx,
            events_rx,
            inner: Arc::new(Mutex::new(MockLinkInner::default())),
        }
    }

    /// Simulate a peer connecting.
    pub fn connect_peer(&self) {
        self.inner.lock().unwrap().connected = true;
        let _ = self.events_tx.send(LinkEvent::PeerConnected);
    }

    /// Simulate the peer dropping the connection.
    pub fn disconnect_peer(&self) {
        self.inner.lock().unwrap().connected = false;
        let _ = self.events_tx.send(LinkEvent::PeerDisconnected);
    }

    /// Simulate a peer write on any channel.
    pub fn write(&self, channel: Channel, data: &[u8]) {
        let _ = self.events_tx.send(LinkEvent::InboundWrite {
            channel,
            data: data.to_vec(),
        });
    }

    /// Simulate a peer write on the configuration channel.
    pub fn write_config(&self, data: &[u8]) {
        self.write(Channel::Config, data);
    }

    /// Mark a channel as unavailable (characteristic not registered).
    pub fn set_channel_ready(&self, channel: Channel, ready: bool) {
        let mut inner = self.inner.lock().unwrap();
        if ready {
            inner.offline_channels.remove(&channel);
        } else {
            inner.offline_channels.insert(channel);
        }
    }

    /// All payloads notified on `channel`, oldest first.
    pub fn notified(&self, channel: Channel) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner
            .notified
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Drain every recorded notify.
    pub fn take_notified(&self) -> Vec<(Channel, Vec<u8>)> {
        std::mem::take(&mut self.inner.lock().unwrap().notified)
    }

    pub fn clear_notified(&self) {
        self.inner.lock().unwrap().notified.clear();
    }

    pub fn advertise_count(&self) -> usize {
        self.inner.lock().unwrap().advertise_count
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTransport for MockLink {
    fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.notified.push((channel, payload.to_vec()));
        Ok(())
    }

    fn peer_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    fn channel_ready(&self, channel: Channel) -> bool {
        !self.inner.lock().unwrap().offline_channels.contains(&channel)
    }

    fn start_advertising(&mut self) -> Result<()> {
        self.inner.lock().unwrap().advertise_count += 1;
        Ok(())
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.events_rx.try_recv().ok()
    }
}
