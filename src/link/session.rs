//! Peer connection lifecycle tracking

/// Settle delay between losing a peer and advertising again.
pub const ADVERTISE_SETTLE_MS: u64 = 500;

/// Tracks the peer link across transport callbacks and drives
/// re-advertising after a disconnect.
///
/// The transport reports connect/disconnect edges as events; `reconcile`
/// compares the current state against the previously observed one so the
/// advertise request is issued exactly once per disconnect, after a settle
/// delay, rather than on every poll while the state is stable.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    connected: bool,
    was_connected: bool,
    readvertise_at: Option<u64>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connected(&mut self) {
        self.connected = true;
    }

    pub fn on_disconnected(&mut self) {
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Periodic reconciliation step.
    ///
    /// Returns true when advertising should be restarted now. The settle
    /// delay is a deadline, not a sleep, so the caller's loop keeps
    /// running while it elapses. A reconnect during the settle window
    /// cancels the pending re-advertise.
    pub fn reconcile(&mut self, now_ms: u64) -> bool {
        if self.connected {
            self.was_connected = true;
            self.readvertise_at = None;
            return false;
        }

        if !self.was_connected {
            return false;
        }

        match self.readvertise_at {
            None => {
                self.readvertise_at = Some(now_ms + ADVERTISE_SETTLE_MS);
                false
            }
            Some(at) if now_ms >= at => {
                self.was_connected = false;
                self.readvertise_at = None;
                true
            }
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_never_advertises() {
        let mut monitor = ConnectionMonitor::new();
        assert!(!monitor.reconcile(0));
        assert!(!monitor.reconcile(10_000));
    }

    #[test]
    fn test_readvertise_once_after_settle() {
        let mut monitor = ConnectionMonitor::new();
        monitor.on_connected();
        assert!(!monitor.reconcile(100));

        monitor.on_disconnected();
        // First pass arms the deadline, nothing fires yet
        assert!(!monitor.reconcile(1_000));
        assert!(!monitor.reconcile(1_000 + ADVERTISE_SETTLE_MS - 1));
        // Deadline passes: advertise exactly once
        assert!(monitor.reconcile(1_000 + ADVERTISE_SETTLE_MS));
        assert!(!monitor.reconcile(1_000 + ADVERTISE_SETTLE_MS + 1));
        assert!(!monitor.reconcile(60_000));
    }

    #[test]
    fn test_reconnect_during_settle_cancels() {
        let mut monitor = ConnectionMonitor::new();
        monitor.on_connected();
        monitor.reconcile(100);

        monitor.on_disconnected();
        assert!(!monitor.reconcile(200));

        // Peer bounces back before the settle deadline
        monitor.on_connected();
        assert!(!monitor.reconcile(250));
        assert!(!monitor.reconcile(10_000));
        assert!(monitor.is_connected());
    }

    #[test]
    fn test_each_disconnect_gets_its_own_advertise() {
        let mut monitor = ConnectionMonitor::new();
        for round in 0..3u64 {
            let t = round * 10_000;
            monitor.on_connected();
            monitor.reconcile(t);
            monitor.on_disconnected();
            assert!(!monitor.reconcile(t + 1));
            assert!(monitor.reconcile(t + 1 + ADVERTISE_SETTLE_MS));
        }
    }
}
