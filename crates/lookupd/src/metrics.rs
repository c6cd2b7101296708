//! Service counters and the set of live connections.
//!
//! Counters are updated once per session by the worker that ran it and read
//! as a consistent [`MetricsSnapshot`]. The connection set backs broadcast
//! delivery and lets shutdown wake persistent sessions idling between
//! requests.

use std::collections::BTreeMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

const METRICS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::metrics");

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The session reached `CLOSED`.
    Completed,
    /// The session reached `ERROR_CLOSED`.
    Failed,
}

#[derive(Debug, Default)]
struct Counters {
    sessions: u64,
    failed: u64,
    rejected: u64,
    total_latency: Duration,
}

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Sessions handled by a worker, successful or not.
    pub sessions: u64,
    /// Sessions that ended in `ERROR_CLOSED`.
    pub failed: u64,
    /// Connections dropped because the hand-off queue was full.
    pub rejected: u64,
    /// Sum of session handling times.
    pub total_latency: Duration,
    /// Connections open when the snapshot was taken.
    pub active: usize,
}

impl MetricsSnapshot {
    /// Mean session handling time, or `None` before the first session.
    #[must_use]
    pub fn average_latency(&self) -> Option<Duration> {
        let nanos = self
            .total_latency
            .as_nanos()
            .checked_div(u128::from(self.sessions))?;
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

/// Shared service counters.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    counters: Mutex<Counters>,
    active: ActiveConnections,
}

impl ServiceMetrics {
    /// Creates zeroed counters with an empty connection set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished session and its handling time.
    pub fn record_session(&self, latency: Duration, outcome: SessionOutcome) {
        let mut counters = self.counters();
        counters.sessions = counters.sessions.saturating_add(1);
        counters.total_latency = counters.total_latency.saturating_add(latency);
        if outcome == SessionOutcome::Failed {
            counters.failed = counters.failed.saturating_add(1);
        }
    }

    /// Records a connection dropped before reaching a worker.
    pub fn record_rejected(&self) {
        let mut counters = self.counters();
        counters.rejected = counters.rejected.saturating_add(1);
    }

    /// Returns a consistent copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters();
        MetricsSnapshot {
            sessions: counters.sessions,
            failed: counters.failed,
            rejected: counters.rejected,
            total_latency: counters.total_latency,
            active: self.active.len(),
        }
    }

    /// Returns the live connection set.
    #[must_use]
    pub fn active(&self) -> &ActiveConnections {
        &self.active
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct ActiveEntry {
    peer: SocketAddr,
    socket: Option<TcpStream>,
    broadcast: bool,
    idle: bool,
}

impl ActiveEntry {
    fn interrupt_read(&self) {
        if let Some(socket) = &self.socket
            && let Err(error) = socket.shutdown(Shutdown::Read)
        {
            debug!(target: METRICS_TARGET, peer = %self.peer, %error, "read shutdown failed");
        }
    }
}

#[derive(Debug, Default)]
struct ConnectionTable {
    next_id: u64,
    draining: bool,
    entries: BTreeMap<u64, ActiveEntry>,
}

/// Outcome of a [`ActiveConnections::broadcast`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Connections the message was written to.
    pub delivered: usize,
    /// Connections whose write failed; they no longer receive broadcasts.
    pub dropped: usize,
}

/// Connections currently owned by a session.
///
/// Each session holds a [`ConnectionRegistration`] for its lifetime; dropping
/// it removes the entry.
#[derive(Debug, Clone, Default)]
pub struct ActiveConnections {
    table: Arc<Mutex<ConnectionTable>>,
}

impl ActiveConnections {
    /// Adds a connection.
    ///
    /// `socket` is a second handle to the connection's TCP socket, used to
    /// wake idle sessions at shutdown and, when `broadcast` is set, to write
    /// broadcast messages. Encrypted connections pass `broadcast =
    /// false` because raw writes would corrupt the TLS record stream.
    pub(crate) fn register(
        &self,
        peer: SocketAddr,
        socket: Option<TcpStream>,
        broadcast: bool,
    ) -> ConnectionRegistration {
        let mut table = self.lock();
        let id = table.next_id;
        table.next_id = table.next_id.wrapping_add(1);
        table.entries.insert(
            id,
            ActiveEntry {
                peer,
                socket,
                broadcast,
                idle: false,
            },
        );
        ConnectionRegistration {
            id,
            connections: self.clone(),
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Reports whether no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Writes `message` verbatim to every plain-TCP connection.
    ///
    /// Connections whose write fails are excluded from later broadcasts.
    /// Writes happen outside the table lock.
    #[must_use]
    pub fn broadcast(&self, message: &[u8]) -> BroadcastReport {
        let targets: Vec<(u64, SocketAddr, TcpStream)> = {
            let table = self.lock();
            table
                .entries
                .iter()
                .filter(|(_, entry)| entry.broadcast)
                .filter_map(|(id, entry)| {
                    let socket = entry.socket.as_ref()?.try_clone().ok()?;
                    Some((*id, entry.peer, socket))
                })
                .collect()
        };

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for (id, peer, mut socket) in targets {
            match socket.write_all(message).and_then(|()| socket.flush()) {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(error) => {
                    warn!(target: METRICS_TARGET, %peer, %error, "broadcast delivery failed");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut table = self.lock();
            for id in &failed {
                if let Some(entry) = table.entries.get_mut(id) {
                    entry.broadcast = false;
                }
            }
        }
        report.dropped = failed.len();
        debug!(
            target: METRICS_TARGET,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast finished"
        );
        report
    }

    /// Starts draining: wakes every session idling between requests.
    ///
    /// A session is idle once it has sent at least one reply and is waiting
    /// for the next request. Its read half is shut down, so it observes
    /// end-of-stream and closes. Sessions that have not answered yet are left
    /// alone to finish their exchange. Sessions that become idle later are
    /// woken as soon as they do.
    pub fn interrupt_idle_reads(&self) {
        let mut table = self.lock();
        table.draining = true;
        for entry in table.entries.values().filter(|entry| entry.idle) {
            entry.interrupt_read();
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a connection listed in [`ActiveConnections`] until dropped.
#[derive(Debug)]
pub struct ConnectionRegistration {
    id: u64,
    connections: ActiveConnections,
}

impl ConnectionRegistration {
    /// Marks the session as idle (waiting for a further request) or busy.
    pub fn set_idle(&self, idle: bool) {
        let mut table = self.connections.lock();
        let draining = table.draining;
        if let Some(entry) = table.entries.get_mut(&self.id) {
            entry.idle = idle;
            if idle && draining {
                entry.interrupt_read();
            }
        }
    }
}

impl Drop for ConnectionRegistration {
    fn drop(&mut self) {
        self.connections.lock().entries.remove(&self.id);
    }
}
