//! Fixed-size pool of session workers fed by a bounded queue.
//!
//! The acceptor hands connections over with a non-blocking `try_send`, so a
//! saturated pool never stalls accepting; the connection is returned to the
//! caller instead.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::panics::describe_panic;

use super::{AcceptedConnection, ConnectionHandler, LISTENER_TARGET, ListenerError};

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Result of offering a connection to the pool.
#[derive(Debug)]
pub(crate) enum Submission {
    Queued,
    /// Every worker is busy and the queue is at capacity.
    Full(AcceptedConnection),
    /// The workers have exited.
    Closed(AcceptedConnection),
}

/// Outcome of draining the pool at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Workers that finished within the drain timeout.
    pub joined: usize,
    /// Workers still running a session when the timeout expired.
    pub abandoned: usize,
}

impl DrainReport {
    /// Reports whether every worker finished in time.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.abandoned == 0
    }
}

pub(crate) struct WorkerPool {
    sender: SyncSender<AcceptedConnection>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `workers` threads sharing a queue of `capacity` slots.
    pub(crate) fn spawn(
        workers: usize,
        capacity: usize,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<Self, ListenerError> {
        let (sender, receiver) = mpsc::sync_channel::<AcceptedConnection>(capacity);
        let queue = Arc::new(Mutex::new(receiver));
        let handles = (0..workers)
            .map(|index| {
                let shared_queue = Arc::clone(&queue);
                let worker_handler = Arc::clone(&handler);
                thread::Builder::new()
                    .name(format!("{}-worker-{index}", env!("CARGO_PKG_NAME")))
                    .spawn(move || run_worker(&shared_queue, worker_handler.as_ref()))
                    .map_err(|source| ListenerError::Spawn {
                        role: "worker",
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sender,
            workers: handles,
        })
    }

    pub(crate) const fn size(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn submit(&self, connection: AcceptedConnection) -> Submission {
        match self.sender.try_send(connection) {
            Ok(()) => Submission::Queued,
            Err(TrySendError::Full(connection)) => Submission::Full(connection),
            Err(TrySendError::Disconnected(connection)) => Submission::Closed(connection),
        }
    }

    /// Closes the queue and waits up to `timeout` for the workers to finish
    /// the sessions already queued or running.
    pub(crate) fn drain(self, timeout: Duration) -> DrainReport {
        let Self { sender, workers } = self;
        drop(sender);

        let deadline = Instant::now() + timeout;
        while workers.iter().any(|worker| !worker.is_finished()) && Instant::now() < deadline {
            thread::sleep(DRAIN_POLL);
        }

        let mut report = DrainReport::default();
        for worker in workers {
            if !worker.is_finished() {
                report.abandoned = report.abandoned.saturating_add(1);
                continue;
            }
            if worker.join().is_err() {
                error!(target: LISTENER_TARGET, "session worker panicked");
            }
            report.joined = report.joined.saturating_add(1);
        }
        report
    }
}

fn run_worker(queue: &Mutex<Receiver<AcceptedConnection>>, handler: &dyn ConnectionHandler) {
    loop {
        let next = match queue.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };
        let Ok(connection) = next else {
            break;
        };
        let peer = connection.peer();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(connection))) {
            error!(
                target: LISTENER_TARGET,
                %peer,
                panic = %describe_panic(payload.as_ref()),
                "connection handler panicked"
            );
        }
    }
    debug!(target: LISTENER_TARGET, "session worker exiting");
}
