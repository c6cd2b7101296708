//! Connection handler that runs one session per accepted connection.

use std::io::{self, Write};
use std::net::TcpStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use lookup_protocol::FRAME_TERMINATOR;
use tracing::{debug, error, warn};

use crate::metrics::{ConnectionRegistration, ServiceMetrics, SessionOutcome};
use crate::panics::describe_panic;
use crate::transport::{AcceptedConnection, ConnectionHandler, ConnectionStream, TlsAcceptor};

use super::errors::{NetworkError, ProtocolError, SessionError};
use super::request::{read_request, trim_request};
use super::resolver::RequestResolver;
use super::state::Session;
use super::{SESSION_TARGET, SessionState};

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Upper bound of a single request read.
    pub max_request_bytes: usize,
    /// Read and write timeout; also bounds the TLS handshake.
    pub io_timeout: Duration,
}

/// Drives accepted connections through the session state machine.
pub(crate) struct SessionHandler {
    resolver: Arc<dyn RequestResolver>,
    tls: Option<TlsAcceptor>,
    metrics: Arc<ServiceMetrics>,
    limits: SessionLimits,
}

impl SessionHandler {
    pub(crate) fn new(
        resolver: Arc<dyn RequestResolver>,
        tls: Option<TlsAcceptor>,
        metrics: Arc<ServiceMetrics>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            resolver,
            tls,
            metrics,
            limits,
        }
    }

    fn run(&self, session: &mut Session, connection: AcceptedConnection) -> Result<(), SessionError> {
        let socket = connection.into_stream();
        configure(&socket, self.limits.io_timeout)?;

        let mut stream = match &self.tls {
            Some(acceptor) => {
                session.advance(SessionState::TlsHandshake)?;
                acceptor.accept(socket).map_err(NetworkError::Handshake)?
            }
            None => ConnectionStream::Tcp(socket),
        };
        let registration = self.register(session, &stream);

        session.advance(SessionState::AwaitRequest)?;
        let result = self.exchange(session, &mut stream, &registration);
        stream.close();
        result
    }

    fn register(&self, session: &Session, stream: &ConnectionStream) -> ConnectionRegistration {
        let socket = stream
            .socket()
            .try_clone()
            .inspect_err(|error| {
                debug!(target: SESSION_TARGET, peer = %session.peer(), %error, "socket clone failed");
            })
            .ok();
        self.metrics
            .active()
            .register(session.peer(), socket, !stream.is_encrypted())
    }

    fn exchange(
        &self,
        session: &mut Session,
        stream: &mut ConnectionStream,
        registration: &ConnectionRegistration,
    ) -> Result<(), SessionError> {
        let limit = self.limits.max_request_bytes;
        loop {
            // Only a session that has already answered may be woken by shutdown.
            registration.set_idle(session.replies() > 0);
            let outcome = read_request(stream, limit);
            registration.set_idle(false);
            let request = match outcome {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return session.advance(SessionState::Closed),
                Err(error) if ends_cleanly(&error, session.replies()) => {
                    debug!(
                        target: SESSION_TARGET,
                        peer = %session.peer(),
                        %error,
                        "client went quiet"
                    );
                    return session.advance(SessionState::Closed);
                }
                Err(error) => return Err(NetworkError::Read(error).into()),
            };

            session.advance(SessionState::Resolve)?;
            let oversized = request.len() >= limit;
            let reply = if oversized {
                let error = ProtocolError::Oversized { limit };
                warn!(target: SESSION_TARGET, peer = %session.peer(), %error, "request refused");
                self.resolver.rejection_reply(&error)
            } else {
                self.resolve(trim_request(&request))
            };
            let mut frame = reply.into_bytes();
            frame.push(FRAME_TERMINATOR);

            session.advance(SessionState::Respond)?;
            stream
                .write_all(&frame)
                .and_then(|()| stream.flush())
                .map_err(NetworkError::Write)?;

            if oversized || !self.resolver.persistent() {
                return session.advance(SessionState::Closed);
            }
            session.advance(SessionState::AwaitRequest)?;
        }
    }

    fn resolve(&self, request: &[u8]) -> String {
        match panic::catch_unwind(AssertUnwindSafe(|| self.resolver.resolve(request))) {
            Ok(reply) => reply,
            Err(payload) => {
                let message = describe_panic(payload.as_ref());
                error!(target: SESSION_TARGET, panic = %message, "resolver panicked");
                self.resolver.failure_reply(&message)
            }
        }
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, connection: AcceptedConnection) {
        let accepted_at = connection.accepted_at();
        let mut session = Session::new(connection.peer());
        let outcome = match self.run(&mut session, connection) {
            Ok(()) => {
                debug!(
                    target: SESSION_TARGET,
                    peer = %session.peer(),
                    replies = session.replies(),
                    "session closed"
                );
                SessionOutcome::Completed
            }
            Err(error) => {
                session.fail();
                warn!(
                    target: SESSION_TARGET,
                    peer = %session.peer(),
                    replies = session.replies(),
                    %error,
                    "session failed"
                );
                SessionOutcome::Failed
            }
        };
        self.metrics.record_session(accepted_at.elapsed(), outcome);
    }
}

fn configure(socket: &TcpStream, timeout: Duration) -> Result<(), NetworkError> {
    socket
        .set_read_timeout(Some(timeout))
        .and_then(|()| socket.set_write_timeout(Some(timeout)))
        .map_err(NetworkError::Configure)
}

/// An idle timeout after a reply, or a truncated TLS stream, is an ordinary
/// disconnect.
fn ends_cleanly(error: &io::Error, replies: usize) -> bool {
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::ConnectionReset => {
            replies > 0
        }
        io::ErrorKind::UnexpectedEof => true,
        _ => false,
    }
}
