//! Per-connection state machine.

use std::net::SocketAddr;

use tracing::trace;

use super::SESSION_TARGET;
use super::errors::SessionError;

/// Lifecycle of one client connection.
///
/// ```text
/// INIT -> [TLS_HANDSHAKE] -> AWAIT_REQUEST -> RESOLVE -> RESPOND -> CLOSED
///                                  ^                         |
///                                  +------- persistent ------+
/// ```
///
/// Any non-terminal state may move to `ERROR_CLOSED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Connection accepted, nothing exchanged yet.
    Init,
    /// Server-side TLS handshake in progress.
    TlsHandshake,
    /// Waiting for the client's request bytes.
    AwaitRequest,
    /// Request read; computing the reply.
    Resolve,
    /// Writing the reply.
    Respond,
    /// Closed normally.
    Closed,
    /// Closed after a failure.
    ErrorClosed,
}

impl SessionState {
    /// Reports whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::ErrorClosed)
    }

    /// Reports whether `next` may follow `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Closed | Self::ErrorClosed, _) => false,
            (_, Self::ErrorClosed)
            | (Self::Init, Self::TlsHandshake | Self::AwaitRequest)
            | (Self::TlsHandshake | Self::Respond, Self::AwaitRequest)
            | (Self::AwaitRequest, Self::Resolve)
            | (Self::AwaitRequest | Self::Respond, Self::Closed)
            | (Self::Resolve, Self::Respond) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Session {
    peer: SocketAddr,
    state: SessionState,
    replies: usize,
}

impl Session {
    pub(crate) const fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            state: SessionState::Init,
            replies: 0,
        }
    }

    pub(crate) const fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) const fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) const fn replies(&self) -> usize {
        self.replies
    }

    pub(crate) fn advance(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_advance_to(next) {
            return Err(SessionError::Transition {
                from: self.state,
                to: next,
            });
        }
        trace!(
            target: SESSION_TARGET,
            peer = %self.peer,
            from = %self.state,
            to = %next,
            "session transition"
        );
        if self.state == SessionState::Respond {
            self.replies = self.replies.saturating_add(1);
        }
        self.state = next;
        Ok(())
    }

    /// Moves to `ERROR_CLOSED` unless the session already ended.
    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() {
            trace!(
                target: SESSION_TARGET,
                peer = %self.peer,
                from = %self.state,
                "session failed"
            );
            self.state = SessionState::ErrorClosed;
        }
    }
}
