//! Behavioural and end-to-end suites for the daemon.

mod bootstrap_behaviour;
mod support;
