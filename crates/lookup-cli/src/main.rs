//! CLI entrypoint for the `lookup` client.
//!
//! The binary delegates to [`lookup_cli::run`], which parses arguments,
//! performs one exchange with the daemon and prints the reply.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    lookup_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
