//! Reference client for the `lookupd` daemon.
//!
//! `lookup search <text>` asks whether a line occurs in the corpus of a
//! daemon running in search mode. `lookup action <name> [json]` invokes an
//! action on a daemon running in dispatch mode and prints the handler's
//! response. Both exit non-zero when the daemon reports an error.

mod cli;
mod errors;
mod transport;

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::process::ExitCode;

use clap::Parser;
use lookup_protocol::{ActionRequest, ActionResponse, FRAME_TERMINATOR, SearchReply};
use serde_json::Value;

use self::cli::{Cli, CliCommand};
use self::errors::AppError;
use self::transport::{Target, TlsTarget, connect};

const USAGE_EXIT: u8 = 2;

/// Runs the client using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if error.use_stderr() => {
            let _ = write!(stderr, "{}", AppError::CliUsage(error));
            return ExitCode::from(USAGE_EXIT);
        }
        Err(error) => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
    };

    let result = execute(&cli)
        .and_then(|reply| writeln!(stdout, "{reply}").map_err(AppError::ForwardResponse));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "lookup: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<String, AppError> {
    let target = target(cli)?;
    match &cli.command {
        CliCommand::Search { text } => search(&target, text),
        CliCommand::Action { name, content } => action(&target, name, content.as_deref()),
    }
}

fn target(cli: &Cli) -> Result<Target, AppError> {
    let tls = if cli.tls {
        let ca_file = cli.ca_file.clone().ok_or(AppError::MissingCaFile)?;
        let server_name = cli.server_name.clone().unwrap_or_else(|| cli.host.clone());
        Some(TlsTarget {
            ca_file,
            server_name,
        })
    } else {
        None
    };
    Ok(Target {
        host: cli.host.clone(),
        port: cli.port,
        tls,
    })
}

fn search(target: &Target, text: &str) -> Result<String, AppError> {
    let line = exchange(target, text.as_bytes())?;
    match SearchReply::parse(&line) {
        Some(reply) if reply.is_answer() => Ok(reply.as_str().to_owned()),
        _ => Err(AppError::Daemon(line)),
    }
}

fn action(target: &Target, name: &str, content: Option<&str>) -> Result<String, AppError> {
    let value = content
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(AppError::InvalidContent)?
        .unwrap_or(Value::Null);
    let payload = serde_json::to_vec(&ActionRequest::new(name, value))
        .map_err(AppError::SerialiseRequest)?;

    let line = exchange(target, &payload)?;
    let response: ActionResponse = serde_json::from_str(&line).map_err(AppError::ParseMessage)?;
    if response.is_error() {
        let message = match response.response {
            Value::String(message) => message,
            other => other.to_string(),
        };
        return Err(AppError::Daemon(message));
    }
    Ok(response.response.to_string())
}

/// Sends one framed request and reads one reply line.
fn exchange(target: &Target, payload: &[u8]) -> Result<String, AppError> {
    let mut connection = connect(target)?;
    let mut frame = payload.to_vec();
    frame.push(FRAME_TERMINATOR);
    connection
        .write_all(&frame)
        .and_then(|()| connection.flush())
        .map_err(AppError::SendRequest)?;

    let mut line = String::new();
    let read = BufReader::new(&mut connection)
        .read_line(&mut line)
        .map_err(AppError::ReadResponse)?;
    connection.finish();
    if read == 0 {
        return Err(AppError::EmptyReply);
    }
    Ok(line.trim_end().to_owned())
}

#[cfg(test)]
mod tests;
