//! The `lookupd` daemon binary.

use std::process::ExitCode;

use lookupd::{BootstrapError, ConfigError, LaunchError};

fn main() -> ExitCode {
    match lookupd::run_daemon() {
        Ok(_) => ExitCode::SUCCESS,
        Err(LaunchError::Bootstrap {
            source:
                BootstrapError::Configuration {
                    source: ConfigError::Arguments(error),
                },
        }) => error.exit(),
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "telemetry may not be installed when startup fails"
)]
fn report(error: &LaunchError) {
    eprintln!("lookupd: {error}");
}
