use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// How the daemon resolves a request once it has been read.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ServiceMode {
    /// Exact-match line search against the corpus; one reply per connection.
    #[default]
    Search,
    /// JSON `{action, content}` requests routed through the action registry.
    Dispatch,
}

/// Errors encountered while parsing a [`LogFormat`] or [`ServiceMode`] from text.
pub type ModeParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    fn parses_log_format(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>().expect("log format"), expected);
    }

    #[rstest]
    #[case("search", ServiceMode::Search)]
    #[case("Dispatch", ServiceMode::Dispatch)]
    fn parses_service_mode(#[case] input: &str, #[case] expected: ServiceMode) {
        assert_eq!(input.parse::<ServiceMode>().expect("service mode"), expected);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!("multiplex".parse::<ServiceMode>().is_err());
    }
}
