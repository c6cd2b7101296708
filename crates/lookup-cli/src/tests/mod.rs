//! Tests for the client runtime against an in-process fake daemon.

mod support;

use std::ffi::OsString;
use std::net::TcpListener;
use std::process::ExitCode;

use lookup_protocol::ActionRequest;
use rstest::rstest;
use serde_json::{Value, json};

use self::support::{FakeDaemon, fixture_path};

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(args: &[&str]) -> Outcome {
    let argv: Vec<OsString> = std::iter::once("lookup")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = crate::run(argv, &mut stdout, &mut stderr);
    Outcome {
        code,
        stdout: String::from_utf8(stdout).expect("utf8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf8 stderr"),
    }
}

fn port_args(daemon: &FakeDaemon) -> Vec<String> {
    vec![
        "--host".to_owned(),
        "127.0.0.1".to_owned(),
        "--port".to_owned(),
        daemon.port().to_string(),
    ]
}

fn invoke_against(daemon: &FakeDaemon, tail: &[&str]) -> Outcome {
    let mut owned = port_args(daemon);
    owned.extend(tail.iter().map(|arg| (*arg).to_owned()));
    let args: Vec<&str> = owned.iter().map(String::as_str).collect();
    invoke(&args)
}

#[rstest]
#[case("STRING EXISTS")]
#[case("STRING NOT FOUND")]
fn search_prints_the_answer(#[case] reply: &str) {
    let daemon = FakeDaemon::plain(reply);
    let outcome = invoke_against(&daemon, &["search", "alpha"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, format!("{reply}\n"));
    assert_eq!(daemon.request(), b"alpha\n");
}

#[rstest]
fn search_errors_exit_non_zero() {
    let daemon = FakeDaemon::plain("SERVER ERROR");
    let outcome = invoke_against(&daemon, &["search", "alpha"]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("SERVER ERROR"), "{}", outcome.stderr);
    assert!(outcome.stdout.is_empty());
}

#[rstest]
fn action_sends_an_envelope_and_prints_the_response() {
    let daemon = FakeDaemon::plain(r#"{"action":"echo","response":{"x":1}}"#);
    let outcome = invoke_against(&daemon, &["action", "echo", r#"{"x":1}"#]);

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert_eq!(
        serde_json::from_str::<Value>(outcome.stdout.trim_end()).expect("json output"),
        json!({"x": 1})
    );
    let sent: ActionRequest =
        serde_json::from_slice(daemon.request().trim_ascii_end()).expect("request envelope");
    assert_eq!(sent, ActionRequest::new("echo", json!({"x": 1})));
}

#[rstest]
fn action_content_defaults_to_null() {
    let daemon = FakeDaemon::plain(r#"{"action":"list_actions","response":["echo"]}"#);
    let outcome = invoke_against(&daemon, &["action", "list_actions"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    let sent: ActionRequest =
        serde_json::from_slice(daemon.request().trim_ascii_end()).expect("request envelope");
    assert_eq!(sent.content, Value::Null);
}

#[rstest]
fn error_envelopes_exit_non_zero() {
    let daemon = FakeDaemon::plain(r#"{"action":"error","response":"Invalid action: nope"}"#);
    let outcome = invoke_against(&daemon, &["action", "nope"]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("Invalid action: nope"), "{}", outcome.stderr);
}

#[rstest]
fn invalid_content_fails_before_connecting() {
    let outcome = invoke(&["--port", "1", "action", "echo", "{not json"]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("not valid JSON"), "{}", outcome.stderr);
}

#[rstest]
fn unreachable_daemons_are_reported() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let outcome = invoke(&["--host", "127.0.0.1", "--port", &port.to_string(), "search", "x"]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("failed to connect"), "{}", outcome.stderr);
}

#[rstest]
fn help_goes_to_stdout() {
    let outcome = invoke(&["--help"]);
    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("search"));
}

#[rstest]
#[case(&["--ca-file", "ca.pem", "search", "x"])]
#[case(&["search"])]
fn usage_errors_exit_with_two(#[case] args: &[&str]) {
    let outcome = invoke(args);
    assert_eq!(outcome.code, ExitCode::from(2));
    assert!(!outcome.stderr.is_empty());
}

#[rstest]
fn tls_without_ca_file_is_rejected() {
    let outcome = invoke(&["--tls", "search", "x"]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("--ca-file"), "{}", outcome.stderr);
}

#[rstest]
fn tls_search_verifies_the_server() {
    let daemon = FakeDaemon::tls("STRING EXISTS");
    let ca = fixture_path("ca.pem");
    let outcome = invoke_against(
        &daemon,
        &["--tls", "--ca-file", ca.as_str(), "--server-name", "localhost", "search", "beta"],
    );

    assert_eq!(outcome.code, ExitCode::SUCCESS, "{}", outcome.stderr);
    assert_eq!(outcome.stdout, "STRING EXISTS\n");
    assert_eq!(daemon.request(), b"beta\n");
}
