//! Scenario world that runs a real daemon on a loopback port.

use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use lookup_config::{Config, ServiceMode};
use serde_json::Value;
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, ConfigLoader, StaticConfigLoader, bootstrap_with};
use crate::dispatch::{ActionRegistry, HandlerError};
use crate::runtime::{RunningDaemon, ShutdownSummary};
use crate::telemetry::TelemetryHandle;
use crate::transport::test_utils::{server_tls_files, tls_client};

use super::RecordingHealthReporter;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Action whose handler sleeps long enough for shutdown to overtake it.
pub const SLOW_ACTION: &str = "slow";
const SLOW_DELAY: Duration = Duration::from_millis(300);
/// Pause between a search client connecting and sending its query.
const HESITATION: Duration = Duration::from_millis(200);

pub struct DaemonWorld {
    dir: TempDir,
    pub config: Config,
    pub registry: ActionRegistry,
    pub reporter: Arc<RecordingHealthReporter>,
    loader: Option<Box<dyn ConfigLoader>>,
    running: Option<RunningDaemon>,
    pub bootstrap_error: Option<BootstrapError>,
    pub telemetry: Option<TelemetryHandle>,
    pub replies: Vec<String>,
    pending: Option<JoinHandle<String>>,
    slow_entered: Arc<AtomicBool>,
    pub summary: Option<ShutdownSummary>,
    pub stop_latency: Option<Duration>,
    pub stopped_before_wait: bool,
}

impl DaemonWorld {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temporary directory");
        let data_path =
            Utf8PathBuf::from_path_buf(dir.path().join("corpus.txt")).expect("utf8 corpus path");
        let mut config = Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            data_path,
            log_filter: "off".to_owned(),
            ..Config::default()
        };
        config.timeouts.accept = Duration::from_millis(50);
        config.timeouts.io = Duration::from_secs(2);
        config.timeouts.drain = Duration::from_secs(3);
        config.pool.workers = 4;

        Self {
            dir,
            config,
            registry: ActionRegistry::with_builtins(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            loader: None,
            running: None,
            bootstrap_error: None,
            telemetry: None,
            replies: Vec::new(),
            pending: None,
            slow_entered: Arc::new(AtomicBool::new(false)),
            summary: None,
            stop_latency: None,
            stopped_before_wait: false,
        }
    }

    pub fn write_corpus(&self, lines: &[&str]) {
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(&self.config.data_path, text).expect("write corpus");
    }

    pub fn append_line(&self, line: &str) {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.config.data_path)
            .expect("open corpus for append");
        writeln!(file, "{line}").expect("append corpus line");
    }

    pub fn enable_tls(&mut self) {
        let (cert, key) = server_tls_files();
        self.config.tls.enabled = true;
        self.config.tls.cert_path = cert;
        self.config.tls.key_path = key;
    }

    pub fn enable_tls_without_material(&mut self) {
        self.config.tls.enabled = true;
        self.config.tls.cert_path =
            Utf8PathBuf::from_path_buf(self.dir.path().join("missing.pem")).expect("utf8 path");
    }

    pub const fn use_dispatch_mode(&mut self) {
        self.config.mode = ServiceMode::Dispatch;
    }

    pub fn use_loader(&mut self, loader: Box<dyn ConfigLoader>) {
        self.loader = Some(loader);
    }

    pub fn register_slow_action(&self) {
        let entered = Arc::clone(&self.slow_entered);
        self.registry
            .register(SLOW_ACTION, move |content: &Value| -> Result<Value, HandlerError> {
                entered.store(true, Ordering::SeqCst);
                thread::sleep(SLOW_DELAY);
                Ok(content.clone())
            })
            .expect("register slow action");
    }

    pub fn start(&mut self) {
        let fallback = StaticConfigLoader::new(self.config.clone());
        let loader: &dyn ConfigLoader = self.loader.as_deref().unwrap_or(&fallback);
        let reporter = Arc::clone(&self.reporter);
        match bootstrap_with(loader, reporter, self.registry.clone()) {
            Ok(daemon) => {
                self.telemetry = Some(daemon.telemetry());
                self.running = Some(daemon.start().expect("start daemon"));
            }
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    pub const fn running(&self) -> &RunningDaemon {
        self.running.as_ref().expect("daemon should be running")
    }

    pub fn address(&self) -> SocketAddr {
        self.running().local_addr()
    }

    /// One search exchange on a fresh connection.
    pub fn query(&self, text: &str) -> String {
        query(self.address(), text)
    }

    pub fn query_tls(&self, text: &str) -> String {
        let mut client = tls_client(self.address());
        client.write_all(text.as_bytes()).expect("send query");
        client.flush().expect("flush query");
        let mut reply = String::new();
        client.read_to_string(&mut reply).expect("read reply");
        reply.trim_end().to_owned()
    }

    /// Sends each request on one persistent connection and records replies.
    pub fn send_requests(&mut self, requests: &[&str]) {
        let stream = connect(self.address());
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut writer = stream;
        for request in requests {
            writer.write_all(request.as_bytes()).expect("send request");
            let mut line = String::new();
            reader.read_line(&mut line).expect("read reply");
            self.replies.push(line.trim_end().to_owned());
        }
    }

    /// Starts a client blocked on [`SLOW_ACTION`] and waits until the
    /// handler is running.
    pub fn start_slow_request(&mut self) {
        let address = self.address();
        self.pending = Some(thread::spawn(move || {
            let mut stream = connect(address);
            stream
                .write_all(br#"{"action":"slow","content":"done"}"#)
                .expect("send slow request");
            let mut reply = String::new();
            BufReader::new(stream)
                .read_line(&mut reply)
                .expect("read slow reply");
            reply.trim_end().to_owned()
        }));
        let deadline = Instant::now() + CLIENT_TIMEOUT;
        while !self.slow_entered.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "slow action never started");
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Connects a search client and waits until the daemon has accepted it.
    /// The client sends `text` only after [`HESITATION`].
    pub fn start_hesitant_query(&mut self, text: &str) {
        let address = self.address();
        let request = text.to_owned();
        self.pending = Some(thread::spawn(move || {
            let mut stream = connect(address);
            thread::sleep(HESITATION);
            stream.write_all(request.as_bytes()).expect("send query");
            let mut reply = String::new();
            stream.read_to_string(&mut reply).expect("read reply");
            reply.trim_end().to_owned()
        }));
        let deadline = Instant::now() + CLIENT_TIMEOUT;
        while self.running().active_connections().is_empty() {
            assert!(Instant::now() < deadline, "search client was never accepted");
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn pending_reply(&mut self) -> String {
        self.pending
            .take()
            .expect("a request should be pending")
            .join()
            .expect("client thread")
    }

    pub fn shutdown(&mut self) {
        let running = self.running.take().expect("daemon should be running");
        let started = Instant::now();
        running.request_shutdown();
        assert!(running.shutdown_flag().load(Ordering::SeqCst));
        let deadline = started + self.config.timeouts.drain + CLIENT_TIMEOUT;
        while !running.is_stopped() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        self.stopped_before_wait = running.is_stopped();
        self.summary = Some(running.wait().expect("daemon stops cleanly"));
        self.stop_latency = Some(started.elapsed());
    }
}

impl Drop for DaemonWorld {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.request_shutdown();
            let _summary = running.wait();
        }
    }
}

pub fn connect(address: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(address).expect("connect to daemon");
    stream
        .set_read_timeout(Some(CLIENT_TIMEOUT))
        .expect("client read timeout");
    stream
}

pub fn query(address: SocketAddr, text: &str) -> String {
    let mut stream = connect(address);
    stream.write_all(text.as_bytes()).expect("send query");
    let mut reply = String::new();
    stream.read_to_string(&mut reply).expect("read reply");
    reply.trim_end().to_owned()
}

pub fn world() -> RefCell<DaemonWorld> {
    RefCell::new(DaemonWorld::new())
}
