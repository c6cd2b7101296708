//! Test helpers for the transport module.

use std::fs::File;
use std::io::BufReader;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use super::{AcceptedConnection, ConnectionHandler};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _connection: AcceptedConnection) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lets a test hold workers inside `handle` until released.
#[derive(Default)]
pub(crate) struct Gate {
    pub(crate) entered: AtomicUsize,
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    pub(crate) fn release(&self) {
        *self.open.lock().expect("gate lock") = true;
        self.opened.notify_all();
    }

    pub(crate) fn wait_until_entered(&self, expected: usize) -> bool {
        wait_for_count(&self.entered, expected)
    }

    fn pass(&self) {
        let mut open = self.open.lock().expect("gate lock");
        while !*open {
            open = self.opened.wait(open).expect("gate wait");
        }
    }
}

pub(crate) struct BlockingHandler {
    gate: Arc<Gate>,
}

impl BlockingHandler {
    pub(crate) fn new() -> (Arc<Gate>, Arc<Self>) {
        let gate = Arc::new(Gate::default());
        let handler = Arc::new(Self {
            gate: Arc::clone(&gate),
        });
        (gate, handler)
    }
}

impl ConnectionHandler for BlockingHandler {
    fn handle(&self, _connection: AcceptedConnection) {
        self.gate.entered.fetch_add(1, Ordering::SeqCst);
        self.gate.pass();
    }
}

pub(crate) fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

pub(crate) fn fixture_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

/// Certificate and key signed by the fixture CA for `localhost`.
pub(crate) fn server_tls_files() -> (Utf8PathBuf, Utf8PathBuf) {
    (fixture_path("server.pem"), fixture_path("server.key"))
}

/// Opens a TLS client connection that trusts the fixture CA.
pub(crate) fn tls_client(address: SocketAddr) -> StreamOwned<ClientConnection, TcpStream> {
    let mut roots = RootCertStore::empty();
    let file = File::open(fixture_path("ca.pem")).expect("open fixture CA");
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        roots.add(cert.expect("parse fixture CA")).expect("trust fixture CA");
    }
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("protocol versions")
    .with_root_certificates(roots)
    .with_no_client_auth();
    let name = ServerName::try_from("localhost").expect("server name");
    let connection = ClientConnection::new(Arc::new(config), name).expect("client connection");
    let socket = TcpStream::connect(address).expect("connect");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    StreamOwned::new(connection, socket)
}
