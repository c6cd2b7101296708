//! Single-shot fake daemon for client tests.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use camino::Utf8PathBuf;
use rustls::{ServerConfig, ServerConnection, StreamOwned};

pub(super) fn fixture_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

/// Accepts one connection, records the request line and answers `reply`.
pub(super) struct FakeDaemon {
    port: u16,
    request: Arc<Mutex<Vec<u8>>>,
}

impl FakeDaemon {
    pub(super) fn plain(reply: &str) -> Self {
        Self::spawn(reply, |stream| Box::new(stream))
    }

    pub(super) fn tls(reply: &str) -> Self {
        let config = Arc::new(server_config());
        Self::spawn(reply, move |stream| {
            let connection = ServerConnection::new(Arc::clone(&config)).expect("server connection");
            Box::new(StreamOwned::new(connection, stream))
        })
    }

    fn spawn<F>(reply: &str, wrap: F) -> Self
    where
        F: FnOnce(TcpStream) -> Box<dyn Duplex> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake daemon");
        let port = listener.local_addr().expect("local addr").port();
        let request = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&request);
        let framed = format!("{reply}\n");
        thread::spawn(move || {
            let (socket, _) = listener.accept().expect("accept client");
            let mut stream = wrap(socket);
            let mut line = Vec::new();
            BufReader::new(&mut stream)
                .read_until(b'\n', &mut line)
                .expect("read request");
            *recorded.lock().expect("request lock") = line;
            stream.write_all(framed.as_bytes()).expect("write reply");
            stream.close();
        });
        Self { port, request }
    }

    pub(super) const fn port(&self) -> u16 {
        self.port
    }

    pub(super) fn request(&self) -> Vec<u8> {
        self.request.lock().expect("request lock").clone()
    }
}

pub(super) trait Duplex: Read + Write + Send {
    fn close(&mut self);
}

impl Duplex for TcpStream {
    fn close(&mut self) {
        self.flush().expect("flush reply");
    }
}

impl Duplex for StreamOwned<ServerConnection, TcpStream> {
    fn close(&mut self) {
        self.conn.send_close_notify();
        self.flush().expect("flush close_notify");
    }
}

fn server_config() -> ServerConfig {
    let certs = rustls_pemfile::certs(&mut BufReader::new(
        File::open(fixture_path("server.pem")).expect("open certificate"),
    ))
    .collect::<Result<Vec<_>, _>>()
    .expect("parse certificate");
    let key = rustls_pemfile::private_key(&mut BufReader::new(
        File::open(fixture_path("server.key")).expect("open key"),
    ))
    .expect("parse key")
    .expect("key present");
    ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .expect("server config")
}
