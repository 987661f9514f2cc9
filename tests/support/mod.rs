//! Test support
//!
//! - `MockConnector`: in-memory streams with scripted responses, counting
//!   opened connections and written bytes
//! - `FakeDaemon`: a tiny text-protocol server on a local TCP port

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use memtext::network::{Connector, Endpoint};

// =============================================================================
// Mock Connector
// =============================================================================

#[derive(Default)]
struct MockState {
    opens: usize,
    responses: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    refuse: bool,
}

/// Connector handing out in-memory streams that share one response script
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose streams answer with `responses`, one per read burst
    pub fn with_responses(responses: &[&[u8]]) -> Self {
        let connector = Self::new();
        for response in responses {
            connector.push_response(response);
        }
        connector
    }

    /// Connector that fails every open
    pub fn refusing() -> Self {
        let connector = Self::new();
        connector.state.lock().unwrap().refuse = true;
        connector
    }

    pub fn push_response(&self, response: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(response.to_vec());
    }

    /// Number of streams opened so far
    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    /// Everything written by all streams
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn open(&self, _endpoint: &Endpoint, _timeout: Option<Duration>) -> io::Result<MockStream> {
        let mut state = self.state.lock().unwrap();
        if state.refuse {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }
        state.opens += 1;

        Ok(MockStream {
            state: Arc::clone(&self.state),
            pending: Cursor::new(Vec::new()),
        })
    }
}

/// In-memory stream of a `MockConnector`
pub struct MockStream {
    state: Arc<Mutex<MockState>>,
    pending: Cursor<Vec<u8>>,
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.position() as usize >= self.pending.get_ref().len() {
            match self.state.lock().unwrap().responses.pop_front() {
                Some(next) => self.pending = Cursor::new(next),
                // Script exhausted: behave like a closed peer
                None => return Ok(0),
            }
        }
        self.pending.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.lock().unwrap().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Fake Daemon
// =============================================================================

type Store = Arc<Mutex<HashMap<String, (u32, Vec<u8>)>>>;

/// Minimal in-process daemon speaking `set`, `get` and `delete`
pub struct FakeDaemon {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
}

impl FakeDaemon {
    /// Bind to an ephemeral local port and serve in the background
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let store: Store = Arc::new(Mutex::new(HashMap::new()));

        let counter = Arc::clone(&accepted);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let _ = serve(stream, store);
                });
            }
        });

        Self { addr, accepted }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

fn serve(stream: TcpStream, store: Store) -> io::Result<()> {
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let fields: Vec<&str> = line.trim_end().split(' ').collect();

        let reply = match fields.as_slice() {
            ["set", key, flags, _exptime, bytes] => {
                let (Ok(flags), Ok(bytes)) = (flags.parse::<u32>(), bytes.parse::<usize>()) else {
                    writer.write_all(b"CLIENT_ERROR bad command line format\r\n")?;
                    continue;
                };
                let mut data = vec![0u8; bytes + 2];
                reader.read_exact(&mut data)?;
                data.truncate(bytes);
                store.lock().unwrap().insert(key.to_string(), (flags, data));
                b"STORED\r\n".to_vec()
            }
            ["get", key] => match store.lock().unwrap().get(*key) {
                Some((flags, data)) => {
                    let mut reply = format!("VALUE {} {} {}\r\n", key, flags, data.len()).into_bytes();
                    reply.extend_from_slice(data);
                    reply.extend_from_slice(b"\r\nEND\r\n");
                    reply
                }
                None => b"END\r\n".to_vec(),
            },
            ["delete", key] => match store.lock().unwrap().remove(*key) {
                Some(_) => b"DELETED\r\n".to_vec(),
                None => b"NOT_FOUND\r\n".to_vec(),
            },
            _ => b"ERROR\r\n".to_vec(),
        };

        writer.write_all(&reply)?;
    }
}
