use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

static NEXT_PORT: AtomicU16 = AtomicU16::new(17_379);

/// Claim a loopback port for this test's exclusive use. Tests run in
/// parallel (unlike the workspace's root-requiring netns suite), so
/// each gets its own port instead of serializing on one.
pub fn claim_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

fn kvstored_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("target/debug/kvstored")
}

pub struct Server {
    child: Child,
    pub port: u16,
    pub db_file: PathBuf,
    _dir: tempfile::TempDir,
}

impl Server {
    /// Spawn `kvstored` on a freshly claimed port, pointed at a
    /// tempdir-scoped snapshot file, and wait until it accepts
    /// connections.
    pub fn spawn() -> Server {
        let port = claim_port();
        let dir = tempfile::tempdir().expect("create tempdir for kvstored snapshot");
        let db_file = dir.path().join("snap.db");

        let child = Command::new(kvstored_path())
            .args(["-p", &port.to_string(), "-b", "127.0.0.1", "-f", db_file.to_str().unwrap()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn kvstored — run `cargo build` first");

        let server = Server { child, port, db_file, _dir: dir };
        server.wait_until_accepting();
        server
    }

    fn wait_until_accepting(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        panic!("kvstored did not start accepting connections on port {}", self.port);
    }

    pub fn connect(&self) -> Conn {
        let stream = TcpStream::connect(("127.0.0.1", self.port)).expect("connect to kvstored");
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        Conn { reader: BufReader::new(stream.try_clone().unwrap()), stream }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A client connection speaking the line protocol directly.
pub struct Conn {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Conn {
    pub fn send_line(&mut self, line: &str) {
        self.stream.write_all(line.as_bytes()).unwrap();
        self.stream.write_all(b"\n").unwrap();
    }

    /// Write bytes with no framing at all — for tests that need to
    /// push past a buffer ceiling without ever completing a line.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        let _ = self.stream.write_all(bytes);
    }

    /// Drain whatever the server sends until it closes the connection
    /// or the read timeout trips, whichever comes first. Used where a
    /// fatal protocol error is expected to close the socket.
    pub fn read_to_end_best_effort(&mut self, out: &mut Vec<u8>) {
        let mut chunk = [0u8; 4096];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => return,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(_) => return,
            }
        }
    }

    /// Read a `+`/`-`/`:` single-line reply verbatim (including its
    /// trailing `\r\n`, to keep assertions byte-exact).
    pub fn read_line_reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line
    }

    /// Read a bulk reply (`$len\r\n<bytes>\r\n` or `$-1\r\n`),
    /// returning `None` for the nil case.
    pub fn read_bulk(&mut self) -> Option<Vec<u8>> {
        let header = self.read_line_reply();
        let header = header.trim_end();
        assert!(header.starts_with('$'), "expected bulk header, got {header:?}");
        let len: i64 = header[1..].parse().unwrap();
        if len < 0 {
            return None;
        }
        let mut data = vec![0u8; len as usize];
        self.reader.read_exact(&mut data).unwrap();
        let mut crlf = [0u8; 2];
        self.reader.read_exact(&mut crlf).unwrap();
        Some(data)
    }

    /// Read an array header (`*count\r\n`) and return `count`.
    pub fn read_array_header(&mut self) -> usize {
        let header = self.read_line_reply();
        let header = header.trim_end();
        assert!(header.starts_with('*'), "expected array header, got {header:?}");
        header[1..].parse().unwrap()
    }
}
