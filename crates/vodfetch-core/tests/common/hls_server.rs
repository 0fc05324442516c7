//! Minimal HTTP/1.1 server for retrieval integration tests.
//!
//! Serves a master playlist, one variant playlist per configured label, and
//! the fragment bodies. Supports failing the first N requests for a fragment
//! with HTTP 500, delaying fragment responses, and counting requests per
//! path so tests can assert which URLs were (not) fetched.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct HlsServerOptions {
    /// Variant labels advertised by the master playlist.
    pub variants: Vec<String>,
    /// Fragment index -> number of requests to answer with HTTP 500 first.
    pub fail_first: HashMap<usize, u32>,
    /// Fragment index -> artificial delay before the response.
    pub delay_ms: HashMap<usize, u64>,
}

struct ServerState {
    base: String,
    fragments: Vec<Vec<u8>>,
    opts: HlsServerOptions,
    fail_remaining: Mutex<HashMap<usize, u32>>,
    hits: Mutex<HashMap<String, u32>>,
}

pub struct HlsServer {
    state: Arc<ServerState>,
}

impl HlsServer {
    /// URL of the master playlist.
    pub fn master_url(&self) -> String {
        format!("{}master.m3u8", self.state.base)
    }

    /// Number of requests seen for an exact path (query stripped).
    pub fn hits(&self, path: &str) -> u32 {
        *self.state.hits.lock().unwrap().get(path).unwrap_or(&0)
    }

    /// Total fragment requests seen, across all variants and retries.
    pub fn fragment_requests(&self) -> u32 {
        self.state
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.ends_with(".ts"))
            .map(|(_, n)| *n)
            .sum()
    }

    /// Total variant-playlist requests seen.
    pub fn variant_playlist_requests(&self) -> u32 {
        self.state
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.ends_with("index.m3u8"))
            .map(|(_, n)| *n)
            .sum()
    }
}

/// Starts a server in a background thread serving `fragments` under the
/// configured variant labels. The server runs until the process exits.
pub fn start(fragments: Vec<Vec<u8>>, opts: HlsServerOptions) -> HlsServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(ServerState {
        base: format!("http://127.0.0.1:{}/", port),
        fail_remaining: Mutex::new(opts.fail_first.clone()),
        hits: Mutex::new(HashMap::new()),
        fragments,
        opts,
    });

    let accept_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&accept_state);
            thread::spawn(move || handle(stream, &state));
        }
    });

    HlsServer { state }
}

fn handle(mut stream: TcpStream, state: &ServerState) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let Some(path) = request_path(request) else {
        return;
    };

    *state.hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

    if path == "/master.m3u8" {
        return respond(&mut stream, "200 OK", master_body(state).as_bytes());
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() == 2 && state.opts.variants.iter().any(|v| v == parts[0]) {
        if parts[1] == "index.m3u8" {
            return respond(&mut stream, "200 OK", variant_body(state).as_bytes());
        }
        if let Some(index) = fragment_index(parts[1]) {
            return respond_fragment(&mut stream, state, index);
        }
    }

    respond(&mut stream, "404 Not Found", b"not found");
}

/// First-line path with any query string stripped.
fn request_path(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let mut words = line.split_whitespace();
    let method = words.next()?;
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    let target = words.next()?;
    Some(target.split('?').next().unwrap_or(target).to_string())
}

/// Parses "seg<N>.ts" into N.
fn fragment_index(name: &str) -> Option<usize> {
    name.strip_prefix("seg")?.strip_suffix(".ts")?.parse().ok()
}

fn master_body(state: &ServerState) -> String {
    let mut body = String::from("#EXTM3U\n");
    for (i, label) in state.opts.variants.iter().enumerate() {
        body.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={}\n{}{}/index.m3u8\n",
            3_000_000 - i * 500_000,
            state.base,
            label
        ));
    }
    body
}

fn variant_body(state: &ServerState) -> String {
    let mut body = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:2\n");
    for i in 0..state.fragments.len() {
        body.push_str(&format!("#EXTINF:2.000,\nseg{}.ts\n", i));
    }
    body.push_str("#EXT-X-ENDLIST\n");
    body
}

fn respond_fragment(stream: &mut TcpStream, state: &ServerState, index: usize) {
    {
        let mut remaining = state.fail_remaining.lock().unwrap();
        if let Some(left) = remaining.get_mut(&index) {
            if *left > 0 {
                *left -= 1;
                return respond(stream, "500 Internal Server Error", b"injected failure");
            }
        }
    }

    if let Some(ms) = state.opts.delay_ms.get(&index) {
        thread::sleep(Duration::from_millis(*ms));
    }

    match state.fragments.get(index) {
        Some(body) => respond(stream, "200 OK", body),
        None => respond(stream, "404 Not Found", b"no such fragment"),
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8]) {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(body);
}
