//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves canned responses keyed by request path; unknown paths get 404.
//! Every response closes its connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    body: Vec<u8>,
    delay: Duration,
    /// Advertise more bytes than are sent, then hang up.
    truncate: bool,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
            truncate: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: if status == 204 {
                Vec::new()
            } else {
                format!("status {}", status).into_bytes()
            },
            delay: Duration::ZERO,
            truncate: false,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn truncated(mut self) -> Self {
        self.truncate = true;
        self
    }
}

pub struct TestServer {
    base: String,
    max_in_flight: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Highest number of requests that were being handled at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Starts the server on a background thread. It runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    {
        let max_in_flight = Arc::clone(&max_in_flight);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                thread::spawn(move || handle(stream, &routes, &in_flight, &max_in_flight));
            }
        });
    }

    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        max_in_flight,
    }
}

/// A URL on a port nothing listens on.
pub fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}{}", port, path)
}

fn handle(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    in_flight: &AtomicUsize,
    max_in_flight: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let Some(path) = read_request_path(&mut stream) else {
        return;
    };

    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404));

    // Counted until the response starts, so a client that already got its
    // answer is never still counted.
    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !route.delay.is_zero() {
        thread::sleep(route.delay);
    }
    in_flight.fetch_sub(1, Ordering::SeqCst);

    let content_length = if route.truncate {
        route.body.len() + 1024
    } else {
        route.body.len()
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        reason(route.status),
        content_length
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}

fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request);
    let line = request.lines().next()?;
    line.split_whitespace().nth(1).map(str::to_string)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
