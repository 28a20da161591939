//! Fake site server for transport and end-to-end tests.
//!
//! Listens on an ephemeral TCP port and answers one HTTP request per
//! connection with the next canned response, recording what it received.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

/// Canned reply for one connection.
#[derive(Debug, Clone)]
pub(crate) struct CannedResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
    pub(crate) location: Option<String>,
}

impl CannedResponse {
    pub(crate) fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            location: None,
        }
    }

    pub(crate) fn redirect(status: u16, location: &str) -> Self {
        Self {
            location: Some(location.to_owned()),
            ..Self::status(status, "")
        }
    }
}

/// Request observed by [`FakeSiteServer`].
#[derive(Debug, Clone, Default)]
pub(crate) struct ReceivedRequest {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: String,
}

impl ReceivedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn form_value(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }
}

/// A thread-backed HTTP server that serves scripted responses in order.
pub(crate) struct FakeSiteServer {
    port: u16,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeSiteServer {
    /// Spawns a server that answers `responses.len()` connections.
    pub(crate) fn spawn(responses: Vec<CannedResponse>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake site server")?;
        listener
            .set_nonblocking(true)
            .context("fake site server nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<ReceivedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let requests_clone = Arc::clone(&requests);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve(&listener, &responses, &requests_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            requests,
            result,
            handle: Some(handle),
        })
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Site URL pointing at this server under `context`.
    pub(crate) fn site_url(&self, context: &str) -> String {
        format!("http://127.0.0.1:{}{context}", self.port)
    }

    /// Waits for the server thread and returns the recorded requests.
    pub(crate) fn take_requests(&mut self) -> Result<Vec<ReceivedRequest>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake site server thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake site server result: {error}"))?
            .take()
        {
            outcome.context("fake site server failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve(
        listener: &TcpListener,
        responses: &[CannedResponse],
        requests: &Arc<Mutex<Vec<ReceivedRequest>>>,
    ) -> Result<()> {
        for response in responses {
            let Some(stream) = Self::accept(listener)? else {
                // The client stopped early; leave the remaining script unused.
                return Ok(());
            };
            let request = read_request(&stream)?;
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(request);
            write_response(stream, response).context("write response")?;
        }
        Ok(())
    }

    fn accept(listener: &TcpListener) -> Result<Option<TcpStream>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .context("blocking client stream")?;
                    stream
                        .set_read_timeout(Some(Duration::from_secs(5)))
                        .context("client read timeout")?;
                    return Ok(Some(stream));
                }
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }
}

impl Drop for FakeSiteServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request(stream: &TcpStream) -> Result<ReceivedRequest> {
    let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
    let mut line = String::new();
    reader.read_line(&mut line).context("read request line")?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let target = parts.next().unwrap_or_default().to_owned();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        line.clear();
        reader.read_line(&mut line).context("read header")?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let value = value.trim().to_owned();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().context("parse content length")?;
            }
            headers.push((name.to_owned(), value));
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).context("read request body")?;
    Ok(ReceivedRequest {
        method,
        target,
        headers,
        body: String::from_utf8(body).context("request body utf8")?,
    })
}

fn write_response(mut stream: TcpStream, response: &CannedResponse) -> io::Result<()> {
    let reason = match response.status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    write!(stream, "HTTP/1.1 {} {reason}\r\n", response.status)?;
    if let Some(location) = &response.location {
        write!(stream, "Location: {location}\r\n")?;
    }
    write!(
        stream,
        "Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    )?;
    stream.flush()
}
