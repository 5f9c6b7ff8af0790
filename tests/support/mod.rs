//! A minimal HTTP/1.1 responder standing in for the external transport during integration
//! tests, following the lineage's pattern of exercising flows end-to-end against scripted
//! fixtures rather than only unit-testing individual functions (§10.4).
//!
//! `curl`'s own nonblocking engine needs a real socket to drive, so this is a hand-rolled
//! blocking `TcpListener` loop on a background thread rather than an in-process fake transport.

// std
use std::{
	collections::{HashMap, VecDeque},
	io::{BufRead, BufReader, Read, Write},
	net::{SocketAddr, TcpListener, TcpStream},
	sync::{Arc, Mutex},
	thread,
};

/// One scripted response, served in order to successive requests against the same path.
pub struct ScriptedResponse {
	pub status: u16,
	pub content_type: &'static str,
	pub body: Vec<u8>,
}
impl ScriptedResponse {
	pub fn json(status: u16, body: impl Into<String>) -> Self {
		Self { status, content_type: "application/json", body: body.into().into_bytes() }
	}
}

/// A scripted HTTP server. Each path is served its queued responses in order; requesting a path
/// past its queued responses returns `500`.
pub struct MockServer {
	addr: SocketAddr,
	_handle: thread::JoinHandle<()>,
}
impl MockServer {
	/// Starts the server with the given per-path response scripts.
	pub fn start(scripts: HashMap<&'static str, Vec<ScriptedResponse>>) -> Self {
		Self::start_with(|_addr| scripts)
	}

	/// Starts the server, handing the bound address to `build_scripts` so response bodies can
	/// embed the server's own URL (e.g. a discovery document's endpoint fields) before the
	/// listener starts accepting connections.
	pub fn start_with(
		build_scripts: impl FnOnce(SocketAddr) -> HashMap<&'static str, Vec<ScriptedResponse>>,
	) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock server socket");
		let addr = listener.local_addr().expect("failed to read mock server address");
		let scripts = build_scripts(addr);
		let scripts: HashMap<&'static str, Mutex<VecDeque<ScriptedResponse>>> =
			scripts.into_iter().map(|(path, queue)| (path, Mutex::new(queue.into()))).collect();
		let scripts = Arc::new(scripts);

		let handle = thread::spawn(move || {
			for stream in listener.incoming() {
				let Ok(stream) = stream else { break };

				handle_connection(stream, &scripts);
			}
		});

		Self { addr, _handle: handle }
	}

	/// Returns `http://127.0.0.1:<port><path>`.
	pub fn url(&self, path: &str) -> String {
		format!("http://{}{path}", self.addr)
	}
}

fn handle_connection(
	mut stream: TcpStream,
	scripts: &HashMap<&'static str, Mutex<VecDeque<ScriptedResponse>>>,
) {
	let mut reader = BufReader::new(stream.try_clone().expect("failed to clone mock socket"));
	let mut request_line = String::new();

	if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
		return;
	}

	let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_owned();
	let mut content_length = 0usize;

	loop {
		let mut line = String::new();

		if reader.read_line(&mut line).unwrap_or(0) == 0 {
			break;
		}
		if line == "\r\n" || line == "\n" {
			break;
		}
		if let Some((name, value)) = line.split_once(':') {
			if name.trim().eq_ignore_ascii_case("content-length") {
				content_length = value.trim().parse().unwrap_or(0);
			}
		}
	}

	let mut body = vec![0u8; content_length];

	reader.read_exact(&mut body).ok();

	let response = scripts
		.get(path.as_str())
		.and_then(|queue| queue.lock().ok().and_then(|mut q| q.pop_front()));

	let response = response.unwrap_or(ScriptedResponse {
		status: 500,
		content_type: "text/plain",
		body: b"no scripted response left".to_vec(),
	});

	let status_line = format!(
		"HTTP/1.1 {} {}\r\n",
		response.status,
		reason_phrase(response.status)
	);
	let headers = format!(
		"Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
		response.content_type,
		response.body.len()
	);

	let _ = stream.write_all(status_line.as_bytes());
	let _ = stream.write_all(headers.as_bytes());
	let _ = stream.write_all(&response.body);
}

fn reason_phrase(status: u16) -> &'static str {
	match status {
		200 => "OK",
		400 => "Bad Request",
		401 => "Unauthorized",
		500 => "Internal Server Error",
		_ => "Unknown",
	}
}
