//! Thin wrapper over `curl`'s multi interface: issues one non-blocking HTTPS request at a time
//! and streams its response body into a capped scratch buffer (§4.2).

// std
use std::sync::{Arc, Mutex};
// self
use crate::{
	_prelude::*,
	config::DebugOptions,
	error::{Error, ProtocolErrorKind, SetupError},
	json::MAX_BODY_BYTES,
	multiplexer::{Mode, Multiplexer},
};

/// HTTP method used by a request builder (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	/// `GET`, used by discovery.
	Get,
	/// `POST`, used by device-authorization and token requests.
	Post,
}

/// Client identification mode applied to an outgoing request (§4.4.4).
#[derive(Clone, Debug)]
pub enum ClientAuth {
	/// `client_id`/`client_secret` sent as HTTP Basic credentials.
	Basic {
		/// Username, pre-urlencoded by the caller.
		username: String,
		/// Password, pre-urlencoded by the caller.
		password: String,
	},
	/// No HTTP auth; `client_id` was appended to the request body instead.
	None,
}

/// Outcome of [`Transport::pump`].
#[derive(Debug)]
pub enum PumpResult {
	/// The request is still in flight; the host should keep waiting on the multiplexer.
	Pending,
	/// The request completed (successfully or not); call [`Transport::finish`] next.
	Done,
}

/// A pending socket registration change reported by curl's `socket_function` callback, queued
/// until the next [`Transport::pump`] call applies it to the [`Multiplexer`] (§4.1, §4.2).
struct PendingSocket {
	fd: std::os::raw::c_int,
	mode: Mode,
}

type SocketQueue = Arc<Mutex<Vec<PendingSocket>>>;
type TimeoutSlot = Arc<Mutex<Option<Option<Duration>>>>;

struct Collector {
	body: Vec<u8>,
	content_type: Option<String>,
	too_large: bool,
}
impl curl::easy::Handler for Collector {
	fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
		if self.body.len() + data.len() > MAX_BODY_BYTES {
			self.too_large = true;

			// Returning fewer bytes than were handed in tells curl to abort the transfer.
			return Ok(0);
		}

		self.body.extend_from_slice(data);

		Ok(data.len())
	}

	fn header(&mut self, data: &[u8]) -> bool {
		if let Ok(line) = std::str::from_utf8(data) {
			if let Some((name, value)) = line.split_once(':') {
				if name.trim().eq_ignore_ascii_case("content-type") {
					self.content_type = Some(value.trim().to_owned());
				}
			}
		}

		true
	}
}

/// Non-blocking HTTP transport adapter driving `curl`'s multi interface (§4.2).
pub struct Transport {
	multi: curl::multi::Multi,
	handle: Option<curl::multi::Easy2Handle<Collector>>,
	sockets: SocketQueue,
	timeout: TimeoutSlot,
}
impl Transport {
	/// Creates a transport, ensuring the one-time global library initialization has run (§5).
	pub fn new() -> Result<Self, SetupError> {
		crate::init::ensure_initialized()?;

		let mut multi = curl::multi::Multi::new();
		let sockets: SocketQueue = Arc::new(Mutex::new(Vec::new()));
		let timeout: TimeoutSlot = Arc::new(Mutex::new(None));

		let sockets_cb = Arc::clone(&sockets);

		multi
			.socket_function(move |socket, events, _token| {
				let mode = if events.input() && events.output() {
					Mode::ReadWrite
				} else if events.output() {
					Mode::Write
				} else if events.input() {
					Mode::Read
				} else {
					Mode::Remove
				};

				if let Ok(mut queue) = sockets_cb.lock() {
					queue.push(PendingSocket { fd: socket, mode });
				}
			})
			.map_err(|_| SetupError::TransportInit)?;

		let timeout_cb = Arc::clone(&timeout);

		multi
			.timer_function(move |delay| {
				if let Ok(mut slot) = timeout_cb.lock() {
					*slot = Some(delay);
				}

				true
			})
			.map_err(|_| SetupError::TransportInit)?;

		Ok(Self { multi, handle: None, sockets, timeout })
	}

	/// Begins a new request; only one may be in flight at a time (I1).
	pub fn begin(
		&mut self,
		url: &Url,
		method: Method,
		body: Option<Vec<u8>>,
		client_auth: ClientAuth,
		debug: &DebugOptions,
	) -> Result<(), Error> {
		let secure = url.scheme() == "https" || (debug.enabled && url.scheme() == "http");

		if !secure {
			return Err(SetupError::Config(crate::config::ConfigError::InsecureDiscoveryUri).into());
		}

		let mut easy = curl::easy::Easy2::new(Collector {
			body: Vec::new(),
			content_type: None,
			too_large: false,
		});

		easy.url(url.as_str()).map_err(transport_setup_err)?;
		easy.verbose(debug.enabled).map_err(transport_setup_err)?;

		if let Some(ca_file) = &debug.ca_file {
			easy.cainfo(ca_file).map_err(transport_setup_err)?;
		}

		let mut headers = curl::easy::List::new();

		// Sending `Accept:` with no value suppresses curl's default `Accept: */*`.
		headers.append("Accept:").map_err(transport_setup_err)?;

		match &client_auth {
			ClientAuth::Basic { username, password } => {
				easy.username(username).map_err(transport_setup_err)?;
				easy.password(password).map_err(transport_setup_err)?;
				easy.http_auth(&{
					let mut auth = curl::easy::Auth::new();

					auth.basic(true);
					auth
				})
				.map_err(transport_setup_err)?;
			},
			ClientAuth::None => {},
		}

		easy.http_headers(headers).map_err(transport_setup_err)?;

		match method {
			Method::Get => {
				easy.get(true).map_err(transport_setup_err)?;
			},
			Method::Post => {
				easy.post(true).map_err(transport_setup_err)?;

				if let Some(body) = body {
					easy.post_field_size(body.len() as u64).map_err(transport_setup_err)?;
					easy.post_fields_copy(&body).map_err(transport_setup_err)?;
				}
			},
		}

		let handle = self.multi.add2(easy).map_err(|_| SetupError::TransportInit)?;

		self.handle = Some(handle);

		Ok(())
	}

	/// Drives the in-flight request forward, reporting socket changes and the next timeout hint
	/// to `mux` (§4.2's "drive all handles" fallback path).
	///
	/// `context` names the step in flight, used only to label a transport failure correctly (the
	/// same [`Transport`] instance is reused across every step of one flow).
	pub fn pump(
		&mut self,
		mux: &mut Multiplexer,
		context: crate::error::Context,
	) -> Result<PumpResult, Error> {
		let still_running = self
			.multi
			.perform()
			.map_err(|e| transport_network_err(context, e.to_string()))?;

		self.apply_pending_sockets(mux)?;
		self.apply_pending_timeout(mux);

		if still_running > 0 {
			return Ok(PumpResult::Pending);
		}

		let mut failure = None;

		self.multi.messages(|message| {
			if let Some(Err(e)) = message.result() {
				failure = Some(e.to_string());
			}
		});

		if let Some(detail) = failure {
			return Err(transport_network_err(context, detail));
		}

		Ok(PumpResult::Done)
	}

	/// Finalizes a completed request, removing its handle and returning status/body/content-type.
	pub fn finish(&mut self, context: crate::error::Context) -> Result<(u32, String, Vec<u8>), Error> {
		let handle = self
			.handle
			.take()
			.ok_or_else(|| transport_network_err(context, "no request in flight".to_owned()))?;
		let status = handle.response_code().unwrap_or(0);
		let (content_type, body, too_large) = {
			let collector = handle.get_ref();

			(collector.content_type.clone(), collector.body.clone(), collector.too_large)
		};

		self.multi
			.remove2(handle)
			.map_err(|_| transport_network_err(context, "failed to finalize request".to_owned()))?;

		if too_large {
			return Err(Error::Protocol { context, kind: ProtocolErrorKind::ResponseTooLarge });
		}

		Ok((status, content_type.unwrap_or_default(), body))
	}

	fn apply_pending_sockets(&mut self, mux: &mut Multiplexer) -> Result<(), Error> {
		let pending: Vec<PendingSocket> =
			self.sockets.lock().map(|mut q| std::mem::take(&mut *q)).unwrap_or_default();

		for socket in pending {
			mux.register(socket.fd as std::os::fd::RawFd, socket.mode)
				.map_err(Error::Setup)?;
		}

		Ok(())
	}

	fn apply_pending_timeout(&mut self, mux: &mut Multiplexer) {
		let next = self.timeout.lock().ok().and_then(|mut slot| slot.take());

		if let Some(delay) = next {
			mux.set_timer(delay);
		}
	}
}

fn transport_setup_err(e: curl::Error) -> Error {
	Error::Setup(SetupError::TransportConfig(e.to_string()))
}

fn transport_network_err(context: crate::error::Context, detail: String) -> Error {
	Error::Transport {
		context,
		detail: "network error occurred while calling the endpoint".to_owned(),
		transport_detail: clean_transport_detail(&detail),
	}
}

/// Moves a trailing newline before the closing paren, matching libcurl's own scratch-buffer
/// formatting convention (§4.6).
fn clean_transport_detail(detail: &str) -> String {
	detail.trim_end_matches('\n').to_owned()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clean_transport_detail_strips_trailing_newline() {
		assert_eq!(clean_transport_detail("connection refused\n"), "connection refused");
	}
}
