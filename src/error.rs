//! Error taxonomy surfaced by the engine to the host connection.
//!
//! Mirrors the three-part assembled message the host is expected to show a user: an optional
//! context phrase naming the step that failed, a detail describing what went wrong, and an
//! optional low-level transport string in parentheses.

// self
use crate::_prelude::*;

/// Crate-wide result alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fixed context phrase named at each step entry (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Context {
	/// Discovery GET failed at the transport level.
	Discovery,
	/// Discovery document failed to parse as a valid metadata document.
	DiscoveryParse,
	/// Discovery document failed post-parse validation (issuer/grant checks).
	DiscoveryValidate,
	/// Device-authorization POST failed at the transport level.
	DeviceAuthz,
	/// Device-authorization response failed to parse.
	DeviceAuthzParse,
	/// Token endpoint returned an error object that failed to parse.
	TokenErrorParse,
	/// Token endpoint's success response failed to parse.
	TokenParse,
	/// Token endpoint request failed at the transport level or returned a fatal error.
	Token,
}
impl Context {
	/// Returns the fixed phrase shown to the host (§4.6).
	pub const fn phrase(self) -> &'static str {
		match self {
			Context::Discovery => "failed to fetch OpenID discovery document",
			Context::DiscoveryParse => "failed to parse OpenID discovery document",
			Context::DiscoveryValidate => "cannot run OAuth device authorization",
			Context::DeviceAuthz => "failed to obtain device authorization",
			Context::DeviceAuthzParse => "failed to parse device authorization",
			Context::TokenErrorParse => "failed to parse token error response",
			Context::TokenParse => "failed to parse access token response",
			Context::Token => "failed to obtain access token",
		}
	}
}
impl Display for Context {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.phrase())
	}
}

/// Canonical engine error surfaced through [`Result`].
///
/// Every variant renders through [`Display`] as the assembled three-part message (§4.6 / §10.1)
/// so the host can copy it verbatim into its own connection error buffer.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Transport library or multiplexer could not be initialized.
	#[error(transparent)]
	Setup(#[from] SetupError),
	/// Underlying HTTP transport reported a failure (connect, TLS, DNS, I/O).
	#[error("{context}: {detail} ({transport_detail})")]
	Transport {
		/// Step that was in flight.
		context: Context,
		/// Human summary of what failed.
		detail: String,
		/// Free-form scratch string from the transport library.
		transport_detail: String,
	},
	/// Response failed schema validation: bad status, missing/duplicate field, type mismatch,
	/// non-JSON content type, invalid UTF-8, embedded NUL, or an oversized body.
	#[error("{context}: {kind}")]
	Protocol {
		/// Step that was in flight.
		context: Context,
		/// What about the response was invalid.
		kind: ProtocolErrorKind,
	},
	/// Discovery's `issuer` did not byte-exactly equal the configured issuer.
	#[error(
		"{context}: provider issuer \"{discovered}\" does not match configured issuer \"{configured}\"",
		context = Context::DiscoveryParse
	)]
	IssuerMismatch {
		/// Issuer advertised by the discovery document.
		discovered: String,
		/// Issuer configured by the host.
		configured: String,
	},
	/// The provider does not support the device grant.
	#[error(
		"{context}: issuer \"{issuer}\" does not support OAuth device authorization",
		context = Context::DiscoveryValidate
	)]
	UnsupportedProvider {
		/// Issuer named in the failing discovery document.
		issuer: String,
	},
	/// Token endpoint returned an in-band RFC 6749 §5.2 error other than a retryable one.
	#[error("{context}: {detail}", context = Context::Token)]
	OAuthError {
		/// Assembled detail, including `error_description` or a synthesized 401 hint.
		detail: String,
	},
	/// A `slow_down` response would overflow the 32-bit polling interval.
	#[error("{context}: polling interval overflowed after repeated slow_down responses", context = Context::Token)]
	Overflow,
	/// The host's auth-data callback returned a negative status.
	#[error("OAuth device authorization was cancelled by the host")]
	HostCancelled,
	/// Re-surfaces the message of a previously assembled fatal error.
	///
	/// Defensive only: the host contract (P3) is to stop calling `poll()` once it has returned
	/// `Failed`, so this variant exists to give repeated calls a well-typed answer instead of
	/// requiring [`Error`] to implement [`Clone`] just to replay one.
	#[error("{0}")]
	Terminal(String),
}

/// Setup-time failures: transport init, multiplexer creation, unsupported platform.
#[derive(Debug, ThisError)]
pub enum SetupError {
	/// Neither supported event-notification facility is available on this platform.
	#[error("no supported I/O readiness facility is available on this platform")]
	UnsupportedPlatform,
	/// The HTTP transport library's one-time global initialization failed.
	#[error("HTTP transport library failed to initialize")]
	TransportInit,
	/// The HTTP transport library rejected a request configuration.
	#[error("HTTP transport library rejected the request configuration: {0}")]
	TransportConfig(String),
	/// The multiplexer (mio `Poll`) could not be constructed.
	#[error("failed to create I/O readiness multiplexer")]
	Multiplexer(#[source] std::io::Error),
	/// The host-supplied configuration was invalid.
	#[error(transparent)]
	Config(#[from] crate::config::ConfigError),
}

/// Reasons a response failed schema or framing validation (§4.3, §7).
#[derive(Debug, ThisError)]
pub enum ProtocolErrorKind {
	/// HTTP status code was not one of the accepted values for the step.
	#[error("unexpected response status: {0}")]
	UnexpectedStatus(u16),
	/// `Content-Type` was not `application/json` (with optional parameters).
	#[error("unexpected content type: \"{0}\"")]
	UnexpectedContentType(String),
	/// The body was not valid UTF-8.
	#[error("response body is not valid UTF-8")]
	InvalidUtf8,
	/// The body contained an embedded NUL byte.
	#[error("response body contains an embedded NUL byte")]
	EmbeddedNul,
	/// The top-level JSON value was not an object.
	#[error("response body is not a JSON object")]
	NotAnObject,
	/// A top-level key appeared more than once (or two keys mapped to the same destination).
	#[error("field \"{0}\" appears more than once")]
	DuplicateField(String),
	/// A declared field did not hold the expected JSON token type.
	#[error("field \"{field}\" must be {expected}")]
	TypeMismatch {
		/// Field name.
		field: &'static str,
		/// Human description of the expected type (e.g. "a string").
		expected: &'static str,
	},
	/// A nested object was found where the schema has no nested-object needs.
	#[error("field \"{0}\" must not be a nested object")]
	NestedObject(String),
	/// A required field was absent after a successful parse.
	#[error("field \"{0}\" is missing")]
	MissingField(&'static str),
	/// Accumulated response body exceeded the 1 MiB cap.
	#[error("response body exceeds the maximum accepted size")]
	ResponseTooLarge,
	/// A numeric field's lexical text could not be parsed as a number.
	#[error("field \"{0}\" is not a valid number")]
	InvalidNumber(&'static str),
}
