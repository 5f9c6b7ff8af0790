//! Host-supplied configuration, validated once at construction (§6, §10.3).

// self
use crate::_prelude::*;

const CLIENT_ID_MAX_LEN: usize = 256;

/// Validation failures raised while building a [`FlowConfig`].
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// `client_id` was empty.
	#[error("client_id cannot be empty")]
	EmptyClientId,
	/// `client_id` contained a byte outside the 7-bit ASCII range.
	#[error("client_id must be 7-bit ASCII")]
	NonAsciiClientId,
	/// `client_id` exceeded the accepted length.
	#[error("client_id exceeds {CLIENT_ID_MAX_LEN} bytes")]
	ClientIdTooLong,
	/// `discovery_uri` could not be parsed as an absolute URL.
	#[error("discovery_uri is not a valid absolute URL")]
	InvalidDiscoveryUri(#[source] url::ParseError),
	/// `discovery_uri` used a scheme other than `https` outside debug mode.
	#[error("discovery_uri must use https (set PGOAUTHDEBUG to allow http)")]
	InsecureDiscoveryUri,
}

/// Validated OAuth client identifier (7-bit ASCII, matching RFC 6749's `client_id` charset).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);
impl ClientId {
	/// Validates and wraps a client identifier.
	pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
		let value = value.into();

		if value.is_empty() {
			return Err(ConfigError::EmptyClientId);
		}
		if !value.is_ascii() {
			return Err(ConfigError::NonAsciiClientId);
		}
		if value.len() > CLIENT_ID_MAX_LEN {
			return Err(ConfigError::ClientIdTooLong);
		}

		Ok(Self(value))
	}
}
impl AsRef<str> for ClientId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ClientId({})", self.0)
	}
}
impl Display for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Debug-mode relaxations read once from the environment (§6, §10.3).
///
/// Constructed from `PGOAUTHDEBUG`/`PGOAUTHCAFILE` at [`FlowConfig`] construction time, never
/// re-read per `poll()`.
#[derive(Clone, Debug, Default)]
pub struct DebugOptions {
	/// `PGOAUTHDEBUG` was set to a non-empty value.
	pub enabled: bool,
	/// `PGOAUTHCAFILE`, honored only when `enabled` is true.
	pub ca_file: Option<String>,
}
impl DebugOptions {
	/// Reads debug options from the process environment.
	pub fn from_env() -> Self {
		let enabled =
			std::env::var("PGOAUTHDEBUG").map(|v| !v.is_empty()).unwrap_or(false);
		let ca_file = if enabled { std::env::var("PGOAUTHCAFILE").ok() } else { None };

		Self { enabled, ca_file }
	}

	/// Minimum accepted polling interval in normal vs. debug mode (I3).
	pub const fn min_interval(&self) -> u32 {
		if self.enabled {
			0
		} else {
			1
		}
	}
}

/// Host-supplied inputs for one device-authorization flow (§3 `FlowContext`, §6).
#[derive(Clone, Debug)]
pub struct FlowConfig {
	/// Absolute URL of the OpenID/OAuth discovery document.
	pub discovery_uri: Url,
	/// Issuer identifier compared byte-exactly against the discovery document's `issuer` (I2).
	pub issuer_id: String,
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret; `Some("")` is distinguishable from `None` (§4.4.4).
	pub client_secret: Option<String>,
	/// Requested scope string, sent verbatim if non-empty.
	pub scope: Option<String>,
	/// Debug-mode relaxations.
	pub debug: DebugOptions,
}
impl FlowConfig {
	/// Validates and assembles a [`FlowConfig`] from host-supplied inputs.
	///
	/// `debug` is read from the environment by the caller via [`DebugOptions::from_env`] so that
	/// tests can supply a fixed value without mutating process environment state.
	pub fn new(
		discovery_uri: &str,
		issuer_id: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: Option<String>,
		scope: Option<String>,
		debug: DebugOptions,
	) -> Result<Self, ConfigError> {
		let discovery_uri =
			Url::parse(discovery_uri).map_err(ConfigError::InvalidDiscoveryUri)?;
		let secure = discovery_uri.scheme() == "https"
			|| (debug.enabled && discovery_uri.scheme() == "http");

		if !secure {
			return Err(ConfigError::InsecureDiscoveryUri);
		}

		let client_id = ClientId::new(client_id)?;

		Ok(Self { discovery_uri, issuer_id: issuer_id.into(), client_id, client_secret, scope, debug })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn debug_off() -> DebugOptions {
		DebugOptions { enabled: false, ca_file: None }
	}

	#[test]
	fn rejects_empty_client_id() {
		assert!(matches!(ClientId::new(""), Err(ConfigError::EmptyClientId)));
	}

	#[test]
	fn rejects_non_ascii_client_id() {
		assert!(matches!(ClientId::new("clïent"), Err(ConfigError::NonAsciiClientId)));
	}

	#[test]
	fn rejects_http_discovery_uri_outside_debug_mode() {
		let err = FlowConfig::new(
			"http://idp.example/",
			"https://idp.example/",
			"client",
			None,
			None,
			debug_off(),
		)
		.unwrap_err();

		assert!(matches!(err, ConfigError::InsecureDiscoveryUri));
	}

	#[test]
	fn allows_http_discovery_uri_in_debug_mode() {
		let debug = DebugOptions { enabled: true, ca_file: None };
		let config = FlowConfig::new(
			"http://idp.example/",
			"https://idp.example/",
			"client",
			None,
			None,
			debug,
		)
		.expect("http scheme should be accepted in debug mode");

		assert_eq!(config.discovery_uri.scheme(), "http");
	}

	#[test]
	fn empty_secret_is_distinguishable_from_absent() {
		let with_empty = FlowConfig::new(
			"https://idp.example/",
			"https://idp.example/",
			"client",
			Some(String::new()),
			None,
			debug_off(),
		)
		.expect("empty secret should be accepted");

		assert_eq!(with_empty.client_secret, Some(String::new()));
	}
}
