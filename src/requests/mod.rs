//! Request builders and response finalizers, one pair per HTTP step (§4.4).

/// Discovery (`GET`) request/response handling.
pub mod device_authz;
/// Device-authorization (`POST`) request/response handling.
pub mod discovery;
/// Token (`POST`, polled) request/response handling.
pub mod token;

// self
use crate::{
	_prelude::*,
	codec::{FormBody, urlencode},
	config::FlowConfig,
	error::ProtocolErrorKind,
	json::{FieldKind, FieldSpec, parse_object},
	transport::ClientAuth,
};

const ERROR_SCHEMA: &[FieldSpec] = &[
	FieldSpec::required("error", FieldKind::String),
	FieldSpec::optional("error_description", FieldKind::String),
];

/// In-band RFC 6749 §5.2 error object shared by device-authorization and token responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthErrorObject {
	/// The `error` code.
	pub error: String,
	/// Optional human-readable detail.
	pub error_description: Option<String>,
}
impl OAuthErrorObject {
	/// Parses an RFC 6749 §5.2 error object from a 400/401 response body.
	pub fn parse(content_type: &str, body: &[u8]) -> Result<Self, ProtocolErrorKind> {
		let fields = parse_object(content_type, body, ERROR_SCHEMA)?;
		let error = fields["error"].as_str().expect("schema marks error required").to_owned();
		let error_description =
			fields.get("error_description").map(|v| v.as_str().expect("schema declares this field as a string").to_owned());

		Ok(Self { error, error_description })
	}
}

/// Applies client identification to an outgoing request (§4.4.4).
///
/// Appends `client_id` to `body` when no secret is configured; otherwise leaves the body
/// untouched and returns HTTP Basic credentials instead. Returns the resulting [`ClientAuth`]
/// plus whether Basic auth was used, which later error handling needs to pick the right 401
/// phrasing (§7 "User-visible behavior").
pub fn apply_client_identification(body: &mut FormBody, config: &FlowConfig) -> (ClientAuth, bool) {
	match &config.client_secret {
		Some(secret) => {
			let auth = ClientAuth::Basic {
				username: urlencode(config.client_id.as_ref()),
				password: urlencode(secret),
			};

			(auth, true)
		},
		None => {
			body.push("client_id", config.client_id.as_ref());

			(ClientAuth::None, false)
		},
	}
}
