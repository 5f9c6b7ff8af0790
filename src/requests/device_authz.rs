//! Device-authorization request/response handling (§4.4.2).

// self
use crate::{
	codec::FormBody,
	config::FlowConfig,
	device::DeviceAuthorization,
	error::{Context, Error, ProtocolErrorKind},
	requests::{OAuthErrorObject, apply_client_identification},
	transport::ClientAuth,
};

/// Builds the `application/x-www-form-urlencoded` device-authorization request body (§4.4.2).
pub fn build_body(config: &FlowConfig) -> (Vec<u8>, ClientAuth, bool) {
	let mut body = FormBody::new();

	body.push_if_non_empty("scope", config.scope.as_deref().unwrap_or(""));

	let (client_auth, used_basic_auth) = apply_client_identification(&mut body, config);

	(body.into_bytes(), client_auth, used_basic_auth)
}

/// Parses and validates a device-authorization response (§4.4.2).
pub fn finalize(
	status: u32,
	content_type: &str,
	body: &[u8],
	min_interval: u32,
) -> Result<DeviceAuthorization, Error> {
	match status {
		200 => DeviceAuthorization::parse(content_type, body, min_interval)
			.map_err(|kind| Error::Protocol { context: Context::DeviceAuthzParse, kind }),
		400 | 401 => {
			let object = OAuthErrorObject::parse(content_type, body)
				.map_err(|kind| Error::Protocol { context: Context::DeviceAuthzParse, kind })?;
			let detail = match &object.error_description {
				Some(description) => format!("{}: {description}", object.error),
				None => object.error,
			};

			Err(Error::OAuthError { detail })
		},
		other => Err(Error::Protocol {
			context: Context::DeviceAuthz,
			kind: ProtocolErrorKind::UnexpectedStatus(other as u16),
		}),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::{ClientId, DebugOptions};

	fn config(secret: Option<&str>) -> FlowConfig {
		FlowConfig {
			discovery_uri: "https://idp.example/.well-known".parse().unwrap(),
			issuer_id: "https://idp.example/".to_owned(),
			client_id: ClientId::new("client").unwrap(),
			client_secret: secret.map(str::to_owned),
			scope: Some("read write".to_owned()),
			debug: DebugOptions::default(),
		}
	}

	#[test]
	fn body_includes_client_id_when_no_secret() {
		let (body, auth, used_basic) = build_body(&config(None));

		assert!(matches!(auth, ClientAuth::None));
		assert!(!used_basic);
		assert!(String::from_utf8(body).unwrap().contains("client_id=client"));
	}

	#[test]
	fn basic_auth_omits_client_id_from_body() {
		let (body, auth, used_basic) = build_body(&config(Some("shh")));

		assert!(matches!(auth, ClientAuth::Basic { .. }));
		assert!(used_basic);
		assert!(!String::from_utf8(body).unwrap().contains("client_id="));
	}

	#[test]
	fn retryable_status_surfaces_oauth_error() {
		let body = br#"{"error":"invalid_client","error_description":"bad secret"}"#;
		let err = finalize(401, "application/json", body, 1).unwrap_err();

		assert!(matches!(err, Error::OAuthError { detail } if detail.contains("bad secret")));
	}
}
