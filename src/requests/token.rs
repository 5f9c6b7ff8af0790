//! Token (polled) request/response handling (§4.4.3).

// self
use crate::{
	codec::FormBody,
	config::FlowConfig,
	error::{Context, Error, ProtocolErrorKind},
	provider::DEVICE_CODE_GRANT_TYPE,
	requests::{OAuthErrorObject, apply_client_identification},
	transport::ClientAuth,
};

/// A successfully obtained access token (§3 `TokenResponse`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// The bearer token value.
	pub access_token: String,
	/// Token type, normally `Bearer`.
	pub token_type: String,
}

/// Outcome of a single polled token request (§4.4.3).
#[derive(Debug)]
pub enum TokenOutcome {
	/// Token endpoint returned `access_token`/`token_type`; the flow is complete.
	Success(AccessToken),
	/// `error == "authorization_pending"`: wait another interval and retry.
	AuthorizationPending,
	/// `error == "slow_down"`: caller must widen the interval by 5s before retrying.
	SlowDown,
}

/// Builds the `application/x-www-form-urlencoded` token request body (§4.4.3).
pub fn build_body(device_code: &str, config: &FlowConfig) -> (Vec<u8>, ClientAuth, bool) {
	let mut body = FormBody::new();

	body.push("device_code", device_code);
	body.push("grant_type", DEVICE_CODE_GRANT_TYPE);

	let (client_auth, used_basic_auth) = apply_client_identification(&mut body, config);

	(body.into_bytes(), client_auth, used_basic_auth)
}

/// Parses and validates a token response, applying the RFC 8628 §3.5 retry semantics (§4.4.3, §7).
pub fn finalize(
	status: u32,
	content_type: &str,
	body: &[u8],
	used_basic_auth: bool,
) -> Result<TokenOutcome, Error> {
	match status {
		200 => {
			let fields = crate::json::parse_object(
				content_type,
				body,
				&[
					crate::json::FieldSpec::required("access_token", crate::json::FieldKind::String),
					crate::json::FieldSpec::required("token_type", crate::json::FieldKind::String),
				],
			)
			.map_err(|kind| Error::Protocol { context: Context::TokenParse, kind })?;
			let access_token = fields["access_token"]
				.as_str()
				.expect("schema marks access_token required")
				.to_owned();
			let token_type =
				fields["token_type"].as_str().expect("schema marks token_type required").to_owned();

			Ok(TokenOutcome::Success(AccessToken { access_token, token_type }))
		},
		400 | 401 => {
			let object = OAuthErrorObject::parse(content_type, body)
				.map_err(|kind| Error::Protocol { context: Context::TokenErrorParse, kind })?;

			match object.error.as_str() {
				"authorization_pending" => Ok(TokenOutcome::AuthorizationPending),
				"slow_down" => Ok(TokenOutcome::SlowDown),
				_ => Err(Error::OAuthError { detail: record_token_error(&object, status, used_basic_auth) }),
			}
		},
		other => Err(Error::Protocol {
			context: Context::Token,
			kind: ProtocolErrorKind::UnexpectedStatus(other as u16),
		}),
	}
}

/// Assembles the fatal in-band error message, synthesizing a hint for 401s that lack a
/// description by distinguishing a wrong secret from a missing one (§7, §10.5).
fn record_token_error(object: &crate::requests::OAuthErrorObject, status: u32, used_basic_auth: bool) -> String {
	if let Some(description) = &object.error_description {
		return format!("{}: {description}", object.error);
	}
	if status == 401 {
		let hint = if used_basic_auth {
			"provider rejected the client secret"
		} else {
			"provider requires client authentication, and no client secret is set"
		};

		return format!("{}: {hint}", object.error);
	}

	object.error.clone()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn authorization_pending_is_retryable() {
		let body = br#"{"error":"authorization_pending"}"#;
		let outcome = finalize(400, "application/json", body, false).unwrap();

		assert!(matches!(outcome, TokenOutcome::AuthorizationPending));
	}

	#[test]
	fn slow_down_is_retryable() {
		let body = br#"{"error":"slow_down"}"#;
		let outcome = finalize(400, "application/json", body, false).unwrap();

		assert!(matches!(outcome, TokenOutcome::SlowDown));
	}

	#[test]
	fn success_status_parses_access_token() {
		let body = br#"{"access_token":"T","token_type":"Bearer"}"#;
		let outcome = finalize(200, "application/json", body, false).unwrap();

		assert!(matches!(outcome, TokenOutcome::Success(AccessToken { access_token, token_type })
			if access_token == "T" && token_type == "Bearer"));
	}

	#[test]
	fn unauthorized_without_description_and_basic_auth_blames_the_secret() {
		let body = br#"{"error":"invalid_client"}"#;
		let err = finalize(401, "application/json", body, true).unwrap_err();

		assert!(matches!(err, Error::OAuthError { detail } if detail.contains("rejected the client secret")));
	}

	#[test]
	fn unauthorized_without_description_and_no_basic_auth_blames_missing_secret() {
		let body = br#"{"error":"invalid_client"}"#;
		let err = finalize(401, "application/json", body, false).unwrap_err();

		assert!(matches!(err, Error::OAuthError { detail } if detail.contains("no client secret is set")));
	}
}
