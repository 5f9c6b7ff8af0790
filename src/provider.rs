//! OpenID/OAuth discovery document parsing and post-parse validation (§3 `ProviderMetadata`,
//! §4.4.1).

// self
use crate::{
	_prelude::*,
	error::ProtocolErrorKind,
	json::{FieldKind, FieldSpec, ParsedFields, parse_object},
};

/// Grant-type identifier the engine requires to be advertised by the provider (§6).
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

const SCHEMA: &[FieldSpec] = &[
	FieldSpec::required("issuer", FieldKind::String),
	FieldSpec::required("token_endpoint", FieldKind::String),
	FieldSpec::optional("device_authorization_endpoint", FieldKind::String),
	FieldSpec::optional("grant_types_supported", FieldKind::ArrayOfString),
];

/// Cached fields from the discovery document (§3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderMetadata {
	/// Issuer identifier as advertised by the provider.
	pub issuer: String,
	/// Token endpoint URL.
	pub token_endpoint: String,
	/// Device-authorization endpoint URL, when advertised.
	pub device_authorization_endpoint: Option<String>,
	/// Grant types the provider supports.
	pub grant_types_supported: Vec<String>,
}
impl ProviderMetadata {
	/// Parses a discovery response body, applying the §4.4.1 schema (not the post-parse issuer
	/// and grant checks, which need the configured issuer and live in [`ProviderMetadata::validate`]).
	pub fn parse(content_type: &str, body: &[u8]) -> Result<Self, ProtocolErrorKind> {
		let fields: ParsedFields = parse_object(content_type, body, SCHEMA)?;
		let issuer = fields["issuer"].as_str().expect("schema marks issuer required").to_owned();
		let token_endpoint = fields["token_endpoint"]
			.as_str()
			.expect("schema marks token_endpoint required")
			.to_owned();
		let device_authorization_endpoint =
			fields.get("device_authorization_endpoint").map(|v| {
				v.as_str().expect("schema declares this field as a string").to_owned()
			});
		// OIDC §3: absent grant_types_supported defaults to the implicit authorization_code set.
		let grant_types_supported = fields
			.get("grant_types_supported")
			.map(|v| v.as_array().expect("schema declares this field as an array").to_vec())
			.unwrap_or_else(|| vec!["authorization_code".to_owned(), "implicit".to_owned()]);

		Ok(Self { issuer, token_endpoint, device_authorization_endpoint, grant_types_supported })
	}

	/// Applies the post-parse checks from §4.4.1: byte-exact issuer match (I2, P5), device-grant
	/// support, and presence of the device-authorization endpoint.
	pub fn validate(&self, configured_issuer: &str) -> Result<(), crate::error::Error> {
		if self.issuer != configured_issuer {
			return Err(crate::error::Error::IssuerMismatch {
				discovered: self.issuer.clone(),
				configured: configured_issuer.to_owned(),
			});
		}
		if !self.grant_types_supported.iter().any(|g| g == DEVICE_CODE_GRANT_TYPE)
			|| self.device_authorization_endpoint.is_none()
		{
			return Err(crate::error::Error::UnsupportedProvider { issuer: self.issuer.clone() });
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_grant_types_when_absent() {
		let body = br#"{"issuer":"https://idp.example/","token_endpoint":"https://idp.example/t"}"#;
		let metadata = ProviderMetadata::parse("application/json", body).unwrap();

		assert_eq!(metadata.grant_types_supported, vec!["authorization_code", "implicit"]);
	}

	#[test]
	fn issuer_mismatch_is_byte_exact() {
		let metadata = ProviderMetadata {
			issuer: "https://idp.example".to_owned(),
			token_endpoint: "https://idp.example/t".to_owned(),
			device_authorization_endpoint: Some("https://idp.example/d".to_owned()),
			grant_types_supported: vec![DEVICE_CODE_GRANT_TYPE.to_owned()],
		};

		assert!(metadata.validate("https://idp.example/").is_err(), "trailing slash must matter");
		assert!(metadata.validate("https://idp.example").is_ok());
	}

	#[test]
	fn missing_device_grant_is_unsupported_provider() {
		let metadata = ProviderMetadata {
			issuer: "https://idp.example/".to_owned(),
			token_endpoint: "https://idp.example/t".to_owned(),
			device_authorization_endpoint: Some("https://idp.example/d".to_owned()),
			grant_types_supported: vec!["authorization_code".to_owned()],
		};

		assert!(matches!(
			metadata.validate("https://idp.example/"),
			Err(crate::error::Error::UnsupportedProvider { .. })
		));
	}
}
