//! Discovery request/response handling (§4.4.1).

// self
use crate::{
	error::{Context, Error, ProtocolErrorKind},
	provider::ProviderMetadata,
};

/// Validates the discovery response's status and schema, then applies the post-parse
/// issuer/grant checks (§4.4.1).
pub fn finalize(
	status: u32,
	content_type: &str,
	body: &[u8],
	configured_issuer: &str,
) -> Result<ProviderMetadata, Error> {
	if status != 200 {
		return Err(Error::Protocol {
			context: Context::Discovery,
			kind: ProtocolErrorKind::UnexpectedStatus(status as u16),
		});
	}

	let metadata = ProviderMetadata::parse(content_type, body)
		.map_err(|kind| Error::Protocol { context: Context::DiscoveryParse, kind })?;

	metadata.validate(configured_issuer)?;

	Ok(metadata)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn non_200_status_is_protocol_error() {
		let err = finalize(500, "application/json", b"{}", "https://idp.example/").unwrap_err();

		assert!(matches!(
			err,
			Error::Protocol { context: Context::Discovery, kind: ProtocolErrorKind::UnexpectedStatus(500) }
		));
	}

	#[test]
	fn wrong_content_type_is_protocol_error() {
		let body = br#"{"issuer":"https://idp.example/","token_endpoint":"https://idp.example/t"}"#;
		let err = finalize(200, "text/plain", body, "https://idp.example/").unwrap_err();

		assert!(matches!(err, Error::Protocol { context: Context::DiscoveryParse, .. }));
	}
}
