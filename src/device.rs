//! RFC 8628 §3.2 device-authorization response parsing (§3 `DeviceAuthorization`, §4.4.2).

// self
use crate::{
	_prelude::*,
	error::ProtocolErrorKind,
	json::{FieldKind, FieldSpec, parse_object},
};

const SCHEMA: &[FieldSpec] = &[
	FieldSpec::required("device_code", FieldKind::String),
	FieldSpec::required("user_code", FieldKind::String),
	FieldSpec::optional("verification_uri", FieldKind::String),
	FieldSpec::optional("verification_url", FieldKind::String),
	FieldSpec::optional("interval", FieldKind::Number),
];

/// Default polling interval when the provider omits `interval` (§4.4.2).
pub const DEFAULT_INTERVAL_SECS: u32 = 5;

/// RFC 8628 §3.2 device-authorization response (§3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceAuthorization {
	/// Opaque device verification code.
	pub device_code: String,
	/// Short code the user enters at the verification URI.
	pub user_code: String,
	/// URI the user visits to approve the grant.
	pub verification_uri: String,
	/// Polling interval in whole seconds; the only field mutated after parsing (by `slow_down`).
	pub interval: u32,
}
impl DeviceAuthorization {
	/// Parses a device-authorization response body (§4.4.2).
	///
	/// `verification_uri` and `verification_url` are accepted as synonyms feeding the same
	/// destination slot; both present at once is rejected as a duplicate destination (§9).
	pub fn parse(
		content_type: &str,
		body: &[u8],
		min_interval: u32,
	) -> Result<Self, ProtocolErrorKind> {
		let fields = parse_object(content_type, body, SCHEMA)?;
		let device_code =
			fields["device_code"].as_str().expect("schema marks device_code required").to_owned();
		let user_code =
			fields["user_code"].as_str().expect("schema marks user_code required").to_owned();
		let verification_uri = match (fields.get("verification_uri"), fields.get("verification_url")) {
			(Some(_), Some(_)) => {
				return Err(ProtocolErrorKind::DuplicateField("verification_uri".to_owned()));
			},
			(Some(v), None) | (None, Some(v)) => {
				v.as_str().expect("schema declares this field as a string").to_owned()
			},
			(None, None) => return Err(ProtocolErrorKind::MissingField("verification_uri")),
		};
		let interval = parse_interval(fields.get("interval").and_then(|v| v.as_str_num()), min_interval)?;

		Ok(Self { device_code, user_code, verification_uri, interval })
	}

	/// Applies RFC 8628 §3.5 `slow_down` back-pressure: interval += 5, failing on 32-bit
	/// overflow (P4).
	pub fn slow_down(&mut self) -> Result<(), crate::error::Error> {
		self.interval =
			self.interval.checked_add(5).ok_or(crate::error::Error::Overflow)?;

		if self.interval > i32::MAX as u32 {
			return Err(crate::error::Error::Overflow);
		}

		Ok(())
	}
}

fn parse_interval(text: Option<&str>, min_interval: u32) -> Result<u32, ProtocolErrorKind> {
	let Some(text) = text else { return Ok(DEFAULT_INTERVAL_SECS) };
	let value: f64 =
		text.parse().map_err(|_| ProtocolErrorKind::InvalidNumber("interval"))?;

	if !value.is_finite() {
		return Err(ProtocolErrorKind::InvalidNumber("interval"));
	}

	let ceiled = value.ceil();
	let capped = if ceiled > i32::MAX as f64 { i32::MAX as u32 } else if ceiled < 0.0 { 0 } else { ceiled as u32 };

	Ok(capped.max(min_interval))
}

// small helper trait kept local to this module: `FieldValue` only exposes `as_str`/`as_array`,
// but the `interval` field is declared `Number`, whose lexical text also lives in the `Str`-like
// slot returned by `as_str`-shaped access. Implemented as an inherent extension on the enum
// itself instead, see `json::FieldValue::as_num`.
trait AsNumExt {
	fn as_str_num(&self) -> Option<&str>;
}
impl AsNumExt for crate::json::FieldValue {
	fn as_str_num(&self) -> Option<&str> {
		match self {
			crate::json::FieldValue::Num(s) => Some(s),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_and_defaults_interval() {
		let body = br#"{"device_code":"DC","user_code":"ABCD-EFGH","verification_uri":"https://idp.example/v"}"#;
		let parsed = DeviceAuthorization::parse("application/json", body, 1).unwrap();

		assert_eq!(parsed.interval, DEFAULT_INTERVAL_SECS);
	}

	#[test]
	fn rejects_both_verification_spellings_present() {
		let body = br#"{"device_code":"DC","user_code":"U","verification_uri":"a","verification_url":"b"}"#;
		let err = DeviceAuthorization::parse("application/json", body, 1).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::DuplicateField(ref k) if k == "verification_uri"));
	}

	#[test]
	fn accepts_verification_url_synonym() {
		let body = br#"{"device_code":"DC","user_code":"U","verification_url":"https://idp.example/v"}"#;
		let parsed = DeviceAuthorization::parse("application/json", body, 1).unwrap();

		assert_eq!(parsed.verification_uri, "https://idp.example/v");
	}

	#[test]
	fn interval_takes_ceiling_and_clamps() {
		let body = br#"{"device_code":"DC","user_code":"U","verification_uri":"v","interval":0.2}"#;
		let parsed = DeviceAuthorization::parse("application/json", body, 1).unwrap();

		assert_eq!(parsed.interval, 1, "0.2 should ceil to 1 and clamp to the normal minimum");
	}

	#[test]
	fn interval_may_be_zero_in_debug_mode() {
		let body = br#"{"device_code":"DC","user_code":"U","verification_uri":"v","interval":0}"#;
		let parsed = DeviceAuthorization::parse("application/json", body, 0).unwrap();

		assert_eq!(parsed.interval, 0);
	}

	#[test]
	fn slow_down_adds_five_per_call() {
		let mut device = DeviceAuthorization {
			device_code: "DC".into(),
			user_code: "U".into(),
			verification_uri: "v".into(),
			interval: 3,
		};

		device.slow_down().unwrap();
		device.slow_down().unwrap();

		assert_eq!(device.interval, 13);
	}

	#[test]
	fn slow_down_fails_on_overflow() {
		let mut device = DeviceAuthorization {
			device_code: "DC".into(),
			user_code: "U".into(),
			verification_uri: "v".into(),
			interval: u32::MAX - 1,
		};

		assert!(matches!(device.slow_down(), Err(crate::error::Error::Overflow)));
	}
}
