//! `application/x-www-form-urlencoded` helpers and media-type matching (§4.2, §6, P2).

// self
use crate::_prelude::*;

/// Percent-encodes `value` for use in an `application/x-www-form-urlencoded` body, rewriting
/// encoded spaces (`%20`) to `+` per the query-form convention (§6, P2).
pub fn urlencode(value: &str) -> String {
	let mut out = String::with_capacity(value.len());

	for byte in value.bytes() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
				out.push(byte as char);
			},
			b' ' => out.push('+'),
			_ => out.push_str(&format!("%{byte:02X}")),
		}
	}

	out
}

/// Decodes a `+`/`%HH`-encoded form value back to its original bytes, for test round-tripping.
pub fn urldecode(value: &str) -> Option<String> {
	let bytes = value.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;

	while i < bytes.len() {
		match bytes[i] {
			b'+' => {
				out.push(b' ');
				i += 1;
			},
			b'%' => {
				let hex = bytes.get(i + 1..i + 3)?;
				let hex = std::str::from_utf8(hex).ok()?;
				let byte = u8::from_str_radix(hex, 16).ok()?;

				out.push(byte);
				i += 3;
			},
			b => {
				out.push(b);
				i += 1;
			},
		}
	}

	String::from_utf8(out).ok()
}

/// Builds an `application/x-www-form-urlencoded` body from ordered key/value pairs.
#[derive(Debug, Default)]
pub struct FormBody {
	parts: Vec<String>,
}
impl FormBody {
	/// Creates an empty body.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `key=urlencode(value)`, skipping the pair entirely if `value` is empty.
	pub fn push_if_non_empty(&mut self, key: &str, value: &str) -> &mut Self {
		if !value.is_empty() {
			self.push(key, value);
		}

		self
	}

	/// Appends `key=urlencode(value)` unconditionally.
	pub fn push(&mut self, key: &str, value: &str) -> &mut Self {
		self.parts.push(format!("{key}={}", urlencode(value)));

		self
	}

	/// Renders the accumulated pairs joined by `&`.
	pub fn into_bytes(self) -> Vec<u8> {
		self.parts.join("&").into_bytes()
	}
}

/// Returns `true` if `content_type` is `application/json`, tolerating trailing parameters
/// introduced by a leading `;` and intervening HTAB/SP (§4.3 item 1, §10.5).
pub fn is_json_content_type(content_type: &str) -> bool {
	const PREFIX: &str = "application/json";

	let trimmed = content_type.trim_start_matches([' ', '\t']);

	if trimmed.len() < PREFIX.len() {
		return false;
	}
	if !trimmed.as_bytes()[..PREFIX.len()].eq_ignore_ascii_case(PREFIX.as_bytes()) {
		return false;
	}

	match trimmed.as_bytes().get(PREFIX.len()) {
		None => true,
		Some(b';') => true,
		Some(b' ' | b'\t') => {
			trimmed[PREFIX.len()..].trim_start_matches([' ', '\t']).starts_with(';')
		},
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn urlencode_rewrites_spaces_to_plus() {
		let encoded = urlencode("a b");

		assert_eq!(encoded, "a+b");
		assert!(!encoded.contains("%20"));
	}

	#[test]
	fn urlencode_roundtrips_arbitrary_strings() {
		for sample in ["hello world", "a/b?c=d&e", "emoji 🦀 test", ""] {
			let encoded = urlencode(sample);

			assert!(encoded.bytes().all(|b| b.is_ascii_alphanumeric()
				|| matches!(b, b'-' | b'_' | b'.' | b'~' | b'%' | b'+')));
			assert_eq!(urldecode(&encoded).as_deref(), Some(sample));
		}
	}

	#[test]
	fn form_body_skips_empty_optional_fields() {
		let mut body = FormBody::new();

		body.push_if_non_empty("scope", "").push("grant_type", "device_code");

		assert_eq!(body.into_bytes(), b"grant_type=device_code");
	}

	#[test]
	fn content_type_matcher_allows_parameters() {
		assert!(is_json_content_type("application/json"));
		assert!(is_json_content_type("application/json; charset=utf-8"));
		assert!(is_json_content_type("application/json \t; charset=utf-8"));
		assert!(is_json_content_type("APPLICATION/JSON"));
		assert!(!is_json_content_type("text/plain"));
		assert!(!is_json_content_type("application/jsonx"));
	}
}
