//! Schema-driven, depth-limited JSON response validator (§4.3, P1, §10.5).
//!
//! Every HTTP response handled by this engine is a single top-level JSON object. Rather than
//! deserializing into an ad-hoc `struct` (which silently tolerates duplicate keys because
//! [`serde_json::Map`] collapses them) this module walks the object's entries itself via
//! [`serde_json::value::RawValue`], so it can reject duplicates and type mismatches with the
//! field-specific messages the original implementation produces.

// std
use std::collections::HashMap;
// self
use crate::{
	_prelude::*,
	error::ProtocolErrorKind,
};

/// Maximum accepted response body size before a transfer is aborted (I6, P6).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Expected JSON token type for a declared field (§4.3 item 6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	/// A JSON string, copied into the destination slot.
	String,
	/// A JSON number, retained as its original lexical text.
	Number,
	/// An array containing only JSON strings.
	ArrayOfString,
}
impl FieldKind {
	const fn expected_description(self) -> &'static str {
		match self {
			FieldKind::String => "a string",
			FieldKind::Number => "a number",
			FieldKind::ArrayOfString => "an array of strings",
		}
	}
}

/// One declared field in a response schema.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
	/// JSON key name at the top level.
	pub key: &'static str,
	/// Expected token type.
	pub kind: FieldKind,
	/// Whether the field must be present after a successful parse.
	pub required: bool,
}
impl FieldSpec {
	/// Declares a required field.
	pub const fn required(key: &'static str, kind: FieldKind) -> Self {
		Self { key, kind, required: true }
	}

	/// Declares an optional field.
	pub const fn optional(key: &'static str, kind: FieldKind) -> Self {
		Self { key, kind, required: false }
	}
}

/// One extracted field value (§3 `JsonField`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
	/// Extracted string.
	Str(String),
	/// Original lexical text of a JSON number.
	Num(String),
	/// Extracted array of strings, order preserved.
	Arr(Vec<String>),
}
impl FieldValue {
	/// Returns the value as a string, if it is one.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			FieldValue::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the value as an array of strings, if it is one.
	pub fn as_array(&self) -> Option<&[String]> {
		match self {
			FieldValue::Arr(v) => Some(v),
			_ => None,
		}
	}
}

/// Map from declared field key to its extracted value; absent keys were optional and missing.
pub type ParsedFields = HashMap<&'static str, FieldValue>;

/// Validates `content_type` and parses `body` against `schema` (§4.3).
pub fn parse_object(
	content_type: &str,
	body: &[u8],
	schema: &[FieldSpec],
) -> Result<ParsedFields, ProtocolErrorKind> {
	if !crate::codec::is_json_content_type(content_type) {
		return Err(ProtocolErrorKind::UnexpectedContentType(content_type.to_owned()));
	}
	if body.contains(&0) {
		return Err(ProtocolErrorKind::EmbeddedNul);
	}

	let text = std::str::from_utf8(body).map_err(|_| ProtocolErrorKind::InvalidUtf8)?;
	let raw: &serde_json::value::RawValue =
		serde_json::from_str(text).map_err(|_| ProtocolErrorKind::NotAnObject)?;
	let object: HashMap<String, Box<serde_json::value::RawValue>> =
		serde_json::from_str(raw.get()).map_err(|_| ProtocolErrorKind::NotAnObject)?;

	// `HashMap` already collapsed duplicates; detect them by re-scanning the raw text for
	// repeated top-level key tokens before they were folded together.
	let mut seen = HashMap::new();

	for key in top_level_keys(raw.get())? {
		if seen.insert(key.clone(), ()).is_some() {
			return Err(ProtocolErrorKind::DuplicateField(key));
		}
	}

	let mut out = ParsedFields::new();

	for field in schema {
		let Some(raw_value) = object.get(field.key) else { continue };
		let value = extract(field, raw_value.get())?;

		out.insert(field.key, value);
	}

	for field in schema {
		if field.required && !out.contains_key(field.key) {
			return Err(ProtocolErrorKind::MissingField(field.key));
		}
	}

	Ok(out)
}

fn extract(field: &FieldSpec, raw: &str) -> Result<FieldValue, ProtocolErrorKind> {
	let trimmed = raw.trim();
	let type_mismatch = || ProtocolErrorKind::TypeMismatch {
		field: field.key,
		expected: field.kind.expected_description(),
	};

	match field.kind {
		FieldKind::String => {
			if !trimmed.starts_with('"') {
				return Err(type_mismatch());
			}

			let s: String = serde_json::from_str(trimmed).map_err(|_| type_mismatch())?;

			Ok(FieldValue::Str(s))
		},
		FieldKind::Number => {
			if trimmed.starts_with('{') {
				return Err(ProtocolErrorKind::NestedObject(field.key.to_owned()));
			}
			if !looks_like_json_number(trimmed) {
				return Err(type_mismatch());
			}

			Ok(FieldValue::Num(trimmed.to_owned()))
		},
		FieldKind::ArrayOfString => {
			if !trimmed.starts_with('[') {
				return Err(type_mismatch());
			}

			let elements: Vec<Box<serde_json::value::RawValue>> =
				serde_json::from_str(trimmed).map_err(|_| type_mismatch())?;
			let mut out = Vec::with_capacity(elements.len());

			for element in &elements {
				let element_text = element.get().trim();

				if element_text.starts_with('{') || element_text.starts_with('[') {
					return Err(ProtocolErrorKind::NestedObject(field.key.to_owned()));
				}
				if !element_text.starts_with('"') {
					return Err(type_mismatch());
				}

				let s: String = serde_json::from_str(element_text).map_err(|_| type_mismatch())?;

				out.push(s);
			}

			Ok(FieldValue::Arr(out))
		},
	}
}

fn looks_like_json_number(text: &str) -> bool {
	!text.is_empty()
		&& text
			.bytes()
			.all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
		&& text.bytes().next().is_some_and(|b| b.is_ascii_digit() || b == b'-')
}

/// Walks a JSON object's top-level keys in source order, without interpreting their values, so
/// duplicate keys can be detected before [`serde_json`] folds them together (I5).
fn top_level_keys(object_text: &str) -> Result<Vec<String>, ProtocolErrorKind> {
	let bytes = object_text.as_bytes();
	let mut i = skip_ws(bytes, 0);

	if bytes.get(i) != Some(&b'{') {
		return Err(ProtocolErrorKind::NotAnObject);
	}

	i += 1;
	i = skip_ws(bytes, i);

	let mut keys = Vec::new();

	if bytes.get(i) == Some(&b'}') {
		return Ok(keys);
	}

	loop {
		i = skip_ws(bytes, i);

		let (key, next) = read_json_string(object_text, i)?;

		keys.push(key);
		i = skip_ws(bytes, next);

		if bytes.get(i) != Some(&b':') {
			return Err(ProtocolErrorKind::NotAnObject);
		}

		i += 1;
		i = skip_ws(bytes, i);
		i = skip_value(bytes, i)?;
		i = skip_ws(bytes, i);

		match bytes.get(i) {
			Some(b',') => {
				i += 1;
			},
			Some(b'}') => break,
			_ => return Err(ProtocolErrorKind::NotAnObject),
		}
	}

	Ok(keys)
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
	while matches!(bytes.get(i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
		i += 1;
	}

	i
}

fn read_json_string(text: &str, start: usize) -> Result<(String, usize), ProtocolErrorKind> {
	let bytes = text.as_bytes();

	if bytes.get(start) != Some(&b'"') {
		return Err(ProtocolErrorKind::NotAnObject);
	}

	let mut i = start + 1;
	let mut escaped = false;

	while let Some(&b) = bytes.get(i) {
		if escaped {
			escaped = false;
		} else if b == b'\\' {
			escaped = true;
		} else if b == b'"' {
			let raw = &text[start..=i];
			let parsed: String = serde_json::from_str(raw).map_err(|_| ProtocolErrorKind::NotAnObject)?;

			return Ok((parsed, i + 1));
		}

		i += 1;
	}

	Err(ProtocolErrorKind::NotAnObject)
}

fn skip_value(bytes: &[u8], start: usize) -> Result<usize, ProtocolErrorKind> {
	let mut i = start;

	match bytes.get(i) {
		Some(b'"') => {
			i += 1;
			let mut escaped = false;

			loop {
				match bytes.get(i) {
					None => return Err(ProtocolErrorKind::NotAnObject),
					Some(b'"') if !escaped => {
						i += 1;
						break;
					},
					Some(b'\\') if !escaped => {
						escaped = true;
						i += 1;
					},
					Some(_) => {
						escaped = false;
						i += 1;
					},
				}
			}
		},
		Some(b'{') | Some(b'[') => {
			let (open, close) =
				if bytes[i] == b'{' { (b'{', b'}') } else { (b'[', b']') };
			let mut depth = 0usize;

			loop {
				match bytes.get(i) {
					None => return Err(ProtocolErrorKind::NotAnObject),
					Some(&b) if b == open => {
						depth += 1;
						i += 1;
					},
					Some(&b) if b == close => {
						depth -= 1;
						i += 1;

						if depth == 0 {
							break;
						}
					},
					Some(b'"') => {
						let (_, next) = read_json_string(
							std::str::from_utf8(bytes).map_err(|_| ProtocolErrorKind::NotAnObject)?,
							i,
						)?;

						i = next;
					},
					Some(_) => i += 1,
				}
			}
		},
		Some(_) => {
			while !matches!(bytes.get(i), None | Some(b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')) {
				i += 1;
			}
		},
		None => return Err(ProtocolErrorKind::NotAnObject),
	}

	Ok(i)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const DISCOVERY_SCHEMA: &[FieldSpec] = &[
		FieldSpec::required("issuer", FieldKind::String),
		FieldSpec::required("token_endpoint", FieldKind::String),
		FieldSpec::optional("device_authorization_endpoint", FieldKind::String),
		FieldSpec::optional("grant_types_supported", FieldKind::ArrayOfString),
	];

	#[test]
	fn parses_well_formed_object() {
		let body = br#"{"issuer":"https://idp.example/","token_endpoint":"https://idp.example/t"}"#;
		let parsed = parse_object("application/json", body, DISCOVERY_SCHEMA)
			.expect("well-formed body should parse");

		assert_eq!(parsed["issuer"].as_str(), Some("https://idp.example/"));
	}

	#[test]
	fn rejects_duplicate_top_level_key() {
		let body = br#"{"issuer":"a","issuer":"b","token_endpoint":"t"}"#;
		let err = parse_object("application/json", body, DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::DuplicateField(ref k) if k == "issuer"));
	}

	#[test]
	fn rejects_non_object_top_level() {
		let err = parse_object("application/json", b"[1,2,3]", DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::NotAnObject));
	}

	#[test]
	fn rejects_wrong_content_type() {
		let err = parse_object("text/plain", b"{}", DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::UnexpectedContentType(ref c) if c == "text/plain"));
	}

	#[test]
	fn rejects_embedded_nul() {
		let mut body = br#"{"issuer":"a b","token_endpoint":"t"}"#.to_vec();
		body.push(0);

		let err = parse_object("application/json", &body, DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::EmbeddedNul));
	}

	#[test]
	fn rejects_type_mismatch() {
		let body = br#"{"issuer":1,"token_endpoint":"t"}"#;
		let err = parse_object("application/json", body, DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::TypeMismatch { field: "issuer", .. }));
	}

	#[test]
	fn rejects_missing_required_field() {
		let body = br#"{"issuer":"a"}"#;
		let err = parse_object("application/json", body, DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::MissingField("token_endpoint")));
	}

	#[test]
	fn rejects_nested_object() {
		let body = br#"{"issuer":{"nested":true},"token_endpoint":"t"}"#;
		let err = parse_object("application/json", body, DISCOVERY_SCHEMA).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::TypeMismatch { field: "issuer", .. }));
	}

	#[test]
	fn array_of_string_rejects_non_string_elements() {
		let schema = &[FieldSpec::required("grant_types_supported", FieldKind::ArrayOfString)];
		let body = br#"{"grant_types_supported":["a",1]}"#;
		let err = parse_object("application/json", body, schema).unwrap_err();

		assert!(matches!(err, ProtocolErrorKind::TypeMismatch { .. }));
	}

	#[test]
	fn unknown_top_level_keys_are_ignored() {
		let body = br#"{"issuer":"a","token_endpoint":"t","extra":123}"#;
		let parsed = parse_object("application/json", body, DISCOVERY_SCHEMA)
			.expect("unknown keys must not cause a failure");

		assert!(!parsed.contains_key("extra"));
	}

	#[test]
	fn number_field_retains_lexical_text() {
		let schema = &[FieldSpec::optional("interval", FieldKind::Number)];
		let body = br#"{"interval":3.50}"#;
		let parsed = parse_object("application/json", body, schema).unwrap();

		assert_eq!(parsed.get("interval"), Some(&FieldValue::Num("3.50".to_owned())));
	}
}
