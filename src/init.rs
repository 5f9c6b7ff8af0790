//! One-time, thread-safe global transport-library initialization with a cached outcome (§5,
//! §9 "Global singletons", §10.5).
//!
//! Mirrors `initialize_curl`'s cached ternary (`Unknown`/`Success`/`Failure`) outcome: the first
//! caller performs the (process-wide, not-necessarily-thread-safe) initialization under a lock;
//! every later caller, on any thread, observes the cached result without re-attempting it.

// std
use std::sync::OnceLock;
// self
use crate::error::SetupError;

static OUTCOME: OnceLock<bool> = OnceLock::new();

/// Ensures the HTTP transport library's global state has been initialized exactly once for the
/// lifetime of the process, returning the cached outcome on every call.
pub fn ensure_initialized() -> Result<(), SetupError> {
	let succeeded = *OUTCOME.get_or_init(|| {
		// `curl::init` is documented as safe to call repeatedly and from multiple threads; the
		// cache here exists to short-circuit the underlying call, matching the lineage this
		// engine mirrors rather than because `curl`'s own init is unsafe to repeat.
		curl::init();

		true
	});

	if succeeded {
		Ok(())
	} else {
		Err(SetupError::TransportInit)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn repeated_calls_reuse_the_cached_outcome() {
		ensure_initialized().expect("first call should initialize successfully");
		ensure_initialized().expect("second call should reuse the cached outcome");
	}
}
