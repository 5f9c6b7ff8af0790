//! Optional observability helpers for the device-authorization engine (§10.2).
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth_device_engine.step` carrying the
//!   current `step` and the constant `grant` field.
//! - Enable `metrics` to increment the `oauth_device_engine_step_total` counter for every step
//!   transition, labeled by `step` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow state-machine steps observed by the engine (§4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
	/// Initial state before the first `poll()`.
	Init,
	/// Fetching the OpenID discovery document.
	Discovery,
	/// Requesting device authorization.
	DeviceAuthz,
	/// Polling the token endpoint.
	TokenRequest,
	/// Waiting out the polling interval.
	WaitInterval,
	/// Terminal success.
	Done,
	/// Terminal failure.
	Failed,
}
impl Step {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Step::Init => "init",
			Step::Discovery => "discovery",
			Step::DeviceAuthz => "device_authz",
			Step::TokenRequest => "token_request",
			Step::WaitInterval => "wait_interval",
			Step::Done => "done",
			Step::Failed => "failed",
		}
	}
}
impl Display for Step {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each step transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepOutcome {
	/// Step was entered.
	Attempt,
	/// Step reported a retryable in-band error (`authorization_pending` / `slow_down`).
	Retry,
	/// Step completed and the flow moved on.
	Advance,
	/// Step failed fatally.
	Failure,
}
impl StepOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StepOutcome::Attempt => "attempt",
			StepOutcome::Retry => "retry",
			StepOutcome::Advance => "advance",
			StepOutcome::Failure => "failure",
		}
	}
}
impl Display for StepOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
