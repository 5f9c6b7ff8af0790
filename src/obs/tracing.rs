// self
use crate::{_prelude::*, obs::Step};

/// A span builder used by the flow state machine.
#[derive(Clone, Debug)]
pub struct StepSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StepSpan {
	/// Creates a new span tagged with the current step.
	pub fn new(step: Step) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("oauth_device_engine.step", step = step.as_str(), grant = "device_code");

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = step;

			Self {}
		}
	}

	/// Enters the span for the duration of one `poll()` call's work on this step.
	pub fn entered(self) -> StepSpanGuard {
		#[cfg(feature = "tracing")]
		{
			StepSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			StepSpanGuard {}
		}
	}
}

/// RAII guard returned by [`StepSpan::entered`].
pub struct StepSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for StepSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StepSpanGuard(..)")
	}
}

/// Emits a `debug`-level transport trace line when `PGOAUTHDEBUG` enabled verbose logging
/// (§6, §10.2). A no-op unless both the `tracing` feature and debug mode are active.
pub fn trace_transport(debug_enabled: bool, message: &str) {
	#[cfg(feature = "tracing")]
	{
		if debug_enabled {
			tracing::debug!(target: "oauth_device_engine::transport", "{message}");
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (debug_enabled, message);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn step_span_noop_without_tracing() {
		let _guard = StepSpan::new(Step::Discovery).entered();
	}

	#[test]
	fn trace_transport_noop_when_debug_disabled() {
		trace_transport(false, "should not panic");
	}
}
