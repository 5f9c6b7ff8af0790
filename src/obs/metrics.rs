// self
use crate::obs::{Step, StepOutcome};

/// Records a step transition via the global metrics recorder (when enabled).
pub fn record_step_outcome(step: Step, outcome: StepOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth_device_engine_step_total",
			"step" => step.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (step, outcome);
	}
}
