// self
use crate::{
	error::ErrorKind,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"console_client_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a failed flow, labeled with the canonical error kind it surfaced as.
///
/// Failures feed both `console_client_flow_total` (so attempt/success/failure stay comparable)
/// and `console_client_flow_errors_total`, which splits them by `error` kind.
pub fn record_flow_failure(kind: FlowKind, error: ErrorKind) {
	record_flow_outcome(kind, FlowOutcome::Failure);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"console_client_flow_errors_total",
			"flow" => kind.as_str(),
			"error" => error.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = error;
	}
}
