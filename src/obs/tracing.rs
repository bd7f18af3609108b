// self
use crate::{_prelude::*, error::ErrorKind, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("console_client.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Refresh coordinator transitions worth logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshEvent {
	/// A call observed `Idle` and started an episode.
	EpisodeStarted,
	/// A call joined the in-flight episode.
	WaiterEnqueued {
		/// Queue length after the enqueue.
		queued: usize,
	},
	/// The refresh call succeeded and the queue was drained.
	Refreshed {
		/// Number of waiters resolved.
		drained: usize,
	},
	/// The refresh call failed and the queue was drained.
	RefreshFailed {
		/// Number of waiters rejected.
		drained: usize,
		/// Class of the refresh failure.
		kind: ErrorKind,
	},
	/// The driving future was dropped before the refresh settled.
	Abandoned {
		/// Number of waiters rejected.
		drained: usize,
	},
}

/// Emits a log event for a refresh coordinator transition (when tracing is enabled).
pub fn log_refresh_event(event: RefreshEvent) {
	#[cfg(feature = "tracing")]
	{
		match event {
			RefreshEvent::EpisodeStarted => tracing::debug!("refresh episode started"),
			RefreshEvent::WaiterEnqueued { queued } =>
				tracing::debug!(queued, "request queued behind in-flight refresh"),
			RefreshEvent::Refreshed { drained } =>
				tracing::info!(drained, "access credential refreshed"),
			RefreshEvent::RefreshFailed { drained, kind } =>
				tracing::warn!(drained, kind = kind.as_str(), "access credential refresh failed"),
			RefreshEvent::Abandoned { drained } =>
				tracing::warn!(drained, "refresh episode abandoned before settling"),
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}

/// Emits a log event for a request that surfaced an error (when tracing is enabled).
pub fn log_request_failure(err: &ApiError) {
	#[cfg(feature = "tracing")]
	{
		let raw = err.raw.as_ref();

		tracing::debug!(
			kind = err.kind().as_str(),
			status = err.status,
			method = raw.and_then(|raw| raw.method.as_deref()),
			url = raw.and_then(|raw| raw.url.as_deref()),
			"request failed"
		);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = err;
	}
}
