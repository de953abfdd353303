// self
use crate::{_prelude::*, auth::UserId, obs::FlowKind, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by session flows.
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
			let span = tracing::info_span!("oauth2_session.flow", flow = kind.as_str(), stage);

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

	/// Emits a `debug` event describing a failed flow inside the span.
	pub fn record_error(&self, error: &Error) {
		#[cfg(feature = "tracing")]
		{
			tracing::debug!(parent: &self.span, class = error.class().as_str(), %error, "flow failed");
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = error;
		}
	}
}

pub(crate) fn log_persistence_degraded(user: &UserId, fingerprint: &str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			user = user.as_str(),
			access_token = fingerprint,
			%error,
			"refreshed token could not be persisted; serving it from memory"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (user, fingerprint, error);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn error_events_are_safe_without_subscriber() {
		let span = FlowSpan::new(FlowKind::Resolve, "test");

		span.record_error(&Error::SessionNotFound);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
