// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("skyeye_client.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
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

pub(crate) fn request_dispatched(method: &str, path: &str, authenticated: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method, path, authenticated, "dispatching request");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, path, authenticated);
}

pub(crate) fn response_received(method: &str, path: &str, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method, path, status, "response received");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, path, status);
}

pub(crate) fn request_failed(path: &str, err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(path, error = %err, "request failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (path, err);
}

pub(crate) fn refresh_settled(succeeded: bool, waiters: usize) {
	super::record_refresh_waiters(succeeded, waiters);

	#[cfg(feature = "tracing")]
	{
		if succeeded {
			tracing::info!(waiters, "token refresh succeeded");
		} else {
			tracing::warn!(waiters, "token refresh failed");
		}
	}
	#[cfg(not(feature = "tracing"))]
	let _ = (succeeded, waiters);
}

pub(crate) fn session_terminated(prompted: bool) {
	#[cfg(feature = "tracing")]
	tracing::info!(prompted, "session terminated");
	#[cfg(not(feature = "tracing"))]
	let _ = prompted;
}

pub(crate) fn store_failure(operation: &'static str, err: &crate::store::StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, error = %err, "session store operation failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, err);
}
