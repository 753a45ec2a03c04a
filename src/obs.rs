//! Optional observability helpers for client calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `skyeye_client.call` with the `call` and
//!   `stage` fields, plus debug/warn events for dispatch, refresh, and session termination. Token
//!   values are never recorded.
//! - Enable `metrics` to increment the `skyeye_client_call_total` counter for every
//!   attempt/success/failure, labeled by `call` + `outcome`, and the
//!   `skyeye_client_refresh_waiters_total` counter with the number of queued requests each refresh
//!   released, labeled by `result`.

mod span;

pub use span::*;

// self
use crate::_prelude::*;

/// Client operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Authenticated API request.
	Request,
	/// Token refresh exchange.
	Refresh,
	/// Credential login.
	Login,
	/// Session logout.
	Logout,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Request => "request",
			CallKind::Refresh => "refresh",
			CallKind::Login => "login",
			CallKind::Logout => "logout",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}

	/// Maps a settled result onto [`CallOutcome::Success`] or [`CallOutcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure }
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

const CALL_TOTAL: &str = "skyeye_client_call_total";
const REFRESH_WAITERS_TOTAL: &str = "skyeye_client_refresh_waiters_total";

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(CALL_TOTAL, "call" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (CALL_TOTAL, kind, outcome);
}

/// Adds the requests a settled refresh released, split by whether they were replayed.
pub(crate) fn record_refresh_waiters(renewed: bool, waiters: usize) {
	#[cfg(feature = "metrics")]
	{
		let result = if renewed { "renewed" } else { "rejected" };

		metrics::counter!(REFRESH_WAITERS_TOTAL, "result" => result).increment(waiters as u64);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (REFRESH_WAITERS_TOTAL, renewed, waiters);
}
