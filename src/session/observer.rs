//! Presentation-layer signals emitted by the client.

// std
use std::time::Duration;
// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::TokenPair};

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
	/// Informational message.
	Info,
	/// Recoverable problem.
	Warning,
	/// Failed request.
	Error,
}

/// Transient user-visible notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
	/// Severity.
	pub level: NoticeLevel,
	/// Localized message.
	pub message: String,
	/// How long the notice stays visible.
	pub duration: Duration,
}
impl Notice {
	/// Creates an error notice.
	pub fn error(message: impl Into<String>, duration: Duration) -> Self {
		Self { level: NoticeLevel::Error, message: message.into(), duration }
	}
}

/// Where the presentation layer should send the user to sign in again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginRedirect {
	/// Login route, e.g. `/login`.
	pub login_route: String,
	/// Location to return to after signing in.
	pub redirect: Option<String>,
}
impl LoginRedirect {
	/// Creates a redirect to `login_route` that remembers `redirect`.
	pub fn new(login_route: impl Into<String>, redirect: Option<String>) -> Self {
		Self { login_route: login_route.into(), redirect: redirect.filter(|r| !r.is_empty()) }
	}

	/// Formats the navigation target, e.g. `/login?redirect=%2Fdevices%3Fpage%3D2`.
	pub fn to_uri(&self) -> String {
		match &self.redirect {
			Some(path) => format!(
				"{}?redirect={}",
				self.login_route,
				form_urlencoded::byte_serialize(path.as_bytes()).collect::<String>()
			),
			None => self.login_route.clone(),
		}
	}
}
impl Display for LoginRedirect {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.to_uri())
	}
}

/// Callbacks the client invokes on the presentation layer.
///
/// Implementations run inline on the calling task, so they should hand work off (to a channel,
/// an event loop, a UI thread) instead of blocking.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Shows a transient notification.
	fn notify(&self, notice: Notice);

	/// Called after login or a successful refresh with the new tokens.
	fn session_renewed(&self, tokens: &TokenPair) {
		let _ = tokens;
	}

	/// Called once per unauthorized episode after credentials were cleared.
	fn session_terminated(&self, redirect: LoginRedirect);

	/// Location to restore after the user signs in again.
	fn current_location(&self) -> Option<String> {
		None
	}
}

/// Observer that ignores every signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl SessionObserver for NoopObserver {
	fn notify(&self, _notice: Notice) {}

	fn session_terminated(&self, _redirect: LoginRedirect) {}
}

/// Observer that records every signal for later inspection.
#[derive(Debug, Default)]
pub struct RecordingObserver {
	location: RwLock<Option<String>>,
	notices: Mutex<Vec<Notice>>,
	renewals: Mutex<Vec<TokenPair>>,
	terminations: Mutex<Vec<LoginRedirect>>,
}
impl RecordingObserver {
	/// Sets the location reported by [`SessionObserver::current_location`].
	pub fn set_location(&self, location: impl Into<String>) {
		*self.location.write() = Some(location.into());
	}

	/// Notices shown so far.
	pub fn notices(&self) -> Vec<Notice> {
		self.notices.lock().clone()
	}

	/// Messages of the notices shown so far.
	pub fn notice_messages(&self) -> Vec<String> {
		self.notices.lock().iter().map(|n| n.message.clone()).collect()
	}

	/// Token pairs announced so far.
	pub fn renewals(&self) -> Vec<TokenPair> {
		self.renewals.lock().clone()
	}

	/// Redirects requested so far.
	pub fn terminations(&self) -> Vec<LoginRedirect> {
		self.terminations.lock().clone()
	}
}
impl SessionObserver for RecordingObserver {
	fn notify(&self, notice: Notice) {
		self.notices.lock().push(notice);
	}

	fn session_renewed(&self, tokens: &TokenPair) {
		self.renewals.lock().push(tokens.clone());
	}

	fn session_terminated(&self, redirect: LoginRedirect) {
		self.terminations.lock().push(redirect);
	}

	fn current_location(&self) -> Option<String> {
		self.location.read().clone()
	}
}
