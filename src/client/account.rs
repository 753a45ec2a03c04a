//! Session lifecycle on top of [`ApiClient`]: login, logout, profile, and startup restore.

// self
use crate::{
	_prelude::*,
	auth::{AuthGrant, TokenSecret, UserInfo},
	client::{ApiClient, refresh::Admission},
	http::{ApiRequest, HttpTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	session::SessionState,
	store::SessionStore,
};

/// Credentials posted to the login endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
	/// Login name.
	pub username: String,
	/// Plain-text password; only ever sent over the configured transport.
	pub password: String,
	/// Requests a long-lived refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub remember_me: Option<bool>,
}
impl LoginRequest {
	/// Creates a request without the remember-me flag.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: password.into(), remember_me: None }
	}

	/// Sets the remember-me flag.
	pub fn remember_me(mut self, remember: bool) -> Self {
		self.remember_me = Some(remember);

		self
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("remember_me", &self.remember_me)
			.finish()
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Signs in with `credentials`, persisting the issued tokens and profile.
	///
	/// The login call never carries a bearer token and never triggers a refresh. On failure the
	/// in-memory session is reset and the error is returned.
	pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthGrant> {
		const KIND: CallKind = CallKind::Login;

		let span = CallSpan::new(KIND, "login");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result: Result<AuthGrant> = span
			.instrument(async {
				let request =
					ApiRequest::post(&self.config.endpoints.login).json(credentials)?.anonymous();

				self.gate.reset();

				let grant = self.request::<AuthGrant>(request).await?;

				self.adopt_grant(&grant).await?;

				Ok(grant)
			})
			.await;

		if result.is_err() {
			self.session.write().reset();
		}

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	/// Ends the session on the server, then clears local credentials.
	///
	/// Local state is cleared even when the server call fails; only a storage failure is
	/// returned.
	pub async fn logout(&self) -> Result<()> {
		const KIND: CallKind = CallKind::Logout;

		let span = CallSpan::new(KIND, "logout");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let _ = self.execute(ApiRequest::post(&self.config.endpoints.logout)).await;

				self.gate.reset();
				self.session.write().reset();
				self.store.clear().await?;

				Ok(())
			})
			.await;

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	/// Fetches the current profile, mirroring and persisting it.
	///
	/// When the call fails the stored profile is used instead, if there is one.
	pub async fn fetch_user_info(&self) -> Result<UserInfo> {
		let request = ApiRequest::get(&self.config.endpoints.user_info);

		match self.request::<UserInfo>(request).await {
			Ok(user) => {
				<dyn SessionStore>::save_user_info(self.store.as_ref(), &user).await?;

				self.session.write().user = user.clone();

				Ok(user)
			},
			Err(err) => match <dyn SessionStore>::user_info(self.store.as_ref()).await {
				Ok(Some(stored)) => {
					self.session.write().user = stored.clone();

					Ok(stored)
				},
				Ok(None) => Err(err),
				Err(store_err) => {
					obs::store_failure("read user info", &store_err);

					Err(err)
				},
			},
		}
	}

	/// Loads the persisted session into memory; call once at startup.
	///
	/// The stored profile is only adopted when an access token is present.
	pub async fn restore_session(&self) -> Result<SessionState> {
		let store = self.store.as_ref();
		let access_token = <dyn SessionStore>::access_token(store).await?;
		let refresh_token = <dyn SessionStore>::refresh_token(store).await?;
		let user = match access_token {
			Some(_) => <dyn SessionStore>::user_info(store).await?.unwrap_or_default(),
			None => UserInfo::default(),
		};
		let state = SessionState { access_token, refresh_token, user };

		self.gate.reset();
		*self.session.write() = state.clone();

		Ok(state)
	}

	/// Exchanges the stored refresh token for a new pair through the shared refresh gate.
	///
	/// Joins a refresh that is already running instead of starting another one. On failure the
	/// local credentials are cleared without prompting for a new login.
	pub async fn renew_session(&self) -> Result<TokenSecret> {
		let store = self.store.as_ref();
		let current = <dyn SessionStore>::access_token(store).await?;
		let Some(refresh_token) = <dyn SessionStore>::refresh_token(store).await? else {
			self.forget_session().await;

			return Err(Error::SessionExpired { source: None });
		};
		let ticket = match self.gate.admit(current.as_ref()) {
			Admission::Leader(ticket) => ticket,
			Admission::Queued(rx) =>
				return match rx.await {
					Ok(outcome) => outcome.map_err(|source| Error::RefreshFailed { source }),
					Err(_) => Err(Error::RefreshAborted),
				},
			Admission::Superseded(token) => return Ok(token),
		};

		match self.run_refresh(&ticket, refresh_token).await {
			Ok(token) => {
				let waiters = ticket.release(Ok(token.clone()));

				obs::refresh_settled(true, waiters);

				Ok(token)
			},
			Err(err) => {
				if ticket.is_current() {
					self.forget_session().await;
				}

				let source = Arc::new(err);
				let waiters = ticket.release(Err(source.clone()));

				obs::refresh_settled(false, waiters);

				Err(Error::RefreshFailed { source })
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_request_serializes_camel_case_and_hides_password() {
		let request = LoginRequest::new("ops", "hunter2").remember_me(true);
		let body = serde_json::to_value(&request).expect("Login request should serialize.");

		assert_eq!(
			body,
			serde_json::json!({ "username": "ops", "password": "hunter2", "rememberMe": true })
		);
		assert!(!format!("{request:?}").contains("hunter2"));

		let bare = serde_json::to_value(LoginRequest::new("ops", "hunter2"))
			.expect("Login request should serialize.");

		assert!(bare.get("rememberMe").is_none());
	}
}
