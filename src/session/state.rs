//! Snapshot of the signed-in session kept next to the persistent store.

// self
use crate::{
	_prelude::*,
	auth::{self, AuthGrant, TokenPair, TokenSecret, UserInfo},
};

/// In-memory mirror of the persisted session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
	/// Current access token.
	pub access_token: Option<TokenSecret>,
	/// Current refresh token.
	pub refresh_token: Option<TokenSecret>,
	/// Profile of the signed-in user; default when unknown.
	pub user: UserInfo,
}
impl SessionState {
	/// Returns `true` while an access token is held.
	pub fn is_logged_in(&self) -> bool {
		self.access_token.is_some()
	}

	/// Returns `true` when no access token is held or its JWT `exp` has passed at `now`.
	pub fn is_access_expired_at(&self, now: OffsetDateTime) -> bool {
		self.access_token.as_ref().is_none_or(|token| auth::is_token_expired(token, now))
	}

	/// See [`UserInfo::is_admin_user`].
	pub fn is_admin_user(&self) -> bool {
		self.user.is_admin_user()
	}

	/// See [`UserInfo::display_name`].
	pub fn display_name(&self) -> &str {
		self.user.display_name()
	}

	/// See [`UserInfo::has_permission`].
	pub fn has_permission<S>(&self, wanted: &[S]) -> bool
	where
		S: AsRef<str>,
	{
		self.user.has_permission(wanted)
	}

	/// See [`UserInfo::has_role`].
	pub fn has_role<S>(&self, wanted: &[S]) -> bool
	where
		S: AsRef<str>,
	{
		self.user.has_role(wanted)
	}

	/// Replaces both tokens.
	pub fn apply_tokens(&mut self, tokens: &TokenPair) {
		self.access_token = Some(tokens.access_token.clone());
		self.refresh_token = Some(tokens.refresh_token.clone());
	}

	/// Applies a login or refresh grant; a grant without a profile keeps the current one.
	pub fn apply_grant(&mut self, grant: &AuthGrant) {
		self.apply_tokens(&grant.tokens());

		if let Some(user) = &grant.user_info {
			self.user = user.clone();
		}
	}

	/// Forgets tokens and profile.
	pub fn reset(&mut self) {
		*self = Self::default();
	}
}
