//! Best-effort inspection of JWT access tokens.
//!
//! Claims are decoded without verifying the signature; they only drive client-side hints such as
//! proactive expiry checks and must never be trusted for authorization decisions.

// crates.io
use base64::{
	Engine,
	engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Subset of registered claims the client cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
	/// Subject.
	#[serde(default)]
	pub sub: Option<String>,
	/// Expiry as seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<i64>,
	/// Issued-at as seconds since the Unix epoch.
	#[serde(default)]
	pub iat: Option<i64>,
}
impl JwtClaims {
	/// Decodes the payload segment of `token`; returns `None` for anything that is not a JWT.
	pub fn parse(token: &str) -> Option<Self> {
		let mut segments = token.split('.');
		let (Some(_), Some(payload), Some(_), None) =
			(segments.next(), segments.next(), segments.next(), segments.next())
		else {
			return None;
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload).or_else(|_| URL_SAFE.decode(payload)).ok()?;

		serde_json::from_slice(&bytes).ok()
	}

	/// Returns the expiry instant, if the token declares one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp?).ok()
	}

	/// Returns `true` once `now` reaches the expiry; tokens without `exp` count as expired.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at().is_none_or(|exp| now >= exp)
	}
}

/// Returns `true` if `token` is not a parseable JWT or has expired at `now`.
pub fn is_token_expired(token: &TokenSecret, now: OffsetDateTime) -> bool {
	JwtClaims::parse(token.expose()).is_none_or(|claims| claims.is_expired_at(now))
}
