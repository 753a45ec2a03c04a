//! Access/refresh token pairs and the grant payload returned by login and refresh.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserInfo},
};

/// Short-lived access token plus the refresh token that renews it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Credential attached to every outgoing request.
	pub access_token: TokenSecret,
	/// Credential exchanged for a new pair once the access token expires.
	pub refresh_token: TokenSecret,
}
impl TokenPair {
	/// Builds a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}
}

/// `data` payload of the login and refresh endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh token.
	pub refresh_token: TokenSecret,
	/// Profile of the signed-in user, when the endpoint includes it.
	#[serde(default)]
	pub user_info: Option<UserInfo>,
}
impl AuthGrant {
	/// Returns the token pair carried by the grant.
	pub fn tokens(&self) -> TokenPair {
		TokenPair {
			access_token: self.access_token.clone(),
			refresh_token: self.refresh_token.clone(),
		}
	}
}
