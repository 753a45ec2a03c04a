//! Client configuration: base URL, timeout, auth endpoints, and the login route.

// std
use std::{env, time::Duration};
// self
use crate::{_prelude::*, error::ConfigError};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a failure notification stays visible.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(5);
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "SKYEYE_API_BASE_URL";
/// Environment variable overriding the timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "SKYEYE_API_TIMEOUT_MS";

/// Paths of the authentication endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEndpoints {
	/// `POST` exchanging a refresh token for a new pair.
	pub refresh: String,
	/// `POST` exchanging credentials for a new pair.
	pub login: String,
	/// `POST` ending the server-side session.
	pub logout: String,
	/// `GET` returning the current [`UserInfo`](crate::auth::UserInfo).
	pub user_info: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			refresh: "/api/auth/refresh".into(),
			login: "/api/auth/login".into(),
			logout: "/api/auth/logout".into(),
			user_info: "/api/auth/info".into(),
		}
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every relative request path is resolved against.
	pub base_url: Url,
	/// Per-request timeout.
	pub timeout: Duration,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Presentation route that hosts the login screen.
	pub login_route: String,
	/// How long failure notifications stay visible.
	pub notice_duration: Duration,
}
impl ClientConfig {
	/// Starts a builder for `base_url` seeded with the default endpoints.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Builds a configuration from [`ENV_BASE_URL`] and [`ENV_TIMEOUT_MS`], falling back to
	/// [`DEFAULT_BASE_URL`] and [`DEFAULT_TIMEOUT`].
	pub fn from_env() -> Result<Self, ConfigError> {
		let raw_base = env::var(ENV_BASE_URL)
			.ok()
			.filter(|v| !v.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_BASE_URL.into());
		let base_url = Url::parse(raw_base.trim())
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder(base_url);

		if let Ok(raw) = env::var(ENV_TIMEOUT_MS) {
			let millis = raw
				.trim()
				.parse::<u64>()
				.map_err(|_| ConfigError::InvalidEnv { name: ENV_TIMEOUT_MS, value: raw.clone() })?;

			builder = builder.timeout(Duration::from_millis(millis));
		}

		builder.build()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	base_url: Url,
	timeout: Duration,
	endpoints: AuthEndpoints,
	login_route: String,
	notice_duration: Duration,
}
impl ClientConfigBuilder {
	fn new(base_url: Url) -> Self {
		Self {
			base_url,
			timeout: DEFAULT_TIMEOUT,
			endpoints: AuthEndpoints::default(),
			login_route: "/login".into(),
			notice_duration: DEFAULT_NOTICE_DURATION,
		}
	}

	/// Overrides the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Overrides the user-info endpoint path.
	pub fn user_info_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.user_info = path.into();

		self
	}

	/// Overrides the login route used for redirects.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Overrides how long failure notifications stay visible.
	pub fn notice_duration(mut self, duration: Duration) -> Self {
		self.notice_duration = duration;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			timeout: self.timeout,
			endpoints: self.endpoints,
			login_route: self.login_route,
			notice_duration: self.notice_duration,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}

		validate_path("refresh", &self.endpoints.refresh)?;
		validate_path("login", &self.endpoints.login)?;
		validate_path("logout", &self.endpoints.logout)?;
		validate_path("user info", &self.endpoints.user_info)?;
		validate_path("login route", &self.login_route)?;

		Ok(())
	}
}

fn validate_path(name: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::RelativePath { name, path: path.to_owned() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse config fixture URL.")
	}

	#[test]
	fn defaults_follow_console_conventions() {
		let config = ClientConfig::builder(url(DEFAULT_BASE_URL))
			.build()
			.expect("Default configuration should validate.");

		assert_eq!(config.timeout, Duration::from_secs(10));
		assert_eq!(config.endpoints.refresh, "/api/auth/refresh");
		assert_eq!(config.login_route, "/login");
		assert_eq!(config.notice_duration, Duration::from_secs(5));
	}

	#[test]
	fn rejects_invalid_settings() {
		let err = ClientConfig::builder(url("ftp://files.example.com"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("https://console.example.com"))
			.timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert!(matches!(err, ConfigError::ZeroTimeout));

		let err = ClientConfig::builder(url("https://console.example.com"))
			.refresh_path("api/auth/refresh")
			.build()
			.expect_err("Relative endpoint paths should be rejected.");

		assert!(matches!(err, ConfigError::RelativePath { name: "refresh", .. }));
	}
}
