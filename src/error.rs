//! Client-level error types shared across the transport, envelope, refresh, and store layers.

// self
use crate::{_prelude::*, envelope};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every `request` settles with exactly one of these; the variants stay distinct so callers can
/// tell an application failure from a dead session or an unreachable server.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body is not a usable envelope.
	#[error(transparent)]
	Envelope(#[from] EnvelopeError),
	/// Server answered with an envelope whose code is not the success sentinel.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// Non-2xx response that carried no usable envelope.
	#[error("Server responded with HTTP {status}: {message}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Mapped user-facing message for the status.
		message: String,
	},
	/// Authentication failed and no refresh token was available to recover.
	#[error("Session expired and no refresh token is available.")]
	SessionExpired {
		/// Failure that revealed the expired session, if a request was involved.
		#[source]
		source: Option<Box<Error>>,
	},
	/// The shared refresh this request was queued behind failed.
	#[error("Token refresh failed: {source}")]
	RefreshFailed {
		/// Refresh failure shared by every queued request.
		#[source]
		source: Arc<Error>,
	},
	/// The in-flight refresh was dropped before it settled.
	#[error("Token refresh was abandoned before completing.")]
	RefreshAborted,
}
impl Error {
	/// Returns the localized message a presentation layer should show for this failure.
	pub fn user_message(&self) -> String {
		match self {
			Self::Api(e) => e.message.clone(),
			Self::Http { message, .. } => message.clone(),
			Self::Transport(e) => envelope::transport_message(e).into(),
			Self::SessionExpired { .. } | Self::RefreshFailed { .. } | Self::RefreshAborted =>
				envelope::SESSION_EXPIRED_MESSAGE.into(),
			Self::Envelope(_) | Self::Storage(_) | Self::Config(_) =>
				envelope::FALLBACK_MESSAGE.into(),
		}
	}

	/// Returns `true` when the failure means the caller must sign in again.
	pub fn is_session_terminal(&self) -> bool {
		match self {
			Self::SessionExpired { .. } | Self::RefreshFailed { .. } | Self::RefreshAborted =>
				true,
			Self::Http { status, .. } => *status == 401,
			Self::Api(e) => e.code == envelope::UNAUTHORIZED_CODE,
			_ => false,
		}
	}
}

/// Application-level failure reported through the envelope `code` field.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct ApiError {
	/// Envelope code returned by the server.
	pub code: i64,
	/// User-facing message mapped from the known code table, or the server message.
	pub message: String,
	/// Raw message supplied by the server, if any.
	pub server_message: Option<String>,
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// Base URL could not be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint or route path does not start with `/`.
	#[error("The {name} path must start with '/': {path}.")]
	RelativePath {
		/// Which path failed validation.
		name: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Timeout must be positive.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// An environment override could not be parsed.
	#[error("Environment variable {name} has an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Raw value read from the environment.
		value: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request did not complete within the configured timeout.
	#[error("Request timed out.")]
	Timeout,
	/// The server could not be reached.
	#[error("Failed to connect to the server.")]
	Connect {
		/// Transport-specific connect error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific connect error.
	pub fn connect(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Connect { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_connect() {
			Self::connect(e)
		} else {
			Self::network(e)
		}
	}
}

/// Failures decoding a response body into an envelope or its payload.
#[derive(Debug, ThisError)]
pub enum EnvelopeError {
	/// Body is not valid JSON or misses the `code` field.
	#[error("Response body is not a valid envelope (HTTP {status}).")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Envelope `data` does not match the type requested by the caller.
	#[error("Envelope data does not match the expected shape.")]
	Payload {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_failure_exposes_shared_source() {
		let shared = Arc::new(Error::Http { status: 401, message: "未授权".into() });
		let err = Error::RefreshFailed { source: shared.clone() };
		let source = StdError::source(&err).expect("Refresh failures should expose their source.");

		assert_eq!(source.to_string(), shared.to_string());
		assert!(err.is_session_terminal());
	}

	#[test]
	fn user_message_prefers_mapped_text() {
		let err = Error::from(ApiError {
			code: 403,
			message: "权限不足，拒绝访问".into(),
			server_message: Some("forbidden".into()),
		});

		assert_eq!(err.user_message(), "权限不足，拒绝访问");
		assert!(!err.is_session_terminal());
		assert_eq!(Error::from(TransportError::Timeout).user_message(), "请求超时，请稍后重试");
	}
}
