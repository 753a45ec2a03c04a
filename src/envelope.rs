//! The `{code, message, data}` wrapper every API response uses, plus the fixed tables that turn
//! envelope codes, HTTP statuses, and transport failures into user-facing messages.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ApiError, EnvelopeError, TransportError},
};

/// The only envelope code that means success.
pub const SUCCESS_CODE: i64 = 200;
/// Envelope code that ends the session without attempting a refresh.
pub const UNAUTHORIZED_CODE: i64 = 401;
/// Message used when no table entry and no server message apply.
pub const FALLBACK_MESSAGE: &str = "请求失败";
/// Message shown when the session cannot be recovered.
pub const SESSION_EXPIRED_MESSAGE: &str = "登录状态已过期，请重新登录";

/// Response wrapper returned by every endpoint, independent of HTTP status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
	/// Application status code; [`SUCCESS_CODE`] is the only success value.
	pub code: i64,
	/// Server-supplied message.
	#[serde(default)]
	pub message: Option<String>,
	/// Payload; absent or `null` for endpoints without a result.
	#[serde(default)]
	pub data: Option<T>,
}
impl Envelope {
	/// Parses an envelope, reporting the failing path when the body is malformed.
	pub fn parse(status: u16, body: &[u8]) -> Result<Self, EnvelopeError> {
		let de = &mut serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(de)
			.map_err(|source| EnvelopeError::Malformed { source, status })
	}

	/// Returns `true` when the code equals [`SUCCESS_CODE`].
	pub fn is_success(&self) -> bool {
		self.code == SUCCESS_CODE
	}

	/// Converts a non-success envelope into an [`ApiError`] with the mapped message.
	pub fn to_api_error(&self) -> ApiError {
		let message = EnvelopeCode::from_code(self.code)
			.map(|code| code.message().to_owned())
			.or_else(|| self.message.clone().filter(|m| !m.is_empty()))
			.unwrap_or_else(|| FALLBACK_MESSAGE.into());

		ApiError { code: self.code, message, server_message: self.message.clone() }
	}

	/// Decodes the payload into the caller's type; a missing payload decodes from `null`.
	pub fn into_data<T>(self) -> Result<T, EnvelopeError>
	where
		T: DeserializeOwned,
	{
		let data = self.data.unwrap_or(Value::Null);

		serde_path_to_error::deserialize(data).map_err(|source| EnvelopeError::Payload { source })
	}
}

/// Envelope codes with a dedicated user-facing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeCode {
	/// Session is not authorized.
	Unauthorized,
	/// Caller lacks permission.
	Forbidden,
	/// Resource does not exist.
	NotFound,
	/// Server-side failure.
	InternalError,
	/// Bad username or password.
	BadCredentials,
	/// Access token expired.
	TokenExpired,
	/// Access token is invalid.
	TokenInvalid,
}
impl EnvelopeCode {
	/// Looks up a known code.
	pub const fn from_code(code: i64) -> Option<Self> {
		match code {
			401 => Some(Self::Unauthorized),
			403 => Some(Self::Forbidden),
			404 => Some(Self::NotFound),
			500 => Some(Self::InternalError),
			608 => Some(Self::BadCredentials),
			609 => Some(Self::TokenExpired),
			610 => Some(Self::TokenInvalid),
			_ => None,
		}
	}

	/// Returns the localized message for the code.
	pub const fn message(self) -> &'static str {
		match self {
			Self::Unauthorized => "未授权访问，请重新登录",
			Self::Forbidden => "权限不足，拒绝访问",
			Self::NotFound => "请求的资源不存在",
			Self::InternalError => "服务器内部错误",
			Self::BadCredentials => "登录失败，用户名或密码错误",
			Self::TokenExpired => "Token已过期",
			Self::TokenInvalid => "Token无效",
		}
	}

	/// Returns `true` for codes a token refresh can recover from.
	pub const fn is_refreshable(self) -> bool {
		matches!(self, Self::TokenExpired | Self::TokenInvalid)
	}
}

/// Maps a non-2xx HTTP status onto the user-facing message table.
pub fn http_status_message(status: u16) -> String {
	let text = match status {
		400 => "请求参数错误",
		401 => "未授权访问，请重新登录",
		403 => "权限不足，拒绝访问",
		404 => "请求的资源不存在",
		408 => "请求超时",
		500 => "服务器内部错误",
		502 => "服务器无响应",
		503 => "服务不可用",
		504 => "网关超时",
		_ => return format!("请求失败: {status}"),
	};

	text.into()
}

/// Maps a transport failure onto the user-facing message table.
pub fn transport_message(err: &TransportError) -> &'static str {
	match err {
		TransportError::Timeout => "请求超时，请稍后重试",
		TransportError::Connect { .. } => "网络连接失败，请检查网络设置",
		TransportError::Network { .. } | TransportError::Io(_) => "网络错误，请检查您的网络连接",
	}
}
