//! Transport primitives for console API calls.
//!
//! [`ApiRequest`] describes one call (method, path, query, body, headers, expected response
//! type) independently of any HTTP stack. [`HttpTransport`] is the client's only dependency on
//! such a stack: it sends a request with an optional bearer token and hands back the raw
//! [`RawResponse`]. Envelope handling, notifications, and token refresh all live above this
//! boundary, so the refresh call can go straight through a transport without re-entering them.

// crates.io
use serde_json::Value;
#[cfg(feature = "reqwest")]
use reqwest::{
	header::{AUTHORIZATION, CONTENT_TYPE},
	multipart::{Form, Part},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
};
#[cfg(feature = "reqwest")] use crate::config::ClientConfig;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute console API calls.
///
/// Implementations own the base URL and timeout. They must attach `bearer` as an
/// `Authorization: Bearer <token>` header when present, report connection problems as
/// [`TransportError`], and return every received response (including non-2xx) as a
/// [`RawResponse`] rather than an error.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request`, attaching `bearer` when provided.
	fn send<'a>(
		&'a self,
		request: &'a ApiRequest,
		bearer: Option<&'a TokenSecret>,
	) -> TransportFuture<'a>;
}

/// HTTP verbs used by the console API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	/// `GET`
	#[default]
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl HttpMethod {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Shape the caller expects back from a successful call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
	/// JSON envelope whose `data` is unwrapped.
	#[default]
	Json,
	/// Raw bytes (exports, snapshots, firmware images).
	Blob,
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document sent as `application/json`.
	Json(Value),
	/// `multipart/form-data` parts.
	Multipart(Vec<FormPart>),
}

/// One field of a multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
	/// Form field name.
	pub name: String,
	/// Field contents.
	pub value: FormValue,
}
impl FormPart {
	/// Creates a plain text field.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: FormValue::Text(value.into()) }
	}

	/// Creates a file field.
	pub fn file(
		name: impl Into<String>,
		file_name: impl Into<String>,
		content_type: Option<String>,
		bytes: Vec<u8>,
	) -> Self {
		Self {
			name: name.into(),
			value: FormValue::File { file_name: file_name.into(), content_type, bytes },
		}
	}
}

/// Contents of a [`FormPart`].
#[derive(Clone, PartialEq, Eq)]
pub enum FormValue {
	/// Text value.
	Text(String),
	/// Uploaded file.
	File {
		/// File name reported to the server.
		file_name: String,
		/// MIME type, if known.
		content_type: Option<String>,
		/// File contents.
		bytes: Vec<u8>,
	},
}
impl Debug for FormValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
			Self::File { file_name, content_type, bytes } => f
				.debug_struct("File")
				.field("file_name", file_name)
				.field("content_type", content_type)
				.field("len", &bytes.len())
				.finish(),
		}
	}
}

/// Transport-agnostic description of one API call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Path relative to the base URL (or an absolute `http(s)://` URL).
	pub path: String,
	/// Query parameters, in order.
	pub query: Vec<(String, String)>,
	/// Request payload.
	pub body: RequestBody,
	/// Extra headers; the bearer header is added by the client.
	pub headers: BTreeMap<String, String>,
	/// Expected response shape.
	pub response_type: ResponseType,
	/// Sends the call without a bearer token and never enters token refresh.
	pub anonymous: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), ..Default::default() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Delete, path)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Appends several query parameters.
	pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: ToString,
	{
		self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = RequestBody::Json(serde_json::to_value(body).map_err(ConfigError::BodySerialize)?);

		Ok(self)
	}

	/// Uses `parts` as a multipart payload.
	pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
		self.body = RequestBody::Multipart(parts);

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Expects raw bytes back instead of a JSON envelope.
	pub fn blob(mut self) -> Self {
		self.response_type = ResponseType::Blob;

		self
	}

	/// Sends the request without credentials.
	pub fn anonymous(mut self) -> Self {
		self.anonymous = true;

		self
	}

	/// Resolves the full URL against `base`, keeping any path prefix the base carries.
	pub fn url(&self, base: &Url) -> Result<Url, ConfigError> {
		let mut url = if self.path.starts_with("http://") || self.path.starts_with("https://") {
			Url::parse(&self.path)
				.map_err(|source| ConfigError::InvalidPath { path: self.path.clone(), source })?
		} else {
			let mut url = base.clone();
			let prefix = base.path().trim_end_matches('/');
			let path = self.path.trim_start_matches('/');

			url.set_path(&format!("{prefix}/{path}"));
			url.set_query(None);

			url
		};

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.query);
		}

		Ok(url)
	}
}

/// Response as received from the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lower-cased names.
	pub headers: BTreeMap<String, String>,
	/// Response body.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` when the server labeled the body as JSON.
	pub fn is_json(&self) -> bool {
		self.headers
			.get("content-type")
			.is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
	}
}

/// Default transport built on a shared reqwest [`ReqwestClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with the configured base URL and timeout.
	pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(config.timeout).build()?;

		Ok(Self::with_client(client, config.base_url.clone()))
	}

	/// Wraps an existing reqwest [`ReqwestClient`]; its own timeout settings apply.
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Base URL every relative path is resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	async fn send_now(
		&self,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<RawResponse> {
		let url = request.url(&self.base_url)?;
		let method = match request.method {
			HttpMethod::Get => reqwest::Method::GET,
			HttpMethod::Post => reqwest::Method::POST,
			HttpMethod::Put => reqwest::Method::PUT,
			HttpMethod::Patch => reqwest::Method::PATCH,
			HttpMethod::Delete => reqwest::Method::DELETE,
		};
		let mut builder = self.client.request(method, url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(token) = bearer {
			builder = builder.header(AUTHORIZATION, token.bearer());
		}

		builder = match &request.body {
			RequestBody::Empty => builder,
			RequestBody::Json(value) => builder
				.header(CONTENT_TYPE, "application/json")
				.body(serde_json::to_vec(value).map_err(ConfigError::BodySerialize)?),
			RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
		};

		let response = builder.send().await.map_err(map_reqwest_error)?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_owned()))
			})
			.collect();
		let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

		Ok(RawResponse { status, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send<'a>(
		&'a self,
		request: &'a ApiRequest,
		bearer: Option<&'a TokenSecret>,
	) -> TransportFuture<'a> {
		Box::pin(self.send_now(request, bearer))
	}
}

#[cfg(feature = "reqwest")]
fn build_form(parts: &[FormPart]) -> Result<Form, ConfigError> {
	let mut form = Form::new();

	for part in parts {
		form = match &part.value {
			FormValue::Text(value) => form.text(part.name.clone(), value.clone()),
			FormValue::File { file_name, content_type, bytes } => {
				let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());

				if let Some(mime) = content_type {
					file = file.mime_str(mime)?;
				}

				form.part(part.name.clone(), file)
			},
		};
	}

	Ok(form)
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::from(err).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://console.example.com/gateway/").expect("Base URL fixture should parse.")
	}

	#[test]
	fn url_keeps_base_prefix_and_encodes_query() {
		let request = ApiRequest::get("/api/devices").query("page", 2).query("name", "北门 camera");
		let url = request.url(&base()).expect("Request URL should resolve.");

		assert_eq!(
			url.as_str(),
			"https://console.example.com/gateway/api/devices?page=2&name=%E5%8C%97%E9%97%A8+camera"
		);
	}

	#[test]
	fn absolute_paths_bypass_the_base() {
		let request = ApiRequest::get("https://cdn.example.com/snapshots/1.jpg").blob();
		let url = request.url(&base()).expect("Absolute URL should resolve.");

		assert_eq!(url.as_str(), "https://cdn.example.com/snapshots/1.jpg");
		assert_eq!(request.response_type, ResponseType::Blob);
	}

	#[test]
	fn json_body_and_flags_are_recorded() {
		let request = ApiRequest::post("/api/auth/refresh")
			.json(&serde_json::json!({ "refreshToken": "r-1" }))
			.expect("JSON body should serialize.")
			.anonymous();

		assert!(request.anonymous);
		assert_eq!(request.body, RequestBody::Json(serde_json::json!({ "refreshToken": "r-1" })));
		assert_eq!(request.method.to_string(), "POST");
	}

	#[test]
	fn json_content_type_detection_ignores_case() {
		let response = RawResponse {
			status: 200,
			headers: BTreeMap::from([(
				"content-type".to_owned(),
				"Application/JSON; charset=utf-8".to_owned(),
			)]),
			body: Vec::new(),
		};

		assert!(response.is_json());
		assert!(response.is_success());
	}
}
