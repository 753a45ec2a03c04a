//! Authenticated request client with single-flight token refresh.
//!
//! [`ApiClient`] attaches the stored access token to every request, unwraps the response
//! envelope, and turns failures into notifications plus a typed [`Error`]. When a request fails
//! authentication (HTTP 401, or envelope codes 609/610) the client exchanges the stored refresh
//! token exactly once, no matter how many requests fail at the same time. Requests that fail
//! while that exchange is running wait in a FIFO queue and are replayed with the new token once
//! it settles. When the session cannot be recovered the client clears the stored credentials
//! and asks the presentation layer, once per episode, to send the user to the login route.

mod account;
mod refresh;
mod stats;

pub use account::*;
pub use stats::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{AuthGrant, TokenSecret},
	config::ClientConfig,
	envelope::{self, Envelope, EnvelopeCode},
	error::EnvelopeError,
	http::{ApiRequest, HttpTransport, RawResponse, ResponseType},
	obs::{self, CallKind, CallOutcome, CallSpan},
	session::{LoginRedirect, Notice, SessionObserver, SessionState},
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};
use refresh::{Admission, RefreshGate, RefreshTicket};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Successful result of [`ApiClient::execute`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
	/// Unwrapped envelope `data`; `null` when the server sent none.
	Json(Value),
	/// Raw response body of a [`ResponseType::Blob`] request.
	Blob(Vec<u8>),
}
impl Payload {
	/// Decodes the payload into `T`, reporting the failing path on mismatch.
	pub fn decode<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let decoded = match self {
			Self::Json(value) => serde_path_to_error::deserialize(value),
			Self::Blob(bytes) =>
				serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&bytes)),
		};

		decoded.map_err(|source| EnvelopeError::Payload { source }.into())
	}

	/// Returns the payload as bytes; JSON payloads are re-encoded.
	pub fn into_bytes(self) -> Vec<u8> {
		match self {
			Self::Json(value) => value.to_string().into_bytes(),
			Self::Blob(bytes) => bytes,
		}
	}
}

/// Issues console API requests on behalf of the signed-in user.
///
/// Cloning is cheap and every clone shares the same session mirror, refresh gate, and
/// termination gate, so a refresh started through one clone also releases requests queued
/// through another.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Validated configuration.
	pub config: Arc<ClientConfig>,
	/// Transport used for every call, including the refresh exchange.
	pub transport: Arc<T>,
	/// Persistent credential storage.
	pub store: Arc<dyn SessionStore>,
	/// Presentation-layer callbacks.
	pub observer: Arc<dyn SessionObserver>,
	/// Counters describing refresh activity.
	pub refresh_metrics: Arc<RefreshMetrics>,
	session: Arc<RwLock<SessionState>>,
	gate: Arc<RefreshGate>,
	termination_armed: Arc<AtomicBool>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client around a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn SessionStore>,
		observer: Arc<dyn SessionObserver>,
	) -> Self {
		Self {
			config: Arc::new(config),
			transport: transport.into(),
			store,
			observer,
			refresh_metrics: Default::default(),
			session: Default::default(),
			gate: Default::default(),
			termination_armed: Arc::new(AtomicBool::new(true)),
		}
	}

	/// Sends `request` and returns the unwrapped payload.
	///
	/// Every call settles exactly once. Authentication failures are recovered transparently
	/// through a single shared refresh; everything else is reported to the observer and returned
	/// as an [`Error`].
	pub async fn execute(&self, request: ApiRequest) -> Result<Payload> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "execute");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.dispatch(&request)).await;

		if let Err(err) = &result {
			obs::request_failed(&request.path, err);
		}

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	/// Sends `request` and decodes the envelope `data` into `R`.
	pub async fn request<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(request).await?.decode()
	}

	/// Sends `request` as a blob request and returns the raw body.
	pub async fn download(&self, request: ApiRequest) -> Result<Vec<u8>> {
		Ok(self.execute(request.blob()).await?.into_bytes())
	}

	/// Returns `true` while a refresh exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.gate.is_refreshing()
	}

	/// Number of requests waiting for the in-flight refresh.
	pub fn pending_len(&self) -> usize {
		self.gate.pending_len()
	}

	/// Snapshot of the in-memory session mirror.
	pub fn session(&self) -> SessionState {
		self.session.read().clone()
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<Payload> {
		if request.anonymous {
			return match self.exchange(request, None).await {
				Exchange::Settled(result) => result,
				Exchange::Unauthorized(err) => Err(err),
			};
		}

		let token = <dyn SessionStore>::access_token(self.store.as_ref()).await?;

		match self.exchange(request, token.as_ref()).await {
			Exchange::Settled(result) => result,
			Exchange::Unauthorized(err) => self.recover(request, token.as_ref(), err).await,
		}
	}

	/// Sends one attempt and classifies the response.
	async fn exchange(&self, request: &ApiRequest, token: Option<&TokenSecret>) -> Exchange {
		let authenticated = !request.anonymous;
		let method = request.method.as_str();

		obs::request_dispatched(method, &request.path, token.is_some());

		let response = match self.transport.send(request, token).await {
			Ok(response) => response,
			Err(err) => {
				if let Error::Transport(e) = &err {
					self.notify_failure(envelope::transport_message(e));
				}

				return Exchange::Settled(Err(err));
			},
		};

		obs::response_received(method, &request.path, response.status);

		match self.classify(request.response_type, response, authenticated) {
			Verdict::Settled(result) => Exchange::Settled(result),
			Verdict::Unauthorized(err) => Exchange::Unauthorized(err),
			Verdict::Terminate(err) => {
				self.terminate_session().await;

				Exchange::Settled(Err(err))
			},
		}
	}

	fn classify(
		&self,
		response_type: ResponseType,
		response: RawResponse,
		authenticated: bool,
	) -> Verdict {
		let status = response.status;

		if !response.is_success() {
			if status == 401 && authenticated {
				return Verdict::Unauthorized(Error::Http {
					status,
					message: envelope::http_status_message(status),
				});
			}
			if let Ok(parsed) = Envelope::parse(status, &response.body) {
				if !parsed.is_success() {
					return self.reject_envelope(&parsed, authenticated);
				}
			}

			let message = envelope::http_status_message(status);

			self.notify_failure(message.clone());

			return Verdict::Settled(Err(Error::Http { status, message }));
		}
		if response_type == ResponseType::Blob && !response.is_json() {
			return Verdict::Settled(Ok(Payload::Blob(response.body)));
		}

		let parsed = match Envelope::parse(status, &response.body) {
			Ok(parsed) => parsed,
			Err(err) => {
				self.notify_failure(envelope::FALLBACK_MESSAGE);

				return Verdict::Settled(Err(err.into()));
			},
		};

		if !parsed.is_success() {
			return self.reject_envelope(&parsed, authenticated);
		}

		match response_type {
			ResponseType::Json =>
				Verdict::Settled(Ok(Payload::Json(parsed.data.unwrap_or(Value::Null)))),
			ResponseType::Blob => Verdict::Settled(Ok(Payload::Blob(response.body))),
		}
	}

	fn reject_envelope(&self, parsed: &Envelope, authenticated: bool) -> Verdict {
		let api_error = parsed.to_api_error();

		if authenticated && EnvelopeCode::from_code(parsed.code).is_some_and(|c| c.is_refreshable())
		{
			return Verdict::Unauthorized(api_error.into());
		}

		self.notify_failure(api_error.message.clone());

		if parsed.code == envelope::UNAUTHORIZED_CODE {
			Verdict::Terminate(api_error.into())
		} else {
			Verdict::Settled(Err(api_error.into()))
		}
	}

	/// Runs the refresh coordination for a request that failed authentication with `used`.
	async fn recover(
		&self,
		request: &ApiRequest,
		used: Option<&TokenSecret>,
		original: Error,
	) -> Result<Payload> {
		let Some(refresh_token) = <dyn SessionStore>::refresh_token(self.store.as_ref()).await?
		else {
			self.terminate_session().await;

			return Err(Error::SessionExpired { source: Some(Box::new(original)) });
		};
		let ticket = match self.gate.admit(used) {
			Admission::Leader(ticket) => ticket,
			Admission::Queued(rx) => {
				self.refresh_metrics.record_queued();

				return match rx.await {
					Ok(Ok(token)) => self.replay(request, token).await,
					Ok(Err(source)) => Err(Error::RefreshFailed { source }),
					Err(_) => Err(Error::RefreshAborted),
				};
			},
			Admission::Superseded(token) => {
				self.refresh_metrics.record_superseded();

				return self.replay(request, token).await;
			},
		};

		match self.run_refresh(&ticket, refresh_token).await {
			Ok(token) => {
				let waiters = ticket.release(Ok(token.clone()));

				obs::refresh_settled(true, waiters);

				self.replay(request, token).await
			},
			Err(err) => {
				// A session ended while the refresh ran was already cleared by whoever ended it.
				if ticket.is_current() {
					self.terminate_session().await;
				}

				let waiters = ticket.release(Err(Arc::new(err)));

				obs::refresh_settled(false, waiters);

				Err(original)
			},
		}
	}

	/// Retries a request once with a freshly issued token; a second authentication failure ends
	/// the session.
	async fn replay(&self, request: &ApiRequest, token: TokenSecret) -> Result<Payload> {
		match self.exchange(request, Some(&token)).await {
			Exchange::Settled(result) => result,
			Exchange::Unauthorized(err) => {
				self.terminate_session().await;

				Err(err)
			},
		}
	}

	/// Exchanges `refresh_token` for a new pair and persists it.
	///
	/// The pair is discarded when the session ended while the exchange was in flight.
	async fn run_refresh(
		&self,
		ticket: &RefreshTicket<'_>,
		refresh_token: TokenSecret,
	) -> Result<TokenSecret> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "run_refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result: Result<TokenSecret> = span
			.instrument(async {
				let request = ApiRequest::post(&self.config.endpoints.refresh)
					.json(&RefreshBody { refresh_token: &refresh_token })?
					.anonymous();
				let response = self.transport.send(&request, None).await?;

				if !response.is_success() {
					return Err(Error::Http {
						status: response.status,
						message: envelope::http_status_message(response.status),
					});
				}

				let parsed = Envelope::parse(response.status, &response.body)?;

				if !parsed.is_success() {
					return Err(parsed.to_api_error().into());
				}

				let grant = parsed.into_data::<AuthGrant>()?;

				if !ticket.is_current() {
					return Err(Error::SessionExpired { source: None });
				}

				self.adopt_grant(&grant).await?;

				Ok(grant.access_token)
			})
			.await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	/// Persists a login or refresh grant and mirrors it in memory.
	async fn adopt_grant(&self, grant: &AuthGrant) -> Result<()> {
		let tokens = grant.tokens();

		<dyn SessionStore>::save_tokens(self.store.as_ref(), &tokens).await?;

		if let Some(user) = &grant.user_info {
			<dyn SessionStore>::save_user_info(self.store.as_ref(), user).await?;
		}

		self.session.write().apply_grant(grant);
		self.termination_armed.store(true, Ordering::Release);
		self.observer.session_renewed(&tokens);

		Ok(())
	}

	/// Clears every credential and prompts for a new login once per episode.
	async fn terminate_session(&self) {
		self.forget_session().await;

		let prompted = self.termination_armed.swap(false, Ordering::AcqRel);

		if prompted {
			let redirect = LoginRedirect::new(
				self.config.login_route.clone(),
				self.observer.current_location(),
			);

			self.observer.session_terminated(redirect);
		}

		obs::session_terminated(prompted);
	}

	async fn forget_session(&self) {
		if let Err(err) = self.store.clear().await {
			obs::store_failure("clear", &err);
		}

		self.session.write().reset();
		self.gate.reset();
	}

	fn notify_failure(&self, message: impl Into<String>) {
		self.observer.notify(Notice::error(message, self.config.notice_duration));
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a reqwest transport built from `config`.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		observer: Arc<dyn SessionObserver>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::new(&config)?;

		Ok(Self::with_transport(config, transport, store, observer))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			observer: self.observer.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			session: self.session.clone(),
			gate: self.gate.clone(),
			termination_armed: self.termination_armed.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.is_refreshing())
			.field("pending", &self.pending_len())
			.finish()
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
	refresh_token: &'a TokenSecret,
}

/// Outcome of one attempt as seen by the refresh coordination.
enum Exchange {
	Settled(Result<Payload>),
	Unauthorized(Error),
}

enum Verdict {
	Settled(Result<Payload>),
	Unauthorized(Error),
	Terminate(Error),
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// self
	use super::*;
	use crate::{
		http::TransportFuture,
		session::RecordingObserver,
		store::{MemoryStore, StorageKey},
	};

	/// Transport replaying canned responses keyed by path and bearer token.
	struct ScriptedTransport {
		calls: AtomicUsize,
		respond: Box<dyn Fn(&ApiRequest, Option<&TokenSecret>) -> RawResponse + Send + Sync>,
	}
	impl ScriptedTransport {
		fn new(
			respond: impl 'static + Fn(&ApiRequest, Option<&TokenSecret>) -> RawResponse + Send + Sync,
		) -> Self {
			Self { calls: AtomicUsize::new(0), respond: Box::new(respond) }
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send<'a>(
			&'a self,
			request: &'a ApiRequest,
			bearer: Option<&'a TokenSecret>,
		) -> TransportFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let response = (self.respond)(request, bearer);

			Box::pin(async move { Ok(response) })
		}
	}

	fn json(status: u16, body: Value) -> RawResponse {
		RawResponse {
			status,
			headers: BTreeMap::from([("content-type".into(), "application/json".into())]),
			body: body.to_string().into_bytes(),
		}
	}

	fn client(
		transport: ScriptedTransport,
	) -> (ApiClient<ScriptedTransport>, Arc<MemoryStore>, Arc<RecordingObserver>) {
		let store = Arc::new(MemoryStore::default());
		let (client, observer) = client_on(Arc::new(transport), store.clone());

		(client, store, observer)
	}

	fn client_on(
		transport: Arc<ScriptedTransport>,
		store: Arc<MemoryStore>,
	) -> (ApiClient<ScriptedTransport>, Arc<RecordingObserver>) {
		let config = ClientConfig::builder(
			Url::parse("http://console.test").expect("Client fixture URL should parse."),
		)
		.build()
		.expect("Client fixture configuration should validate.");
		let observer = Arc::new(RecordingObserver::default());
		let client = ApiClient::with_transport(config, transport, store, observer.clone());

		(client, observer)
	}

	#[tokio::test]
	async fn envelope_codes_609_refresh_like_http_401() {
		let transport = ScriptedTransport::new(|request, bearer| {
			match (request.path.as_str(), bearer.map(TokenSecret::expose)) {
				("/api/auth/refresh", None) => json(
					200,
					serde_json::json!({
						"code": 200,
						"data": { "accessToken": "a-2", "refreshToken": "r-2" }
					}),
				),
				("/api/devices", Some("a-2")) =>
					json(200, serde_json::json!({ "code": 200, "data": [1, 2] })),
				_ => json(200, serde_json::json!({ "code": 609, "message": "expired" })),
			}
		});
		let (client, store, observer) = client(transport);

		store.set(StorageKey::AccessToken, "a-1".into()).await.expect("Seeding should succeed.");
		store.set(StorageKey::RefreshToken, "r-1".into()).await.expect("Seeding should succeed.");

		let ids: Vec<u32> = client
			.request(ApiRequest::get("/api/devices"))
			.await
			.expect("Expired tokens should be refreshed transparently.");

		assert_eq!(ids, [1, 2]);
		assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
		assert!(observer.notices().is_empty());
		assert_eq!(client.session().access_token, Some(TokenSecret::new("a-2")));
		assert_eq!(client.refresh_metrics.successes(), 1);
	}

	#[tokio::test]
	async fn envelope_401_terminates_without_refreshing() {
		let transport = ScriptedTransport::new(|_, _| {
			json(200, serde_json::json!({ "code": 401, "message": "unauthorized" }))
		});
		let (client, store, observer) = client(transport);

		store.set(StorageKey::AccessToken, "a-1".into()).await.expect("Seeding should succeed.");
		store.set(StorageKey::RefreshToken, "r-1".into()).await.expect("Seeding should succeed.");
		observer.set_location("/alerts");

		let err = client
			.execute(ApiRequest::get("/api/alerts/rules"))
			.await
			.expect_err("Envelope 401 should reject.");

		assert!(matches!(err, Error::Api(ref e) if e.code == 401));
		assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
		assert_eq!(observer.notice_messages(), ["未授权访问，请重新登录"]);
		assert_eq!(observer.terminations()[0].to_uri(), "/login?redirect=%2Falerts");
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn blob_requests_return_raw_bytes() {
		let transport = ScriptedTransport::new(|_, _| RawResponse {
			status: 200,
			headers: BTreeMap::from([("content-type".into(), "image/jpeg".into())]),
			body: vec![0xFF, 0xD8, 0xFF],
		});
		let (client, _, _) = client(transport);
		let bytes = client
			.download(ApiRequest::get("/api/devices/7/snapshot"))
			.await
			.expect("Blob download should succeed.");

		assert_eq!(bytes, [0xFF, 0xD8, 0xFF]);
	}

	#[tokio::test]
	async fn non_2xx_envelopes_use_the_code_table() {
		let transport = ScriptedTransport::new(|_, _| {
			json(400, serde_json::json!({ "code": 404, "message": "missing" }))
		});
		let (client, _, observer) = client(transport);
		let err = client
			.execute(ApiRequest::delete("/api/collectors/9"))
			.await
			.expect_err("Non-success envelopes should reject.");

		assert!(matches!(err, Error::Api(ref e) if e.code == 404));
		assert_eq!(observer.notice_messages(), ["请求的资源不存在"]);
	}

	#[tokio::test]
	async fn anonymous_401_never_refreshes() {
		let transport = ScriptedTransport::new(|_, _| json(401, serde_json::json!({})));
		let (client, store, observer) = client(transport);

		store.set(StorageKey::RefreshToken, "r-1".into()).await.expect("Seeding should succeed.");

		let err = client
			.execute(ApiRequest::post("/api/auth/login").anonymous())
			.await
			.expect_err("Anonymous 401 should reject.");

		assert!(matches!(err, Error::Http { status: 401, .. }));
		assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
		assert_eq!(observer.notice_messages(), ["未授权访问，请重新登录"]);
		assert!(observer.terminations().is_empty());
	}

	#[tokio::test]
	async fn clients_sharing_a_store_refresh_tokens_written_by_each_other() {
		let refreshes = Arc::new(AtomicUsize::new(0));
		let counter = refreshes.clone();
		let transport = Arc::new(ScriptedTransport::new(move |request, bearer| {
			match (request.path.as_str(), bearer.map(TokenSecret::expose)) {
				("/api/auth/refresh", None) => {
					let n = counter.fetch_add(1, Ordering::SeqCst) + 1;

					json(
						200,
						serde_json::json!({
							"code": 200,
							"data": {
								"accessToken": format!("a-{n}"),
								"refreshToken": format!("r-{n}")
							}
						}),
					)
				},
				("/api/devices", Some("a-3")) =>
					json(200, serde_json::json!({ "code": 200, "data": [] })),
				_ => json(401, serde_json::json!({})),
			}
		}));
		let store = Arc::new(MemoryStore::default());
		let (first, first_observer) = client_on(transport.clone(), store.clone());
		let (second, _) = client_on(transport, store.clone());

		store.set(StorageKey::AccessToken, "a-0".into()).await.expect("Seeding should succeed.");
		store.set(StorageKey::RefreshToken, "r-0".into()).await.expect("Seeding should succeed.");

		assert_eq!(
			first.renew_session().await.expect("First renewal should succeed."),
			TokenSecret::new("a-1")
		);
		assert_eq!(
			second.renew_session().await.expect("Second renewal should succeed."),
			TokenSecret::new("a-2")
		);

		// `a-2` is what the store holds now, and the server no longer accepts it.
		let devices: Vec<u32> = first
			.request(ApiRequest::get("/api/devices"))
			.await
			.expect("A token rotated by another client should still be refreshed.");

		assert!(devices.is_empty());
		assert_eq!(refreshes.load(Ordering::SeqCst), 3);
		assert_eq!(first.refresh_metrics.superseded(), 0);
		assert!(first_observer.terminations().is_empty());
		assert_eq!(store.snapshot().get("skyeye_access_token").map(String::as_str), Some("a-3"));
	}
}
