//! Authenticated API client for the SkyEye monitoring console.
//!
//! Every request carries the stored bearer token and has its `{code, message, data}` envelope
//! unwrapped. Expired tokens are renewed by a single refresh call that replays every request
//! blocked on it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and embedders wiring a client
	//! against a mock server.

	pub use serde_json::{Value, json};

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ApiClient,
		config::ClientConfig,
		http::ReqwestTransport,
		session::RecordingObserver,
		store::{MemoryStore, SessionStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

	/// Handles returned alongside a test client so assertions can inspect side effects.
	#[derive(Clone, Debug)]
	pub struct TestHarness {
		/// Backing credential store shared with the client.
		pub store: Arc<MemoryStore>,
		/// Observer capturing notifications, renewals, and terminations.
		pub observer: Arc<RecordingObserver>,
	}

	/// Builds a reqwest client that accepts the self-signed certificates `httpmock` serves.
	pub fn test_reqwest_client(timeout: std::time::Duration) -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(timeout)
			.build()
			.expect("Failed to build insecure reqwest client for tests.")
	}

	/// Builds a client against `base_url` with an in-memory store and a recording observer.
	pub fn build_test_client(base_url: &str) -> (ReqwestTestClient, TestHarness) {
		let config = ClientConfig::builder(
			Url::parse(base_url).expect("Mock server base URL should parse successfully."),
		)
		.timeout(std::time::Duration::from_secs(5))
		.build()
		.expect("Test client configuration should be valid.");
		let transport = ReqwestTransport::with_client(
			test_reqwest_client(config.timeout),
			config.base_url.clone(),
		);
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let observer = Arc::new(RecordingObserver::default());
		let client = ApiClient::with_transport(config, transport, store, observer.clone());

		(client, TestHarness { store: store_backend, observer })
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
