//! Shared fixtures for the reqwest-backed integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime, macros};
// self
use oauth2_session::{
	auth::{SessionRecord, UserId},
	config::{
		CALLBACK_URL_PARAMETER, CLIENT_ID_PARAMETER, MemoryParameterStore, RegistrationSource,
	},
	flows::ReqwestBroker,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	oauth::Clock,
	provider::ProviderDescriptor,
	reqwest::Client as ReqwestClient,
	store::{MemoryStore, SessionStore},
	url::Url,
};

pub const CLIENT_ID: &str = "client-session";
pub const CALLBACK_URL: &str = "https://app.example.com/callback";
pub const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

/// Clock pinned by the test body.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	pub fn at(instant: OffsetDateTime) -> Arc<Self> {
		Arc::new(Self(Mutex::new(instant)))
	}

	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	pub fn advance(&self, by: Duration) {
		*self.0.lock() += by;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock`.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	ReqwestHttpClient::from_builder(
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true),
	)
	.expect("Failed to build insecure Reqwest client for tests.")
}

pub fn registration_params() -> MemoryParameterStore {
	[(CLIENT_ID_PARAMETER, CLIENT_ID), (CALLBACK_URL_PARAMETER, CALLBACK_URL)]
		.into_iter()
		.collect()
}

pub fn build_descriptor(server: &MockServer) -> ProviderDescriptor {
	let url = |path: &str| {
		Url::parse(&server.url(path)).expect("Mock provider endpoint should parse successfully.")
	};

	ProviderDescriptor::builder("mock-cognito")
		.authorization_endpoint(url("/oauth2/authorize"))
		.token_endpoint(url("/oauth2/token"))
		.user_info_endpoint(url("/oauth2/userInfo"))
		.build()
		.expect("Provider descriptor should build successfully.")
}

/// Broker over `store` with the registration in `params` and a manual clock.
pub fn build_broker_with(
	server: &MockServer,
	store: Arc<dyn SessionStore>,
	params: MemoryParameterStore,
	clock: Arc<ManualClock>,
) -> ReqwestBroker {
	ReqwestBroker::with_http_client(
		store,
		RegistrationSource::new(Arc::new(params)),
		build_descriptor(server),
		test_reqwest_http_client(),
		Arc::new(ReqwestTransportErrorMapper),
	)
	.with_clock(clock)
}

/// Broker over a fresh [`MemoryStore`], returning the store for inspection.
pub fn build_broker(
	server: &MockServer,
	clock: Arc<ManualClock>,
) -> (ReqwestBroker, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let broker = build_broker_with(server, store.clone(), registration_params(), clock);

	(broker, store)
}

/// Seeds one session for `user` expiring an hour after [`T0`].
pub async fn seed_session(store: &MemoryStore, user: &str, access: &str, refresh: &str) {
	let record = SessionRecord::builder(UserId::new(user).expect("User fixture should be valid."))
		.access_token(access)
		.refresh_token(refresh)
		.expiry(T0 + Duration::hours(1))
		.build()
		.expect("Session record fixture should build successfully.");

	store.upsert(record).await.expect("Failed to seed session into the store.");
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: i64) -> serde_json::Value {
	let mut body = serde_json::json!({
		"access_token": access,
		"token_type": "Bearer",
		"expires_in": expires_in,
	});

	if let Some(refresh) = refresh {
		body["refresh_token"] = refresh.into();
	}

	body
}

pub fn profile_body(username: &str) -> serde_json::Value {
	serde_json::json!({
		"sub": "6f1c2a8e-0000-4000-8000-000000000001",
		"username": username,
		"email": format!("{username}@example.com"),
		"email_verified": "true",
		"name": "Test User",
	})
}
