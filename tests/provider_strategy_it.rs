#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use common::*;
use oauth2_session::{
	error::Error,
	provider::{ProviderErrorContext, ProviderErrorKind, ProviderStrategy, TokenRequestKind},
};

/// Treats any refresh failure carrying an HTTP status as a revoked grant.
struct StrictRefreshStrategy;
impl ProviderStrategy for StrictRefreshStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		match (ctx.request, ctx.http_status) {
			(TokenRequestKind::RefreshToken, Some(_)) => ProviderErrorKind::InvalidGrant,
			_ => ProviderErrorKind::Transient,
		}
	}
}

#[tokio::test]
async fn custom_strategies_drive_refresh_classification() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::at(T0);
	let (broker, store) = build_broker(&server, clock.clone());
	let broker = broker.with_strategy(Arc::new(StrictRefreshStrategy));

	seed_session(&store, "alice", "AT1", "refresh1").await;
	clock.advance(Duration::hours(2));
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"error\":\"server_error\"}");
		})
		.await;

	let err = broker.resolve("AT1").await.expect_err("Refresh must fail.");

	assert!(matches!(err, Error::RefreshRejected { .. }));
}

#[tokio::test]
async fn the_default_strategy_treats_server_errors_as_transient() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::at(T0);
	let (broker, store) = build_broker(&server, clock.clone());

	seed_session(&store, "alice", "AT1", "refresh1").await;
	clock.advance(Duration::hours(2));
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"error\":\"server_error\"}");
		})
		.await;

	let err = broker.resolve("AT1").await.expect_err("Refresh must fail.");

	assert!(matches!(err, Error::RefreshFailed { .. }));
	assert!(err.is_retryable());
}

#[tokio::test]
async fn unclassified_client_errors_are_fatal() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_broker(&server, ManualClock::at(T0));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\",\"error_description\":\"unknown client\"}");
		})
		.await;

	let err = broker.login("abc123").await.expect_err("Unknown clients must fail.");

	assert!(matches!(err, Error::ExchangeFailed { .. }));
	assert!(!err.is_retryable());
	assert!(!err.requires_reauthentication());
}
