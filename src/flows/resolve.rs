//! Session resolution: bearer credential in, authenticated client out.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{HeaderValue, header::AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::{Token, UserId, strip_bearer_scheme},
	error::ProviderError,
	flows::SessionBroker,
	http::{ProviderHttpClient, TransportErrorMapper},
	oauth::OAuthClient,
	obs::{self, FlowKind},
	store::StoreError,
};

/// Whether a refreshed token made it back into the session store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistenceStatus {
	/// The stored token was still valid; nothing was written.
	Unchanged,
	/// A refreshed token replaced the stored one.
	Persisted,
	/// A refreshed token is in use but the store write failed.
	///
	/// The old access token keeps resolving until the next successful write, and the next
	/// resolve of it refreshes again.
	Degraded(StoreError),
}

/// HTTP client pre-authorized with the principal's current access token.
pub struct AuthenticatedClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	user: UserId,
	token: Token,
	persistence: PersistenceStatus,
	client: OAuthClient<C, M>,
}
impl<C, M> AuthenticatedClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Principal the session belongs to.
	pub fn user(&self) -> &UserId {
		&self.user
	}

	/// Token the client authorizes requests with.
	pub fn token(&self) -> &Token {
		&self.token
	}

	/// Raw access token; differs from the presented credential after a refresh.
	pub fn access_token(&self) -> &str {
		self.token.access_token.expose()
	}

	/// Outcome of writing a refreshed token back to the store.
	pub fn persistence(&self) -> &PersistenceStatus {
		&self.persistence
	}

	/// Returns `true` when a refreshed token could not be stored.
	pub fn is_degraded(&self) -> bool {
		matches!(self.persistence, PersistenceStatus::Degraded(_))
	}

	/// OAuth client bound to the broker's transport.
	pub fn oauth_client(&self) -> &OAuthClient<C, M> {
		&self.client
	}

	/// Adds the `Authorization` header to `request`, replacing any existing one.
	pub fn authorize(&self, mut request: HttpRequest) -> Result<HttpRequest, ProviderError> {
		let value = HeaderValue::from_str(&self.token.authorization_value())
			.map_err(oauth2::http::Error::from)?;

		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(request)
	}

	/// Authorizes and sends `request` through the broker's transport.
	pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
		let request = self.authorize(request)?;

		self.client.send(request).await
	}

	/// Adds the `Authorization` header to a reqwest request builder.
	#[cfg(feature = "reqwest")]
	pub fn sign(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		builder.header(reqwest::header::AUTHORIZATION, self.token.authorization_value())
	}
}
impl<C, M> Debug for AuthenticatedClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("user", &self.user)
			.field("token", &self.token)
			.field("persistence", &self.persistence)
			.finish()
	}
}

impl<C, M> SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Resolves a bearer credential into an authenticated client.
	///
	/// Accepts a raw access token or an `Authorization` header value. A stale token is
	/// refreshed and the session record rotated before the client is returned; when the store
	/// rejects the rotation the refreshed client is still returned, flagged as
	/// [`PersistenceStatus::Degraded`].
	pub async fn resolve(&self, credential: &str) -> Result<AuthenticatedClient<C, M>> {
		self.observe(FlowKind::Resolve, "resolve", self.resolve_session(credential)).await
	}

	pub(crate) async fn resolve_session(
		&self,
		credential: &str,
	) -> Result<AuthenticatedClient<C, M>> {
		let raw = strip_bearer_scheme(credential);

		if raw.is_empty() {
			return Err(Error::invalid_request("access token is empty"));
		}

		let record = self.store.find_by_access_token(raw).await.map_err(Error::from_lookup)?;
		let client = self.oauth_client().await?;
		let source = client.token_source(record.token(), self.clock.clone(), self.refresh_leeway);
		let token = source.token().await.map_err(Error::from_refresh)?;
		let persistence = if token.access_token == record.access_token {
			PersistenceStatus::Unchanged
		} else {
			match self.store.upsert(record.rotated(&token)).await {
				Ok(()) => PersistenceStatus::Persisted,
				Err(e) => {
					obs::report_persistence_degraded(
						&record.user,
						&token.access_token.fingerprint(),
						&e,
					);

					PersistenceStatus::Degraded(e)
				},
			}
		};

		Ok(AuthenticatedClient { user: record.user, token, persistence, client })
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use oauth2::http::{Method, Request};
	// self
	use super::*;
	use crate::{
		config::ClientRegistration,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		oauth::OAuthConfig,
		provider::{DefaultProviderStrategy, ProviderDescriptor},
	};

	fn client() -> AuthenticatedClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
		let descriptor =
			ProviderDescriptor::cognito("auth.example.io").expect("Descriptor fixture should build.");
		let config = OAuthConfig::build(
			&descriptor,
			&ClientRegistration::new("client", "https://app.example.com/callback"),
		)
		.expect("Config fixture should build.");

		AuthenticatedClient {
			user: UserId::new("alice").expect("User fixture should be valid."),
			token: Token::new("AT2", "bearer", Some("refresh1".into()), OffsetDateTime::UNIX_EPOCH),
			persistence: PersistenceStatus::Persisted,
			client: config.bind(
				Arc::new(ReqwestHttpClient::new().expect("Reqwest client should build.")),
				Arc::new(ReqwestTransportErrorMapper),
				Arc::new(DefaultProviderStrategy),
			),
		}
	}

	#[test]
	fn authorize_replaces_existing_authorization_headers() {
		let client = client();
		let request = Request::builder()
			.method(Method::GET)
			.uri("https://api.example.com/me")
			.header(AUTHORIZATION, "Bearer AT1")
			.body(Vec::new())
			.expect("Request fixture should build.");
		let authorized = client.authorize(request).expect("Authorization should apply.");
		let values = authorized.headers().get_all(AUTHORIZATION).iter().collect::<Vec<_>>();

		assert_eq!(values, vec![&HeaderValue::from_static("Bearer AT2")]);
		assert_eq!(client.access_token(), "AT2");
		assert!(!client.is_degraded());
	}

	#[test]
	fn sign_attaches_bearer_auth_to_reqwest_builders() {
		let client = client();
		let request = client
			.sign(ReqwestClient::new().get("https://api.example.com/me"))
			.build()
			.expect("Reqwest request should build.");

		assert_eq!(
			request.headers().get(reqwest::header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer AT2")
		);
	}
}
