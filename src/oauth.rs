//! OAuth client configuration and token endpoint calls.
//!
//! [`OAuthConfig`] is a pure value combining the provider descriptor with the client
//! registration; it is rebuilt for every flow invocation. Binding it to a transport yields an
//! [`OAuthClient`] that exchanges authorization codes, refreshes tokens, and hands out
//! [`TokenSource`]s.

pub mod token_source;

pub use oauth2;
pub use token_source::*;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet, EndpointSet,
	HttpClientError, HttpRequest, HttpResponse, RedirectUrl, RefreshToken, RequestTokenError,
	Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	config::ClientRegistration,
	error::{ConfigError, ProviderError, TransientError},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot, TransportErrorMapper},
	provider::{
		ProviderDescriptor, ProviderErrorContext, ProviderErrorKind, ProviderStrategy,
		TokenRequestKind,
	},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provider endpoints bound to one client registration.
#[derive(Clone, Debug)]
pub struct OAuthConfig {
	oauth_client: ConfiguredBasicClient,
	registration: ClientRegistration,
	redirect_url: Url,
	user_info: Url,
	scopes: Vec<String>,
}
impl OAuthConfig {
	/// Combines the descriptor's endpoints with the registration.
	///
	/// Fails with [`ConfigError::InvalidRedirect`] when the registered redirect URL is
	/// malformed.
	pub fn build(
		descriptor: &ProviderDescriptor,
		registration: &ClientRegistration,
	) -> Result<Self, ConfigError> {
		let redirect_url = registration.parsed_redirect_url()?;
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(invalid_endpoint(&descriptor.endpoints.authorization))?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(invalid_endpoint(&descriptor.endpoints.token))?;
		let oauth_client = BasicClient::new(ClientId::new(registration.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(RedirectUrl::from_url(redirect_url.clone()));

		Ok(Self {
			oauth_client,
			registration: registration.clone(),
			redirect_url,
			user_info: descriptor.endpoints.user_info.clone(),
			scopes: descriptor.scopes.clone(),
		})
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.registration.client_id
	}

	/// Parsed redirect URL.
	pub fn redirect_url(&self) -> &Url {
		&self.redirect_url
	}

	/// Identity endpoint queried after login and by the user info flow.
	pub fn user_info_endpoint(&self) -> &Url {
		&self.user_info
	}

	/// Authorization URL for the code flow carrying `state`.
	pub fn authorize_url(&self, state: &str) -> Url {
		let (url, _) = self
			.oauth_client
			.authorize_url(|| CsrfToken::new(state.to_owned()))
			.add_scopes(self.scopes.iter().cloned().map(Scope::new))
			.url();

		url
	}

	/// Attaches a transport, producing a client able to call the token endpoint.
	pub fn bind<C, M>(
		self,
		http_client: Arc<C>,
		mapper: Arc<M>,
		strategy: Arc<dyn ProviderStrategy>,
	) -> OAuthClient<C, M>
	where
		C: ?Sized + ProviderHttpClient,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		OAuthClient { config: Arc::new(self), http_client, mapper, strategy }
	}
}

/// [`OAuthConfig`] bound to a transport, error mapper, and provider strategy.
pub struct OAuthClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<OAuthConfig>,
	http_client: Arc<C>,
	mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> OAuthClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Underlying configuration.
	pub fn config(&self) -> &OAuthConfig {
		&self.config
	}

	/// Exchanges a one-time authorization code for a token issued at `now`.
	pub async fn exchange_code(
		&self,
		code: &str,
		now: OffsetDateTime,
	) -> Result<Token, ProviderError> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = self
			.config
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&handle)
			.await
			.map_err(|err| {
				self.map_request_error(TokenRequestKind::AuthorizationCode, meta.take(), err)
			})?;

		token_from_response(&response, None, now)
	}

	/// Redeems the token's refresh credential for a new token issued at `now`.
	///
	/// The previous refresh token is carried over when the provider does not issue a new one.
	/// A token without a refresh credential is treated as a rejected grant.
	pub async fn refresh(&self, token: &Token, now: OffsetDateTime) -> Result<Token, ProviderError> {
		let refresh = token.refresh_token.as_ref().ok_or_else(|| ProviderError::InvalidGrant {
			reason: "session holds no refresh token".into(),
		})?;
		let secret = RefreshToken::new(refresh.expose().to_owned());
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = self
			.config
			.oauth_client
			.exchange_refresh_token(&secret)
			.request_async(&handle)
			.await
			.map_err(|err| {
				self.map_request_error(TokenRequestKind::RefreshToken, meta.take(), err)
			})?;

		token_from_response(&response, Some(refresh), now)
	}

	/// Seeds a [`TokenSource`] with `token`.
	pub fn token_source(
		&self,
		token: Token,
		clock: Arc<dyn Clock>,
		leeway: Duration,
	) -> TokenSource<C, M> {
		TokenSource::new(self.clone(), token, clock, leeway)
	}

	/// Sends an arbitrary request (identity lookups) through the bound transport.
	pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());

		handle
			.call(request)
			.await
			.map_err(|err| self.mapper.map_transport_error(meta.take().as_ref(), err))
	}

	fn map_request_error(
		&self,
		request: TokenRequestKind,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> ProviderError {
		let meta = meta.as_ref();
		let status = ResponseMetadata::status_of(meta);

		match err {
			RequestTokenError::ServerResponse(response) =>
				self.map_server_response_error(request, response, meta),
			RequestTokenError::Request(error) => self.mapper.map_transport_error(meta, error),
			RequestTokenError::Parse(source, body) => match status {
				Some(code) if code >= 400 => {
					let ctx = ProviderErrorContext::new(request)
						.with_http_status(code)
						.with_body_preview(String::from_utf8_lossy(&body));

					classified(self.strategy.classify_token_error(&ctx), format!("HTTP {code}"), meta)
				},
				_ => TransientError::TokenResponseParse { source, status }.into(),
			},
			RequestTokenError::Other(message) => TransientError::TokenEndpoint {
				message,
				status,
				retry_after: ResponseMetadata::retry_after_of(meta),
			}
			.into(),
		}
	}

	fn map_server_response_error(
		&self,
		request: TokenRequestKind,
		response: BasicErrorResponse,
		meta: Option<&ResponseMetadata>,
	) -> ProviderError {
		let mut ctx =
			ProviderErrorContext::new(request).with_oauth_error(response.error().as_ref());

		if let Some(description) = response.error_description() {
			ctx = ctx.with_error_description(description.as_str());
		}
		if let Some(status) = ResponseMetadata::status_of(meta) {
			ctx = ctx.with_http_status(status);
		}

		let reason = match response.error_description() {
			Some(description) => format!("{}: {description}", response.error().as_ref()),
			None => response.error().as_ref().to_owned(),
		};

		classified(self.strategy.classify_token_error(&ctx), reason, meta)
	}
}
impl<C, M> Clone for OAuthClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			http_client: self.http_client.clone(),
			mapper: self.mapper.clone(),
			strategy: self.strategy.clone(),
		}
	}
}
impl<C, M> Debug for OAuthClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthClient").field("config", &self.config).finish()
	}
}

fn invalid_endpoint(url: &Url) -> impl FnOnce(url::ParseError) -> ConfigError {
	let url = url.to_string();

	move |source| ConfigError::InvalidEndpoint { url, source }
}

fn classified(
	kind: ProviderErrorKind,
	reason: String,
	meta: Option<&ResponseMetadata>,
) -> ProviderError {
	match kind {
		ProviderErrorKind::InvalidGrant => ProviderError::InvalidGrant { reason },
		ProviderErrorKind::InvalidClient => ProviderError::InvalidClient { reason },
		ProviderErrorKind::Transient => TransientError::TokenEndpoint {
			message: reason,
			status: ResponseMetadata::status_of(meta),
			retry_after: ResponseMetadata::retry_after_of(meta),
		}
		.into(),
	}
}

fn token_from_response(
	response: &BasicTokenResponse,
	previous_refresh: Option<&TokenSecret>,
	now: OffsetDateTime,
) -> Result<Token, ProviderError> {
	let access_token = response.access_token().secret();

	if access_token.is_empty() {
		return Err(ProviderError::malformed("access_token is empty"));
	}

	let expires_in = response
		.expires_in()
		.ok_or_else(|| ProviderError::malformed("expires_in is missing"))?
		.as_secs();
	let expires_in = i64::try_from(expires_in)
		.ok()
		.filter(|secs| *secs > 0)
		.ok_or_else(|| ProviderError::malformed("expires_in must be a positive number of seconds"))?;
	let expiry = now
		.checked_add(Duration::seconds(expires_in))
		.ok_or_else(|| ProviderError::malformed("expires_in is out of range"))?;
	let mut token = Token::new(
		access_token.clone(),
		response.token_type().as_ref(),
		response.refresh_token().map(|secret| secret.secret().clone()),
		expiry,
	);

	if token.refresh_token.is_none() {
		token.refresh_token = previous_refresh.cloned();
	}

	Ok(token)
}
