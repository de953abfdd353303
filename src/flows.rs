//! High-level session flows powered by the broker facade.

pub mod authorize;
pub mod login;
pub mod resolve;
pub mod user_info;

pub use authorize::*;
pub use login::*;
pub use resolve::*;
pub use user_info::*;

// self
use crate::{
	_prelude::*,
	config::RegistrationSource,
	http::{ProviderHttpClient, TransportErrorMapper},
	oauth::{Clock, OAuthClient, OAuthConfig, SystemClock},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{DefaultProviderStrategy, ProviderDescriptor, ProviderStrategy},
	store::SessionStore,
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = SessionBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates session flows against a single identity provider.
///
/// The broker owns the HTTP client, session store, provider descriptor, registration source,
/// and strategy references so individual flows can focus on their own steps. Nothing else is
/// shared between invocations: the OAuth client is rebuilt from the registration source on
/// every call.
pub struct SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Session store holding one record per principal.
	pub store: Arc<dyn SessionStore>,
	/// Source of the client id and redirect URL.
	pub registration: RegistrationSource,
	/// Provider descriptor that defines the OAuth endpoints.
	pub descriptor: ProviderDescriptor,
	/// Strategy classifying token endpoint failures.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Clock consulted for expiry decisions.
	pub clock: Arc<dyn Clock>,
	/// Tokens are treated as stale this long before their nominal expiry.
	pub refresh_leeway: Duration,
}
impl<C, M> SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Default early-expiry window applied before refreshing.
	pub const DEFAULT_REFRESH_LEEWAY: Duration = Duration::seconds(10);

	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn SessionStore>,
		registration: RegistrationSource,
		descriptor: ProviderDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			registration,
			descriptor,
			strategy: Arc::new(DefaultProviderStrategy),
			clock: Arc::new(SystemClock),
			refresh_leeway: Self::DEFAULT_REFRESH_LEEWAY,
		}
	}

	/// Replaces the provider strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Replaces the clock (tests pin time with this).
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the early-expiry window; negative values are clamped to zero.
	pub fn with_refresh_leeway(mut self, leeway: Duration) -> Self {
		self.refresh_leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Reads the registration and binds a fresh OAuth client to the broker's transport.
	pub async fn oauth_client(&self) -> Result<OAuthClient<C, M>> {
		let registration = self.registration.fetch().await?;
		let config = OAuthConfig::build(&self.descriptor, &registration)?;

		Ok(config.bind(
			self.http_client.clone(),
			self.transport_mapper.clone(),
			self.strategy.clone(),
		))
	}

	async fn observe<T, F>(&self, kind: FlowKind, stage: &'static str, flow: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let span = FlowSpan::new(kind, stage);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span.instrument(flow).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(e) => {
				span.record_error(e);
				obs::record_flow_outcome(kind, FlowOutcome::Failure);
			},
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl SessionBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker with its own non-redirecting reqwest transport.
	pub fn new(
		store: Arc<dyn SessionStore>,
		registration: RegistrationSource,
		descriptor: ProviderDescriptor,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			store,
			registration,
			descriptor,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Clone for SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			store: self.store.clone(),
			registration: self.registration.clone(),
			descriptor: self.descriptor.clone(),
			strategy: self.strategy.clone(),
			clock: self.clock.clone(),
			refresh_leeway: self.refresh_leeway,
		}
	}
}
impl<C, M> Debug for SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionBroker")
			.field("descriptor", &self.descriptor)
			.field("registration", &self.registration)
			.field("refresh_leeway", &self.refresh_leeway)
			.finish()
	}
}
