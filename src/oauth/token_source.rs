//! Token sources that hand back a currently valid token, refreshing when the held one is
//! stale.

// self
use crate::{
	_prelude::*,
	auth::Token,
	error::ProviderError,
	http::{ProviderHttpClient, TransportErrorMapper},
	oauth::OAuthClient,
};

/// Source of the current instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Caches one token and refreshes it through the bound [`OAuthClient`] once it is stale.
///
/// A refreshed token replaces the cached one, so later calls reuse it until it goes stale in
/// turn.
pub struct TokenSource<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: OAuthClient<C, M>,
	clock: Arc<dyn Clock>,
	leeway: Duration,
	current: Mutex<Token>,
}
impl<C, M> TokenSource<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		client: OAuthClient<C, M>,
		token: Token,
		clock: Arc<dyn Clock>,
		leeway: Duration,
	) -> Self {
		Self { client, clock, leeway, current: Mutex::new(token) }
	}

	/// Returns a token valid at the current instant, refreshing first when needed.
	pub async fn token(&self) -> Result<Token, ProviderError> {
		let held = self.current.lock().clone();
		let now = self.clock.now();

		if !held.is_stale_at(now, self.leeway) {
			return Ok(held);
		}

		let refreshed = self.client.refresh(&held, now).await?;

		*self.current.lock() = refreshed.clone();

		Ok(refreshed)
	}

	/// Cached token without any staleness check.
	pub fn current(&self) -> Token {
		self.current.lock().clone()
	}

	/// Bound client the source refreshes through.
	pub fn client(&self) -> &OAuthClient<C, M> {
		&self.client
	}
}
impl<C, M> Debug for TokenSource<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSource")
			.field("leeway", &self.leeway)
			.field("current", &*self.current.lock())
			.finish()
	}
}
