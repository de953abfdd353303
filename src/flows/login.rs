//! Authorization code login: exchange, identify, persist.

// self
use crate::{
	_prelude::*,
	auth::{SessionRecord, TokenSecret, UserId},
	error::IdentityError,
	flows::{SessionBroker, user_info},
	http::{ProviderHttpClient, TransportErrorMapper},
	obs::FlowKind,
};

/// Result of a completed login.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
	/// Principal the session was stored under.
	pub user: UserId,
	/// Access token the caller presents from now on.
	pub access_token: TokenSecret,
	/// Expiry instant of `access_token`.
	pub expiry: OffsetDateTime,
	/// Profile returned by the identity endpoint.
	pub profile: user_info::UserInfo,
}

impl<C, M> SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Redeems an authorization code and stores the resulting session.
	///
	/// Any previous session of the same principal is replaced, so its access token stops
	/// resolving. The token is only returned once the store has accepted the record.
	pub async fn login(&self, code: &str) -> Result<LoginOutcome> {
		self.observe(FlowKind::Login, "login", async move {
			let code = code.trim();

			if code.is_empty() {
				return Err(Error::invalid_request("authorization code is empty"));
			}

			let client = self.oauth_client().await?;
			let token =
				client.exchange_code(code, self.clock.now()).await.map_err(Error::from_exchange)?;
			let profile = user_info::fetch_user_info(&client, &token).await?;
			let user = profile.user_id().map_err(IdentityError::from)?;
			let record = SessionRecord::from_token(user.clone(), &token);

			self.store
				.upsert(record)
				.await
				.map_err(|source| Error::PersistenceFailed { source })?;

			Ok(LoginOutcome { user, access_token: token.access_token, expiry: token.expiry, profile })
		})
		.await
	}
}
