//! Authorization redirect construction for front ends starting a login.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	flows::SessionBroker,
	http::{ProviderHttpClient, TransportErrorMapper},
	obs::FlowKind,
};

const STATE_LEN: usize = 32;

/// Authorize URL plus the `state` value the provider must echo back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRedirect {
	/// Fully-formed authorize URL to send the end-user to.
	pub url: Url,
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
}
impl AuthorizationRedirect {
	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(Error::invalid_request("authorization state mismatch"))
		}
	}
}

impl<C, M> SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the provider authorize URL (`response_type=code`) with a fresh random state.
	pub async fn authorization_redirect(&self) -> Result<AuthorizationRedirect> {
		self.observe(FlowKind::Authorize, "authorization_redirect", async move {
			let client = self.oauth_client().await?;
			let state = random_state();
			let url = client.config().authorize_url(&state);

			Ok(AuthorizationRedirect { url, state })
		})
		.await
	}
}

fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
