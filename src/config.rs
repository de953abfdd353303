//! Client registration lookup backed by a key/value parameter store.
//!
//! The identity provider's client id and redirect URL live outside the crate (a managed
//! parameter store, the process environment, or a test fixture). [`RegistrationSource`] reads
//! the two named parameters on every call so each flow invocation builds its OAuth client
//! from current values instead of a process-wide cached configuration.

pub mod env;
pub mod memory;

pub use env::EnvParameterStore;
pub use memory::MemoryParameterStore;

// self
use crate::{_prelude::*, error::ConfigError};

/// Default parameter name holding the OAuth client identifier.
pub const CLIENT_ID_PARAMETER: &str = "/cognito/client/id";
/// Default parameter name holding the OAuth redirect (callback) URL.
pub const CALLBACK_URL_PARAMETER: &str = "/cognito/client/callbackUrl";

/// Boxed future returned by [`ParameterStore`] implementations.
pub type ParameterFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ParameterStoreError>> + 'a + Send>>;

/// Read-only key/value configuration store.
pub trait ParameterStore
where
	Self: Send + Sync,
{
	/// Fetches the named parameters. Names without a value are omitted from the returned map.
	fn get_parameters<'a>(
		&'a self,
		names: &'a [&'a str],
	) -> ParameterFuture<'a, HashMap<String, String>>;
}

/// Error type produced by [`ParameterStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ParameterStoreError {
	/// Backend could not be reached or answered with an error.
	#[error("Parameter store backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// OAuth client registration as provisioned with the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Redirect URL registered for the authorization code flow (unparsed).
	pub redirect_url: String,
}
impl ClientRegistration {
	/// Creates a registration from raw values.
	pub fn new(client_id: impl Into<String>, redirect_url: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), redirect_url: redirect_url.into() }
	}

	/// Parses the redirect URL, failing with [`ConfigError::InvalidRedirect`].
	pub fn parsed_redirect_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.redirect_url).map_err(|source| ConfigError::InvalidRedirect {
			url: self.redirect_url.clone(),
			source,
		})
	}
}

/// Reads the [`ClientRegistration`] from a [`ParameterStore`].
#[derive(Clone)]
pub struct RegistrationSource {
	store: Arc<dyn ParameterStore>,
	client_id_parameter: String,
	redirect_url_parameter: String,
}
impl RegistrationSource {
	/// Creates a source that reads the default parameter names.
	pub fn new(store: Arc<dyn ParameterStore>) -> Self {
		Self {
			store,
			client_id_parameter: CLIENT_ID_PARAMETER.into(),
			redirect_url_parameter: CALLBACK_URL_PARAMETER.into(),
		}
	}

	/// Overrides the parameter names holding the client id and redirect URL.
	pub fn with_parameter_names(
		mut self,
		client_id: impl Into<String>,
		redirect_url: impl Into<String>,
	) -> Self {
		self.client_id_parameter = client_id.into();
		self.redirect_url_parameter = redirect_url.into();

		self
	}

	/// Reads both parameters.
	///
	/// Fails when the store is unreachable or when either value is absent or blank.
	pub async fn fetch(&self) -> Result<ClientRegistration, ConfigError> {
		let names = [self.client_id_parameter.as_str(), self.redirect_url_parameter.as_str()];
		let mut values = self.store.get_parameters(&names).await?;
		let mut take = |name: &str| {
			values
				.remove(name)
				.map(|value| value.trim().to_owned())
				.filter(|value| !value.is_empty())
				.ok_or_else(|| ConfigError::MissingParameter { name: name.to_owned() })
		};
		let client_id = take(self.client_id_parameter.as_str())?;
		let redirect_url = take(self.redirect_url_parameter.as_str())?;

		Ok(ClientRegistration { client_id, redirect_url })
	}
}
impl Debug for RegistrationSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistrationSource")
			.field("client_id_parameter", &self.client_id_parameter)
			.field("redirect_url_parameter", &self.redirect_url_parameter)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	struct UnreachableStore;
	impl ParameterStore for UnreachableStore {
		fn get_parameters<'a>(
			&'a self,
			_names: &'a [&'a str],
		) -> ParameterFuture<'a, HashMap<String, String>> {
			Box::pin(async {
				Err(ParameterStoreError::Backend { message: "connection refused".into() })
			})
		}
	}

	fn runtime() -> Runtime {
		Runtime::new().expect("Failed to build Tokio runtime for registration tests.")
	}

	#[test]
	fn fetch_reads_and_trims_both_parameters() {
		let store = MemoryParameterStore::from_iter([
			(CLIENT_ID_PARAMETER, " client-123 "),
			(CALLBACK_URL_PARAMETER, "https://app.example.com/callback"),
		]);
		let registration = runtime()
			.block_on(RegistrationSource::new(Arc::new(store)).fetch())
			.expect("Registration should be readable.");

		assert_eq!(registration.client_id, "client-123");
		assert_eq!(registration.redirect_url, "https://app.example.com/callback");
	}

	#[test]
	fn fetch_fails_when_either_parameter_is_missing() {
		let store = MemoryParameterStore::from_iter([(CLIENT_ID_PARAMETER, "client-123")]);
		let err = runtime()
			.block_on(RegistrationSource::new(Arc::new(store)).fetch())
			.expect_err("Missing callback URL must fail.");

		assert!(err.is_unavailable());
		assert!(
			matches!(err, ConfigError::MissingParameter { ref name } if name == CALLBACK_URL_PARAMETER)
		);

		let blank = MemoryParameterStore::from_iter([
			(CLIENT_ID_PARAMETER, "   "),
			(CALLBACK_URL_PARAMETER, "https://app.example.com/callback"),
		]);
		let err = runtime()
			.block_on(RegistrationSource::new(Arc::new(blank)).fetch())
			.expect_err("Blank client id must fail.");

		assert!(matches!(err, ConfigError::MissingParameter { ref name } if name == CLIENT_ID_PARAMETER));
	}

	#[test]
	fn fetch_surfaces_store_outages_as_unavailable() {
		let err = runtime()
			.block_on(RegistrationSource::new(Arc::new(UnreachableStore)).fetch())
			.expect_err("Unreachable store must fail.");

		assert!(matches!(err, ConfigError::ParameterStore(_)));
		assert!(err.is_unavailable());
	}

	#[test]
	fn custom_parameter_names_are_honored() {
		let store = MemoryParameterStore::from_iter([
			("/app/oauth/client", "client-xyz"),
			("/app/oauth/redirect", "https://xyz.example.com/cb"),
		]);
		let source = RegistrationSource::new(Arc::new(store))
			.with_parameter_names("/app/oauth/client", "/app/oauth/redirect");
		let registration =
			runtime().block_on(source.fetch()).expect("Custom names should resolve.");

		assert_eq!(registration.client_id, "client-xyz");
		assert_eq!(
			registration.parsed_redirect_url().expect("Redirect should parse.").as_str(),
			"https://xyz.example.com/cb"
		);
	}

	#[test]
	fn malformed_redirect_is_invalid_not_unavailable() {
		let err = ClientRegistration::new("client", "not a url")
			.parsed_redirect_url()
			.expect_err("Malformed redirect must fail to parse.");

		assert!(matches!(err, ConfigError::InvalidRedirect { .. }));
		assert!(!err.is_unavailable());
	}
}
