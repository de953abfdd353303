//! Provider descriptor data structures and their validating builder.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Descriptor identifier is blank.
	#[error("Provider identifier cannot be empty.")]
	EmptyId,
	/// Authorization endpoint is required to start the login redirect.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for code exchanges and refreshes.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Identity endpoint is required to resolve the principal after login.
	#[error("Missing user info endpoint.")]
	MissingUserInfoEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A hosted domain could not be turned into endpoint URLs.
	#[error("Provider domain `{domain}` is invalid.")]
	InvalidDomain {
		/// Offending domain.
		domain: String,
	},
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the login redirect points at.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Identity endpoint returning the authenticated principal's profile.
	pub user_info: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier, used in span fields.
	pub id: String,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested by the authorization redirect.
	pub scopes: Vec<String>,
}
impl ProviderDescriptor {
	/// Scopes requested when a descriptor does not override them.
	pub const DEFAULT_SCOPES: [&'static str; 3] = ["openid", "email", "profile"];

	/// Creates a new builder for the provided identifier.
	pub fn builder(id: impl Into<String>) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Descriptor for a hosted Cognito user pool domain (e.g. `auth.example.com`).
	///
	/// Endpoints follow the hosted UI layout: `/oauth2/authorize`, `/oauth2/token`, and
	/// `/oauth2/userInfo`.
	pub fn cognito(domain: &str) -> Result<Self, ProviderDescriptorError> {
		let domain = domain.trim().trim_end_matches('/');
		let base = Url::parse(&format!("https://{domain}/"))
			.ok()
			.filter(|url| !domain.is_empty() && url.host_str().is_some() && url.path() == "/")
			.ok_or_else(|| ProviderDescriptorError::InvalidDomain { domain: domain.to_owned() })?;
		let endpoint = |path: &str| {
			base.join(path)
				.map_err(|_| ProviderDescriptorError::InvalidDomain { domain: domain.to_owned() })
		};

		Self::builder("cognito")
			.authorization_endpoint(endpoint("oauth2/authorize")?)
			.token_endpoint(endpoint("oauth2/token")?)
			.user_info_endpoint(endpoint("oauth2/userInfo")?)
			.build()
	}

	/// Space-delimited scope string sent with the authorization redirect.
	pub fn scope_param(&self) -> String {
		self.scopes.join(" ")
	}

	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if self.id.trim().is_empty() {
			return Err(ProviderDescriptorError::EmptyId);
		}

		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("user_info", &self.endpoints.user_info)?;

		Ok(())
	}
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: String,
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Option<Url>,
	/// Identity endpoint.
	pub user_info_endpoint: Option<Url>,
	/// Requested scopes; `None` keeps [`ProviderDescriptor::DEFAULT_SCOPES`].
	pub scopes: Option<Vec<String>>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			authorization_endpoint: None,
			token_endpoint: None,
			user_info_endpoint: None,
			scopes: None,
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the identity endpoint.
	pub fn user_info_endpoint(mut self, url: Url) -> Self {
		self.user_info_endpoint = Some(url);

		self
	}

	/// Overrides the scopes requested by the authorization redirect.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let user_info =
			self.user_info_endpoint.ok_or(ProviderDescriptorError::MissingUserInfoEndpoint)?;
		let scopes = self.scopes.unwrap_or_else(|| {
			ProviderDescriptor::DEFAULT_SCOPES.iter().map(|scope| (*scope).to_owned()).collect()
		});
		let descriptor = ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { authorization, token, user_info },
			scopes,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
