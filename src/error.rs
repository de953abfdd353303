//! Session-level error types shared across flows, stores, and configuration sources.

// self
use crate::{
	_prelude::*, auth::IdentifierError, config::ParameterStoreError, store::StoreError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// How a caller is expected to react to an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
	/// Temporary store or provider failure; retry with backoff.
	Retry,
	/// The session is gone or unusable; the caller must log in again.
	Reauthenticate,
	/// The caller supplied malformed input.
	FixInput,
	/// Deployment or registration problem that retrying will not fix.
	Fatal,
}
impl ErrorClass {
	/// Returns a stable label suitable for responses and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorClass::Retry => "retry",
			ErrorClass::Reauthenticate => "reauthenticate",
			ErrorClass::FixInput => "fix_input",
			ErrorClass::Fatal => "fatal",
		}
	}
}
impl Display for ErrorClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical error exposed by the session flows.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Client registration could not be read (`ConfigUnavailable`) or is malformed
	/// (`ConfigInvalid`).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Session store I/O failed while looking up a session.
	#[error("Session store is unavailable: {source}")]
	StoreUnavailable {
		/// Underlying store failure.
		#[source]
		source: StoreError,
	},
	/// Caller input was rejected before any I/O happened.
	#[error("Request is invalid: {reason}.")]
	InvalidRequest {
		/// Human-readable reason.
		reason: String,
	},
	/// No session record matches the presented credential.
	#[error("No session matches the presented credential.")]
	SessionNotFound,
	/// Provider reported the authorization code as invalid or expired.
	#[error("Provider rejected the authorization code.")]
	ExchangeRejected {
		/// Provider classification of the rejection.
		#[source]
		source: ProviderError,
	},
	/// Authorization code exchange failed for a non-rejection reason.
	#[error("Authorization code exchange failed.")]
	ExchangeFailed {
		/// Transport or provider failure.
		#[source]
		source: ProviderError,
	},
	/// Provider rejected the stored refresh token; the session is no longer usable.
	#[error("Provider rejected the refresh token.")]
	RefreshRejected {
		/// Provider classification of the rejection.
		#[source]
		source: ProviderError,
	},
	/// Token refresh failed for a non-rejection reason.
	#[error("Token refresh failed.")]
	RefreshFailed {
		/// Transport or provider failure.
		#[source]
		source: ProviderError,
	},
	/// Identity endpoint call or payload decoding failed.
	#[error("Identity lookup failed.")]
	IdentityLookupFailed {
		/// Identity endpoint failure.
		#[source]
		source: IdentityError,
	},
	/// Login could not make the new session durable.
	#[error("Session could not be persisted.")]
	PersistenceFailed {
		/// Underlying store failure.
		#[source]
		source: StoreError,
	},
}
impl Error {
	/// Classifies the error into retry, re-authentication, caller-input, or fatal buckets.
	pub fn class(&self) -> ErrorClass {
		match self {
			Error::Config(_) => ErrorClass::Fatal,
			Error::InvalidRequest { .. } => ErrorClass::FixInput,
			Error::SessionNotFound
			| Error::ExchangeRejected { .. }
			| Error::RefreshRejected { .. } => ErrorClass::Reauthenticate,
			Error::ExchangeFailed { source } | Error::RefreshFailed { source } =>
				if matches!(source, ProviderError::InvalidClient { .. }) {
					ErrorClass::Fatal
				} else {
					ErrorClass::Retry
				},
			Error::StoreUnavailable { .. }
			| Error::IdentityLookupFailed { .. }
			| Error::PersistenceFailed { .. } => ErrorClass::Retry,
		}
	}

	/// Returns `true` when the caller must restart from the login flow.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(self.class(), ErrorClass::Reauthenticate)
	}

	/// Returns `true` when the same call may succeed after a backoff.
	pub fn is_retryable(&self) -> bool {
		matches!(self.class(), ErrorClass::Retry)
	}

	pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
		Self::InvalidRequest { reason: reason.into() }
	}

	/// Maps a session lookup failure: a missing record means the session is gone, anything
	/// else is a store outage.
	pub(crate) fn from_lookup(err: StoreError) -> Self {
		match err {
			StoreError::NotFound => Self::SessionNotFound,
			source => Self::StoreUnavailable { source },
		}
	}

	pub(crate) fn from_exchange(source: ProviderError) -> Self {
		if source.is_rejection() {
			Self::ExchangeRejected { source }
		} else {
			Self::ExchangeFailed { source }
		}
	}

	pub(crate) fn from_refresh(source: ProviderError) -> Self {
		if source.is_rejection() {
			Self::RefreshRejected { source }
		} else {
			Self::RefreshFailed { source }
		}
	}
}
impl From<IdentityError> for Error {
	fn from(source: IdentityError) -> Self {
		Self::IdentityLookupFailed { source }
	}
}

/// Client registration and provider configuration failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Parameter store could not be read.
	#[error("Parameter store could not be read.")]
	ParameterStore(#[from] ParameterStoreError),
	/// A required registration parameter is absent or blank.
	#[error("Required parameter `{name}` is missing.")]
	MissingParameter {
		/// Parameter name that was looked up.
		name: String,
	},
	/// Redirect URL from the registration cannot be parsed.
	#[error("Redirect URL `{url}` is invalid.")]
	InvalidRedirect {
		/// Offending value.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider endpoint was rejected while building the OAuth client.
	#[error("Provider endpoint `{url}` is invalid.")]
	InvalidEndpoint {
		/// Offending value.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Returns `true` when the registration could not be obtained at all (`ConfigUnavailable`)
	/// rather than obtained but malformed (`ConfigInvalid`).
	pub fn is_unavailable(&self) -> bool {
		matches!(self, Self::ParameterStore(_) | Self::MissingParameter { .. })
	}
}

/// Failures reported by the identity provider's token endpoint or transport.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Provider rejected the grant (bad or expired code, revoked refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider refused the client credentials.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Network or IO failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token payload decoded but violates the expected shape.
	#[error("Token endpoint response is malformed: {reason}.")]
	MalformedResponse {
		/// What was wrong with the payload.
		reason: String,
	},
	/// Outbound request could not be assembled.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ProviderError {
	/// Returns `true` when the provider definitively refused the presented grant.
	pub fn is_rejection(&self) -> bool {
		matches!(self, Self::InvalidGrant { .. })
	}

	pub(crate) fn malformed(reason: impl Into<String>) -> Self {
		Self::MalformedResponse { reason: reason.into() }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Identity endpoint failures.
#[derive(Debug, ThisError)]
pub enum IdentityError {
	/// The request never produced an HTTP response.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// Identity endpoint answered with a non-success status.
	#[error("Identity endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Payload does not match the expected profile shape.
	#[error("Identity payload is malformed.")]
	Decode {
		/// Structured decoding failure, including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Payload carried a username that is not a valid principal identifier.
	#[error("Identity payload carries an invalid username.")]
	InvalidUsername(#[from] IdentifierError),
}
