//! Persisted session records, rotation helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{
		UserId,
		token::{self, Token, TokenSecret},
	},
};

/// Errors produced by [`SessionRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionRecordBuilderError {
	/// Issued when no (or an empty) access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expiry or expires_in.")]
	MissingExpiry,
}

/// Durable representation of one principal's OAuth grant.
///
/// Keyed by `user`; `access_token` is the unique secondary-index key. A refresh replaces the
/// token fields in place, so the old access token stops resolving once the rotated record is
/// written.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Stable identity of the principal.
	pub user: UserId,
	/// Current bearer credential.
	pub access_token: TokenSecret,
	/// Normalized token type.
	pub token_type: String,
	/// Refresh credential used to mint new access tokens.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant of `access_token`.
	#[serde(with = "time::serde::rfc3339")]
	pub expiry: OffsetDateTime,
}
impl SessionRecord {
	/// Returns a builder for the provided principal.
	pub fn builder(user: UserId) -> SessionRecordBuilder {
		SessionRecordBuilder::new(user)
	}

	/// Creates the first record for a principal from a freshly exchanged token.
	pub fn from_token(user: UserId, token: &Token) -> Self {
		Self {
			user,
			access_token: token.access_token.clone(),
			token_type: token.token_type.clone(),
			refresh_token: token.refresh_token.clone(),
			expiry: token.expiry,
		}
	}

	/// Token handle seeded from the stored fields.
	pub fn token(&self) -> Token {
		Token {
			access_token: self.access_token.clone(),
			token_type: self.token_type.clone(),
			refresh_token: self.refresh_token.clone(),
			expiry: self.expiry,
		}
	}

	/// Builds the replacement record after a refresh produced `token`.
	///
	/// The principal is kept; the refresh token is replaced only when the provider issued a
	/// new one.
	pub fn rotated(&self, token: &Token) -> Self {
		Self {
			user: self.user.clone(),
			access_token: token.access_token.clone(),
			token_type: token.token_type.clone(),
			refresh_token: token.refresh_token.clone().or_else(|| self.refresh_token.clone()),
			expiry: token.expiry,
		}
	}

	/// Returns `true` when `expiry` is at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expiry
	}

	/// Secondary-index key derived from the access token.
	pub fn access_fingerprint(&self) -> String {
		self.access_token.fingerprint()
	}
}
impl Debug for SessionRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionRecord")
			.field("user", &self.user)
			.field("access_token", &self.access_fingerprint())
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Builder for [`SessionRecord`].
#[derive(Clone, Debug)]
pub struct SessionRecordBuilder {
	user: UserId,
	access_token: Option<TokenSecret>,
	token_type: Option<String>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expiry: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl SessionRecordBuilder {
	fn new(user: UserId) -> Self {
		Self {
			user,
			access_token: None,
			token_type: None,
			refresh_token: None,
			issued_at: None,
			expiry: None,
			expires_in: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the token type (normalized on build).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant `expires_in` is measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expiry(mut self, instant: OffsetDateTime) -> Self {
		self.expiry = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`SessionRecord`].
	pub fn build(self) -> Result<SessionRecord, SessionRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(SessionRecordBuilderError::MissingAccessToken)?;
		let expiry = match (self.expiry, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(SessionRecordBuilderError::MissingExpiry),
		};

		Ok(SessionRecord {
			user: self.user,
			access_token,
			token_type: token::normalize_token_type(self.token_type.as_deref().unwrap_or_default()),
			refresh_token: self.refresh_token.filter(|secret| !secret.is_empty()),
			expiry,
		})
	}
}
