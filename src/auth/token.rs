//! Token handles, redacted secrets, and access-token fingerprints.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Token type assumed when the provider omits one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret is the empty string.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Stable, non-reversible identifier for the secret.
	///
	/// Base64 (no padding) SHA-256 digest of the raw value. Stores index on it and log
	/// fields carry it in place of the secret.
	pub fn fingerprint(&self) -> String {
		fingerprint(&self.0)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// In-memory OAuth token handle seeded from a session record or a token endpoint response.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	/// Bearer credential presented to resource servers.
	pub access_token: TokenSecret,
	/// Normalized token type (`Bearer` unless the provider says otherwise).
	pub token_type: String,
	/// Refresh credential, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant of `access_token`.
	pub expiry: OffsetDateTime,
}
impl Token {
	/// Creates a token handle, normalizing the token type.
	pub fn new(
		access_token: impl Into<String>,
		token_type: &str,
		refresh_token: Option<String>,
		expiry: OffsetDateTime,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			token_type: normalize_token_type(token_type),
			refresh_token: refresh_token.filter(|value| !value.is_empty()).map(TokenSecret::new),
			expiry,
		}
	}

	/// Returns `true` when the token must be refreshed before use at `now`.
	///
	/// `leeway` makes the token stale slightly before its nominal expiry so it does not lapse
	/// in flight.
	pub fn is_stale_at(&self, now: OffsetDateTime, leeway: Duration) -> bool {
		// An expiry too close to the calendar's lower bound to subtract from is always stale.
		self.expiry.checked_sub(leeway).is_none_or(|deadline| now >= deadline)
	}

	/// `Authorization` header value for outbound requests.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &self.access_token.fingerprint())
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Strips a `Bearer` scheme label from a presented credential, returning the raw token.
///
/// Credentials without a scheme are returned trimmed; other schemes are left untouched so they
/// fail lookup instead of being silently reinterpreted.
pub fn strip_bearer_scheme(credential: &str) -> &str {
	let trimmed = credential.trim();

	if trimmed.eq_ignore_ascii_case("bearer") {
		return "";
	}

	match trimmed.split_once(char::is_whitespace) {
		Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
		_ => trimmed,
	}
}

/// Fingerprints a raw token value (see [`TokenSecret::fingerprint`]).
pub fn fingerprint(raw: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(raw.as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

pub(crate) fn normalize_token_type(raw: &str) -> String {
	let trimmed = raw.trim();

	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("bearer") {
		DEFAULT_TOKEN_TYPE.into()
	} else if trimmed.eq_ignore_ascii_case("mac") {
		"MAC".into()
	} else if trimmed.eq_ignore_ascii_case("basic") {
		"Basic".into()
	} else {
		trimmed.into()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::{PrimitiveDateTime, macros};
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert!(!format!("{:?}", Token::new("super-secret", "", None, OffsetDateTime::UNIX_EPOCH))
			.contains("super-secret"));
	}

	#[test]
	fn fingerprints_are_stable_and_distinct() {
		let a = TokenSecret::new("AT1");

		assert_eq!(a.fingerprint(), fingerprint("AT1"));
		assert_ne!(a.fingerprint(), fingerprint("AT2"));
		assert!(!a.fingerprint().contains('='));
	}

	#[test]
	fn token_type_is_normalized() {
		let expiry = macros::datetime!(2025-01-01 01:00 UTC);

		assert_eq!(Token::new("a", "bearer", None, expiry).token_type, "Bearer");
		assert_eq!(Token::new("a", "", None, expiry).token_type, "Bearer");
		assert_eq!(Token::new("a", "mac", None, expiry).token_type, "MAC");
		assert_eq!(Token::new("a", "DPoP", None, expiry).token_type, "DPoP");
		assert_eq!(Token::new("a", "bearer", None, expiry).authorization_value(), "Bearer a");
	}

	#[test]
	fn empty_refresh_tokens_are_dropped() {
		let expiry = macros::datetime!(2025-01-01 01:00 UTC);

		assert!(Token::new("a", "Bearer", Some(String::new()), expiry).refresh_token.is_none());
		assert!(Token::new("a", "Bearer", Some("r".into()), expiry).refresh_token.is_some());
	}

	#[test]
	fn staleness_honors_leeway() {
		let token =
			Token::new("a", "Bearer", None, macros::datetime!(2025-01-01 01:00 UTC));
		let leeway = Duration::seconds(10);

		assert!(!token.is_stale_at(macros::datetime!(2025-01-01 00:59:49 UTC), leeway));
		assert!(token.is_stale_at(macros::datetime!(2025-01-01 00:59:50 UTC), leeway));
		assert!(token.is_stale_at(macros::datetime!(2025-01-01 03:00 UTC), Duration::ZERO));
	}

	#[test]
	fn staleness_near_the_calendar_bounds_does_not_panic() {
		let floor = Token::new("a", "Bearer", None, PrimitiveDateTime::MIN.assume_utc());
		let ceiling = Token::new("a", "Bearer", None, PrimitiveDateTime::MAX.assume_utc());
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(floor.is_stale_at(now, Duration::seconds(10)));
		assert!(!ceiling.is_stale_at(now, Duration::seconds(10)));
	}

	#[test]
	fn bearer_scheme_is_stripped_case_insensitively() {
		assert_eq!(strip_bearer_scheme("Bearer AT1"), "AT1");
		assert_eq!(strip_bearer_scheme("bearer   AT1 "), "AT1");
		assert_eq!(strip_bearer_scheme("AT1"), "AT1");
		assert_eq!(strip_bearer_scheme("Bearer "), "");
		assert_eq!(strip_bearer_scheme("Basic abc"), "Basic abc");
	}
}
