//! Provider strategy hooks that classify token endpoint failures.
//!
//! Implementations normalize error mapping without tying flows to any particular HTTP client.

// self
use crate::_prelude::*;

/// Token endpoint call a failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRequestKind {
	/// `grant_type=authorization_code`.
	AuthorizationCode,
	/// `grant_type=refresh_token`.
	RefreshToken,
}
impl TokenRequestKind {
	/// Returns the OAuth `grant_type` value.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenRequestKind::AuthorizationCode => "authorization_code",
			TokenRequestKind::RefreshToken => "refresh_token",
		}
	}
}

/// Strategy hook that lets providers classify token endpoint errors.
///
/// The hook works on crate-owned data so downstream crates never depend on reqwest-specific
/// structures.
pub trait ProviderStrategy
where
	Self: Send + Sync,
{
	/// Maps low-level HTTP/JSON errors into the session taxonomy for a token request.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the grant (bad code, expired or revoked refresh token).
	InvalidGrant,
	/// Client registration is not accepted by the provider.
	InvalidClient,
	/// Failure is temporary and should be retried.
	Transient,
}

/// Context passed to provider strategies when classifying token errors.
///
/// Only primitive data is kept (status codes, OAuth fields, body preview).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Token request associated with the failure.
	pub request: TokenRequestKind,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided request.
	pub fn new(request: TokenRequestKind) -> Self {
		Self {
			request,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
		}
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a truncated body preview for providers that return non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		let body = body.into();

		self.body_preview = Some(match body.char_indices().nth(Self::BODY_PREVIEW_LIMIT) {
			Some((cut, _)) => format!("{}…", &body[..cut]),
			None => body,
		});

		self
	}
}

/// Default strategy applying RFC 6749 heuristics.
///
/// Structured OAuth fields win, then body hints, then the HTTP status. Transport failures
/// never reach a strategy; the transport error mapper reports them as transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(match_exact_value)
			.or_else(|| ctx.error_description.as_deref().and_then(match_exact_value))
			.or_else(|| classify_body(ctx.error_description.as_deref()))
			.or_else(|| classify_body(ctx.body_preview.as_deref()))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	const GRANT: [&str; 3] = ["invalid_grant", "access_denied", "expired_token"];
	const CLIENT: [&str; 4] =
		["invalid_client", "unauthorized_client", "invalid_scope", "unsupported_grant_type"];
	const TRANSIENT: [&str; 3] = ["temporarily_unavailable", "server_error", "slow_down"];

	let value = value.trim();
	let is = |set: &[&str]| set.iter().any(|candidate| value.eq_ignore_ascii_case(candidate));

	if is(&GRANT[..]) {
		Some(ProviderErrorKind::InvalidGrant)
	} else if is(&CLIENT[..]) {
		Some(ProviderErrorKind::InvalidClient)
	} else if is(&TRANSIENT[..]) {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") || text.contains("refresh token has expired") =>
			Some(ProviderErrorKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(ProviderErrorKind::InvalidClient),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401 | 403) => ProviderErrorKind::InvalidClient,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_token_error(&ctx)
	}

	#[test]
	fn oauth_fields_take_precedence_over_status() {
		let ctx = ProviderErrorContext::new(TokenRequestKind::RefreshToken)
			.with_http_status(500)
			.with_oauth_error("invalid_grant");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidGrant);

		let ctx = ProviderErrorContext::new(TokenRequestKind::AuthorizationCode)
			.with_http_status(400)
			.with_oauth_error("invalid_client");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidClient);
	}

	#[test]
	fn descriptions_and_bodies_are_consulted_before_status() {
		let ctx = ProviderErrorContext::new(TokenRequestKind::RefreshToken)
			.with_oauth_error("custom")
			.with_error_description("Refresh Token has expired");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidGrant);

		let ctx = ProviderErrorContext::new(TokenRequestKind::RefreshToken)
			.with_http_status(400)
			.with_body_preview("upstream said: please retry later");

		assert_eq!(classify(ctx), ProviderErrorKind::Transient);
	}

	#[test]
	fn status_fallback_classifies_unrecognized_errors() {
		let status = |code| {
			classify(ProviderErrorContext::new(TokenRequestKind::AuthorizationCode).with_http_status(code))
		};

		assert_eq!(status(400), ProviderErrorKind::InvalidGrant);
		assert_eq!(status(401), ProviderErrorKind::InvalidClient);
		assert_eq!(status(429), ProviderErrorKind::Transient);
		assert_eq!(status(503), ProviderErrorKind::Transient);
		assert_eq!(
			classify(ProviderErrorContext::new(TokenRequestKind::RefreshToken)),
			ProviderErrorKind::Transient
		);
		assert_eq!(
			classify(
				ProviderErrorContext::new(TokenRequestKind::RefreshToken)
					.with_http_status(503)
					.with_oauth_error("invalid_grant")
			),
			ProviderErrorKind::InvalidGrant
		);
	}

	#[test]
	fn body_previews_are_truncated() {
		let ctx = ProviderErrorContext::new(TokenRequestKind::RefreshToken)
			.with_body_preview("é".repeat(300));
		let preview = ctx.body_preview.expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), 257);
		assert!(preview.ends_with('…'));
	}
}
