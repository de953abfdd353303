//! Identity lookups plus the thin refresh and client-info surfaces built on `resolve`.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
use serde::de::{self, Deserializer};
// self
use crate::{
	_prelude::*,
	api::{ClientInfoResponse, RefreshResponse},
	auth::{IdentifierError, Token, UserId},
	error::{IdentityError, ProviderError},
	flows::SessionBroker,
	http::{ProviderHttpClient, TransportErrorMapper},
	oauth::OAuthClient,
	obs::FlowKind,
};

/// Profile returned by the provider's identity endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
	/// Provider subject identifier.
	pub sub: String,
	/// Username; the stable identity sessions are keyed by.
	pub username: String,
	/// Email address, when shared.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Whether the email address has been verified.
	#[serde(
		default,
		deserialize_with = "flexible_bool",
		skip_serializing_if = "Option::is_none"
	)]
	pub email_verified: Option<bool>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Family name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub family_name: Option<String>,
}
impl UserInfo {
	/// Validated principal identity derived from `username`.
	pub fn user_id(&self) -> Result<UserId, IdentifierError> {
		UserId::new(&self.username)
	}
}

impl<C, M> SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Resolves `credential` and returns the caller's provider profile.
	pub async fn user_info(&self, credential: &str) -> Result<UserInfo> {
		self.observe(FlowKind::UserInfo, "user_info", async move {
			let session = self.resolve_session(credential).await?;

			Ok(fetch_user_info(session.oauth_client(), session.token()).await?)
		})
		.await
	}

	/// Resolves `credential` and returns the access token callers should use from now on.
	pub async fn refresh(&self, credential: &str) -> Result<RefreshResponse> {
		self.observe(FlowKind::Refresh, "refresh", async move {
			let session = self.resolve_session(credential).await?;

			Ok(RefreshResponse { access_token: session.access_token().to_owned() })
		})
		.await
	}

	/// Returns the client registration as currently provisioned.
	pub async fn client_info(&self) -> Result<ClientInfoResponse> {
		self.observe(FlowKind::ClientInfo, "client_info", async move {
			let registration = self.registration.fetch().await?;

			Ok(ClientInfoResponse {
				client_id: registration.client_id,
				callback_url: registration.redirect_url,
			})
		})
		.await
	}
}

/// Calls the identity endpoint with `token` and decodes the profile.
pub(crate) async fn fetch_user_info<C, M>(
	client: &OAuthClient<C, M>,
	token: &Token,
) -> Result<UserInfo, IdentityError>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let request = identity_request(client, token)?;
	let response = client.send(request).await?;

	decode_user_info(&response)
}

fn identity_request<C, M>(
	client: &OAuthClient<C, M>,
	token: &Token,
) -> Result<HttpRequest, ProviderError>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let request = Request::builder()
		.method(Method::GET)
		.uri(client.config().user_info_endpoint().as_str())
		.header(ACCEPT, "application/json")
		.header(AUTHORIZATION, token.authorization_value())
		.body(Vec::new())?;

	Ok(request)
}

fn decode_user_info(response: &HttpResponse) -> Result<UserInfo, IdentityError> {
	let status = response.status();

	if !status.is_success() {
		return Err(IdentityError::Status { status: status.as_u16() });
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| IdentityError::Decode { source })
}

// The provider reports `email_verified` as either a JSON boolean or the strings "true"/"false".
fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Flexible {
		Bool(bool),
		Text(String),
	}

	match Option::<Flexible>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Flexible::Bool(value)) => Ok(Some(value)),
		Some(Flexible::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
			"true" => Ok(Some(true)),
			"false" => Ok(Some(false)),
			_ => Err(de::Error::invalid_value(de::Unexpected::Str(&text), &"a boolean")),
		},
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	fn response(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}

	#[test]
	fn profiles_decode_with_string_or_bool_verification() {
		let profile = decode_user_info(&response(
			StatusCode::OK,
			r#"{"sub":"0f1e","username":"alice","email":"alice@example.com","email_verified":"true","name":"Alice","family_name":"Liddell"}"#,
		))
		.expect("Profile should decode.");

		assert_eq!(profile.username, "alice");
		assert_eq!(profile.email_verified, Some(true));
		assert_eq!(profile.user_id().expect("Username should be valid.").as_str(), "alice");

		let minimal = decode_user_info(&response(
			StatusCode::OK,
			r#"{"sub":"0f1e","username":"bob","email_verified":false}"#,
		))
		.expect("Minimal profile should decode.");

		assert_eq!(minimal.email_verified, Some(false));
		assert!(minimal.email.is_none());
	}

	#[test]
	fn decode_errors_report_the_field_path() {
		let err = decode_user_info(&response(StatusCode::OK, r#"{"sub":"0f1e","username":7}"#))
			.expect_err("Numeric username must fail.");

		match err {
			IdentityError::Decode { source } => assert_eq!(source.path().to_string(), "username"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn non_success_statuses_fail_before_decoding() {
		let err = decode_user_info(&response(StatusCode::UNAUTHORIZED, "{}"))
			.expect_err("401 must fail.");

		assert!(matches!(err, IdentityError::Status { status: 401 }));
	}
}
