//! Wire shapes for the inbound surfaces and their broker entry points.
//!
//! Field names match the JSON bodies the session endpoints exchange with front ends. The
//! `handle_*` methods run a flow and translate failures into an [`ErrorResponse`] carrying an
//! HTTP status derived from the error's [`ErrorClass`].

// self
use crate::{
	_prelude::*,
	error::ErrorClass,
	flows::{LoginOutcome, SessionBroker, UserInfo},
	http::{ProviderHttpClient, TransportErrorMapper},
};

/// Body of a login request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
	/// One-time authorization code returned by the provider redirect.
	pub code: String,
}

/// Body returned by a successful login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
	/// Access token the caller presents from now on.
	pub access_token: String,
	/// Principal identity the session was stored under.
	pub user: String,
}
impl From<LoginOutcome> for LoginResponse {
	fn from(outcome: LoginOutcome) -> Self {
		Self {
			access_token: outcome.access_token.expose().to_owned(),
			user: outcome.user.as_str().to_owned(),
		}
	}
}

/// Body of a refresh request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
	/// Access token (or `Authorization` header value) the caller currently holds.
	pub access_token: String,
}

/// Body returned by a refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
	/// Current access token; unchanged when the presented one was still valid.
	pub access_token: String,
}

/// Body of a user info request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoRequest {
	/// Access token (or `Authorization` header value) the caller currently holds.
	pub access_token: String,
}

/// Client registration as exposed to front ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfoResponse {
	/// OAuth client identifier.
	pub client_id: String,
	/// Registered redirect URL.
	pub callback_url: String,
}

/// Error body returned by the `handle_*` entry points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Human-readable message; never contains token material.
	pub message: String,
	/// HTTP status code.
	pub status: u16,
	/// How the caller should react.
	pub class: ErrorClass,
}
impl ErrorResponse {
	/// HTTP status used for each error class.
	pub const fn status_for(class: ErrorClass) -> u16 {
		match class {
			ErrorClass::FixInput => 400,
			ErrorClass::Reauthenticate => 401,
			ErrorClass::Fatal => 500,
			ErrorClass::Retry => 503,
		}
	}
}
impl From<&Error> for ErrorResponse {
	fn from(error: &Error) -> Self {
		let class = error.class();

		Self { message: error.to_string(), status: Self::status_for(class), class }
	}
}
impl From<Error> for ErrorResponse {
	fn from(error: Error) -> Self {
		Self::from(&error)
	}
}

impl<C, M> SessionBroker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs [`SessionBroker::login`] for a decoded request body.
	pub async fn handle_login(
		&self,
		request: &LoginRequest,
	) -> Result<LoginResponse, ErrorResponse> {
		Ok(self.login(&request.code).await?.into())
	}

	/// Runs [`SessionBroker::refresh`] for a decoded request body.
	pub async fn handle_refresh(
		&self,
		request: &RefreshRequest,
	) -> Result<RefreshResponse, ErrorResponse> {
		Ok(self.refresh(&request.access_token).await?)
	}

	/// Runs [`SessionBroker::user_info`] for a decoded request body.
	pub async fn handle_user_info(
		&self,
		request: &UserInfoRequest,
	) -> Result<UserInfo, ErrorResponse> {
		Ok(self.user_info(&request.access_token).await?)
	}

	/// Runs [`SessionBroker::client_info`].
	pub async fn handle_client_info(&self) -> Result<ClientInfoResponse, ErrorResponse> {
		Ok(self.client_info().await?)
	}
}
