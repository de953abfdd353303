//! Optional observability helpers for session flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_session.flow` with the `flow` and
//!   `stage` (call site) fields, plus a `warn` event whenever a refreshed token could not be
//!   written back to the store.
//! - Enable `metrics` to increment the `oauth2_session_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and
//!   `oauth2_session_persistence_degraded_total` for failed write-backs.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, auth::UserId, store::StoreError};

/// Session flows observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization code login.
	Login,
	/// Bearer credential resolution (with transparent refresh).
	Resolve,
	/// Refresh surface returning the current access token.
	Refresh,
	/// Authenticated identity lookup.
	UserInfo,
	/// Client registration lookup.
	ClientInfo,
	/// Authorization redirect construction.
	Authorize,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Resolve => "resolve",
			FlowKind::Refresh => "refresh",
			FlowKind::UserInfo => "user_info",
			FlowKind::ClientInfo => "client_info",
			FlowKind::Authorize => "authorize",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Reports a refreshed token that could not be written back to the store.
///
/// Only the access-token fingerprint is emitted.
pub fn report_persistence_degraded(user: &UserId, fingerprint: &str, error: &StoreError) {
	log_persistence_degraded(user, fingerprint, error);
	count_persistence_degraded();
}
