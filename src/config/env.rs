//! [`ParameterStore`] backed by process environment variables.
//!
//! Parameter names map to variable names by dropping the leading `/`, turning separators into
//! `_`, splitting camelCase words, and upper-casing: `/cognito/client/callbackUrl` is read from
//! `COGNITO_CLIENT_CALLBACK_URL`.

// std
use std::env::{self, VarError};
// self
use crate::{
	_prelude::*,
	config::{ParameterFuture, ParameterStore, ParameterStoreError},
};

/// Environment-backed parameter store with optional per-parameter overrides.
#[derive(Clone, Debug, Default)]
pub struct EnvParameterStore {
	overrides: HashMap<String, String>,
}
impl EnvParameterStore {
	/// Creates a store using the derived variable names.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads `parameter` from `variable` instead of the derived name.
	pub fn with_variable(mut self, parameter: impl Into<String>, variable: impl Into<String>) -> Self {
		self.overrides.insert(parameter.into(), variable.into());

		self
	}

	/// Environment variable consulted for `parameter`.
	pub fn variable_for(&self, parameter: &str) -> String {
		self.overrides.get(parameter).cloned().unwrap_or_else(|| derive_variable(parameter))
	}
}
impl ParameterStore for EnvParameterStore {
	fn get_parameters<'a>(
		&'a self,
		names: &'a [&'a str],
	) -> ParameterFuture<'a, HashMap<String, String>> {
		Box::pin(async move {
			let mut values = HashMap::with_capacity(names.len());

			for name in names {
				let variable = self.variable_for(name);

				match env::var(&variable) {
					Ok(value) => {
						values.insert((*name).to_owned(), value);
					},
					Err(VarError::NotPresent) => {},
					Err(VarError::NotUnicode(_)) =>
						return Err(ParameterStoreError::Backend {
							message: format!("environment variable {variable} is not valid UTF-8"),
						}),
				}
			}

			Ok(values)
		})
	}
}

fn derive_variable(parameter: &str) -> String {
	let mut out = String::with_capacity(parameter.len() + 4);
	let mut prev_lower = false;

	for c in parameter.trim_start_matches('/').chars() {
		if c.is_ascii_alphanumeric() {
			if c.is_ascii_uppercase() && prev_lower {
				out.push('_');
			}

			out.push(c.to_ascii_uppercase());

			prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
		} else {
			if !out.is_empty() && !out.ends_with('_') {
				out.push('_');
			}

			prev_lower = false;
		}
	}

	out.trim_end_matches('_').to_owned()
}
