//! Pluggable auth adapter seam.
//!
//! An enclosing auth system keeps adapters by [`name`](AuthAdapter::name) and hands them the
//! client-supplied auth data. [`AppleAuthAdapter`] is the Sign in with Apple strategy.

// crates.io
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
// self
use crate::{
	_prelude::*,
	cache::KeyCache,
	provider::ProviderConfig,
	verifier::{IdTokenClaims, IdTokenVerifier},
};

/// Auth data supplied by a client signing in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
	/// Identity token; absent or empty tokens are rejected.
	#[serde(default)]
	pub token: Option<String>,
	/// User id the token must have been issued for.
	#[serde(default)]
	pub id: String,
}

/// Per-application adapter options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterOptions {
	/// Expected audience; the audience check is skipped when unset.
	#[serde(default)]
	pub client_id: Option<String>,
}

/// Strategy that validates third-party auth data.
#[async_trait]
pub trait AuthAdapter: Send + Sync {
	/// Name the enclosing registry selects this adapter by.
	fn name(&self) -> &str;

	/// Validate the auth data, returning the decoded identity claims.
	async fn validate_auth_data(
		&self,
		auth_data: &AuthData,
		options: &AdapterOptions,
	) -> Result<IdTokenClaims>;

	/// Validate the application id the request was made for.
	async fn validate_app_id(&self) -> Result<()>;
}

/// Sign in with Apple adapter.
#[derive(Clone, Debug)]
pub struct AppleAuthAdapter {
	verifier: IdTokenVerifier,
}
impl AppleAuthAdapter {
	/// Adapter for the production Apple endpoints.
	pub fn new() -> Result<Self> {
		Ok(Self::with_verifier(IdTokenVerifier::new(ProviderConfig::apple()?)?))
	}

	/// Adapter for the production Apple endpoints, sharing `cache` as its key fallback.
	pub fn with_cache(cache: KeyCache) -> Result<Self> {
		Ok(Self::with_verifier(IdTokenVerifier::with_cache(ProviderConfig::apple()?, cache)?))
	}

	/// Adapter around a preconfigured verifier.
	pub fn with_verifier(verifier: IdTokenVerifier) -> Self {
		Self { verifier }
	}

	/// Underlying verifier.
	pub fn verifier(&self) -> &IdTokenVerifier {
		&self.verifier
	}
}
#[async_trait]
impl AuthAdapter for AppleAuthAdapter {
	fn name(&self) -> &str {
		&self.verifier.provider().provider_id
	}

	async fn validate_auth_data(
		&self,
		auth_data: &AuthData,
		options: &AdapterOptions,
	) -> Result<IdTokenClaims> {
		let token = auth_data.token.as_deref().unwrap_or_default();

		self.verifier.verify(token, &auth_data.id, options.client_id.as_deref()).await
	}

	async fn validate_app_id(&self) -> Result<()> {
		self.verifier.validate_app_id()
	}
}
