//! Async OpenID Connect ID token verification with a last-known-good signing key fallback,
//! pluggable into auth adapter registries.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod adapter;
pub mod cache;
pub mod http;
pub mod keys;
pub mod metrics;
pub mod provider;
pub mod verifier;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	adapter::{AdapterOptions, AppleAuthAdapter, AuthAdapter, AuthData},
	cache::{CacheSnapshot, KeyCache},
	error::{Error, ErrorKind, INTERNAL_SERVER_ERROR, OBJECT_NOT_FOUND, Result},
	keys::{KeyResolver, PublicKey},
	provider::{APPLE_ISSUER, APPLE_JWKS_URL, ProviderConfig},
	verifier::{Audience, IdTokenClaims, IdTokenVerifier},
};
