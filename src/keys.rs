//! Provider key resolution with a last-known-good fallback.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use base64::prelude::*;
use jsonwebtoken::{
	DecodingKey,
	jwk::{AlgorithmParameters, Jwk, JwkSet},
};
use reqwest::Client;
// self
use crate::{
	_prelude::*,
	cache::KeyCache,
	http::client::{build_client, fetch_jwks},
	metrics::{self, KeyFetchOutcome, VerifierMetrics},
	provider::ProviderConfig,
};

/// RSA public key built from a published key set entry.
#[derive(Clone)]
pub struct PublicKey {
	key: DecodingKey,
	kid: Option<String>,
	modulus_bits: usize,
	fetched_at: DateTime<Utc>,
}
impl PublicKey {
	/// Build a key from base64-encoded modulus and exponent components.
	///
	/// Unpadded base64url is expected; padded and standard alphabets are accepted as well.
	pub fn from_components(kid: Option<String>, modulus: &str, exponent: &str) -> Result<Self> {
		let n = decode_component("n", modulus)?;
		let e = decode_component("e", exponent)?;

		Ok(Self {
			key: DecodingKey::from_rsa_raw_components(&n, &e),
			kid,
			modulus_bits: bit_length(&n),
			fetched_at: Utc::now(),
		})
	}

	/// Build a key from a JWK; only RSA entries are usable.
	pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
		match &jwk.algorithm {
			AlgorithmParameters::RSA(rsa) =>
				Self::from_components(jwk.common.key_id.clone(), &rsa.n, &rsa.e),
			_ => Err(Error::KeySet(format!(
				"Key {kid:?} is not an RSA key.",
				kid = jwk.common.key_id.as_deref().unwrap_or_default()
			))),
		}
	}

	/// Key usable by the JWT primitive.
	pub fn decoding_key(&self) -> &DecodingKey {
		&self.key
	}

	/// Key id advertised by the key set.
	pub fn kid(&self) -> Option<&str> {
		self.kid.as_deref()
	}

	/// When the key was built from a fetched key set.
	pub fn fetched_at(&self) -> DateTime<Utc> {
		self.fetched_at
	}
}
impl Debug for PublicKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("PublicKey")
			.field("kid", &self.kid)
			.field("modulus_bits", &self.modulus_bits)
			.field("fetched_at", &self.fetched_at)
			.finish_non_exhaustive()
	}
}

/// Fetches the provider key and keeps the injected cache current.
#[derive(Clone, Debug)]
pub struct KeyResolver {
	provider: Arc<ProviderConfig>,
	client: Client,
	cache: KeyCache,
	metrics: Arc<VerifierMetrics>,
}
impl KeyResolver {
	/// Build a resolver with a fresh cache and the default reqwest client.
	pub fn new(provider: ProviderConfig) -> Result<Self> {
		Self::with_cache(provider, KeyCache::new())
	}

	/// Build a resolver around an existing cache.
	pub fn with_cache(provider: ProviderConfig, cache: KeyCache) -> Result<Self> {
		provider.validate()?;

		let client = build_client(&provider)?;

		Ok(Self::with_parts(provider, client, cache))
	}

	/// Build a resolver from preassembled parts (primarily for tests).
	pub fn with_parts(provider: ProviderConfig, client: Client, cache: KeyCache) -> Self {
		Self { provider: Arc::new(provider), client, cache, metrics: VerifierMetrics::new() }
	}

	/// Provider settings this resolver fetches for.
	pub fn provider(&self) -> &ProviderConfig {
		&self.provider
	}

	/// Cache holding the last key fetched successfully.
	pub fn cache(&self) -> &KeyCache {
		&self.cache
	}

	/// Per-resolver metrics accumulator.
	pub fn metrics(&self) -> Arc<VerifierMetrics> {
		self.metrics.clone()
	}

	/// Fetch the provider key set and build a key from its first entry.
	///
	/// A successful fetch overwrites the cache. When retrieval fails and a key is cached, the
	/// cached key is returned instead; otherwise the fetch error is returned unchanged.
	#[tracing::instrument(skip(self), fields(provider = %self.provider.provider_id))]
	pub async fn fetch_public_key(&self) -> Result<PublicKey> {
		let jwks = match fetch_jwks(&self.client, &self.provider).await {
			Ok(jwks) => jwks,
			Err(err) if err.is_fetch_failure() => {
				let Some(cached) = self.cache.current().await else {
					self.observe(KeyFetchOutcome::Error);

					return Err(err);
				};

				tracing::warn!(
					error = %err,
					kid = cached.kid().unwrap_or_default(),
					"key set fetch failed, using cached key"
				);

				self.observe(KeyFetchOutcome::Fallback);

				return Ok(cached);
			},
			Err(err) => return Err(err),
		};
		let key = first_key(&jwks)?;

		self.cache.store(key.clone()).await;
		self.observe(KeyFetchOutcome::Fetched);

		tracing::debug!(kid = key.kid().unwrap_or_default(), "provider key refreshed");

		Ok(key)
	}

	fn observe(&self, outcome: KeyFetchOutcome) {
		metrics::record_key_fetch(&self.provider.provider_id, outcome);

		self.metrics.record_key_fetch(outcome);
	}
}

fn first_key(jwks: &JwkSet) -> Result<PublicKey> {
	let jwk = jwks.keys.first().ok_or_else(|| Error::KeySet("Key set contains no keys.".into()))?;

	PublicKey::from_jwk(jwk)
}

fn bit_length(bytes: &[u8]) -> usize {
	match bytes.iter().position(|b| *b != 0) {
		Some(i) => (bytes.len() - i) * 8 - bytes[i].leading_zeros() as usize,
		None => 0,
	}
}

fn decode_component(field: &'static str, value: &str) -> Result<Vec<u8>> {
	let cleaned = value.trim();
	let decoded = BASE64_URL_SAFE_NO_PAD
		.decode(cleaned)
		.or_else(|_| BASE64_URL_SAFE.decode(cleaned))
		.or_else(|_| BASE64_STANDARD.decode(cleaned))
		.map_err(|err| Error::KeySet(format!("Invalid base64 in `{field}`: {err}.")))?;

	if decoded.is_empty() {
		return Err(Error::KeySet(format!("Component `{field}` is empty.")));
	}

	Ok(decoded)
}
