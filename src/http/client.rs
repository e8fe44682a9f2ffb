//! HTTP client integration for key set retrieval.

// crates.io
use http::header::ACCEPT;
use jsonwebtoken::jwk::JwkSet;
use reqwest::{Client, redirect::Policy};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	provider::{self, ProviderConfig},
};

/// Build the reqwest client used for key set requests.
pub fn build_client(provider: &ProviderConfig) -> Result<Client> {
	let client = Client::builder()
		.redirect(Policy::limited(provider.max_redirects as usize))
		.user_agent(format!("id-token-verifier/{}", env!("CARGO_PKG_VERSION")))
		.connect_timeout(Duration::from_secs(5))
		.timeout(provider.request_timeout)
		.build()?;

	Ok(client)
}

/// Retrieve and parse the provider's published key set.
///
/// A body that is not JSON counts as a fetch failure. A JSON document without a usable `keys`
/// array is reported as [`Error::KeySet`], which never falls back to the cache.
pub async fn fetch_jwks(client: &Client, provider: &ProviderConfig) -> Result<JwkSet> {
	if provider.require_https {
		provider::enforce_https(&provider.jwks_url)?;
	}

	let start = Instant::now();
	let response = client
		.get(provider.jwks_url.clone())
		.header(ACCEPT, "application/json")
		.timeout(provider.request_timeout)
		.send()
		.await?;
	let elapsed = start.elapsed();
	let status = response.status();

	if !status.is_success() {
		let body = response.text().await.ok();

		return Err(Error::HttpStatus { status, url: provider.jwks_url.clone(), body });
	}
	if let Some(length) = response.content_length()
		&& length > provider.max_response_bytes
	{
		return Err(Error::ResponseTooLarge {
			url: provider.jwks_url.clone(),
			size: length,
			limit: provider.max_response_bytes,
		});
	}

	let bytes = response.bytes().await?;

	if bytes.len() as u64 > provider.max_response_bytes {
		return Err(Error::ResponseTooLarge {
			url: provider.jwks_url.clone(),
			size: bytes.len() as u64,
			limit: provider.max_response_bytes,
		});
	}

	let document: Value = serde_json::from_slice(&bytes)?;
	let jwks = parse_key_set(document)?;

	tracing::debug!(
		provider = %provider.provider_id,
		status = %status,
		elapsed = ?elapsed,
		keys = jwks.keys.len(),
		"key set fetch complete"
	);

	Ok(jwks)
}

fn parse_key_set(document: Value) -> Result<JwkSet> {
	if !document.get("keys").is_some_and(Value::is_array) {
		return Err(Error::KeySet("Response carries no `keys` array.".into()));
	}

	serde_json::from_value(document)
		.map_err(|err| Error::KeySet(format!("Malformed key set entry: {err}.")))
}
