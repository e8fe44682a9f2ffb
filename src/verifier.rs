//! ID token verification against a single OpenID provider.

// std
use std::fmt::{Display, Formatter, Result as FmtResult};
// crates.io
use jsonwebtoken::Validation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	cache::KeyCache,
	keys::{KeyResolver, PublicKey},
	metrics::{self, VerifierMetrics},
	provider::ProviderConfig,
};

/// The `aud` claim, which providers emit either as a string or as a list.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
	Single(String),
	Multiple(Vec<String>),
}
impl Audience {
	/// Whether `client_id` is an intended recipient.
	pub fn contains(&self, client_id: &str) -> bool {
		match self {
			Self::Single(aud) => aud == client_id,
			Self::Multiple(auds) => auds.iter().any(|aud| aud == client_id),
		}
	}
}
impl Display for Audience {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Single(aud) => f.write_str(aud),
			Self::Multiple(auds) => f.write_str(&auds.join(",")),
		}
	}
}

/// Decoded ID token payload.
///
/// Claims other than `iss`, `sub`, and `aud` are kept verbatim in [`extra`](Self::extra), so the
/// payload re-serialises to the shape the provider signed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
	/// Issuer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
	/// Subject; the provider's stable user id.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Intended recipients.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<Audience>,
	/// Every other claim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl IdTokenClaims {
	/// Look up a provider-specific claim.
	pub fn claim(&self, name: &str) -> Option<&Value> {
		self.extra.get(name)
	}

	/// The `email` claim, when present as a string.
	pub fn email(&self) -> Option<&str> {
		self.claim("email").and_then(Value::as_str)
	}

	/// The `exp` claim as a UTC timestamp.
	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		self.claim("exp").and_then(Value::as_i64).and_then(|secs| DateTime::from_timestamp(secs, 0))
	}

	/// The `iat` claim as a UTC timestamp.
	pub fn issued_at(&self) -> Option<DateTime<Utc>> {
		self.claim("iat").and_then(Value::as_i64).and_then(|secs| DateTime::from_timestamp(secs, 0))
	}
}

/// Verifies ID tokens issued by one provider.
#[derive(Clone, Debug)]
pub struct IdTokenVerifier {
	resolver: KeyResolver,
	validation: Validation,
}
impl IdTokenVerifier {
	/// Build a verifier with its own empty key cache.
	pub fn new(provider: ProviderConfig) -> Result<Self> {
		Ok(Self::from_resolver(KeyResolver::new(provider)?))
	}

	/// Build a verifier that falls back to `cache` when the key set cannot be fetched.
	pub fn with_cache(provider: ProviderConfig, cache: KeyCache) -> Result<Self> {
		Ok(Self::from_resolver(KeyResolver::with_cache(provider, cache)?))
	}

	/// Wrap an existing resolver.
	pub fn from_resolver(resolver: KeyResolver) -> Self {
		let validation = resolver.provider().validation();

		Self { resolver, validation }
	}

	/// Provider settings.
	pub fn provider(&self) -> &ProviderConfig {
		self.resolver.provider()
	}

	/// Key cache shared with the resolver.
	pub fn cache(&self) -> &KeyCache {
		self.resolver.cache()
	}

	/// Per-verifier metrics accumulator.
	pub fn metrics(&self) -> Arc<VerifierMetrics> {
		self.resolver.metrics()
	}

	/// Fetch the provider key, falling back to the cached key on fetch failure.
	pub async fn fetch_public_key(&self) -> Result<PublicKey> {
		self.resolver.fetch_public_key().await
	}

	/// Verify `token` and check that it was issued to `expected_subject`.
	///
	/// The audience is only checked when `expected_client_id` is supplied. On success the decoded
	/// claims are returned as-is.
	#[tracing::instrument(
		skip(self, token, expected_client_id),
		fields(provider = %self.resolver.provider().provider_id)
	)]
	pub async fn verify(
		&self,
		token: &str,
		expected_subject: &str,
		expected_client_id: Option<&str>,
	) -> Result<IdTokenClaims> {
		let outcome = self.verify_token(token, expected_subject, expected_client_id).await;
		let rejected = outcome.as_ref().err().map(Error::kind);

		if let Some(kind) = rejected {
			tracing::debug!(reason = kind.as_str(), "id token rejected");
		}

		metrics::record_verification(&self.resolver.provider().provider_id, rejected);

		self.resolver.metrics().record_verification(rejected.is_none());

		outcome
	}

	/// Application ids are not scoped by this provider; always succeeds.
	pub fn validate_app_id(&self) -> Result<()> {
		Ok(())
	}

	async fn verify_token(
		&self,
		token: &str,
		expected_subject: &str,
		expected_client_id: Option<&str>,
	) -> Result<IdTokenClaims> {
		if token.is_empty() {
			return Err(Error::MissingToken);
		}

		let key = self.resolver.fetch_public_key().await?;
		let data =
			jsonwebtoken::decode::<IdTokenClaims>(token, key.decoding_key(), &self.validation)
				.map_err(Error::SignatureInvalid)?;

		check_claims(
			&data.claims,
			&self.resolver.provider().issuer,
			expected_subject,
			expected_client_id,
		)?;

		tracing::debug!(kid = data.header.kid.as_deref().unwrap_or_default(), "id token accepted");

		Ok(data.claims)
	}
}

/// Compare decoded claims against expectations: issuer, then subject, then audience.
pub fn check_claims(
	claims: &IdTokenClaims,
	issuer: &str,
	expected_subject: &str,
	expected_client_id: Option<&str>,
) -> Result<()> {
	if claims.iss.as_deref() != Some(issuer) {
		return Err(Error::IssuerMismatch {
			expected: issuer.to_owned(),
			actual: claims.iss.clone().unwrap_or_default(),
		});
	}
	if claims.sub.as_deref() != Some(expected_subject) {
		return Err(Error::SubjectMismatch);
	}
	if let Some(client_id) = expected_client_id
		&& !claims.aud.as_ref().is_some_and(|aud| aud.contains(client_id))
	{
		return Err(Error::AudienceMismatch {
			expected: client_id.to_owned(),
			actual: claims.aud.as_ref().map(ToString::to_string).unwrap_or_default(),
		});
	}

	Ok(())
}
