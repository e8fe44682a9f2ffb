//! Identity provider settings and configuration validation.

// crates.io
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::_prelude::*;

/// Issuer advertised by Sign in with Apple.
pub const APPLE_ISSUER: &str = "https://appleid.apple.com";
/// Published key set for Sign in with Apple.
pub const APPLE_JWKS_URL: &str = "https://appleid.apple.com/auth/keys";
/// Provider id used by [`ProviderConfig::apple`].
pub const APPLE_PROVIDER_ID: &str = "apple";
/// Default size guard (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;
/// Default per-request timeout applied to the key fetch.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default clock skew tolerated when checking `exp` and `nbf`; none unless configured.
pub const DEFAULT_LEEWAY: Duration = Duration::ZERO;
/// Maximum redirect depth.
pub const MAX_REDIRECTS: u8 = 10;

/// Settings describing a single OpenID provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Name the enclosing auth system selects this provider by.
	pub provider_id: String,
	/// Exact `iss` value every accepted token must carry.
	pub issuer: String,
	/// URL of the published key set.
	pub jwks_url: Url,
	/// Signing algorithm the provider uses for ID tokens.
	#[serde(default = "default_algorithm")]
	pub algorithm: Algorithm,
	/// Whether HTTPS is required for key retrieval.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// Maximum size allowed for key set payloads in bytes.
	#[serde(default = "default_max_response_bytes")]
	pub max_response_bytes: u64,
	/// Maximum number of redirects to follow during fetch.
	#[serde(default = "default_max_redirects")]
	pub max_redirects: u8,
	/// Timeout applied to the key set request.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Clock skew tolerated for time-based claims.
	#[serde(default = "default_leeway")]
	pub leeway: Duration,
}
impl ProviderConfig {
	/// Construct a provider with default transport settings.
	pub fn new(
		provider_id: impl Into<String>,
		issuer: impl Into<String>,
		jwks_url: impl AsRef<str>,
	) -> Result<Self> {
		let jwks_url = Url::parse(jwks_url.as_ref())?;

		Ok(Self {
			provider_id: provider_id.into(),
			issuer: issuer.into(),
			jwks_url,
			algorithm: default_algorithm(),
			require_https: true,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
			max_redirects: default_max_redirects(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			leeway: DEFAULT_LEEWAY,
		})
	}

	/// Sign in with Apple.
	pub fn apple() -> Result<Self> {
		Self::new(APPLE_PROVIDER_ID, APPLE_ISSUER, APPLE_JWKS_URL)
	}

	/// Point the provider at a different key set endpoint.
	pub fn with_jwks_url(mut self, jwks_url: impl AsRef<str>) -> Result<Self> {
		self.jwks_url = Url::parse(jwks_url.as_ref())?;

		Ok(self)
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Validate the provider settings.
	pub fn validate(&self) -> Result<()> {
		validate_provider_id(&self.provider_id)?;

		if self.issuer.trim().is_empty() {
			return Err(Error::Validation { field: "issuer", reason: "Must not be empty.".into() });
		}
		if self.require_https {
			enforce_https(&self.jwks_url)?;
		}
		if self.jwks_url.host_str().is_none() {
			return Err(Error::Validation {
				field: "jwks_url",
				reason: "Must include a host component.".into(),
			});
		}
		if !is_rsa_family(self.algorithm) {
			return Err(Error::Validation {
				field: "algorithm",
				reason: format!(
					"{:?} cannot be verified with an RSA key built from modulus and exponent.",
					self.algorithm
				),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.max_redirects > MAX_REDIRECTS {
			return Err(Error::Validation {
				field: "max_redirects",
				reason: format!("Must be less than or equal to {}.", MAX_REDIRECTS),
			});
		}
		if self.request_timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "request_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}

		Ok(())
	}

	/// Build the JWT primitive's validation rules.
	///
	/// Issuer, subject, and audience are compared by the verifier afterwards so each mismatch
	/// surfaces as its own error.
	pub fn validation(&self) -> Validation {
		let mut validation = Validation::new(self.algorithm);

		validation.leeway = self.leeway.as_secs();
		validation.validate_nbf = true;
		validation.validate_aud = false;
		validation.required_spec_claims.clear();

		validation
	}
}

/// Ensure the provided URL uses HTTPS.
pub fn enforce_https(url: &Url) -> Result<()> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(Error::Security(format!("Key set URL {url} must use HTTPS.")))
	}
}

fn is_rsa_family(algorithm: Algorithm) -> bool {
	matches!(
		algorithm,
		Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512
	)
}

fn default_algorithm() -> Algorithm {
	Algorithm::RS256
}

fn default_true() -> bool {
	true
}

fn default_max_response_bytes() -> u64 {
	DEFAULT_MAX_RESPONSE_BYTES
}

fn default_max_redirects() -> u8 {
	3
}

fn default_request_timeout() -> Duration {
	DEFAULT_REQUEST_TIMEOUT
}

fn default_leeway() -> Duration {
	DEFAULT_LEEWAY
}

fn validate_provider_id(value: &str) -> Result<()> {
	if value.is_empty() {
		return Err(Error::Validation {
			field: "provider_id",
			reason: "Must not be empty.".into(),
		});
	}
	if value.len() > 64 {
		return Err(Error::Validation {
			field: "provider_id",
			reason: "Must be 64 characters or fewer.".into(),
		});
	}
	if !value.as_bytes().iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_')) {
		return Err(Error::Validation {
			field: "provider_id",
			reason: "May only contain ASCII letters, numbers, '-', or '_'.".into(),
		});
	}

	Ok(())
}
