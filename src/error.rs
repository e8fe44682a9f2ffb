//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error code reported for every rejected identity assertion.
///
/// Callers see a single "object not found / invalid auth data" category regardless of which
/// check failed; the message carries the detail.
pub const OBJECT_NOT_FOUND: i32 = 101;
/// Error code reported for misconfiguration of the verifier itself.
pub const INTERNAL_SERVER_ERROR: i32 = 1;

/// Unified error type for the ID token verifier crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error("Upstream HTTP status {status} from {url}: {body:?}")]
	HttpStatus { status: http::StatusCode, url: url::Url, body: Option<String> },
	#[error("Response size {size} bytes from {url} exceeds the configured guard of {limit} bytes.")]
	ResponseTooLarge { url: url::Url, size: u64, limit: u64 },
	#[error("Key set unusable: {0}")]
	KeySet(String),

	#[error("id token is invalid for this user.")]
	MissingToken,
	#[error("id token not issued by correct OpenID provider - expected: {expected} | from: {actual}")]
	IssuerMismatch { expected: String, actual: String },
	#[error("auth data is invalid for this user.")]
	SubjectMismatch,
	#[error("jwt aud parameter does not include this client - is: {actual} | expected: {expected}")]
	AudienceMismatch { expected: String, actual: String },
	#[error("id token signature or registered claims rejected: {0}")]
	SignatureInvalid(jsonwebtoken::errors::Error),

	#[error("Security violation: {0}")]
	Security(String),
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Classify the error into the verification taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::MissingToken => ErrorKind::MissingToken,
			Self::Reqwest(_)
			| Self::Serde(_)
			| Self::HttpStatus { .. }
			| Self::ResponseTooLarge { .. }
			| Self::KeySet(_) => ErrorKind::KeyFetchFailure,
			Self::IssuerMismatch { .. } => ErrorKind::IssuerMismatch,
			Self::SubjectMismatch => ErrorKind::SubjectMismatch,
			Self::AudienceMismatch { .. } => ErrorKind::AudienceMismatch,
			Self::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
			Self::Url(_) | Self::Security(_) | Self::Validation { .. } => ErrorKind::Configuration,
			Self::Metrics(_) => ErrorKind::Metrics,
		}
	}

	/// Numeric code surfaced to the enclosing auth system.
	pub fn code(&self) -> i32 {
		match self.kind() {
			ErrorKind::Configuration | ErrorKind::Metrics => INTERNAL_SERVER_ERROR,
			_ => OBJECT_NOT_FOUND,
		}
	}

	/// Whether the error was produced while retrieving the provider key set.
	///
	/// Only these errors are eligible for the cached-key fallback.
	pub fn is_fetch_failure(&self) -> bool {
		matches!(
			self,
			Self::Reqwest(_) | Self::Serde(_) | Self::HttpStatus { .. } | Self::ResponseTooLarge { .. }
		)
	}
}

/// Coarse error categories exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// No token was supplied.
	MissingToken,
	/// The provider key could not be obtained and no cached key was available.
	KeyFetchFailure,
	/// The `iss` claim does not match the configured issuer.
	IssuerMismatch,
	/// The `sub` claim does not match the expected user id.
	SubjectMismatch,
	/// The `aud` claim does not include the expected client id.
	AudienceMismatch,
	/// The JWT primitive rejected the signature or a registered claim such as `exp`.
	SignatureInvalid,
	/// The verifier itself is misconfigured.
	Configuration,
	/// The metrics exporter could not be installed.
	Metrics,
}
impl ErrorKind {
	/// Stable label used for logs and metrics.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MissingToken => "missing_token",
			Self::KeyFetchFailure => "key_fetch_failure",
			Self::IssuerMismatch => "issuer_mismatch",
			Self::SubjectMismatch => "subject_mismatch",
			Self::AudienceMismatch => "audience_mismatch",
			Self::SignatureInvalid => "signature_invalid",
			Self::Configuration => "configuration",
			Self::Metrics => "metrics",
		}
	}
}
