//! Metrics helpers and per-verifier telemetry bookkeeping.
//!
//! Counters on [`VerifierMetrics`] are always maintained. The `metrics` feature additionally
//! emits them through the `metrics` facade, and `prometheus` installs an exporter for it.

// std
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
#[cfg(feature = "metrics")] use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "metrics")] use smallvec::SmallVec;
// self
use crate::{_prelude::*, ErrorKind};

#[cfg(feature = "metrics")]
type LabelSet = SmallVec<[Label; 4]>;

#[cfg(feature = "metrics")]
const METRIC_KEY_FETCH_TOTAL: &str = "id_token_key_fetch_total";
#[cfg(feature = "metrics")]
const METRIC_VERIFICATIONS_TOTAL: &str = "id_token_verifications_total";

#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// How a key lookup was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyFetchOutcome {
	/// A key set was fetched and the cache overwritten.
	Fetched,
	/// The fetch failed and the cached key was served.
	Fallback,
	/// The fetch failed with nothing cached.
	Error,
}
impl KeyFetchOutcome {
	/// Label value for this outcome.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Fetched => "fetched",
			Self::Fallback => "fallback",
			Self::Error => "error",
		}
	}
}

/// Thread-safe counters for a single verifier.
#[derive(Debug, Default)]
pub struct VerifierMetrics {
	key_fetches: AtomicU64,
	key_fetch_errors: AtomicU64,
	fallback_serves: AtomicU64,
	accepted: AtomicU64,
	rejected: AtomicU64,
}
impl VerifierMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record the outcome of a key lookup.
	pub fn record_key_fetch(&self, outcome: KeyFetchOutcome) {
		let counter = match outcome {
			KeyFetchOutcome::Fetched => &self.key_fetches,
			KeyFetchOutcome::Fallback => &self.fallback_serves,
			KeyFetchOutcome::Error => &self.key_fetch_errors,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a verification result.
	pub fn record_verification(&self, accepted: bool) {
		if accepted {
			self.accepted.fetch_add(1, Ordering::Relaxed);
		} else {
			self.rejected.fetch_add(1, Ordering::Relaxed);
		}
	}

	/// Take a point-in-time snapshot.
	pub fn snapshot(&self) -> VerifierMetricsSnapshot {
		VerifierMetricsSnapshot {
			key_fetches: self.key_fetches.load(Ordering::Relaxed),
			key_fetch_errors: self.key_fetch_errors.load(Ordering::Relaxed),
			fallback_serves: self.fallback_serves.load(Ordering::Relaxed),
			accepted: self.accepted.load(Ordering::Relaxed),
			rejected: self.rejected.load(Ordering::Relaxed),
		}
	}
}

/// Read-only snapshot of [`VerifierMetrics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierMetricsSnapshot {
	/// Successful key set fetches.
	pub key_fetches: u64,
	/// Failed fetches with no cached key to fall back on.
	pub key_fetch_errors: u64,
	/// Failed fetches answered from the cache.
	pub fallback_serves: u64,
	/// Tokens accepted.
	pub accepted: u64,
	/// Tokens rejected for any reason.
	pub rejected: u64,
}
impl VerifierMetricsSnapshot {
	/// Share of verifications that were accepted.
	pub fn acceptance_rate(&self) -> f64 {
		let total = self.accepted + self.rejected;

		if total == 0 { 0.0 } else { self.accepted as f64 / total as f64 }
	}
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record the outcome of a key lookup.
pub fn record_key_fetch(provider: &str, outcome: KeyFetchOutcome) {
	#[cfg(feature = "metrics")]
	{
		let mut labels = base_labels(provider);

		labels.push(Label::new("outcome", outcome.as_str()));

		metrics::counter!(METRIC_KEY_FETCH_TOTAL, labels.iter()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (provider, outcome);
}

/// Record a verification; `rejected` carries the failure category.
pub fn record_verification(provider: &str, rejected: Option<ErrorKind>) {
	#[cfg(feature = "metrics")]
	{
		let mut labels = base_labels(provider);

		match rejected {
			None => labels.push(Label::new("outcome", "accepted")),
			Some(kind) => {
				labels.push(Label::new("outcome", "rejected"));
				labels.push(Label::new("reason", kind.as_str()));
			},
		}

		metrics::counter!(METRIC_VERIFICATIONS_TOTAL, labels.iter()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (provider, rejected);
}

#[cfg(feature = "metrics")]
fn base_labels(provider: &str) -> LabelSet {
	let mut labels = LabelSet::with_capacity(3);

	labels.push(Label::new("provider", provider.to_owned()));

	labels
}
