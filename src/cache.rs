//! Single-slot cache holding the last provider key that was fetched successfully.

// crates.io
use tokio::sync::RwLock;
// self
use crate::{_prelude::*, keys::PublicKey};

/// Last-known-good provider key.
///
/// The slot is overwritten by every successful fetch and consulted only when a fetch fails; it
/// never expires. Clones share the same slot, so one cache can be handed to several resolvers.
#[derive(Clone, Debug, Default)]
pub struct KeyCache {
	slot: Arc<RwLock<Option<PublicKey>>>,
}
impl KeyCache {
	/// Create an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a cache already holding `key`.
	pub fn with_key(key: PublicKey) -> Self {
		Self { slot: Arc::new(RwLock::new(Some(key))) }
	}

	/// Clone out the cached key, if any.
	pub async fn current(&self) -> Option<PublicKey> {
		self.slot.read().await.clone()
	}

	/// Replace the cached key, returning the one it displaced.
	pub async fn store(&self, key: PublicKey) -> Option<PublicKey> {
		let mut slot = self.slot.write().await;

		slot.replace(key)
	}

	/// Whether no key has been cached yet.
	pub async fn is_empty(&self) -> bool {
		self.slot.read().await.is_none()
	}

	/// Capture the cache state for status reporting.
	pub async fn snapshot(&self) -> CacheSnapshot {
		let slot = self.slot.read().await;

		CacheSnapshot {
			captured_at: Utc::now(),
			kid: slot.as_ref().and_then(|key| key.kid().map(ToOwned::to_owned)),
			fetched_at: slot.as_ref().map(PublicKey::fetched_at),
		}
	}
}

/// Point-in-time view of the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSnapshot {
	/// Wall-clock time the snapshot was taken.
	pub captured_at: DateTime<Utc>,
	/// Key id of the cached key, when the key set advertised one.
	pub kid: Option<String>,
	/// When the cached key was fetched; `None` while the cache is empty.
	pub fetched_at: Option<DateTime<Utc>>,
}
impl CacheSnapshot {
	/// Age of the cached key at capture time.
	pub fn age(&self) -> Option<TimeDelta> {
		self.fetched_at.map(|fetched_at| self.captured_at - fetched_at)
	}
}
