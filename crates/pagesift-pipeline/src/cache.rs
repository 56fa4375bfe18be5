//! Content-addressed memoization of stage results.
//!
//! Results are keyed by a 128-bit SipHash-1-3 digest of the page pixels,
//! its colour layout and the parameters of the stage that produced them.
//! Identical pages analyzed with identical parameters share one result.
//!
//! A [`MemoCache`] computes each key at most once, even under concurrent
//! lookups: the first caller runs the computation while the others block
//! on the same slot and then share its result.
//!
//! A cache built with [`MemoCache::new`] grows with every distinct page
//! and is emptied only by `clear()`. Long-running sessions should use
//! [`MemoCache::with_max_entries`], which drops the oldest key once the
//! limit is reached.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use image::{DynamicImage, GrayImage};
use siphasher::sip128::{Hasher128, SipHasher13};

use crate::types::{AnalysisConfig, EdgeMap};

/// Digest of a page and the parameters applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey(u128);

impl ContentKey {
    /// Hash `image` together with stage parameters.
    #[must_use]
    pub fn new(image: &DynamicImage, params: &[u64]) -> Self {
        let mut hasher = SipHasher13::new();
        hasher.write_u32(image.width());
        hasher.write_u32(image.height());
        let color = image.color();
        hasher.write_u8(color.channel_count());
        hasher.write_u8(color.bytes_per_pixel());
        hasher.write(image.as_bytes());
        for &param in params {
            hasher.write_u64(param);
        }
        Self(hasher.finish128().as_u128())
    }

    /// Key for the cleaned page produced under `config`.
    #[must_use]
    pub fn cleaned(image: &DynamicImage, config: &AnalysisConfig) -> Self {
        Self::new(
            image,
            &[
                u64::from(config.contrast_factor.to_bits()),
                u64::from(config.sharpness_factor.to_bits()),
                u64::from(config.binarize_threshold),
            ],
        )
    }

    /// Key for the edge map produced under `config`.
    #[must_use]
    pub fn edges(image: &DynamicImage, config: &AnalysisConfig) -> Self {
        Self::new(
            image,
            &[
                u64::from(config.blur_kernel_size),
                u64::from(config.canny_low.to_bits()),
                u64::from(config.canny_high.to_bits()),
            ],
        )
    }

    /// The raw digest.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

type Slot<V> = Arc<OnceLock<Arc<V>>>;

struct Entries<V> {
    slots: HashMap<ContentKey, Slot<V>>,
    // Keys in insertion order, oldest first.
    order: VecDeque<ContentKey>,
}

/// Thread-safe compute-once map from [`ContentKey`] to shared values.
///
/// Unbounded unless built with [`MemoCache::with_max_entries`].
pub struct MemoCache<V> {
    entries: Mutex<Entries<V>>,
    max_entries: Option<NonZeroUsize>,
}

impl<V> MemoCache<V> {
    /// Create an empty, unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                slots: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries: None,
        }
    }

    /// Create an empty cache holding at most `max_entries` keys.
    ///
    /// Inserting a new key into a full cache evicts the oldest one.
    /// Values already handed out stay alive.
    #[must_use]
    pub fn with_max_entries(max_entries: NonZeroUsize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::new()
        }
    }

    /// The entry limit, if any.
    #[must_use]
    pub const fn max_entries(&self) -> Option<NonZeroUsize> {
        self.max_entries
    }

    /// Return the value for `key`, running `compute` if no value exists yet.
    ///
    /// Concurrent callers with the same key wait for a single computation.
    /// If `compute` panics the slot stays empty and a later call retries.
    pub fn get_or_compute(&self, key: ContentKey, compute: impl FnOnce() -> V) -> Arc<V> {
        let slot = {
            let mut entries = self.lock();
            if let Some(slot) = entries.slots.get(&key) {
                Arc::clone(slot)
            } else {
                if let Some(max) = self.max_entries {
                    while entries.slots.len() >= max.get() {
                        let Some(oldest) = entries.order.pop_front() else {
                            break;
                        };
                        entries.slots.remove(&oldest);
                    }
                }
                let slot: Slot<V> = Arc::default();
                entries.slots.insert(key, Arc::clone(&slot));
                entries.order.push_back(key);
                slot
            }
        };
        Arc::clone(slot.get_or_init(|| Arc::new(compute())))
    }

    /// The value for `key`, if it has been computed.
    #[must_use]
    pub fn get(&self, key: ContentKey) -> Option<Arc<V>> {
        self.lock().slots.get(&key).and_then(|slot| slot.get().cloned())
    }

    /// Returns `true` if a value for `key` has been computed.
    #[must_use]
    pub fn contains(&self, key: ContentKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of computed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Returns `true` if no value has been computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Values already handed out stay alive.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.slots.clear();
        entries.order.clear();
    }

    // A panic inside `compute` runs outside the lock, so a poisoned map is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, Entries<V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for MemoCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("len", &self.len())
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

/// Stage caches shared by every [`Analyzer`](crate::Analyzer) in a session.
#[derive(Debug, Default)]
pub struct SessionCache {
    /// Cleaned pages, keyed by [`ContentKey::cleaned`].
    pub cleaned: MemoCache<GrayImage>,
    /// Edge maps, keyed by [`ContentKey::edges`].
    pub edges: MemoCache<EdgeMap>,
}

impl SessionCache {
    /// Create an empty, unbounded session cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session cache keeping at most `max_pages` results per stage.
    #[must_use]
    pub fn with_max_pages(max_pages: NonZeroUsize) -> Self {
        Self {
            cleaned: MemoCache::with_max_entries(max_pages),
            edges: MemoCache::with_max_entries(max_pages),
        }
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.cleaned.clear();
        self.edges.clear();
    }
}
