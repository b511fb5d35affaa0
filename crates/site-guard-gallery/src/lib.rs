#![warn(missing_docs)]
//! # site-guard-gallery
//!
//! ## Purpose
//! Admits gallery image fetches in bounded, paced batches sized by the current
//! delivery tier.
//!
//! ## Responsibilities
//! - Resolve every item reference once at mount; invalid ones fail at once.
//! - Make the first `initial_count` items eligible, and more as the viewer
//!   scrolls (plus `preload_count` look-ahead).
//! - Never exceed `max_concurrent_loads` in flight and pause
//!   `inter_batch_delay_ms` after each batch of `batch_size` admissions.
//! - Ignore settlements that arrive after [`GalleryLoader::cancel`].
//!
//! ## Data flow
//! Host visibility events -> [`GalleryLoader::on_visible`]; host timer ->
//! [`GalleryLoader::poll`] -> [`LoadTicket`]s the host fetches -> host
//! completion -> [`GalleryLoader::on_settled`].
//!
//! ## Ownership and lifetimes
//! The loader owns its item slots and a clone of the shared
//! [`DeliveryContext`]; tickets are owned values the host may hold across
//! awaits. Time is always passed in, so the machine is deterministic.
//!
//! ## Error model
//! Nothing here fails. Invalid references and failed fetches become
//! [`ItemState::Failed`] entries the host renders as placeholders.
//!
//! ## Security and privacy notes
//! Tickets only ever carry URLs produced by the media resolver, so the host
//! never requests an untrusted absolute URL directly.
//!
//! ## Example
//! ```rust
//! use site_guard_delivery::{DeliveryContext, PerformanceTier};
//! use site_guard_gallery::{GalleryLoader, LoadOutcome};
//! use site_guard_media::MediaResolver;
//!
//! let context = DeliveryContext::new(false);
//! context.cache().initialize(PerformanceTier::Low);
//! let refs = vec!["/a.jpg".to_string(), "https://example.com/b.jpg".to_string()];
//! let mut gallery = GalleryLoader::new(refs, &MediaResolver::default(), context);
//!
//! let tickets = gallery.poll(0);
//! assert_eq!(tickets.len(), 2);
//! for ticket in &tickets {
//!     assert!(gallery.on_settled(ticket, LoadOutcome::Loaded));
//! }
//! assert!(gallery.is_complete());
//! ```

use serde::{Deserialize, Serialize};
use site_guard_delivery::{DeliveryContext, DeliveryTuning};
use site_guard_media::{LoadFailure, LoadedMedia, MediaFallback, MediaResolver};

/// Lifecycle of one gallery item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemState {
    /// Waiting for eligibility or a free slot.
    Pending,
    /// Ticket issued, fetch in flight.
    Loading,
    /// Fetch completed.
    Loaded,
    /// Reference invalid or fetch failed; render a placeholder.
    Failed {
        /// Human-readable reason.
        reason: String,
        /// Whether a manual retry may succeed.
        retry: bool,
    },
}

impl ItemState {
    fn is_settled(&self) -> bool {
        matches!(self, Self::Loaded | Self::Failed { .. })
    }
}

/// Result of a host fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Image loaded.
    Loaded,
    /// Image failed to load.
    Failed {
        /// Human-readable reason.
        reason: String,
        /// Whether a manual retry may succeed.
        retry: bool,
    },
}

impl From<&Result<LoadedMedia, LoadFailure>> for LoadOutcome {
    fn from(result: &Result<LoadedMedia, LoadFailure>) -> Self {
        match result {
            Ok(_) => Self::Loaded,
            Err(failure) => {
                let MediaFallback::Placeholder { retry } = failure.fallback;
                Self::Failed {
                    reason: failure.to_string(),
                    retry,
                }
            }
        }
    }
}

/// Permission to fetch one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    index: usize,
    url: String,
    generation: u64,
}

impl LoadTicket {
    /// Item index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Resolved URL to request.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Loader generation that issued the ticket.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Aggregate item counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryProgress {
    /// Items not yet admitted.
    pub pending: usize,
    /// Items in flight.
    pub loading: usize,
    /// Items loaded.
    pub loaded: usize,
    /// Items failed.
    pub failed: usize,
}

#[derive(Debug, Clone)]
struct ItemSlot {
    url: Option<String>,
    state: ItemState,
}

/// Deterministic batch admission state machine.
#[derive(Debug)]
pub struct GalleryLoader {
    context: DeliveryContext,
    items: Vec<ItemSlot>,
    eligible_until: usize,
    in_flight: usize,
    batch: Option<BatchWindow>,
    resume_at_ms: Option<u64>,
    generation: u64,
    cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
struct BatchWindow {
    tuning: DeliveryTuning,
    admitted: usize,
}

impl GalleryLoader {
    /// Mounts a gallery over `references`.
    pub fn new(references: Vec<String>, resolver: &MediaResolver, context: DeliveryContext) -> Self {
        let items: Vec<ItemSlot> = references
            .iter()
            .map(|reference| match resolver.try_resolve(reference) {
                Ok(resolution) => ItemSlot {
                    url: Some(resolution.url),
                    state: ItemState::Pending,
                },
                Err(error) => ItemSlot {
                    url: None,
                    state: ItemState::Failed {
                        reason: error.to_string(),
                        retry: false,
                    },
                },
            })
            .collect();

        let tuning = context.tuning();
        let eligible_until = tuning.initial_count.min(items.len());
        tracing::debug!(
            items = items.len(),
            tier = %context.tier(),
            initial = eligible_until,
            "gallery mounted"
        );

        Self {
            context,
            items,
            eligible_until,
            in_flight: 0,
            batch: None,
            resume_at_ms: None,
            generation: 0,
            cancelled: false,
        }
    }

    /// Marks `index` visible, extending eligibility by the look-ahead.
    pub fn on_visible(&mut self, index: usize) {
        let preload = self.context.tuning().preload_count;
        let until = index
            .saturating_add(1)
            .saturating_add(preload)
            .min(self.items.len());
        self.eligible_until = self.eligible_until.max(until);
    }

    /// Issues tickets allowed at `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> Vec<LoadTicket> {
        if self.cancelled {
            return Vec::new();
        }
        if let Some(resume_at) = self.resume_at_ms {
            if now_ms < resume_at {
                return Vec::new();
            }
            self.resume_at_ms = None;
        }

        let mut tickets = Vec::new();
        while let Some(index) = self.next_eligible() {
            let window = *self.batch.get_or_insert_with(|| BatchWindow {
                tuning: self.context.tuning(),
                admitted: 0,
            });
            if self.in_flight >= window.tuning.max_concurrent_loads {
                break;
            }

            let slot = &mut self.items[index];
            let Some(url) = slot.url.clone() else {
                break;
            };
            slot.state = ItemState::Loading;
            self.in_flight += 1;
            tickets.push(LoadTicket {
                index,
                url,
                generation: self.generation,
            });

            let admitted = window.admitted + 1;
            if admitted >= window.tuning.batch_size {
                self.batch = None;
                self.resume_at_ms = Some(now_ms.saturating_add(window.tuning.inter_batch_delay_ms));
                break;
            }
            self.batch = Some(BatchWindow { admitted, ..window });
        }

        if !tickets.is_empty() {
            tracing::debug!(admitted = tickets.len(), in_flight = self.in_flight, "gallery admitted loads");
        }
        tickets
    }

    /// Records a fetch result. Returns `false` for stale or unknown tickets.
    pub fn on_settled(&mut self, ticket: &LoadTicket, outcome: LoadOutcome) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let Some(slot) = self.items.get_mut(ticket.index) else {
            return false;
        };
        if slot.state != ItemState::Loading {
            return false;
        }

        slot.state = match outcome {
            LoadOutcome::Loaded => ItemState::Loaded,
            LoadOutcome::Failed { reason, retry } => ItemState::Failed { reason, retry },
        };
        self.in_flight = self.in_flight.saturating_sub(1);
        true
    }

    /// Stops admissions and invalidates every outstanding ticket.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.cancelled = true;
        self.in_flight = 0;
        self.batch = None;
        self.resume_at_ms = None;
        for slot in &mut self.items {
            if slot.state == ItemState::Loading {
                slot.state = ItemState::Pending;
            }
        }
        tracing::debug!(generation = self.generation, "gallery loading cancelled");
    }

    /// State of item `index`.
    pub fn state(&self, index: usize) -> Option<&ItemState> {
        self.items.get(index).map(|slot| &slot.state)
    }

    /// Loads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Number of items currently eligible for admission.
    pub fn eligible_count(&self) -> usize {
        self.eligible_until
    }

    /// Earliest time the next batch may start, while paused.
    pub fn resume_at_ms(&self) -> Option<u64> {
        self.resume_at_ms
    }

    /// Aggregate counts.
    pub fn progress(&self) -> GalleryProgress {
        self.items
            .iter()
            .fold(GalleryProgress::default(), |mut progress, slot| {
                match slot.state {
                    ItemState::Pending => progress.pending += 1,
                    ItemState::Loading => progress.loading += 1,
                    ItemState::Loaded => progress.loaded += 1,
                    ItemState::Failed { .. } => progress.failed += 1,
                }
                progress
            })
    }

    /// Returns `true` when every item has loaded or failed.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|slot| slot.state.is_settled())
    }

    fn next_eligible(&self) -> Option<usize> {
        self.items[..self.eligible_until]
            .iter()
            .position(|slot| slot.state == ItemState::Pending)
    }
}
