//! Announcement override
//!
//! The player's narration voice must duck program audio for its whole
//! utterance regardless of what the detector thinks. Announcements are
//! serialized by a generation counter: starting a new one supersedes any
//! in flight, and an end carrying a superseded token is ignored, so a
//! stale completion (or error callback) can never un-duck a newer
//! announcement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::link::DuckLink;

/// Proof of a particular `begin` call; hand it back to [`AnnouncementCoordinator::end`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementToken(u64);

/// Serializes announcement speech onto the duck link
#[derive(Clone)]
pub struct AnnouncementCoordinator {
    link: DuckLink,
    generation: Arc<AtomicU64>,
}

impl AnnouncementCoordinator {
    pub fn new(link: DuckLink) -> Self {
        Self {
            link,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start an announcement, superseding any already in flight
    ///
    /// Raises the speaking flag (program audio ducks) and returns the token
    /// the matching [`end`](Self::end) must present.
    pub fn begin(&self) -> AnnouncementToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.link.set_speaking(true);
        debug!(generation, "announcement began");
        AnnouncementToken(generation)
    }

    /// Finish an announcement
    ///
    /// Lowers the speaking flag only if `token` belongs to the current
    /// announcement; returns whether it did. Ends from superseded
    /// announcements are no-ops.
    pub fn end(&self, token: AnnouncementToken) -> bool {
        let current = self.generation.load(Ordering::SeqCst);
        if token.0 != current {
            debug!(
                token = token.0,
                current, "stale announcement end ignored"
            );
            return false;
        }
        self.link.set_speaking(false);
        debug!(generation = current, "announcement ended");
        true
    }

    /// Whether an announcement currently holds the duck
    pub fn is_speaking(&self) -> bool {
        self.link.is_speaking()
    }
}
