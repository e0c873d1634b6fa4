use std::collections::HashSet;

use image::Rgb;
use tracing::warn;

/// Number of slots in a classic indexed-color table.
pub const REGISTRY_SLOTS: usize = 256;

/// Observability hook counting distinct colors seen while one buffer is built.
///
/// It mirrors the old indexed-palette limit purely as a diagnostic: crossing the
/// limit is logged once and never affects which colors are produced.
#[derive(Debug, Default)]
pub struct ColorRegistry {
    seen: HashSet<[u8; 3]>,
    registered: usize,
    limit_reached: bool,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, color: Rgb<u8>) {
        self.registered += 1;
        if self.limit_reached {
            return;
        }

        self.seen.insert(color.0);
        if self.seen.len() >= REGISTRY_SLOTS {
            warn!(
                distinct = self.seen.len(),
                registered = self.registered,
                "color registry limit reached"
            );
            self.limit_reached = true;
            // Tracking stops here; release the set.
            self.seen = HashSet::new();
        }
    }

    /// Whether more than `REGISTRY_SLOTS - 1` distinct colors were registered.
    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Total number of registrations, distinct or not.
    pub fn registered(&self) -> usize {
        self.registered
    }
}
