//! Block Clock
//!
//! The farm reads time only as a monotonically non-decreasing block
//! height supplied by its embedder.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::Arc;
use crate::errors::{FarmError, FarmResult};

/// Discrete time source consumed by the farm
pub trait BlockClock {
    /// Current block height, never lower than a previous reading
    fn current_height(&self) -> u64;
}

/// Manually driven clock
///
/// Clones share the same counter, so an embedder (or a test) keeps a
/// handle to advance the height while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    height: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at `height`
    pub fn new(height: u64) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(height)),
        }
    }

    /// Advance by `blocks`, returning the new height
    ///
    /// Saturates at `u64::MAX`, never wraps.
    pub fn advance(&self, blocks: u64) -> u64 {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| Some(h.saturating_add(blocks)))
            .unwrap_or_else(|h| h);
        previous.saturating_add(blocks)
    }

    /// Move to `height`; refuses to go backwards
    pub fn set(&self, height: u64) -> FarmResult<()> {
        let current = self.height.load(Ordering::SeqCst);
        if height < current {
            return Err(FarmError::ClockRegression {
                last: current,
                current: height,
            });
        }
        self.height.store(height, Ordering::SeqCst);
        Ok(())
    }
}

impl BlockClock for ManualClock {
    fn current_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}
