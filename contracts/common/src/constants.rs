//! Farm Constants
//!
//! Fixed-point precision and default configuration values.

/// Fixed-point precision for reward-per-share accumulators
pub mod precision {
    /// Scale applied to every reward-per-share value (1e12)
    ///
    /// Owed rewards are `stake * acc / SCALE`; with u128 intermediates this
    /// leaves ~2^88 of headroom for `stake * acc` before overflow.
    pub const SCALE: u128 = 1_000_000_000_000;
}

/// Emission defaults
pub mod emission {
    /// Default start block (emission active from genesis)
    pub const DEFAULT_START_BLOCK: u64 = 0;

    /// Default bonus end block. Stored only; emission stays flat.
    pub const DEFAULT_BONUS_END_BLOCK: u64 = 100;
}

/// Registry limits
pub mod limits {
    /// Maximum number of pools a single farm will register
    ///
    /// Bounds the cost of `checkpoint_all`, which walks every pool.
    pub const MAX_POOLS: usize = 1_024;
}

/// Domain tags for derived identifiers
pub mod domain {
    /// Tag mixed into asset identifiers derived from labels
    pub const ASSET_ID_TAG: &[u8] = b"stackfarm/asset";

    /// Tag mixed into the farm custody address
    pub const FARM_ACCOUNT_TAG: &[u8] = b"stackfarm/custody";
}
