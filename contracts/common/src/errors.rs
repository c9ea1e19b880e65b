//! Error Types for the StackFarm ledger
//!
//! Every failure is surfaced synchronously to the caller. A failed
//! operation never leaves partial state behind, so the error carries
//! enough context to explain the rejection without inspecting state.

use crate::types::{Address, AssetId};

/// Result type alias for farm operations
pub type FarmResult<T> = Result<T, FarmError>;

/// Main error enum for all farm errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    // ============ Asset Errors ============
    /// External asset movement was rejected
    TransferFailed {
        asset: AssetId,
        from: Address,
        to: Address,
        amount: u64,
        reason: TransferFailure,
    },

    // ============ Position Errors ============
    /// Withdraw amount exceeds the staked amount
    InsufficientStake { staked: u64, requested: u64 },

    /// Claim amount exceeds the currently accrued pending reward
    ExceedsPending { pending: u64, requested: u64 },

    /// Nothing accrued for this position
    NoRewardsToClaim,

    /// Zero amount not allowed
    ZeroAmount,

    // ============ Pool Errors ============
    /// Operation references a pool that does not exist
    InvalidIndex { pool_index: u32, pool_count: u32 },

    /// Reward budget cannot cover the payout
    InsufficientRewardBudget { budget: u64, requested: u64 },

    // ============ Authorization Errors ============
    /// Only the configured admin can perform this action
    AdminOnly { caller: Address },

    // ============ Configuration Errors ============
    /// Invalid configuration value
    InvalidConfig { param: &'static str, reason: &'static str },

    /// Invalid address (e.g., zero address)
    InvalidAddress { reason: &'static str },

    /// Block height moved backwards
    ClockRegression { last: u64, current: u64 },

    // ============ Persistence Errors ============
    /// State could not be written or a restored state is inconsistent
    SnapshotFailed { reason: &'static str },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,
}

/// Why the asset ledger refused a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFailure {
    /// Payer balance too low
    Balance,
    /// Payer allowance for the spender too low
    Allowance,
    /// Ledger refused for another reason (frozen account, unknown asset)
    Rejected,
}

impl FarmError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransferFailed { .. } => "E001_TRANSFER_FAILED",
            Self::InsufficientStake { .. } => "E010_INSUFFICIENT_STAKE",
            Self::ExceedsPending { .. } => "E011_EXCEEDS_PENDING",
            Self::NoRewardsToClaim => "E012_NO_REWARDS",
            Self::ZeroAmount => "E013_ZERO_AMOUNT",
            Self::InvalidIndex { .. } => "E020_INVALID_INDEX",
            Self::InsufficientRewardBudget { .. } => "E021_BUDGET_EXHAUSTED",
            Self::AdminOnly { .. } => "E030_ADMIN_ONLY",
            Self::InvalidConfig { .. } => "E040_INVALID_CONFIG",
            Self::InvalidAddress { .. } => "E041_INVALID_ADDRESS",
            Self::ClockRegression { .. } => "E042_CLOCK_REGRESSION",
            Self::SnapshotFailed { .. } => "E050_SNAPSHOT_FAILED",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if the caller can fix the condition and retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::TransferFailed { reason, .. } => *reason != TransferFailure::Rejected,
            Self::InsufficientRewardBudget { .. } => true, // Operator refills
            Self::ExceedsPending { .. } => true,        // Wait for accrual
            _ => false,
        }
    }
}

impl core::fmt::Display for FarmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TransferFailed { amount, reason, .. } => {
                write!(f, "{}: transfer of {} rejected ({:?})", self.code(), amount, reason)
            }
            Self::InsufficientStake { staked, requested } => {
                write!(f, "{}: requested {} but only {} staked", self.code(), requested, staked)
            }
            Self::ExceedsPending { pending, requested } => {
                write!(f, "{}: requested {} but only {} pending", self.code(), requested, pending)
            }
            Self::InvalidIndex { pool_index, pool_count } => {
                write!(f, "{}: pool {} of {}", self.code(), pool_index, pool_count)
            }
            Self::InsufficientRewardBudget { budget, requested } => {
                write!(f, "{}: requested {} with budget {}", self.code(), requested, budget)
            }
            Self::InvalidConfig { param, reason } => {
                write!(f, "{}: {} {}", self.code(), param, reason)
            }
            Self::SnapshotFailed { reason } => write!(f, "{}: {}", self.code(), reason),
            _ => f.write_str(self.code()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FarmError {}
