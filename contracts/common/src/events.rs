//! Farm Events
//!
//! Events are collected during execution and handed to the embedder,
//! which may index them off-line for UIs, analytics and audits.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use crate::types::{Address, AssetId, PoolIndex};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Registry Events (0x01 - 0x1F)
    PoolRegistered = 0x01,
    PoolWeightUpdated = 0x02,
    PoolCheckpointed = 0x03,

    // Position Events (0x20 - 0x3F)
    Deposited = 0x20,
    Withdrawn = 0x21,
    EmergencyWithdrawn = 0x22,
    RewardClaimed = 0x23,

    // Budget Events (0x40 - 0x5F)
    RewardsFunded = 0x40,
}

/// Main event enum containing all farm events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum FarmEvent {
    // ============ Registry Events ============

    /// Emitted when a pool is appended to the registry
    PoolRegistered {
        pool_index: PoolIndex,
        stake_asset: AssetId,
        weight: u64,
        total_allocation_weight: u64,
        block_height: u64,
    },

    /// Emitted when a pool's weight changes
    PoolWeightUpdated {
        pool_index: PoolIndex,
        old_weight: u64,
        new_weight: u64,
        total_allocation_weight: u64,
        block_height: u64,
    },

    /// Emitted when a checkpoint distributes reward into a pool
    PoolCheckpointed {
        pool_index: PoolIndex,
        pool_reward: u64,
        acc_reward_per_share: u128,
        block_height: u64,
    },

    // ============ Position Events ============

    /// Emitted when stake is deposited
    Deposited {
        pool_index: PoolIndex,
        user: Address,
        amount: u64,
        new_stake: u64,
        pool_total: u64,
        block_height: u64,
    },

    /// Emitted when stake is withdrawn
    Withdrawn {
        pool_index: PoolIndex,
        user: Address,
        amount: u64,
        new_stake: u64,
        pool_total: u64,
        block_height: u64,
    },

    /// Emitted when a position is emptied without its reward
    EmergencyWithdrawn {
        pool_index: PoolIndex,
        user: Address,
        amount: u64,
        reward_forfeited: u64,
        block_height: u64,
    },

    /// Emitted when reward is paid out
    RewardClaimed {
        pool_index: PoolIndex,
        user: Address,
        amount: u64,
        remaining_pending: u64,
        block_height: u64,
    },

    // ============ Budget Events ============

    /// Emitted when the operator funds the reward budget
    RewardsFunded {
        funder: Address,
        amount: u64,
        new_budget: u64,
        block_height: u64,
    },
}

impl FarmEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PoolRegistered { .. } => EventType::PoolRegistered,
            Self::PoolWeightUpdated { .. } => EventType::PoolWeightUpdated,
            Self::PoolCheckpointed { .. } => EventType::PoolCheckpointed,
            Self::Deposited { .. } => EventType::Deposited,
            Self::Withdrawn { .. } => EventType::Withdrawn,
            Self::EmergencyWithdrawn { .. } => EventType::EmergencyWithdrawn,
            Self::RewardClaimed { .. } => EventType::RewardClaimed,
            Self::RewardsFunded { .. } => EventType::RewardsFunded,
        }
    }

    /// Get the block height when event occurred
    pub fn block_height(&self) -> u64 {
        match self {
            Self::PoolRegistered { block_height, .. } => *block_height,
            Self::PoolWeightUpdated { block_height, .. } => *block_height,
            Self::PoolCheckpointed { block_height, .. } => *block_height,
            Self::Deposited { block_height, .. } => *block_height,
            Self::Withdrawn { block_height, .. } => *block_height,
            Self::EmergencyWithdrawn { block_height, .. } => *block_height,
            Self::RewardClaimed { block_height, .. } => *block_height,
            Self::RewardsFunded { block_height, .. } => *block_height,
        }
    }

    /// Pool the event refers to, if any
    pub fn pool_index(&self) -> Option<PoolIndex> {
        match self {
            Self::PoolRegistered { pool_index, .. }
            | Self::PoolWeightUpdated { pool_index, .. }
            | Self::PoolCheckpointed { pool_index, .. }
            | Self::Deposited { pool_index, .. }
            | Self::Withdrawn { pool_index, .. }
            | Self::EmergencyWithdrawn { pool_index, .. }
            | Self::RewardClaimed { pool_index, .. } => Some(*pool_index),
            Self::RewardsFunded { .. } => None,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
///
/// The log only grows. A long-lived owner must hand events off with
/// [`EventLog::drain`] (or `clear`) after each batch it processes.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<FarmEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: FarmEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[FarmEvent] {
        &self.events
    }

    /// Take all events, leaving the log empty
    pub fn drain(&mut self) -> Vec<FarmEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&FarmEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events were emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
