//! StackFarm Common Library
//!
//! Shared types, constants, and utilities for the StackFarm multi-pool
//! staking ledger.
//!
//! ## Contents
//!
//! - **Fixed-point math**: scaled reward-per-share arithmetic, truncating toward zero
//! - **Types**: pools, user positions, farm actions
//! - **Errors**: typed failures with stable codes
//! - **Events**: typed, serializable event log
//! - **Asset seam**: the `AssetService` trait and an in-memory `TokenLedger`
//! - **Clock seam**: the `BlockClock` trait and a `ManualClock`
//!
//! This crate is `no_std` compatible (with `alloc`) when built without
//! the default `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{collections::{BTreeMap, BTreeSet}, sync::Arc, vec::Vec};
#[cfg(feature = "std")]
pub use std::{collections::{BTreeMap, BTreeSet}, sync::Arc, vec::Vec};

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod token_ops;
pub mod clock;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use token_ops::*;
pub use clock::*;
