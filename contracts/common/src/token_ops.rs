//! Asset Operations
//!
//! The farm never owns balances itself; it moves stake and reward through
//! an external fungible-asset ledger. This module defines that seam and an
//! in-memory multi-asset ledger used by embedders and tests.
//!
//! ## Key Features
//!
//! - **AssetService**: `transfer_from`, `transfer`, `balance_of`
//! - **Bound holder**: `transfer` always debits the farm custody account
//! - **Allowances**: `transfer_from` spends an approval granted to the holder
//! - **All-or-nothing**: a rejected movement leaves every balance untouched

use sha2::{Digest, Sha256};

use crate::{BTreeMap, BTreeSet};
use crate::constants::domain::ASSET_ID_TAG;
use crate::errors::{FarmError, FarmResult, TransferFailure};
use crate::types::{Address, AssetId};

// ============================================================================
// Asset Service Seam
// ============================================================================

/// Fungible-asset ledger consumed by the farm
///
/// Implementations must be atomic per call: either the full amount moves
/// or nothing changes and an error is returned.
pub trait AssetService {
    /// Move `amount` of `asset` from `payer` to `recipient`, spending the
    /// allowance `payer` granted to this service's holder
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        payer: &Address,
        recipient: &Address,
        amount: u64,
    ) -> FarmResult<()>;

    /// Move `amount` of `asset` from this service's holder to `recipient`
    fn transfer(&mut self, asset: &AssetId, recipient: &Address, amount: u64) -> FarmResult<()>;

    /// Current balance of `account` in `asset`
    fn balance_of(&self, asset: &AssetId, account: &Address) -> u64;
}

/// Derive a deterministic asset identifier from a label
pub fn asset_id(label: &[u8]) -> AssetId {
    let mut hasher = Sha256::new();
    hasher.update(ASSET_ID_TAG);
    hasher.update(label);
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}

// ============================================================================
// In-Memory Ledger
// ============================================================================

/// Multi-asset balance ledger bound to one holder account
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    /// Account debited by `transfer` and spender for `transfer_from`
    holder: Address,
    /// (asset, account) -> balance
    balances: BTreeMap<(AssetId, Address), u64>,
    /// (asset, owner, spender) -> remaining allowance
    allowances: BTreeMap<(AssetId, Address, Address), u64>,
    /// asset -> total minted minus burned
    supply: BTreeMap<AssetId, u64>,
    /// Accounts whose movements are refused
    frozen: BTreeSet<Address>,
}

impl TokenLedger {
    /// Create an empty ledger bound to `holder`
    pub fn new(holder: Address) -> Self {
        Self {
            holder,
            ..Self::default()
        }
    }

    /// Account this ledger acts for
    pub fn holder(&self) -> Address {
        self.holder
    }

    /// Credit newly issued units to `to`
    pub fn mint(&mut self, asset: &AssetId, to: &Address, amount: u64) -> FarmResult<()> {
        let supply = self.supply.get(asset).copied().unwrap_or(0);
        let new_supply = supply.checked_add(amount).ok_or(FarmError::Overflow)?;
        let balance = self.balance_of(asset, to);
        let new_balance = balance.checked_add(amount).ok_or(FarmError::Overflow)?;

        self.supply.insert(*asset, new_supply);
        self.balances.insert((*asset, *to), new_balance);
        Ok(())
    }

    /// Set the allowance `owner` grants to `spender`
    pub fn approve(&mut self, asset: &AssetId, owner: &Address, spender: &Address, amount: u64) {
        self.allowances.insert((*asset, *owner, *spender), amount);
    }

    /// Remaining allowance `owner` granted to `spender`
    pub fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(&(*asset, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Total units in circulation
    pub fn total_supply(&self, asset: &AssetId) -> u64 {
        self.supply.get(asset).copied().unwrap_or(0)
    }

    /// Refuse every movement touching `account`
    pub fn freeze(&mut self, account: &Address) {
        self.frozen.insert(*account);
    }

    /// Lift a freeze
    pub fn unfreeze(&mut self, account: &Address) {
        self.frozen.remove(account);
    }

    /// Plain transfer between two accounts, no allowance involved
    pub fn transfer_between(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> FarmResult<()> {
        self.check_movement(asset, from, to, amount)?;
        self.apply_movement(asset, from, to, amount)
    }

    fn failure(asset: &AssetId, from: &Address, to: &Address, amount: u64, reason: TransferFailure) -> FarmError {
        FarmError::TransferFailed {
            asset: *asset,
            from: *from,
            to: *to,
            amount,
            reason,
        }
    }

    fn check_movement(&self, asset: &AssetId, from: &Address, to: &Address, amount: u64) -> FarmResult<()> {
        if self.frozen.contains(from) || self.frozen.contains(to) {
            return Err(Self::failure(asset, from, to, amount, TransferFailure::Rejected));
        }
        if self.balance_of(asset, from) < amount {
            return Err(Self::failure(asset, from, to, amount, TransferFailure::Balance));
        }
        if from != to && self.balance_of(asset, to).checked_add(amount).is_none() {
            return Err(FarmError::Overflow);
        }
        Ok(())
    }

    fn apply_movement(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: u64) -> FarmResult<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let from_balance = self.balance_of(asset, from);
        let to_balance = self.balance_of(asset, to);
        self.balances.insert((*asset, *from), from_balance - amount);
        self.balances.insert((*asset, *to), to_balance + amount);
        Ok(())
    }
}

impl AssetService for TokenLedger {
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        payer: &Address,
        recipient: &Address,
        amount: u64,
    ) -> FarmResult<()> {
        let spender = self.holder;
        let needs_allowance = *payer != spender;
        let allowance = self.allowance(asset, payer, &spender);

        if needs_allowance && allowance < amount {
            log::warn!("transfer_from rejected: allowance {} < {}", allowance, amount);
            return Err(Self::failure(asset, payer, recipient, amount, TransferFailure::Allowance));
        }
        self.check_movement(asset, payer, recipient, amount)?;

        if needs_allowance {
            self.allowances.insert((*asset, *payer, spender), allowance - amount);
        }
        self.apply_movement(asset, payer, recipient, amount)
    }

    fn transfer(&mut self, asset: &AssetId, recipient: &Address, amount: u64) -> FarmResult<()> {
        let holder = self.holder;
        self.transfer_between(asset, &holder, recipient, amount)
    }

    fn balance_of(&self, asset: &AssetId, account: &Address) -> u64 {
        self.balances.get(&(*asset, *account)).copied().unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FARM: Address = [9u8; 32];
    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    fn token() -> AssetId {
        asset_id(b"LPA")
    }

    fn funded_ledger() -> TokenLedger {
        let mut ledger = TokenLedger::new(FARM);
        ledger.mint(&token(), &ALICE, 10_000).unwrap();
        ledger
    }

    #[test]
    fn test_asset_id_deterministic() {
        assert_eq!(asset_id(b"LPA"), asset_id(b"LPA"));
        assert_ne!(asset_id(b"LPA"), asset_id(b"LPB"));
    }

    #[test]
    fn test_mint_and_supply() {
        let ledger = funded_ledger();
        assert_eq!(ledger.balance_of(&token(), &ALICE), 10_000);
        assert_eq!(ledger.total_supply(&token()), 10_000);
        assert_eq!(ledger.holder(), FARM);
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut ledger = funded_ledger();
        ledger.approve(&token(), &ALICE, &FARM, 3_000);

        ledger.transfer_from(&token(), &ALICE, &FARM, 1_000).unwrap();

        assert_eq!(ledger.balance_of(&token(), &ALICE), 9_000);
        assert_eq!(ledger.balance_of(&token(), &FARM), 1_000);
        assert_eq!(ledger.allowance(&token(), &ALICE, &FARM), 2_000);
    }

    #[test]
    fn test_transfer_from_without_allowance_fails() {
        let mut ledger = funded_ledger();
        ledger.approve(&token(), &ALICE, &FARM, 500);

        let result = ledger.transfer_from(&token(), &ALICE, &FARM, 1_000);
        assert!(matches!(
            result,
            Err(FarmError::TransferFailed { reason: TransferFailure::Allowance, .. })
        ));
        // Nothing moved, allowance intact
        assert_eq!(ledger.balance_of(&token(), &ALICE), 10_000);
        assert_eq!(ledger.allowance(&token(), &ALICE, &FARM), 500);
    }

    #[test]
    fn test_transfer_from_insufficient_balance() {
        let mut ledger = funded_ledger();
        ledger.approve(&token(), &ALICE, &FARM, 50_000);

        let result = ledger.transfer_from(&token(), &ALICE, &FARM, 20_000);
        assert!(matches!(
            result,
            Err(FarmError::TransferFailed { reason: TransferFailure::Balance, .. })
        ));
        assert_eq!(ledger.allowance(&token(), &ALICE, &FARM), 50_000);
    }

    #[test]
    fn test_transfer_debits_holder() {
        let mut ledger = funded_ledger();
        ledger.mint(&token(), &FARM, 100).unwrap();

        ledger.transfer(&token(), &BOB, 40).unwrap();
        assert_eq!(ledger.balance_of(&token(), &FARM), 60);
        assert_eq!(ledger.balance_of(&token(), &BOB), 40);

        assert!(ledger.transfer(&token(), &BOB, 61).is_err());
    }

    #[test]
    fn test_frozen_account_rejected() {
        let mut ledger = funded_ledger();
        ledger.approve(&token(), &ALICE, &FARM, 1_000);
        ledger.freeze(&ALICE);

        let result = ledger.transfer_from(&token(), &ALICE, &FARM, 10);
        assert!(matches!(
            result,
            Err(FarmError::TransferFailed { reason: TransferFailure::Rejected, .. })
        ));

        ledger.unfreeze(&ALICE);
        assert!(ledger.transfer_from(&token(), &ALICE, &FARM, 10).is_ok());
    }

    #[test]
    fn test_transfer_between_accounts() {
        let mut ledger = funded_ledger();
        ledger.transfer_between(&token(), &ALICE, &BOB, 2_000).unwrap();
        assert_eq!(ledger.balance_of(&token(), &BOB), 2_000);
        assert_eq!(ledger.total_supply(&token()), 10_000);
    }
}
