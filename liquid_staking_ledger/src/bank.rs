// ============================================
// liquid_staking_ledger/src/bank.rs
// Module-owned fund accounts

use cosmwasm_std::{Coin, StdResult, Storage, Uint128};
use sha2::{Digest, Sha256};

use crate::error::ContractError;
use crate::state::MODULE_BALANCES;

pub const REWARD_COLLECTOR_MODULE: &str = "reward_collector";

/// Deterministic address of a named module account: the first 20 bytes of
/// sha256(name), hex encoded.
pub fn module_address(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();

    hex::encode(&digest[..20])
}

pub fn deposit_address(chain_id: &str) -> String {
    module_address(&format!("{}.deposit", chain_id))
}

pub fn reward_collector_address() -> String {
    module_address(REWARD_COLLECTOR_MODULE)
}

pub fn balance(storage: &dyn Storage, account: &str, denom: &str) -> StdResult<Uint128> {
    Ok(MODULE_BALANCES
        .may_load(storage, (account, denom))?
        .unwrap_or_default())
}

pub fn credit(storage: &mut dyn Storage, account: &str, coin: &Coin) -> Result<(), ContractError> {
    if coin.amount.is_zero() {
        return Ok(());
    }
    let current = balance(storage, account, &coin.denom)?;
    MODULE_BALANCES.save(
        storage,
        (account, &coin.denom),
        &current.checked_add(coin.amount)?,
    )?;
    Ok(())
}

pub fn debit(storage: &mut dyn Storage, account: &str, coin: &Coin) -> Result<(), ContractError> {
    if coin.amount.is_zero() {
        return Ok(());
    }
    let current = balance(storage, account, &coin.denom)?;
    if current < coin.amount {
        return Err(ContractError::InsufficientFunds {
            account: account.to_string(),
            denom: coin.denom.clone(),
            needed: coin.amount.to_string(),
            available: current.to_string(),
        });
    }

    let remaining = current - coin.amount;
    if remaining.is_zero() {
        MODULE_BALANCES.remove(storage, (account, &coin.denom));
    } else {
        MODULE_BALANCES.save(storage, (account, &coin.denom), &remaining)?;
    }
    Ok(())
}

pub fn send(
    storage: &mut dyn Storage,
    from: &str,
    to: &str,
    coin: &Coin,
) -> Result<(), ContractError> {
    debit(storage, from, coin)?;
    credit(storage, to, coin)
}

/// Moves the full `denom` balance of `from` into `to` and returns what was moved
pub fn send_all(
    storage: &mut dyn Storage,
    from: &str,
    to: &str,
    denom: &str,
) -> Result<Coin, ContractError> {
    let coin = Coin {
        denom: denom.to_string(),
        amount: balance(storage, from, denom)?,
    };
    send(storage, from, to, &coin)?;
    Ok(coin)
}
