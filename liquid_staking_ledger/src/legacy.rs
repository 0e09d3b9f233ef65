// ============================================
// liquid_staking_ledger/src/legacy.rs
// Legacy single-purpose custody module state

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Coin, Decimal, Order, StdResult, Storage, Uint128};

use crate::bank;
use crate::error::ContractError;
use crate::state::{DELEGATION_RECORDS, LEGACY_HOST_ZONES};

pub const LEGACY_FEE_MODULE: &str = "legacy_fee";

#[cw_serde]
pub struct LegacyHostZone {
    pub chain_id: String,
    pub native_token_denom: String,
    pub native_token_ibc_denom: String,
    pub transfer_channel_id: String,
    pub deposit_address: String,
    pub redemption_rate: Decimal,
    pub min_redemption_rate: Decimal,
    pub max_redemption_rate: Decimal,
    /// Stake already settled on the host
    pub delegated_balance: Uint128,
    #[serde(default)]
    pub halted: bool,
}

#[cw_serde]
#[derive(Copy, Eq)]
pub enum DelegationRecordStatus {
    TransferInProgress,
    TransferFailed,
    DelegationQueue,
    DelegationComplete,
}

impl DelegationRecordStatus {
    /// Funds that have left the deposit account but are not yet part of
    /// the zone's delegated balance
    pub fn is_unsettled(&self) -> bool {
        matches!(
            self,
            DelegationRecordStatus::TransferInProgress | DelegationRecordStatus::DelegationQueue
        )
    }
}

#[cw_serde]
pub struct DelegationRecord {
    pub id: u64,
    pub host_zone_id: String,
    pub status: DelegationRecordStatus,
    pub native_amount: Uint128,
    #[serde(default)]
    pub tx_hash: String,
}

#[cw_serde]
pub struct AccountBalance {
    pub address: String,
    pub coin: Coin,
}

/// State of the legacy module at the time this contract takes over its books
#[cw_serde]
#[derive(Default)]
pub struct LegacyGenesis {
    pub host_zones: Vec<LegacyHostZone>,
    #[serde(default)]
    pub delegation_records: Vec<DelegationRecord>,
    #[serde(default)]
    pub balances: Vec<AccountBalance>,
}

pub fn import_genesis(storage: &mut dyn Storage, genesis: &LegacyGenesis) -> Result<(), ContractError> {
    for host_zone in &genesis.host_zones {
        set_legacy_host_zone(storage, host_zone)?;
    }
    for record in &genesis.delegation_records {
        set_delegation_record(storage, record)?;
    }
    for balance in &genesis.balances {
        bank::credit(storage, &balance.address, &balance.coin)?;
    }
    Ok(())
}

pub fn fee_address() -> String {
    bank::module_address(LEGACY_FEE_MODULE)
}

pub fn set_legacy_host_zone(storage: &mut dyn Storage, host_zone: &LegacyHostZone) -> StdResult<()> {
    LEGACY_HOST_ZONES.save(storage, &host_zone.chain_id, host_zone)
}

pub fn load_legacy_host_zone(
    storage: &dyn Storage,
    chain_id: &str,
) -> Result<LegacyHostZone, ContractError> {
    LEGACY_HOST_ZONES
        .may_load(storage, chain_id)?
        .ok_or_else(|| ContractError::LegacyHostZoneNotFound {
            chain_id: chain_id.to_string(),
        })
}

pub fn set_delegation_record(storage: &mut dyn Storage, record: &DelegationRecord) -> StdResult<()> {
    DELEGATION_RECORDS.save(storage, record.id, record)
}

pub fn load_delegation_record(
    storage: &dyn Storage,
    id: u64,
) -> Result<DelegationRecord, ContractError> {
    DELEGATION_RECORDS
        .may_load(storage, id)?
        .ok_or(ContractError::DelegationRecordNotFound { id })
}

pub fn delegation_records_for_host(
    storage: &dyn Storage,
    chain_id: &str,
) -> StdResult<Vec<DelegationRecord>> {
    DELEGATION_RECORDS
        .range(storage, None, None, Order::Ascending)
        .filter(|item| {
            item.as_ref()
                .map(|(_, record)| record.host_zone_id == chain_id)
                .unwrap_or(true)
        })
        .map(|item| item.map(|(_, record)| record))
        .collect()
}

/// Native tokens in transit or queued for delegation on the host
pub fn unsettled_delegations(storage: &dyn Storage, chain_id: &str) -> Result<Uint128, ContractError> {
    delegation_records_for_host(storage, chain_id)?
        .iter()
        .filter(|record| record.status.is_unsettled())
        .try_fold(Uint128::zero(), |total, record| {
            Ok::<_, ContractError>(total.checked_add(record.native_amount)?)
        })
}
