// ============================================
// liquid_staking_ledger/src/records.rs
// Deposit and unbonding records

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Order, StdResult, Storage, Uint128};

use crate::error::ContractError;
use crate::state::{DEPOSIT_RECORDS, DEPOSIT_RECORD_COUNT, EPOCH_UNBONDING_RECORDS};

// ============ Deposit records ============

#[cw_serde]
#[derive(Copy, Eq)]
pub enum DepositRecordStatus {
    TransferQueue,
    TransferInProgress,
    DelegationQueue,
    DelegationInProgress,
}

impl DepositRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositRecordStatus::TransferQueue => "transfer_queue",
            DepositRecordStatus::TransferInProgress => "transfer_in_progress",
            DepositRecordStatus::DelegationQueue => "delegation_queue",
            DepositRecordStatus::DelegationInProgress => "delegation_in_progress",
        }
    }
}

#[cw_serde]
pub struct DepositRecord {
    pub id: u64,
    pub amount: Uint128,
    pub denom: String,
    pub host_zone_id: String,
    pub status: DepositRecordStatus,
    pub deposit_epoch_number: u64,
    #[serde(default)]
    pub delegation_txs_in_progress: u64,
}

/// Hands out the next deposit record id. Ids are never reused.
pub fn next_deposit_record_id(storage: &mut dyn Storage) -> StdResult<u64> {
    let id = DEPOSIT_RECORD_COUNT.may_load(storage)?.unwrap_or_default();
    DEPOSIT_RECORD_COUNT.save(storage, &(id + 1))?;
    Ok(id)
}

/// Stores a new record under a freshly assigned id and returns it
pub fn append_deposit_record(
    storage: &mut dyn Storage,
    mut record: DepositRecord,
) -> StdResult<DepositRecord> {
    record.id = next_deposit_record_id(storage)?;
    DEPOSIT_RECORDS.save(storage, record.id, &record)?;
    Ok(record)
}

pub fn set_deposit_record(storage: &mut dyn Storage, record: &DepositRecord) -> StdResult<()> {
    DEPOSIT_RECORDS.save(storage, record.id, record)
}

pub fn get_deposit_record(storage: &dyn Storage, id: u64) -> StdResult<Option<DepositRecord>> {
    DEPOSIT_RECORDS.may_load(storage, id)
}

pub fn load_deposit_record(storage: &dyn Storage, id: u64) -> Result<DepositRecord, ContractError> {
    get_deposit_record(storage, id)?.ok_or(ContractError::DepositRecordNotFound { id })
}

pub fn remove_deposit_record(storage: &mut dyn Storage, id: u64) {
    DEPOSIT_RECORDS.remove(storage, id)
}

pub fn all_deposit_records(storage: &dyn Storage) -> StdResult<Vec<DepositRecord>> {
    DEPOSIT_RECORDS
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, record)| record))
        .collect()
}

pub fn deposit_records_for_host(
    storage: &dyn Storage,
    chain_id: &str,
) -> StdResult<Vec<DepositRecord>> {
    Ok(all_deposit_records(storage)?
        .into_iter()
        .filter(|record| record.host_zone_id == chain_id)
        .collect())
}

pub fn deposit_records_with_status(
    storage: &dyn Storage,
    chain_id: &str,
    status: DepositRecordStatus,
) -> StdResult<Vec<DepositRecord>> {
    Ok(deposit_records_for_host(storage, chain_id)?
        .into_iter()
        .filter(|record| record.status == status)
        .collect())
}

// ============ Unbonding records ============

#[cw_serde]
#[derive(Copy, Eq)]
pub enum HostZoneUnbondingStatus {
    UnbondingQueue,
    UnbondingInProgress,
    ExitTransferQueue,
    ExitTransferInProgress,
    Claimable,
}

impl HostZoneUnbondingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostZoneUnbondingStatus::UnbondingQueue => "unbonding_queue",
            HostZoneUnbondingStatus::UnbondingInProgress => "unbonding_in_progress",
            HostZoneUnbondingStatus::ExitTransferQueue => "exit_transfer_queue",
            HostZoneUnbondingStatus::ExitTransferInProgress => "exit_transfer_in_progress",
            HostZoneUnbondingStatus::Claimable => "claimable",
        }
    }
}

#[cw_serde]
pub struct HostZoneUnbonding {
    pub host_zone_id: String,
    pub denom: String,
    pub status: HostZoneUnbondingStatus,
    pub st_token_amount: Uint128,
    pub native_token_amount: Uint128,
    #[serde(default)]
    pub st_tokens_to_burn: Uint128,
    #[serde(default)]
    pub native_tokens_to_unbond: Uint128,
    #[serde(default)]
    pub claimable_native_tokens: Uint128,
    #[serde(default)]
    pub undelegation_txs_in_progress: u64,
    /// Seconds since epoch at which the undelegated tokens are released
    #[serde(default)]
    pub unbonding_time: u64,
}

impl HostZoneUnbonding {
    pub fn new(host_zone_id: &str, denom: &str) -> Self {
        HostZoneUnbonding {
            host_zone_id: host_zone_id.to_string(),
            denom: denom.to_string(),
            status: HostZoneUnbondingStatus::UnbondingQueue,
            st_token_amount: Uint128::zero(),
            native_token_amount: Uint128::zero(),
            st_tokens_to_burn: Uint128::zero(),
            native_tokens_to_unbond: Uint128::zero(),
            claimable_native_tokens: Uint128::zero(),
            undelegation_txs_in_progress: 0,
            unbonding_time: 0,
        }
    }

    /// Derives the accounting fields from (status, stTokenAmount, nativeTokenAmount).
    ///
    /// | status                                      | burn | unbond | claimable | txs |
    /// |---------------------------------------------|------|--------|-----------|-----|
    /// | unbonding queue / exit transfer (either)    | 0    | 0      | 0         | 0   |
    /// | unbonding in progress                       | st   | native | 0         | 1   |
    /// | claimable                                   | 0    | 0      | native    | 0   |
    pub fn derive_accounting_fields(&mut self) {
        match self.status {
            HostZoneUnbondingStatus::UnbondingQueue
            | HostZoneUnbondingStatus::ExitTransferQueue
            | HostZoneUnbondingStatus::ExitTransferInProgress => {
                self.st_tokens_to_burn = Uint128::zero();
                self.native_tokens_to_unbond = Uint128::zero();
                self.claimable_native_tokens = Uint128::zero();
                self.undelegation_txs_in_progress = 0;
            }
            HostZoneUnbondingStatus::UnbondingInProgress => {
                self.st_tokens_to_burn = self.st_token_amount;
                self.native_tokens_to_unbond = self.native_token_amount;
                self.claimable_native_tokens = Uint128::zero();
                self.undelegation_txs_in_progress = 1;
            }
            HostZoneUnbondingStatus::Claimable => {
                self.st_tokens_to_burn = Uint128::zero();
                self.native_tokens_to_unbond = Uint128::zero();
                self.claimable_native_tokens = self.native_token_amount;
                self.undelegation_txs_in_progress = 0;
            }
        }
    }

    pub fn set_status(&mut self, status: HostZoneUnbondingStatus) {
        self.status = status;
        self.derive_accounting_fields();
    }
}

#[cw_serde]
pub struct EpochUnbondingRecord {
    pub epoch_number: u64,
    pub host_zone_unbondings: Vec<HostZoneUnbonding>,
}

impl EpochUnbondingRecord {
    pub fn host_zone_unbonding(&self, chain_id: &str) -> Option<&HostZoneUnbonding> {
        self.host_zone_unbondings
            .iter()
            .find(|hzu| hzu.host_zone_id == chain_id)
    }

    pub fn host_zone_unbonding_mut(&mut self, chain_id: &str) -> Option<&mut HostZoneUnbonding> {
        self.host_zone_unbondings
            .iter_mut()
            .find(|hzu| hzu.host_zone_id == chain_id)
    }
}

pub fn set_epoch_unbonding_record(
    storage: &mut dyn Storage,
    record: &EpochUnbondingRecord,
) -> StdResult<()> {
    EPOCH_UNBONDING_RECORDS.save(storage, record.epoch_number, record)
}

pub fn get_epoch_unbonding_record(
    storage: &dyn Storage,
    epoch_number: u64,
) -> StdResult<Option<EpochUnbondingRecord>> {
    EPOCH_UNBONDING_RECORDS.may_load(storage, epoch_number)
}

pub fn load_epoch_unbonding_record(
    storage: &dyn Storage,
    epoch_number: u64,
) -> Result<EpochUnbondingRecord, ContractError> {
    get_epoch_unbonding_record(storage, epoch_number)?
        .ok_or(ContractError::EpochUnbondingRecordNotFound { epoch_number })
}

pub fn remove_epoch_unbonding_record(storage: &mut dyn Storage, epoch_number: u64) {
    EPOCH_UNBONDING_RECORDS.remove(storage, epoch_number)
}

pub fn all_epoch_unbonding_records(storage: &dyn Storage) -> StdResult<Vec<EpochUnbondingRecord>> {
    EPOCH_UNBONDING_RECORDS
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, record)| record))
        .collect()
}

/// The epoch unbonding record with the highest epoch number
pub fn latest_epoch_unbonding_record(
    storage: &dyn Storage,
) -> StdResult<Option<EpochUnbondingRecord>> {
    EPOCH_UNBONDING_RECORDS
        .range(storage, None, None, Order::Descending)
        .next()
        .transpose()
        .map(|latest| latest.map(|(_, record)| record))
}

/// Native tokens already promised to redeemers on `chain_id` that are still
/// counted in the zone's delegations
pub fn pending_unbonding_amount(
    storage: &dyn Storage,
    chain_id: &str,
) -> Result<Uint128, ContractError> {
    let mut total = Uint128::zero();
    for record in all_epoch_unbonding_records(storage)? {
        for hzu in &record.host_zone_unbondings {
            let pending = matches!(
                hzu.status,
                HostZoneUnbondingStatus::UnbondingQueue | HostZoneUnbondingStatus::UnbondingInProgress
            );
            if pending && hzu.host_zone_id == chain_id {
                total = total.checked_add(hzu.native_token_amount)?;
            }
        }
    }
    Ok(total)
}
