// ============================================
// liquid_staking_ledger/src/epoch.rs
// Epoch trackers

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdResult, Storage};

use crate::error::ContractError;
use crate::state::EPOCH_TRACKERS;

/// Deposits are transferred and delegated on this schedule
pub const STRIDE_EPOCH: &str = "stride_epoch";
/// Unbondings are batched on this schedule
pub const DAY_EPOCH: &str = "day";

#[cw_serde]
pub struct EpochTracker {
    pub epoch_identifier: String,
    pub epoch_number: u64,
    pub next_epoch_start_time: u64,
    pub duration: u64,
}

pub fn set_epoch_tracker(storage: &mut dyn Storage, tracker: &EpochTracker) -> StdResult<()> {
    EPOCH_TRACKERS.save(storage, &tracker.epoch_identifier, tracker)
}

pub fn get_epoch_tracker(
    storage: &dyn Storage,
    epoch_identifier: &str,
) -> StdResult<Option<EpochTracker>> {
    EPOCH_TRACKERS.may_load(storage, epoch_identifier)
}

pub fn load_epoch_tracker(
    storage: &dyn Storage,
    epoch_identifier: &str,
) -> Result<EpochTracker, ContractError> {
    get_epoch_tracker(storage, epoch_identifier)?.ok_or_else(|| {
        ContractError::MissingEpochTracker {
            epoch_identifier: epoch_identifier.to_string(),
        }
    })
}
