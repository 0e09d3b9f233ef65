// ============================================
// liquid_staking_ledger/src/error.rs
// Error definitions

use cosmwasm_std::{CheckedMultiplyRatioError, Decimal, OverflowError, StdError};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("{0}")]
    CheckedMultiplyRatio(#[from] CheckedMultiplyRatioError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Invalid amount")]
    InvalidAmount {},

    // ============ Not found ============
    #[error("{chain_id} host zone not found")]
    HostZoneNotFound { chain_id: String },

    #[error("legacy {chain_id} host zone not found")]
    LegacyHostZoneNotFound { chain_id: String },

    #[error("deposit record {id} not found")]
    DepositRecordNotFound { id: u64 },

    #[error("no {chain_id} deposit record in transfer queue for epoch {epoch_number}")]
    NoQueuedDepositRecord { chain_id: String, epoch_number: u64 },

    #[error("delegation record {id} not found")]
    DelegationRecordNotFound { id: u64 },

    #[error("epoch unbonding record {epoch_number} not found")]
    EpochUnbondingRecordNotFound { epoch_number: u64 },

    #[error("no {chain_id} host zone unbonding in epoch unbonding record {epoch_number}")]
    HostZoneUnbondingNotFound { chain_id: String, epoch_number: u64 },

    #[error("trade route {reward_denom} -> {target_denom} not found")]
    TradeRouteNotFound {
        reward_denom: String,
        target_denom: String,
    },

    #[error("pending batch {sequence} on {chain_id} not found")]
    PendingBatchNotFound { chain_id: String, sequence: u64 },

    // ============ Invariant violations ============
    #[error("redemption rate {rate} on {chain_id} is outside of bounds [{min}, {max}]")]
    RedemptionRateOutsideBounds {
        chain_id: String,
        rate: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("there should only be one {chain_id} deposit record, found {count}")]
    TooManyDepositRecords { chain_id: String, count: usize },

    #[error("{chain_id} is missing its {account} address")]
    MissingAddress { chain_id: String, account: String },

    #[error("redemption rate bound adjustment {adjustment} leaves no room below the rate")]
    InvalidBoundAdjustment { adjustment: Decimal },

    #[error("record {id} on {chain_id} has status {actual}, expected {expected}")]
    UnexpectedRecordStatus {
        chain_id: String,
        id: u64,
        actual: String,
        expected: String,
    },

    #[error("insufficient {denom} balance in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: String,
        denom: String,
        needed: String,
        available: String,
    },

    // ============ Precondition failures ============
    #[error("epoch tracker {epoch_identifier} must exist")]
    MissingEpochTracker { epoch_identifier: String },

    #[error("at least one epoch unbonding record must exist")]
    MissingEpochUnbondingRecord {},

    #[error("{chain_id} host zone is already registered")]
    HostZoneAlreadyRegistered { chain_id: String },

    #[error("redemptions are disabled on {chain_id}")]
    RedemptionsDisabled { chain_id: String },

    #[error("{chain_id} host zone is halted")]
    HostZoneHalted { chain_id: String },

    #[error("upgrade {name} has already been applied at height {height}")]
    UpgradeAlreadyApplied { name: String, height: u64 },

    #[error("module {module} cannot be migrated from version {from} down to {to}")]
    ModuleDowngrade { module: String, from: u64, to: u64 },

    #[error("cannot migrate from contract {stored}, expected {expected}")]
    ContractNameMismatch { stored: String, expected: String },

    // ============ Transport ============
    #[error("unable to issue {kind} batch for {chain_id}: {reason}")]
    TransportFailure {
        chain_id: String,
        kind: String,
        reason: String,
    },
}

impl ContractError {
    pub fn missing_address(chain_id: &str, account: &str) -> Self {
        ContractError::MissingAddress {
            chain_id: chain_id.to_string(),
            account: account.to_string(),
        }
    }

    pub fn host_zone_not_found(chain_id: &str) -> Self {
        ContractError::HostZoneNotFound {
            chain_id: chain_id.to_string(),
        }
    }

    /// Transport failures are isolated to the zone that raised them.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, ContractError::TransportFailure { .. })
    }
}
