// ============================================
// liquid_staking_ledger/src/msg.rs
// Message definitions

use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, Decimal, Uint128};

use crate::host_zone::{HostZoneRegistration, IcaAccountType, TradeRoute};
use crate::legacy::LegacyGenesis;
use crate::migrations::{CustodialMigration, RedemptionRateSnapshot};
use crate::redemption_rate::RedemptionRateBoundsConfig;
use crate::upgrades::VersionMap;

#[cw_serde]
pub struct InstantiateMsg {
    pub operator: String,
    pub ica_controller: String,
    pub ibc_transfer_timeout_seconds: Option<u64>,
    pub redemption_rate_bounds: RedemptionRateBoundsConfig,
    #[serde(default)]
    pub module_versions: VersionMap,
    pub legacy_genesis: Option<LegacyGenesis>,
}

#[cw_serde]
pub enum ExecuteMsg {
    RegisterHostZone {
        registration: HostZoneRegistration,
    },
    LiquidStake {
        chain_id: String,
    },
    RedeemStake {
        chain_id: String,
    },
    UpdateRedemptionRate {
        chain_id: String,
        redemption_rate: Decimal,
    },
    ResetRedemptionRateBounds {
        chain_id: String,
    },
    ToggleRedemptions {
        chain_id: String,
        enabled: bool,
    },
    /// Halted zones accept no stakes or redemptions and are left out of epochs
    SetHostZoneHalted {
        chain_id: String,
        halted: bool,
    },
    SetTradeRoute {
        trade_route: TradeRoute,
    },
    RemoveTradeRoute {
        reward_denom: String,
        target_denom: String,
    },
    TransferCommunityPoolDepositToHolding {
        chain_id: String,
        coin: Coin,
    },
    UpdateConfig {
        operator: Option<String>,
        ica_controller: Option<String>,
        ibc_transfer_timeout_seconds: Option<u64>,
    },
}

/// Calls only the chain itself can make
#[cw_serde]
pub enum SudoMsg {
    EpochStart {
        epoch_identifier: String,
        epoch_number: u64,
        next_epoch_start_time: u64,
        duration: u64,
    },
    BatchCallback {
        chain_id: String,
        sequence: u64,
        success: bool,
    },
    IcaRegistered {
        chain_id: String,
        account_type: IcaAccountType,
        address: String,
    },
}

#[cw_serde]
pub struct MigrateMsg {
    /// Upgrade name, each name is applied once
    pub name: String,
    pub plan: UpgradePlan,
    /// Target version of every module after this upgrade
    pub module_versions: VersionMap,
}

#[cw_serde]
pub enum UpgradePlan {
    /// No state changes beyond the module versions
    VersionsOnly {},
    RedemptionRateBounds {
        bounds: RedemptionRateBoundsConfig,
        snapshot: Option<RedemptionRateSnapshot>,
    },
    BatchedAccounting {
        custodial_migrations: Vec<CustodialMigration>,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(crate::state::Config)]
    Config {},

    #[returns(crate::host_zone::HostZone)]
    HostZone { chain_id: String },

    #[returns(Vec<crate::host_zone::HostZone>)]
    HostZones {},

    #[returns(RedemptionRateResponse)]
    RedemptionRate { chain_id: String },

    #[returns(crate::records::DepositRecord)]
    DepositRecord { id: u64 },

    #[returns(Vec<crate::records::DepositRecord>)]
    DepositRecords { chain_id: Option<String> },

    #[returns(crate::legacy::DelegationRecord)]
    DelegationRecord { id: u64 },

    #[returns(crate::records::EpochUnbondingRecord)]
    EpochUnbondingRecord { epoch_number: u64 },

    #[returns(Vec<crate::records::EpochUnbondingRecord>)]
    EpochUnbondingRecords {},

    #[returns(crate::host_zone::TradeRoute)]
    TradeRoute {
        reward_denom: String,
        target_denom: String,
    },

    #[returns(Vec<crate::host_zone::TradeRoute>)]
    TradeRoutes {},

    #[returns(crate::epoch::EpochTracker)]
    EpochTracker { epoch_identifier: String },

    #[returns(Uint128)]
    ModuleBalance { address: String, denom: String },

    #[returns(Option<crate::transport::PendingBatch>)]
    PendingBatch { chain_id: String, sequence: u64 },

    #[returns(VersionMap)]
    ModuleVersions {},
}

#[cw_serde]
pub struct RedemptionRateResponse {
    pub chain_id: String,
    pub redemption_rate: Decimal,
    pub min_redemption_rate: Decimal,
    pub max_redemption_rate: Decimal,
    pub redemptions_enabled: bool,
}
