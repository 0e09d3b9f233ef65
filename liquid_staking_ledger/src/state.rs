// ============================================
// liquid_staking_ledger/src/state.rs
// Storage layout

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Uint128};
use cw_storage_plus::{Item, Map};

use crate::epoch::EpochTracker;
use crate::host_zone::{HostZone, TradeRoute};
use crate::legacy::{DelegationRecord, LegacyHostZone};
use crate::records::{DepositRecord, EpochUnbondingRecord};
use crate::redemption_rate::RedemptionRateBoundsConfig;
use crate::transport::PendingBatch;

#[cw_serde]
pub struct Config {
    pub owner: Addr,
    /// Allowed to push redemption rates and community pool transfers
    pub operator: Addr,
    /// Contract that submits interchain account transactions on our behalf
    pub ica_controller: Addr,
    pub ibc_transfer_timeout_seconds: u64,
    pub redemption_rate_bounds: RedemptionRateBoundsConfig,
}

pub const CONFIG: Item<Config> = Item::new("config");

// Host zone registry
pub const HOST_ZONES: Map<&str, HostZone> = Map::new("host_zone");
// reward denom ++ target denom => trade route
pub const TRADE_ROUTES: Map<&[u8], TradeRoute> = Map::new("trade_route");

// Record store
pub const DEPOSIT_RECORDS: Map<u64, DepositRecord> = Map::new("deposit_record");
pub const DEPOSIT_RECORD_COUNT: Item<u64> = Item::new("deposit_record_count");
pub const EPOCH_UNBONDING_RECORDS: Map<u64, EpochUnbondingRecord> =
    Map::new("epoch_unbonding_record");
pub const EPOCH_TRACKERS: Map<&str, EpochTracker> = Map::new("epoch_tracker");

// Legacy custody module
pub const LEGACY_HOST_ZONES: Map<&str, LegacyHostZone> = Map::new("legacy_host_zone");
pub const DELEGATION_RECORDS: Map<u64, DelegationRecord> = Map::new("delegation_record");

// (account, denom) => balance
pub const MODULE_BALANCES: Map<(&str, &str), Uint128> = Map::new("module_balance");

// Outbound batches awaiting their completion callback
pub const BATCH_SEQUENCES: Map<&str, u64> = Map::new("batch_sequence");
pub const PENDING_BATCHES: Map<(&str, u64), PendingBatch> = Map::new("pending_batch");

// Upgrades
pub const MODULE_VERSIONS: Map<&str, u64> = Map::new("module_version");
pub const APPLIED_UPGRADES: Map<&str, u64> = Map::new("applied_upgrade");
