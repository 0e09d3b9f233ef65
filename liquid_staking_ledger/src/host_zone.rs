// ============================================
// liquid_staking_ledger/src/host_zone.rs
// Host zone registry and trade routes

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Order, StdResult, Storage, Uint128};

use crate::bank;
use crate::epoch::{load_epoch_tracker, DAY_EPOCH, STRIDE_EPOCH};
use crate::error::ContractError;
use crate::records::{
    append_deposit_record, latest_epoch_unbonding_record, set_epoch_unbonding_record,
    DepositRecord, DepositRecordStatus, HostZoneUnbonding,
};
use crate::state::{HOST_ZONES, TRADE_ROUTES};

#[cw_serde]
pub struct HostZone {
    pub chain_id: String,
    pub connection_id: String,
    pub transfer_channel_id: String,
    pub bech32_prefix: String,
    pub host_denom: String,
    pub ibc_denom: String,
    pub deposit_address: String,
    pub delegation_ica_address: String,
    pub fee_ica_address: String,
    pub redemption_ica_address: String,
    pub community_pool_deposit_ica_address: String,
    pub community_pool_stake_holding_address: String,
    pub redemption_rate: Decimal,
    pub min_redemption_rate: Decimal,
    pub max_redemption_rate: Decimal,
    pub total_delegations: Uint128,
    /// Unbonding period on the host, in days
    pub unbonding_period: u64,
    #[serde(default)]
    pub redemptions_enabled: bool,
    #[serde(default)]
    pub halted: bool,
}

impl HostZone {
    pub fn st_denom(&self) -> String {
        format!("st{}", self.host_denom)
    }
}

#[cw_serde]
#[derive(Copy, Eq)]
pub enum IcaAccountType {
    Delegation,
    Fee,
    Redemption,
    CommunityPoolDeposit,
}

impl IcaAccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IcaAccountType::Delegation => "delegation",
            IcaAccountType::Fee => "fee",
            IcaAccountType::Redemption => "redemption",
            IcaAccountType::CommunityPoolDeposit => "community pool deposit",
        }
    }
}

pub fn set_host_zone(storage: &mut dyn Storage, host_zone: &HostZone) -> StdResult<()> {
    HOST_ZONES.save(storage, &host_zone.chain_id, host_zone)
}

pub fn get_host_zone(storage: &dyn Storage, chain_id: &str) -> StdResult<Option<HostZone>> {
    HOST_ZONES.may_load(storage, chain_id)
}

pub fn load_host_zone(storage: &dyn Storage, chain_id: &str) -> Result<HostZone, ContractError> {
    get_host_zone(storage, chain_id)?.ok_or_else(|| ContractError::host_zone_not_found(chain_id))
}

pub fn remove_host_zone(storage: &mut dyn Storage, chain_id: &str) {
    HOST_ZONES.remove(storage, chain_id)
}

pub fn all_host_zones(storage: &dyn Storage) -> StdResult<Vec<HostZone>> {
    HOST_ZONES
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, host_zone)| host_zone))
        .collect()
}

// ============ Trade routes ============

#[cw_serde]
pub struct TradeRoute {
    pub reward_denom_on_host_zone: String,
    pub target_denom_on_host_zone: String,
    pub trade_zone_chain_id: String,
    pub min_transfer_amount: Uint128,
    pub max_allowed_swap_loss_rate: Decimal,
}

impl TradeRoute {
    pub fn key(&self) -> Vec<u8> {
        trade_route_key(
            &self.reward_denom_on_host_zone,
            &self.target_denom_on_host_zone,
        )
    }
}

/// Trade routes are keyed by the raw concatenation of the two denoms
pub fn trade_route_key(start_denom: &str, end_denom: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(start_denom.len() + end_denom.len());
    key.extend_from_slice(start_denom.as_bytes());
    key.extend_from_slice(end_denom.as_bytes());
    key
}

pub fn set_trade_route(storage: &mut dyn Storage, trade_route: &TradeRoute) -> StdResult<()> {
    TRADE_ROUTES.save(storage, &trade_route.key(), trade_route)
}

pub fn get_trade_route(
    storage: &dyn Storage,
    start_denom: &str,
    end_denom: &str,
) -> StdResult<Option<TradeRoute>> {
    TRADE_ROUTES.may_load(storage, &trade_route_key(start_denom, end_denom))
}

pub fn load_trade_route(
    storage: &dyn Storage,
    start_denom: &str,
    end_denom: &str,
) -> Result<TradeRoute, ContractError> {
    get_trade_route(storage, start_denom, end_denom)?.ok_or_else(|| {
        ContractError::TradeRouteNotFound {
            reward_denom: start_denom.to_string(),
            target_denom: end_denom.to_string(),
        }
    })
}

pub fn remove_trade_route(storage: &mut dyn Storage, start_denom: &str, end_denom: &str) {
    TRADE_ROUTES.remove(storage, &trade_route_key(start_denom, end_denom))
}

pub fn all_trade_routes(storage: &dyn Storage) -> StdResult<Vec<TradeRoute>> {
    TRADE_ROUTES
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, route)| route))
        .collect()
}

// ============ Registration ============

#[cw_serde]
pub struct HostZoneRegistration {
    pub chain_id: String,
    pub connection_id: String,
    pub transfer_channel_id: String,
    pub bech32_prefix: String,
    pub host_denom: String,
    pub ibc_denom: String,
    pub unbonding_period: u64,
    pub min_redemption_rate: Decimal,
    pub max_redemption_rate: Decimal,
}

/// Checks everything registration depends on without writing anything
pub fn check_registration(storage: &dyn Storage, chain_id: &str) -> Result<(), ContractError> {
    if get_host_zone(storage, chain_id)?.is_some() {
        return Err(ContractError::HostZoneAlreadyRegistered {
            chain_id: chain_id.to_string(),
        });
    }
    load_epoch_tracker(storage, STRIDE_EPOCH)?;
    load_epoch_tracker(storage, DAY_EPOCH)?;
    if latest_epoch_unbonding_record(storage)?.is_none() {
        return Err(ContractError::MissingEpochUnbondingRecord {});
    }
    Ok(())
}

/// Creates the host zone, its first deposit record (for the current stride epoch)
/// and its entry in the latest epoch unbonding record.
pub fn register_host_zone(
    storage: &mut dyn Storage,
    registration: HostZoneRegistration,
) -> Result<HostZone, ContractError> {
    check_registration(storage, &registration.chain_id)?;

    let stride_epoch = load_epoch_tracker(storage, STRIDE_EPOCH)?;
    let mut epoch_unbonding_record =
        latest_epoch_unbonding_record(storage)?.ok_or(ContractError::MissingEpochUnbondingRecord {})?;

    let host_zone = HostZone {
        deposit_address: bank::deposit_address(&registration.chain_id),
        chain_id: registration.chain_id,
        connection_id: registration.connection_id,
        transfer_channel_id: registration.transfer_channel_id,
        bech32_prefix: registration.bech32_prefix,
        host_denom: registration.host_denom,
        ibc_denom: registration.ibc_denom,
        delegation_ica_address: String::new(),
        fee_ica_address: String::new(),
        redemption_ica_address: String::new(),
        community_pool_deposit_ica_address: String::new(),
        community_pool_stake_holding_address: String::new(),
        redemption_rate: Decimal::one(),
        min_redemption_rate: registration.min_redemption_rate,
        max_redemption_rate: registration.max_redemption_rate,
        total_delegations: Uint128::zero(),
        unbonding_period: registration.unbonding_period,
        redemptions_enabled: true,
        halted: false,
    };
    set_host_zone(storage, &host_zone)?;

    append_deposit_record(
        storage,
        DepositRecord {
            id: 0,
            amount: Uint128::zero(),
            denom: host_zone.ibc_denom.clone(),
            host_zone_id: host_zone.chain_id.clone(),
            status: DepositRecordStatus::TransferQueue,
            deposit_epoch_number: stride_epoch.epoch_number,
            delegation_txs_in_progress: 0,
        },
    )?;

    epoch_unbonding_record
        .host_zone_unbondings
        .push(HostZoneUnbonding::new(&host_zone.chain_id, &host_zone.host_denom));
    set_epoch_unbonding_record(storage, &epoch_unbonding_record)?;

    Ok(host_zone)
}

/// Records an interchain account address reported by the controller
pub fn set_ica_address(
    storage: &mut dyn Storage,
    chain_id: &str,
    account_type: IcaAccountType,
    address: String,
) -> Result<HostZone, ContractError> {
    let mut host_zone = load_host_zone(storage, chain_id)?;
    match account_type {
        IcaAccountType::Delegation => host_zone.delegation_ica_address = address,
        IcaAccountType::Fee => host_zone.fee_ica_address = address,
        IcaAccountType::Redemption => host_zone.redemption_ica_address = address,
        IcaAccountType::CommunityPoolDeposit => {
            host_zone.community_pool_deposit_ica_address = address
        }
    }
    set_host_zone(storage, &host_zone)?;
    Ok(host_zone)
}
