// ============================================
// liquid_staking_ledger/src/contract.rs
// Liquid staking ledger entry points

use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Coin, Decimal, Deps, DepsMut, Env, MessageInfo, Response,
    StdError, StdResult, Uint128,
};
use cw2::{get_contract_version, set_contract_version};

use crate::bank;
use crate::batch::EpochBatchProcessor;
use crate::epoch::{load_epoch_tracker, EpochTracker, STRIDE_EPOCH};
use crate::error::ContractError;
use crate::host_zone::{
    all_host_zones, all_trade_routes, load_host_zone, load_trade_route, register_host_zone,
    remove_trade_route, set_host_zone, set_ica_address, set_trade_route, HostZone,
    HostZoneRegistration, TradeRoute,
};
use crate::legacy::{self, load_delegation_record};
use crate::msg::{
    ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg, RedemptionRateResponse, SudoMsg,
};
use crate::records::{
    all_deposit_records, all_epoch_unbonding_records, deposit_records_for_host,
    deposit_records_with_status, latest_epoch_unbonding_record, load_deposit_record,
    load_epoch_unbonding_record, pending_unbonding_amount, set_deposit_record, set_epoch_unbonding_record,
    DepositRecordStatus, HostZoneUnbondingStatus,
};
use crate::redemption_rate::{check_within_bounds, native_to_st, st_to_native, RedemptionRateGuard};
use crate::state::{Config, CONFIG, DEPOSIT_RECORD_COUNT};
use crate::transport::{
    get_pending_batch, peek_sequence, save_pending_batch, BatchKind, PendingBatch, Transport,
};
use crate::upgrades::{apply_upgrade, load_version_map, store_version_map};

const CONTRACT_NAME: &str = "crates.io:liquid-staking-ledger";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_IBC_TRANSFER_TIMEOUT_SECONDS: u64 = 3_600;

// ============ Instantiate ============

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    // every configured band must leave room below the rate
    let guard = RedemptionRateGuard::new(&msg.redemption_rate_bounds);
    guard.compute_bounds("", Decimal::one())?;
    for chain_buffer in &msg.redemption_rate_bounds.chain_buffers {
        guard.compute_bounds(&chain_buffer.chain_id, Decimal::one())?;
    }

    let config = Config {
        owner: info.sender.clone(),
        operator: deps.api.addr_validate(&msg.operator)?,
        ica_controller: deps.api.addr_validate(&msg.ica_controller)?,
        ibc_transfer_timeout_seconds: msg
            .ibc_transfer_timeout_seconds
            .unwrap_or(DEFAULT_IBC_TRANSFER_TIMEOUT_SECONDS),
        redemption_rate_bounds: msg.redemption_rate_bounds,
    };

    CONFIG.save(deps.storage, &config)?;
    DEPOSIT_RECORD_COUNT.save(deps.storage, &0u64)?;
    store_version_map(deps.storage, &msg.module_versions)?;

    if let Some(genesis) = &msg.legacy_genesis {
        legacy::import_genesis(deps.storage, genesis)?;
    }

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("owner", info.sender)
        .add_attribute("operator", config.operator)
        .add_attribute("ica_controller", config.ica_controller))
}

// ============ Execute ============

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::RegisterHostZone { registration } => {
            execute_register_host_zone(deps, info, registration)
        }

        ExecuteMsg::LiquidStake { chain_id } => execute_liquid_stake(deps, info, chain_id),

        ExecuteMsg::RedeemStake { chain_id } => execute_redeem_stake(deps, info, chain_id),

        ExecuteMsg::UpdateRedemptionRate {
            chain_id,
            redemption_rate,
        } => execute_update_redemption_rate(deps, info, chain_id, redemption_rate),

        ExecuteMsg::ResetRedemptionRateBounds { chain_id } => {
            execute_reset_redemption_rate_bounds(deps, info, chain_id)
        }

        ExecuteMsg::ToggleRedemptions { chain_id, enabled } => {
            execute_toggle_redemptions(deps, info, chain_id, enabled)
        }

        ExecuteMsg::SetHostZoneHalted { chain_id, halted } => {
            execute_set_host_zone_halted(deps, info, chain_id, halted)
        }

        ExecuteMsg::SetTradeRoute { trade_route } => {
            execute_set_trade_route(deps, info, trade_route)
        }

        ExecuteMsg::RemoveTradeRoute {
            reward_denom,
            target_denom,
        } => execute_remove_trade_route(deps, info, reward_denom, target_denom),

        ExecuteMsg::TransferCommunityPoolDepositToHolding { chain_id, coin } => {
            execute_community_pool_transfer(deps, env, info, chain_id, coin)
        }

        ExecuteMsg::UpdateConfig {
            operator,
            ica_controller,
            ibc_transfer_timeout_seconds,
        } => execute_update_config(deps, info, operator, ica_controller, ibc_transfer_timeout_seconds),
    }
}

fn ensure_owner(config: &Config, info: &MessageInfo) -> Result<(), ContractError> {
    if info.sender != config.owner {
        return Err(ContractError::Unauthorized {});
    }
    Ok(())
}

fn ensure_operator(config: &Config, info: &MessageInfo) -> Result<(), ContractError> {
    if info.sender != config.operator && info.sender != config.owner {
        return Err(ContractError::Unauthorized {});
    }
    Ok(())
}

/// The single coin of `denom` attached to the message
fn paid_amount(info: &MessageInfo, denom: &str) -> Result<Uint128, ContractError> {
    match info.funds.as_slice() {
        [coin] if coin.denom == denom && !coin.amount.is_zero() => Ok(coin.amount),
        _ => Err(ContractError::InvalidAmount {}),
    }
}

fn ensure_active(host_zone: &HostZone) -> Result<(), ContractError> {
    if host_zone.halted {
        return Err(ContractError::HostZoneHalted {
            chain_id: host_zone.chain_id.clone(),
        });
    }
    check_within_bounds(host_zone, host_zone.redemption_rate)
}

// ============ HOST ZONES ============

fn execute_register_host_zone(
    deps: DepsMut,
    info: MessageInfo,
    registration: HostZoneRegistration,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    let host_zone = register_host_zone(deps.storage, registration)?;

    Ok(Response::new()
        .add_attribute("action", "register_host_zone")
        .add_attribute("chain_id", host_zone.chain_id)
        .add_attribute("deposit_address", host_zone.deposit_address)
        .add_attribute("host_denom", host_zone.host_denom))
}

fn execute_toggle_redemptions(
    deps: DepsMut,
    info: MessageInfo,
    chain_id: String,
    enabled: bool,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    let mut host_zone = load_host_zone(deps.storage, &chain_id)?;
    host_zone.redemptions_enabled = enabled;
    set_host_zone(deps.storage, &host_zone)?;

    Ok(Response::new()
        .add_attribute("action", "toggle_redemptions")
        .add_attribute("chain_id", chain_id)
        .add_attribute("enabled", enabled.to_string()))
}

fn execute_set_host_zone_halted(
    deps: DepsMut,
    info: MessageInfo,
    chain_id: String,
    halted: bool,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    let mut host_zone = load_host_zone(deps.storage, &chain_id)?;
    host_zone.halted = halted;
    set_host_zone(deps.storage, &host_zone)?;

    Ok(Response::new()
        .add_attribute("action", "set_host_zone_halted")
        .add_attribute("chain_id", chain_id)
        .add_attribute("halted", halted.to_string()))
}

// ============ STAKING ============

fn execute_liquid_stake(
    deps: DepsMut,
    info: MessageInfo,
    chain_id: String,
) -> Result<Response, ContractError> {
    let host_zone = load_host_zone(deps.storage, &chain_id)?;
    ensure_active(&host_zone)?;
    let amount = paid_amount(&info, &host_zone.ibc_denom)?;

    let stride_epoch = load_epoch_tracker(deps.storage, STRIDE_EPOCH)?;
    let mut record = deposit_records_with_status(deps.storage, &chain_id, DepositRecordStatus::TransferQueue)?
        .into_iter()
        .find(|record| record.deposit_epoch_number == stride_epoch.epoch_number)
        .ok_or_else(|| ContractError::NoQueuedDepositRecord {
            chain_id: chain_id.clone(),
            epoch_number: stride_epoch.epoch_number,
        })?;

    let st_amount = native_to_st(amount, host_zone.redemption_rate)?;
    if st_amount.is_zero() {
        return Err(ContractError::InvalidAmount {});
    }

    record.amount = record.amount.checked_add(amount)?;
    set_deposit_record(deps.storage, &record)?;
    bank::credit(
        deps.storage,
        &host_zone.deposit_address,
        &Coin {
            denom: host_zone.ibc_denom.clone(),
            amount,
        },
    )?;

    Ok(Response::new()
        .add_attribute("action", "liquid_stake")
        .add_attribute("chain_id", chain_id)
        .add_attribute("staker", info.sender)
        .add_attribute("native_amount", amount)
        .add_attribute("st_amount", st_amount)
        .add_attribute("st_denom", host_zone.st_denom())
        .add_attribute("deposit_record_id", record.id.to_string()))
}

fn execute_redeem_stake(
    deps: DepsMut,
    info: MessageInfo,
    chain_id: String,
) -> Result<Response, ContractError> {
    let host_zone = load_host_zone(deps.storage, &chain_id)?;
    if !host_zone.redemptions_enabled {
        return Err(ContractError::RedemptionsDisabled { chain_id });
    }
    ensure_active(&host_zone)?;
    let st_amount = paid_amount(&info, &host_zone.st_denom())?;
    let native_amount = st_to_native(st_amount, host_zone.redemption_rate)?;
    // earlier redemptions not yet undelegated already claim part of the stake
    let available = host_zone
        .total_delegations
        .saturating_sub(pending_unbonding_amount(deps.storage, &chain_id)?);
    if native_amount > available {
        return Err(ContractError::InsufficientFunds {
            account: host_zone.delegation_ica_address,
            denom: host_zone.host_denom,
            needed: native_amount.to_string(),
            available: available.to_string(),
        });
    }

    let mut record =
        latest_epoch_unbonding_record(deps.storage)?.ok_or(ContractError::MissingEpochUnbondingRecord {})?;
    let epoch_number = record.epoch_number;
    let hzu = record.host_zone_unbonding_mut(&chain_id).ok_or_else(|| {
        ContractError::HostZoneUnbondingNotFound {
            chain_id: chain_id.clone(),
            epoch_number,
        }
    })?;
    if hzu.status != HostZoneUnbondingStatus::UnbondingQueue {
        return Err(ContractError::UnexpectedRecordStatus {
            chain_id,
            id: epoch_number,
            actual: hzu.status.as_str().to_string(),
            expected: HostZoneUnbondingStatus::UnbondingQueue.as_str().to_string(),
        });
    }
    hzu.st_token_amount = hzu.st_token_amount.checked_add(st_amount)?;
    hzu.native_token_amount = hzu.native_token_amount.checked_add(native_amount)?;
    set_epoch_unbonding_record(deps.storage, &record)?;

    Ok(Response::new()
        .add_attribute("action", "redeem_stake")
        .add_attribute("chain_id", chain_id)
        .add_attribute("redeemer", info.sender)
        .add_attribute("st_amount", st_amount)
        .add_attribute("native_amount", native_amount)
        .add_attribute("epoch_number", epoch_number.to_string()))
}

// ============ REDEMPTION RATE ============

fn execute_update_redemption_rate(
    deps: DepsMut,
    info: MessageInfo,
    chain_id: String,
    redemption_rate: Decimal,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_operator(&config, &info)?;

    RedemptionRateGuard::new(&config.redemption_rate_bounds).validate(
        deps.storage,
        &chain_id,
        redemption_rate,
    )?;

    let mut host_zone = load_host_zone(deps.storage, &chain_id)?;
    host_zone.redemption_rate = redemption_rate;
    set_host_zone(deps.storage, &host_zone)?;

    Ok(Response::new()
        .add_attribute("action", "update_redemption_rate")
        .add_attribute("chain_id", chain_id)
        .add_attribute("redemption_rate", redemption_rate.to_string()))
}

fn execute_reset_redemption_rate_bounds(
    deps: DepsMut,
    info: MessageInfo,
    chain_id: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    let mut host_zone = load_host_zone(deps.storage, &chain_id)?;
    let (min, max) = RedemptionRateGuard::new(&config.redemption_rate_bounds)
        .compute_bounds(&chain_id, host_zone.redemption_rate)?;
    host_zone.min_redemption_rate = min;
    host_zone.max_redemption_rate = max;
    set_host_zone(deps.storage, &host_zone)?;

    Ok(Response::new()
        .add_attribute("action", "reset_redemption_rate_bounds")
        .add_attribute("chain_id", chain_id)
        .add_attribute("min_redemption_rate", min.to_string())
        .add_attribute("max_redemption_rate", max.to_string()))
}

// ============ TRADE ROUTES ============

fn execute_set_trade_route(
    deps: DepsMut,
    info: MessageInfo,
    trade_route: TradeRoute,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    set_trade_route(deps.storage, &trade_route)?;

    Ok(Response::new()
        .add_attribute("action", "set_trade_route")
        .add_attribute("reward_denom", trade_route.reward_denom_on_host_zone)
        .add_attribute("target_denom", trade_route.target_denom_on_host_zone))
}

fn execute_remove_trade_route(
    deps: DepsMut,
    info: MessageInfo,
    reward_denom: String,
    target_denom: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    load_trade_route(deps.storage, &reward_denom, &target_denom)?;
    remove_trade_route(deps.storage, &reward_denom, &target_denom);

    Ok(Response::new()
        .add_attribute("action", "remove_trade_route")
        .add_attribute("reward_denom", reward_denom)
        .add_attribute("target_denom", target_denom))
}

// ============ COMMUNITY POOL ============

fn execute_community_pool_transfer(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    chain_id: String,
    coin: Coin,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_operator(&config, &info)?;
    if coin.amount.is_zero() {
        return Err(ContractError::InvalidAmount {});
    }

    let host_zone = load_host_zone(deps.storage, &chain_id)?;
    let sequence = peek_sequence(deps.storage, &chain_id)?;
    let msg = Transport::new(&config, &env).community_pool_transfer(&host_zone, sequence, coin.clone())?;
    save_pending_batch(
        deps.storage,
        &PendingBatch {
            chain_id: chain_id.clone(),
            sequence,
            kind: BatchKind::CommunityPoolTransfer,
            record_ids: vec![],
            amount: coin.amount,
        },
    )?;

    Ok(Response::new()
        .add_message(msg)
        .add_attribute("action", "community_pool_transfer")
        .add_attribute("chain_id", chain_id)
        .add_attribute("sequence", sequence.to_string())
        .add_attribute("coin", coin.to_string()))
}

// ============ ADMIN ============

fn execute_update_config(
    deps: DepsMut,
    info: MessageInfo,
    operator: Option<String>,
    ica_controller: Option<String>,
    ibc_transfer_timeout_seconds: Option<u64>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info)?;

    if let Some(operator) = operator {
        config.operator = deps.api.addr_validate(&operator)?;
    }
    if let Some(ica_controller) = ica_controller {
        config.ica_controller = deps.api.addr_validate(&ica_controller)?;
    }
    if let Some(timeout) = ibc_transfer_timeout_seconds {
        config.ibc_transfer_timeout_seconds = timeout;
    }
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "update_config")
        .add_attribute("operator", config.operator)
        .add_attribute("ica_controller", config.ica_controller))
}

// ============ Sudo ============

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn sudo(deps: DepsMut, env: Env, msg: SudoMsg) -> Result<Response, ContractError> {
    match msg {
        SudoMsg::EpochStart {
            epoch_identifier,
            epoch_number,
            next_epoch_start_time,
            duration,
        } => {
            let config = CONFIG.load(deps.storage)?;
            EpochBatchProcessor::new(&config, &env).begin_epoch(
                deps.storage,
                EpochTracker {
                    epoch_identifier,
                    epoch_number,
                    next_epoch_start_time,
                    duration,
                },
            )
        }

        SudoMsg::BatchCallback {
            chain_id,
            sequence,
            success,
        } => {
            let config = CONFIG.load(deps.storage)?;
            EpochBatchProcessor::new(&config, &env).handle_callback(deps.storage, &chain_id, sequence, success)
        }

        SudoMsg::IcaRegistered {
            chain_id,
            account_type,
            address,
        } => {
            set_ica_address(deps.storage, &chain_id, account_type, address.clone())?;
            Ok(Response::new()
                .add_attribute("action", "ica_registered")
                .add_attribute("chain_id", chain_id)
                .add_attribute("account_type", account_type.as_str())
                .add_attribute("address", address))
        }
    }
}

// ============ Migrate ============

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, env: Env, msg: MigrateMsg) -> Result<Response, ContractError> {
    let stored = get_contract_version(deps.storage)?;
    if stored.contract != CONTRACT_NAME {
        return Err(ContractError::ContractNameMismatch {
            stored: stored.contract,
            expected: CONTRACT_NAME.to_string(),
        });
    }
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    apply_upgrade(deps, &env, msg)
}

// ============ Query ============

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&CONFIG.load(deps.storage)?),
        QueryMsg::HostZone { chain_id } => {
            to_json_binary(&load_host_zone(deps.storage, &chain_id).map_err(to_std)?)
        }
        QueryMsg::HostZones {} => to_json_binary(&all_host_zones(deps.storage)?),
        QueryMsg::RedemptionRate { chain_id } => {
            to_json_binary(&query_redemption_rate(deps, chain_id)?)
        }
        QueryMsg::DepositRecord { id } => {
            to_json_binary(&load_deposit_record(deps.storage, id).map_err(to_std)?)
        }
        QueryMsg::DepositRecords { chain_id } => match chain_id {
            Some(chain_id) => to_json_binary(&deposit_records_for_host(deps.storage, &chain_id)?),
            None => to_json_binary(&all_deposit_records(deps.storage)?),
        },
        QueryMsg::DelegationRecord { id } => {
            to_json_binary(&load_delegation_record(deps.storage, id).map_err(to_std)?)
        }
        QueryMsg::EpochUnbondingRecord { epoch_number } => to_json_binary(
            &load_epoch_unbonding_record(deps.storage, epoch_number).map_err(to_std)?,
        ),
        QueryMsg::EpochUnbondingRecords {} => {
            to_json_binary(&all_epoch_unbonding_records(deps.storage)?)
        }
        QueryMsg::TradeRoute {
            reward_denom,
            target_denom,
        } => to_json_binary(
            &load_trade_route(deps.storage, &reward_denom, &target_denom).map_err(to_std)?,
        ),
        QueryMsg::TradeRoutes {} => to_json_binary(&all_trade_routes(deps.storage)?),
        QueryMsg::EpochTracker { epoch_identifier } => to_json_binary(
            &load_epoch_tracker(deps.storage, &epoch_identifier).map_err(to_std)?,
        ),
        QueryMsg::ModuleBalance { address, denom } => {
            to_json_binary(&bank::balance(deps.storage, &address, &denom)?)
        }
        QueryMsg::PendingBatch { chain_id, sequence } => {
            to_json_binary(&get_pending_batch(deps.storage, &chain_id, sequence)?)
        }
        QueryMsg::ModuleVersions {} => to_json_binary(&load_version_map(deps.storage)?),
    }
}

fn to_std(err: ContractError) -> StdError {
    match err {
        ContractError::Std(err) => err,
        other => StdError::generic_err(other.to_string()),
    }
}

fn query_redemption_rate(deps: Deps, chain_id: String) -> StdResult<RedemptionRateResponse> {
    let host_zone = load_host_zone(deps.storage, &chain_id).map_err(to_std)?;
    Ok(RedemptionRateResponse {
        chain_id,
        redemption_rate: host_zone.redemption_rate,
        min_redemption_rate: host_zone.min_redemption_rate,
        max_redemption_rate: host_zone.max_redemption_rate,
        redemptions_enabled: host_zone.redemptions_enabled,
    })
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::DAY_EPOCH;
    use crate::host_zone::IcaAccountType;
    use crate::redemption_rate::RedemptionRateBoundsConfig;
    use cosmwasm_std::testing::{mock_dependencies, mock_env, mock_info, MockApi, MockQuerier, MockStorage};
    use cosmwasm_std::{coins, from_json, OwnedDeps};
    use std::str::FromStr;

    const CHAIN_ID: &str = "cosmoshub-4";

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn instantiate_msg() -> InstantiateMsg {
        InstantiateMsg {
            operator: "operator".to_string(),
            ica_controller: "ica_controller".to_string(),
            ibc_transfer_timeout_seconds: None,
            redemption_rate_bounds: RedemptionRateBoundsConfig {
                outer_min_adjustment: dec("0.05"),
                outer_max_adjustment: dec("0.10"),
                chain_buffers: vec![],
            },
            module_versions: [("records".to_string(), 1u64)].into_iter().collect(),
            legacy_genesis: None,
        }
    }

    fn epoch_start(epoch_identifier: &str, epoch_number: u64) -> SudoMsg {
        SudoMsg::EpochStart {
            epoch_identifier: epoch_identifier.to_string(),
            epoch_number,
            next_epoch_start_time: 0,
            duration: 21_600,
        }
    }

    fn setup() -> OwnedDeps<MockStorage, MockApi, MockQuerier> {
        let mut deps = mock_dependencies();
        instantiate(deps.as_mut(), mock_env(), mock_info("creator", &[]), instantiate_msg()).unwrap();
        sudo(deps.as_mut(), mock_env(), epoch_start(STRIDE_EPOCH, 1)).unwrap();
        sudo(deps.as_mut(), mock_env(), epoch_start(DAY_EPOCH, 1)).unwrap();

        let msg = ExecuteMsg::RegisterHostZone {
            registration: HostZoneRegistration {
                chain_id: CHAIN_ID.to_string(),
                connection_id: "connection-0".to_string(),
                transfer_channel_id: "channel-0".to_string(),
                bech32_prefix: "cosmos".to_string(),
                host_denom: "uatom".to_string(),
                ibc_denom: "ibc/atom".to_string(),
                unbonding_period: 21,
                min_redemption_rate: dec("0.9"),
                max_redemption_rate: dec("1.5"),
            },
        };
        execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), msg).unwrap();
        for (account_type, address) in [
            (IcaAccountType::Delegation, "cosmos1delegation"),
            (IcaAccountType::Redemption, "cosmos1redemption"),
        ] {
            sudo(
                deps.as_mut(),
                mock_env(),
                SudoMsg::IcaRegistered {
                    chain_id: CHAIN_ID.to_string(),
                    account_type,
                    address: address.to_string(),
                },
            )
            .unwrap();
        }
        deps
    }

    fn host_zone(deps: Deps) -> HostZone {
        from_json(query(deps, mock_env(), QueryMsg::HostZone { chain_id: CHAIN_ID.to_string() }).unwrap()).unwrap()
    }

    #[test]
    fn proper_initialization() {
        let mut deps = mock_dependencies();
        let res = instantiate(deps.as_mut(), mock_env(), mock_info("creator", &[]), instantiate_msg()).unwrap();
        assert_eq!(0, res.messages.len());

        let config = CONFIG.load(&deps.storage).unwrap();
        assert_eq!(config.owner, "creator");
        assert_eq!(config.ibc_transfer_timeout_seconds, DEFAULT_IBC_TRANSFER_TIMEOUT_SECONDS);
        assert_eq!(load_version_map(&deps.storage).unwrap().get("records"), Some(&1));
    }

    #[test]
    fn bad_bound_adjustment_is_rejected_at_instantiate() {
        let mut deps = mock_dependencies();
        let mut msg = instantiate_msg();
        msg.redemption_rate_bounds.outer_min_adjustment = dec("1.5");
        let err = instantiate(deps.as_mut(), mock_env(), mock_info("creator", &[]), msg).unwrap_err();
        assert!(matches!(err, ContractError::InvalidBoundAdjustment { .. }));
    }

    #[test]
    fn register_requires_owner_and_epochs() {
        let mut deps = mock_dependencies();
        instantiate(deps.as_mut(), mock_env(), mock_info("creator", &[]), instantiate_msg()).unwrap();
        let registration = crate::host_zone::tests::registration(CHAIN_ID);

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("anyone", &[]),
            ExecuteMsg::RegisterHostZone {
                registration: registration.clone(),
            },
        )
        .unwrap_err();
        assert_eq!(err, ContractError::Unauthorized {});

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("creator", &[]),
            ExecuteMsg::RegisterHostZone { registration },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ContractError::MissingEpochTracker {
                epoch_identifier: STRIDE_EPOCH.to_string()
            }
        );
    }

    #[test]
    fn liquid_stake_credits_current_deposit_record() {
        let mut deps = setup();
        let res = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("staker", &coins(1_000, "ibc/atom")),
            ExecuteMsg::LiquidStake {
                chain_id: CHAIN_ID.to_string(),
            },
        )
        .unwrap();
        assert!(res.attributes.iter().any(|a| a.key == "st_amount" && a.value == "1000"));

        let records = deposit_records_for_host(&deps.storage, CHAIN_ID).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, Uint128::new(1_000));

        let balance: Uint128 = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::ModuleBalance {
                    address: bank::deposit_address(CHAIN_ID),
                    denom: "ibc/atom".to_string(),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(balance, Uint128::new(1_000));

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("staker", &coins(1_000, "uosmo")),
            ExecuteMsg::LiquidStake {
                chain_id: CHAIN_ID.to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err, ContractError::InvalidAmount {});
    }

    #[test]
    fn redemption_rate_updates_are_rejected_not_clamped() {
        let mut deps = setup();
        let update = |rate: &str| ExecuteMsg::UpdateRedemptionRate {
            chain_id: CHAIN_ID.to_string(),
            redemption_rate: dec(rate),
        };

        let err = execute(deps.as_mut(), mock_env(), mock_info("staker", &[]), update("1.1")).unwrap_err();
        assert_eq!(err, ContractError::Unauthorized {});

        execute(deps.as_mut(), mock_env(), mock_info("operator", &[]), update("1.5")).unwrap();
        assert_eq!(host_zone(deps.as_ref()).redemption_rate, dec("1.5"));

        let err = execute(deps.as_mut(), mock_env(), mock_info("operator", &[]), update("1.51")).unwrap_err();
        assert!(matches!(err, ContractError::RedemptionRateOutsideBounds { .. }));
        assert_eq!(host_zone(deps.as_ref()).redemption_rate, dec("1.5"));

        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("creator", &[]),
            ExecuteMsg::ResetRedemptionRateBounds {
                chain_id: CHAIN_ID.to_string(),
            },
        )
        .unwrap();
        let rate: RedemptionRateResponse = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::RedemptionRate {
                    chain_id: CHAIN_ID.to_string(),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(rate.min_redemption_rate, dec("1.425"));
        assert_eq!(rate.max_redemption_rate, dec("1.65"));
    }

    #[test]
    fn redeem_stake_queues_unbonding() {
        let mut deps = setup();
        let mut zone = host_zone(deps.as_ref());
        zone.redemption_rate = dec("1.2");
        zone.total_delegations = Uint128::new(10_000);
        set_host_zone(&mut deps.storage, &zone).unwrap();

        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("redeemer", &coins(500, "stuatom")),
            ExecuteMsg::RedeemStake {
                chain_id: CHAIN_ID.to_string(),
            },
        )
        .unwrap();

        let record = latest_epoch_unbonding_record(&deps.storage).unwrap().unwrap();
        let hzu = record.host_zone_unbonding(CHAIN_ID).unwrap();
        assert_eq!(hzu.st_token_amount, Uint128::new(500));
        assert_eq!(hzu.native_token_amount, Uint128::new(600));

        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("creator", &[]),
            ExecuteMsg::ToggleRedemptions {
                chain_id: CHAIN_ID.to_string(),
                enabled: false,
            },
        )
        .unwrap();
        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("redeemer", &coins(500, "stuatom")),
            ExecuteMsg::RedeemStake {
                chain_id: CHAIN_ID.to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ContractError::RedemptionsDisabled {
                chain_id: CHAIN_ID.to_string()
            }
        );
    }

    #[test]
    fn redemptions_cannot_exceed_stake_not_yet_unbonding() {
        let mut deps = setup();
        let mut zone = host_zone(deps.as_ref());
        zone.total_delegations = Uint128::new(1_000);
        set_host_zone(&mut deps.storage, &zone).unwrap();

        let redeem = ExecuteMsg::RedeemStake {
            chain_id: CHAIN_ID.to_string(),
        };
        execute(deps.as_mut(), mock_env(), mock_info("alice", &coins(600, "stuatom")), redeem.clone()).unwrap();
        let err = execute(deps.as_mut(), mock_env(), mock_info("bob", &coins(600, "stuatom")), redeem.clone())
            .unwrap_err();
        assert_eq!(
            err,
            ContractError::InsufficientFunds {
                account: "cosmos1delegation".to_string(),
                denom: "uatom".to_string(),
                needed: "600".to_string(),
                available: "400".to_string(),
            }
        );
        execute(deps.as_mut(), mock_env(), mock_info("bob", &coins(400, "stuatom")), redeem).unwrap();

        sudo(deps.as_mut(), mock_env(), epoch_start(DAY_EPOCH, 2)).unwrap();
        let res = sudo(
            deps.as_mut(),
            mock_env(),
            SudoMsg::BatchCallback {
                chain_id: CHAIN_ID.to_string(),
                sequence: 1,
                success: true,
            },
        )
        .unwrap();
        assert_eq!(res.messages.len(), 1);
        assert!(host_zone(deps.as_ref()).total_delegations.is_zero());
    }

    #[test]
    fn halted_zone_rejects_stakes_until_resumed() {
        let mut deps = setup();
        let halt = |halted| ExecuteMsg::SetHostZoneHalted {
            chain_id: CHAIN_ID.to_string(),
            halted,
        };
        let stake = ExecuteMsg::LiquidStake {
            chain_id: CHAIN_ID.to_string(),
        };

        let err = execute(deps.as_mut(), mock_env(), mock_info("operator", &[]), halt(true)).unwrap_err();
        assert_eq!(err, ContractError::Unauthorized {});

        execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), halt(true)).unwrap();
        assert!(host_zone(deps.as_ref()).halted);
        let err = execute(deps.as_mut(), mock_env(), mock_info("staker", &coins(100, "ibc/atom")), stake.clone())
            .unwrap_err();
        assert_eq!(
            err,
            ContractError::HostZoneHalted {
                chain_id: CHAIN_ID.to_string()
            }
        );

        execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), halt(false)).unwrap();
        execute(deps.as_mut(), mock_env(), mock_info("staker", &coins(100, "ibc/atom")), stake).unwrap();
    }

    #[test]
    fn trade_routes_round_trip_through_queries() {
        let mut deps = setup();
        let route = TradeRoute {
            reward_denom_on_host_zone: "ibc/usdc".to_string(),
            target_denom_on_host_zone: "uatom".to_string(),
            trade_zone_chain_id: "osmosis-1".to_string(),
            min_transfer_amount: Uint128::new(1_000_000),
            max_allowed_swap_loss_rate: dec("0.05"),
        };
        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("creator", &[]),
            ExecuteMsg::SetTradeRoute {
                trade_route: route.clone(),
            },
        )
        .unwrap();

        let loaded: TradeRoute = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::TradeRoute {
                    reward_denom: "ibc/usdc".to_string(),
                    target_denom: "uatom".to_string(),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(loaded, route);

        let remove = ExecuteMsg::RemoveTradeRoute {
            reward_denom: "ibc/usdc".to_string(),
            target_denom: "uatom".to_string(),
        };
        execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), remove.clone()).unwrap();
        let err = execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), remove).unwrap_err();
        assert!(matches!(err, ContractError::TradeRouteNotFound { .. }));
    }

    #[test]
    fn community_pool_transfer_needs_holding_address() {
        let mut deps = setup();
        let msg = ExecuteMsg::TransferCommunityPoolDepositToHolding {
            chain_id: CHAIN_ID.to_string(),
            coin: Coin {
                denom: "uatom".to_string(),
                amount: Uint128::new(50),
            },
        };
        let err = execute(deps.as_mut(), mock_env(), mock_info("operator", &[]), msg.clone()).unwrap_err();
        assert!(err.to_string().contains("holding address"));

        let mut zone = host_zone(deps.as_ref());
        zone.community_pool_stake_holding_address = "cosmos1holding".to_string();
        set_host_zone(&mut deps.storage, &zone).unwrap();
        sudo(
            deps.as_mut(),
            mock_env(),
            SudoMsg::IcaRegistered {
                chain_id: CHAIN_ID.to_string(),
                account_type: IcaAccountType::CommunityPoolDeposit,
                address: "cosmos1cpdeposit".to_string(),
            },
        )
        .unwrap();

        let res = execute(deps.as_mut(), mock_env(), mock_info("operator", &[]), msg).unwrap();
        assert_eq!(res.messages.len(), 1);
        let batch = get_pending_batch(&deps.storage, CHAIN_ID, 1).unwrap().unwrap();
        assert_eq!(batch.kind, BatchKind::CommunityPoolTransfer);

        sudo(
            deps.as_mut(),
            mock_env(),
            SudoMsg::BatchCallback {
                chain_id: CHAIN_ID.to_string(),
                sequence: 1,
                success: true,
            },
        )
        .unwrap();
        assert_eq!(get_pending_batch(&deps.storage, CHAIN_ID, 1).unwrap(), None);
    }

    #[test]
    fn migrate_rejects_foreign_contract() {
        let mut deps = mock_dependencies();
        set_contract_version(&mut deps.storage, "crates.io:something-else", "0.1.0").unwrap();
        let err = migrate(
            deps.as_mut(),
            mock_env(),
            MigrateMsg {
                name: "v2".to_string(),
                plan: crate::msg::UpgradePlan::VersionsOnly {},
                module_versions: Default::default(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::ContractNameMismatch { .. }));
    }
}
