// ============================================
// liquid_staking_ledger/src/upgrades.rs
// Upgrade handler: named one-shot plans and module version bookkeeping

use std::collections::BTreeMap;

use cosmwasm_std::{to_json_binary, Api, DepsMut, Env, Event, Order, Response, StdResult, Storage};

use crate::error::ContractError;
use crate::migrations::{self, initiate_migration};
use crate::msg::{MigrateMsg, UpgradePlan};
use crate::state::{APPLIED_UPGRADES, CONFIG, MODULE_VERSIONS};

/// module name => consensus version
pub type VersionMap = BTreeMap<String, u64>;

pub fn load_version_map(storage: &dyn Storage) -> StdResult<VersionMap> {
    MODULE_VERSIONS
        .range(storage, None, None, Order::Ascending)
        .collect()
}

pub fn store_version_map(storage: &mut dyn Storage, versions: &VersionMap) -> StdResult<()> {
    for (module, version) in versions {
        MODULE_VERSIONS.save(storage, module, version)?;
    }
    Ok(())
}

/// Merges the target versions into the stored ones. Modules may stay put or
/// move forward, never back.
pub fn run_module_migrations(
    current: &VersionMap,
    target: &VersionMap,
) -> Result<VersionMap, ContractError> {
    let mut updated = current.clone();
    for (module, to) in target {
        let from = current.get(module).copied().unwrap_or_default();
        if *to < from {
            return Err(ContractError::ModuleDowngrade {
                module: module.clone(),
                from,
                to: *to,
            });
        }
        updated.insert(module.clone(), *to);
    }
    Ok(updated)
}

fn debug(api: &dyn Api, name: &str, line: String) {
    api.debug(&format!("upgrade {}: {}", name, line));
}

fn apply_plan(
    storage: &mut dyn Storage,
    api: &dyn Api,
    name: &str,
    plan: UpgradePlan,
) -> Result<Vec<Event>, ContractError> {
    let mut events = vec![];

    match plan {
        UpgradePlan::VersionsOnly {} => {}
        UpgradePlan::RedemptionRateBounds { bounds, snapshot } => {
            let mut config = CONFIG.load(storage)?;
            config.redemption_rate_bounds = bounds;
            CONFIG.save(storage, &config)?;

            let host_zones =
                migrations::reset_redemption_rate_bounds(storage, &config.redemption_rate_bounds)?;
            for host_zone in &host_zones {
                events.push(
                    Event::new("redemption_rate_bounds_reset")
                        .add_attribute("chain_id", &host_zone.chain_id)
                        .add_attribute("min_redemption_rate", host_zone.min_redemption_rate.to_string())
                        .add_attribute("max_redemption_rate", host_zone.max_redemption_rate.to_string()),
                );
            }
            debug(api, name, format!("reset bounds on {} host zones", host_zones.len()));

            if let Some(snapshot) = snapshot {
                let changed = migrations::reestimate_queued_unbondings(storage, &snapshot)?;
                debug(api, name, format!("re-estimated {} queued unbondings", changed));
            }
        }
        UpgradePlan::BatchedAccounting {
            custodial_migrations,
        } => {
            let summary = migrations::backfill(storage)?;
            debug(
                api,
                name,
                format!(
                    "backfilled {} host zones, {} deposit records, {} host zone unbondings",
                    summary.host_zones, summary.deposit_records, summary.host_zone_unbondings
                ),
            );
            events.push(
                Event::new("schema_backfill")
                    .add_attribute("host_zones", summary.host_zones.to_string())
                    .add_attribute("deposit_records", summary.deposit_records.to_string())
                    .add_attribute("host_zone_unbondings", summary.host_zone_unbondings.to_string()),
            );

            for migration in &custodial_migrations {
                let result = initiate_migration(storage, migration)?;
                debug(api, name, format!("migrated {} off the legacy module", result.chain_id));
                events.push(
                    Event::new("custodial_migration")
                        .add_attribute("chain_id", &result.chain_id)
                        .add_attribute("total_delegations", result.total_delegations)
                        .add_attribute("deposit_transferred", result.deposit_transferred.to_string())
                        .add_attribute("fees_transferred", result.fees_transferred.to_string()),
                );
            }
        }
    }

    Ok(events)
}

/// Runs a named upgrade exactly once. Any error aborts the whole upgrade.
pub fn apply_upgrade(deps: DepsMut, env: &Env, msg: MigrateMsg) -> Result<Response, ContractError> {
    if let Some(height) = APPLIED_UPGRADES.may_load(deps.storage, &msg.name)? {
        return Err(ContractError::UpgradeAlreadyApplied {
            name: msg.name,
            height,
        });
    }

    let current = load_version_map(deps.storage)?;
    let versions = run_module_migrations(&current, &msg.module_versions)?;

    debug(deps.api, &msg.name, format!("starting at height {}", env.block.height));
    let events = apply_plan(deps.storage, deps.api, &msg.name, msg.plan)?;

    store_version_map(deps.storage, &versions)?;
    APPLIED_UPGRADES.save(deps.storage, &msg.name, &env.block.height)?;
    debug(deps.api, &msg.name, "complete".to_string());

    Ok(Response::new()
        .set_data(to_json_binary(&versions)?)
        .add_events(events)
        .add_attribute("action", "upgrade")
        .add_attribute("name", msg.name)
        .add_attribute("height", env.block.height.to_string()))
}
