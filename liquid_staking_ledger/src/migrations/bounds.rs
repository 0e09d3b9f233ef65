// ============================================
// liquid_staking_ledger/src/migrations/bounds.rs
// Redemption rate bound reset and unbonding re-estimation

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Storage};

use crate::error::ContractError;
use crate::host_zone::{all_host_zones, set_host_zone, HostZone};
use crate::records::{all_epoch_unbonding_records, set_epoch_unbonding_record, HostZoneUnbondingStatus};
use crate::redemption_rate::{st_to_native, RedemptionRateBoundsConfig, RedemptionRateGuard};

#[cw_serde]
pub struct ChainRate {
    pub chain_id: String,
    pub redemption_rate: Decimal,
}

#[cw_serde]
pub struct EpochRate {
    pub epoch_number: u64,
    pub chain_id: String,
    pub redemption_rate: Decimal,
}

/// Point in time redemption rates, only read while the upgrade runs
#[cw_serde]
#[derive(Default)]
pub struct RedemptionRateSnapshot {
    pub at_upgrade: Vec<ChainRate>,
    #[serde(default)]
    pub by_epoch: Vec<EpochRate>,
}

impl RedemptionRateSnapshot {
    /// The rate recorded for that epoch, falling back to the rate at upgrade time
    pub fn rate(&self, chain_id: &str, epoch_number: u64) -> Option<Decimal> {
        self.by_epoch
            .iter()
            .find(|r| r.chain_id == chain_id && r.epoch_number == epoch_number)
            .map(|r| r.redemption_rate)
            .or_else(|| {
                self.at_upgrade
                    .iter()
                    .find(|r| r.chain_id == chain_id)
                    .map(|r| r.redemption_rate)
            })
    }
}

/// Recomputes every zone's band around its current rate
pub fn reset_redemption_rate_bounds(
    storage: &mut dyn Storage,
    config: &RedemptionRateBoundsConfig,
) -> Result<Vec<HostZone>, ContractError> {
    let guard = RedemptionRateGuard::new(config);

    let mut updated = vec![];
    for mut host_zone in all_host_zones(storage)? {
        let (min, max) = guard.compute_bounds(&host_zone.chain_id, host_zone.redemption_rate)?;
        host_zone.min_redemption_rate = min;
        host_zone.max_redemption_rate = max;
        updated.push(host_zone);
    }
    for host_zone in &updated {
        set_host_zone(storage, host_zone)?;
    }

    Ok(updated)
}

/// Re-estimates the native amount of unbondings that have not been sent to the
/// host yet. Returns how many entries changed.
pub fn reestimate_queued_unbondings(
    storage: &mut dyn Storage,
    snapshot: &RedemptionRateSnapshot,
) -> Result<u64, ContractError> {
    let mut changed = 0;
    for mut record in all_epoch_unbonding_records(storage)? {
        let mut dirty = false;
        for hzu in record.host_zone_unbondings.iter_mut() {
            if hzu.status != HostZoneUnbondingStatus::UnbondingQueue {
                continue;
            }
            let Some(rate) = snapshot.rate(&hzu.host_zone_id, record.epoch_number) else {
                continue;
            };
            let native_token_amount = st_to_native(hzu.st_token_amount, rate)?;
            if native_token_amount != hzu.native_token_amount {
                hzu.native_token_amount = native_token_amount;
                changed += 1;
                dirty = true;
            }
        }
        if dirty {
            set_epoch_unbonding_record(storage, &record)?;
        }
    }
    Ok(changed)
}
