// ============================================
// liquid_staking_ledger/src/redemption_rate.rs
// Redemption rate bounds

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Storage, Uint128};

use crate::error::ContractError;
use crate::host_zone::{load_host_zone, HostZone};

#[cw_serde]
pub struct ChainBuffer {
    pub chain_id: String,
    pub buffer: Decimal,
}

#[cw_serde]
pub struct RedemptionRateBoundsConfig {
    pub outer_min_adjustment: Decimal,
    pub outer_max_adjustment: Decimal,
    /// Chains whose yield is less predictable get a wider band
    #[serde(default)]
    pub chain_buffers: Vec<ChainBuffer>,
}

pub struct RedemptionRateGuard<'a> {
    config: &'a RedemptionRateBoundsConfig,
}

impl<'a> RedemptionRateGuard<'a> {
    pub fn new(config: &'a RedemptionRateBoundsConfig) -> Self {
        RedemptionRateGuard { config }
    }

    pub fn buffer(&self, chain_id: &str) -> Decimal {
        self.config
            .chain_buffers
            .iter()
            .find(|b| b.chain_id == chain_id)
            .map(|b| b.buffer)
            .unwrap_or_default()
    }

    /// min = rate * (1 - outerMin - buffer), max = rate * (1 + outerMax + buffer)
    pub fn compute_bounds(
        &self,
        chain_id: &str,
        current_rate: Decimal,
    ) -> Result<(Decimal, Decimal), ContractError> {
        let buffer = self.buffer(chain_id);

        let min_adjustment = self.config.outer_min_adjustment.checked_add(buffer)?;
        let min_multiplier = Decimal::one()
            .checked_sub(min_adjustment)
            .map_err(|_| ContractError::InvalidBoundAdjustment {
                adjustment: min_adjustment,
            })?;
        let max_multiplier = Decimal::one()
            .checked_add(self.config.outer_max_adjustment)?
            .checked_add(buffer)?;

        let min = current_rate.checked_mul(min_multiplier)?;
        let max = current_rate.checked_mul(max_multiplier)?;
        Ok((min, max))
    }

    /// Fails closed: a rate strictly outside the zone's stored band is rejected,
    /// a rate sitting exactly on a bound is accepted.
    pub fn validate(
        &self,
        storage: &dyn Storage,
        chain_id: &str,
        candidate_rate: Decimal,
    ) -> Result<(), ContractError> {
        let host_zone = load_host_zone(storage, chain_id)?;
        check_within_bounds(&host_zone, candidate_rate)
    }
}

/// floor(st_amount * rate)
pub fn st_to_native(st_amount: Uint128, rate: Decimal) -> Result<Uint128, ContractError> {
    Ok(st_amount.checked_multiply_ratio(rate.atomics(), Decimal::one().atomics())?)
}

/// floor(native_amount / rate)
pub fn native_to_st(native_amount: Uint128, rate: Decimal) -> Result<Uint128, ContractError> {
    if rate.is_zero() {
        return Err(ContractError::InvalidAmount {});
    }
    Ok(native_amount.checked_multiply_ratio(Decimal::one().atomics(), rate.atomics())?)
}

pub fn check_within_bounds(host_zone: &HostZone, rate: Decimal) -> Result<(), ContractError> {
    if rate < host_zone.min_redemption_rate || rate > host_zone.max_redemption_rate {
        return Err(ContractError::RedemptionRateOutsideBounds {
            chain_id: host_zone.chain_id.clone(),
            rate,
            min: host_zone.min_redemption_rate,
            max: host_zone.max_redemption_rate,
        });
    }
    Ok(())
}
