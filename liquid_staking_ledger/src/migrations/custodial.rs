// ============================================
// liquid_staking_ledger/src/migrations/custodial.rs
// Moves a host zone off the legacy custody module

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Coin, Storage, Uint128};

use crate::bank;
use crate::epoch::{load_epoch_tracker, DAY_EPOCH, STRIDE_EPOCH};
use crate::error::ContractError;
use crate::host_zone::{register_host_zone, set_host_zone, HostZone, HostZoneRegistration};
use crate::legacy::{self, load_legacy_host_zone, set_legacy_host_zone, LegacyHostZone};
use crate::records::{
    deposit_records_for_host, latest_epoch_unbonding_record, set_deposit_record,
};

/// Chain parameters the legacy module never stored
#[cw_serde]
pub struct CustodialMigration {
    pub chain_id: String,
    pub connection_id: String,
    pub bech32_prefix: String,
    /// Unbonding period on the host, in days
    pub unbonding_period: u64,
}

#[cw_serde]
pub struct CustodialMigrationResult {
    pub chain_id: String,
    pub total_delegations: Uint128,
    pub deposit_transferred: Coin,
    pub fees_transferred: Coin,
}

/// Settled delegated balance plus whatever is still in flight
pub fn total_delegations(
    storage: &dyn Storage,
    legacy_host_zone: &LegacyHostZone,
) -> Result<Uint128, ContractError> {
    let unsettled = legacy::unsettled_delegations(storage, &legacy_host_zone.chain_id)?;
    Ok(legacy_host_zone.delegated_balance.checked_add(unsettled)?)
}

/// Every precondition of the migration, checked before anything is written.
///
/// Registration always creates one deposit record, so any record that already
/// exists for the chain means there would be more than one afterwards.
fn precheck(
    storage: &dyn Storage,
    migration: &CustodialMigration,
) -> Result<LegacyHostZone, ContractError> {
    let legacy_host_zone = load_legacy_host_zone(storage, &migration.chain_id)?;

    load_epoch_tracker(storage, STRIDE_EPOCH)?;
    load_epoch_tracker(storage, DAY_EPOCH)?;
    if latest_epoch_unbonding_record(storage)?.is_none() {
        return Err(ContractError::MissingEpochUnbondingRecord {});
    }

    let existing = deposit_records_for_host(storage, &migration.chain_id)?.len();
    if existing > 0 {
        return Err(ContractError::TooManyDepositRecords {
            chain_id: migration.chain_id.clone(),
            count: existing + 1,
        });
    }

    if legacy_host_zone.deposit_address.is_empty() {
        return Err(ContractError::missing_address(
            &legacy_host_zone.chain_id,
            "legacy deposit",
        ));
    }

    Ok(legacy_host_zone)
}

fn registration(legacy_host_zone: &LegacyHostZone, migration: &CustodialMigration) -> HostZoneRegistration {
    HostZoneRegistration {
        chain_id: migration.chain_id.clone(),
        connection_id: migration.connection_id.clone(),
        transfer_channel_id: legacy_host_zone.transfer_channel_id.clone(),
        bech32_prefix: migration.bech32_prefix.clone(),
        host_denom: legacy_host_zone.native_token_denom.clone(),
        ibc_denom: legacy_host_zone.native_token_ibc_denom.clone(),
        unbonding_period: migration.unbonding_period,
        min_redemption_rate: legacy_host_zone.min_redemption_rate,
        max_redemption_rate: legacy_host_zone.max_redemption_rate,
    }
}

/// Copies the exchange rate, bounds and stake over from the legacy zone.
/// Redemptions stay off until the zone is re-verified.
pub fn carry_over_host_zone(
    storage: &mut dyn Storage,
    legacy_host_zone: &LegacyHostZone,
    mut host_zone: HostZone,
) -> Result<HostZone, ContractError> {
    host_zone.redemption_rate = legacy_host_zone.redemption_rate;
    host_zone.min_redemption_rate = legacy_host_zone.min_redemption_rate;
    host_zone.max_redemption_rate = legacy_host_zone.max_redemption_rate;
    host_zone.total_delegations = total_delegations(storage, legacy_host_zone)?;
    host_zone.redemptions_enabled = false;

    set_host_zone(storage, &host_zone)?;
    Ok(host_zone)
}

/// Sweeps the legacy deposit and fee accounts into the general module and
/// books the swept deposits on the zone's single deposit record.
pub fn migrate_protocol_owned_accounts(
    storage: &mut dyn Storage,
    legacy_host_zone: &LegacyHostZone,
    host_zone: &HostZone,
) -> Result<(Coin, Coin), ContractError> {
    let mut records = deposit_records_for_host(storage, &host_zone.chain_id)?;
    if records.len() != 1 {
        return Err(ContractError::TooManyDepositRecords {
            chain_id: host_zone.chain_id.clone(),
            count: records.len(),
        });
    }
    let mut record = records.remove(0);

    let denom = &legacy_host_zone.native_token_ibc_denom;
    let deposit = bank::send_all(
        storage,
        &legacy_host_zone.deposit_address,
        &host_zone.deposit_address,
        denom,
    )?;
    let fees = bank::send_all(
        storage,
        &legacy::fee_address(),
        &bank::reward_collector_address(),
        denom,
    )?;

    record.amount = record.amount.checked_add(deposit.amount)?;
    set_deposit_record(storage, &record)?;

    Ok((deposit, fees))
}

pub fn initiate_migration(
    storage: &mut dyn Storage,
    migration: &CustodialMigration,
) -> Result<CustodialMigrationResult, ContractError> {
    let mut legacy_host_zone = precheck(storage, migration)?;

    let host_zone = register_host_zone(storage, registration(&legacy_host_zone, migration))?;
    let host_zone = carry_over_host_zone(storage, &legacy_host_zone, host_zone)?;
    let (deposit_transferred, fees_transferred) =
        migrate_protocol_owned_accounts(storage, &legacy_host_zone, &host_zone)?;

    // the legacy zone stays readable but no longer custodies anything
    legacy_host_zone.halted = true;
    set_legacy_host_zone(storage, &legacy_host_zone)?;

    Ok(CustodialMigrationResult {
        chain_id: host_zone.chain_id,
        total_delegations: host_zone.total_delegations,
        deposit_transferred,
        fees_transferred,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_zone::load_host_zone;
    use crate::host_zone::tests::seed_epochs;
    use crate::legacy::{set_delegation_record, DelegationRecord, DelegationRecordStatus};
    use crate::records::{append_deposit_record, DepositRecord, DepositRecordStatus};
    use cosmwasm_std::testing::MockStorage;
    use cosmwasm_std::Decimal;
    use std::str::FromStr;

    const CHAIN_ID: &str = "celestia";
    const IBC_DENOM: &str = "ibc/tia";

    fn migration() -> CustodialMigration {
        CustodialMigration {
            chain_id: CHAIN_ID.to_string(),
            connection_id: "connection-104".to_string(),
            bech32_prefix: "celestia".to_string(),
            unbonding_period: 21,
        }
    }

    fn legacy_zone() -> LegacyHostZone {
        LegacyHostZone {
            chain_id: CHAIN_ID.to_string(),
            native_token_denom: "utia".to_string(),
            native_token_ibc_denom: IBC_DENOM.to_string(),
            transfer_channel_id: "channel-162".to_string(),
            deposit_address: bank::module_address("legacy.celestia.deposit"),
            redemption_rate: Decimal::from_str("1.02").unwrap(),
            min_redemption_rate: Decimal::from_str("0.95").unwrap(),
            max_redemption_rate: Decimal::from_str("1.1").unwrap(),
            delegated_balance: Uint128::new(1_000),
            halted: false,
        }
    }

    fn coin(amount: u128) -> Coin {
        Coin {
            denom: IBC_DENOM.to_string(),
            amount: Uint128::new(amount),
        }
    }

    fn seed(storage: &mut MockStorage) -> LegacyHostZone {
        seed_epochs(storage, 5);
        let legacy_host_zone = legacy_zone();
        set_legacy_host_zone(storage, &legacy_host_zone).unwrap();

        for (id, status, amount) in [
            (1, DelegationRecordStatus::TransferInProgress, 100),
            (2, DelegationRecordStatus::DelegationQueue, 200),
            (3, DelegationRecordStatus::DelegationComplete, 5_000),
        ] {
            set_delegation_record(
                storage,
                &DelegationRecord {
                    id,
                    host_zone_id: CHAIN_ID.to_string(),
                    status,
                    native_amount: Uint128::new(amount),
                    tx_hash: String::new(),
                },
            )
            .unwrap();
        }

        bank::credit(storage, &legacy_host_zone.deposit_address, &coin(4_000)).unwrap();
        bank::credit(storage, &legacy::fee_address(), &coin(250)).unwrap();
        legacy_host_zone
    }

    fn balances(storage: &MockStorage, legacy_host_zone: &LegacyHostZone) -> [Uint128; 4] {
        [
            bank::balance(storage, &legacy_host_zone.deposit_address, IBC_DENOM).unwrap(),
            bank::balance(storage, &legacy::fee_address(), IBC_DENOM).unwrap(),
            bank::balance(storage, &bank::deposit_address(CHAIN_ID), IBC_DENOM).unwrap(),
            bank::balance(storage, &bank::reward_collector_address(), IBC_DENOM).unwrap(),
        ]
    }

    #[test]
    fn total_delegations_include_unsettled_records() {
        let mut storage = MockStorage::new();
        let legacy_host_zone = seed(&mut storage);
        assert_eq!(
            total_delegations(&storage, &legacy_host_zone).unwrap(),
            Uint128::new(1_300)
        );
    }

    #[test]
    fn migration_carries_over_zone_and_funds() {
        let mut storage = MockStorage::new();
        let legacy_host_zone = seed(&mut storage);
        let [legacy_deposit, legacy_fee, _, _] = balances(&storage, &legacy_host_zone);

        let result = initiate_migration(&mut storage, &migration()).unwrap();
        assert_eq!(result.total_delegations, Uint128::new(1_300));
        assert_eq!(result.deposit_transferred, coin(4_000));
        assert_eq!(result.fees_transferred, coin(250));

        let host_zone = load_host_zone(&storage, CHAIN_ID).unwrap();
        assert_eq!(host_zone.redemption_rate, Decimal::from_str("1.02").unwrap());
        assert_eq!(host_zone.min_redemption_rate, Decimal::from_str("0.95").unwrap());
        assert_eq!(host_zone.max_redemption_rate, Decimal::from_str("1.1").unwrap());
        assert_eq!(host_zone.transfer_channel_id, "channel-162");
        assert_eq!(host_zone.connection_id, "connection-104");
        assert_eq!(host_zone.host_denom, "utia");
        assert_eq!(host_zone.ibc_denom, IBC_DENOM);
        assert_eq!(host_zone.unbonding_period, 21);
        assert!(!host_zone.redemptions_enabled);

        let [old_deposit, old_fee, new_deposit, new_fee] = balances(&storage, &legacy_host_zone);
        assert!(old_deposit.is_zero());
        assert!(old_fee.is_zero());
        assert_eq!(legacy_deposit + legacy_fee, new_deposit + new_fee);

        let records = deposit_records_for_host(&storage, CHAIN_ID).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, Uint128::new(4_000));
        assert_eq!(records[0].status, DepositRecordStatus::TransferQueue);
        assert_eq!(records[0].deposit_epoch_number, 5);

        assert!(load_legacy_host_zone(&storage, CHAIN_ID).unwrap().halted);
    }

    #[test]
    fn migrating_twice_fails_and_leaves_first_result_intact() {
        let mut storage = MockStorage::new();
        let legacy_host_zone = seed(&mut storage);
        initiate_migration(&mut storage, &migration()).unwrap();

        // more funds show up in the legacy account after the first run
        bank::credit(&mut storage, &legacy_host_zone.deposit_address, &coin(10)).unwrap();
        let host_zone_after_first = load_host_zone(&storage, CHAIN_ID).unwrap();
        let balances_after_first = balances(&storage, &legacy_host_zone);

        let err = initiate_migration(&mut storage, &migration()).unwrap_err();
        assert_eq!(
            err,
            ContractError::TooManyDepositRecords {
                chain_id: CHAIN_ID.to_string(),
                count: 2,
            }
        );
        assert!(err.to_string().contains("there should only be one"));

        assert_eq!(load_host_zone(&storage, CHAIN_ID).unwrap(), host_zone_after_first);
        assert_eq!(balances(&storage, &legacy_host_zone), balances_after_first);
        assert_eq!(deposit_records_for_host(&storage, CHAIN_ID).unwrap().len(), 1);
    }

    #[test]
    fn pre_existing_deposit_records_block_the_transfer() {
        let mut storage = MockStorage::new();
        let legacy_host_zone = seed(&mut storage);
        for amount in [1, 2] {
            append_deposit_record(
                &mut storage,
                DepositRecord {
                    id: 0,
                    amount: Uint128::new(amount),
                    denom: IBC_DENOM.to_string(),
                    host_zone_id: CHAIN_ID.to_string(),
                    status: DepositRecordStatus::TransferQueue,
                    deposit_epoch_number: 5,
                    delegation_txs_in_progress: 0,
                },
            )
            .unwrap();
        }
        let before = balances(&storage, &legacy_host_zone);

        let err = initiate_migration(&mut storage, &migration()).unwrap_err();
        assert!(err.to_string().contains("should only be one"));
        assert_eq!(balances(&storage, &legacy_host_zone), before);
        assert_eq!(crate::host_zone::get_host_zone(&storage, CHAIN_ID).unwrap(), None);
    }

    #[test]
    fn missing_preconditions_abort() {
        let mut storage = MockStorage::new();
        let err = initiate_migration(&mut storage, &migration()).unwrap_err();
        assert_eq!(
            err,
            ContractError::LegacyHostZoneNotFound {
                chain_id: CHAIN_ID.to_string()
            }
        );

        set_legacy_host_zone(&mut storage, &legacy_zone()).unwrap();
        let err = initiate_migration(&mut storage, &migration()).unwrap_err();
        assert_eq!(
            err,
            ContractError::MissingEpochTracker {
                epoch_identifier: STRIDE_EPOCH.to_string()
            }
        );
    }
}
