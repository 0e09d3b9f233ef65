// ============================================
// liquid_staking_ledger/src/migrations/backfill.rs
// Schema backfill for fields added by the batched accounting upgrade

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Storage;

use crate::error::ContractError;
use crate::host_zone::{all_host_zones, set_host_zone, HostZone};
use crate::records::{
    all_deposit_records, all_epoch_unbonding_records, set_deposit_record,
    set_epoch_unbonding_record, DepositRecord, DepositRecordStatus, EpochUnbondingRecord,
    HostZoneUnbonding,
};

#[cw_serde]
#[derive(Default)]
pub struct BackfillSummary {
    pub host_zones: u64,
    pub deposit_records: u64,
    pub host_zone_unbondings: u64,
}

pub fn migrate_host_zone(mut host_zone: HostZone) -> HostZone {
    host_zone.redemptions_enabled = true;
    host_zone
}

pub fn migrate_deposit_record(mut record: DepositRecord) -> DepositRecord {
    record.delegation_txs_in_progress = match record.status {
        DepositRecordStatus::DelegationInProgress => 1,
        DepositRecordStatus::TransferQueue
        | DepositRecordStatus::TransferInProgress
        | DepositRecordStatus::DelegationQueue => 0,
    };
    record
}

pub fn migrate_host_zone_unbonding(mut hzu: HostZoneUnbonding) -> HostZoneUnbonding {
    hzu.derive_accounting_fields();
    hzu
}

pub fn migrate_epoch_unbonding_record(record: EpochUnbondingRecord) -> EpochUnbondingRecord {
    EpochUnbondingRecord {
        epoch_number: record.epoch_number,
        host_zone_unbondings: record
            .host_zone_unbondings
            .into_iter()
            .map(migrate_host_zone_unbonding)
            .collect(),
    }
}

/// Derives the new host zone, deposit record and unbonding fields from the
/// existing ones. Every record is decoded before the first write, so a record
/// that cannot be read aborts the backfill with nothing changed.
pub fn backfill(storage: &mut dyn Storage) -> Result<BackfillSummary, ContractError> {
    let host_zones = all_host_zones(storage)?;
    let deposit_records = all_deposit_records(storage)?;
    let epoch_unbonding_records = all_epoch_unbonding_records(storage)?;

    let mut summary = BackfillSummary::default();

    for host_zone in host_zones {
        set_host_zone(storage, &migrate_host_zone(host_zone))?;
        summary.host_zones += 1;
    }
    for record in deposit_records {
        set_deposit_record(storage, &migrate_deposit_record(record))?;
        summary.deposit_records += 1;
    }
    for record in epoch_unbonding_records {
        let record = migrate_epoch_unbonding_record(record);
        summary.host_zone_unbondings += record.host_zone_unbondings.len() as u64;
        set_epoch_unbonding_record(storage, &record)?;
    }

    Ok(summary)
}
