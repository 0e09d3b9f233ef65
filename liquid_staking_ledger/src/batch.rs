// ============================================
// liquid_staking_ledger/src/batch.rs
// Epoch batch processing and completion callbacks

use cosmwasm_std::{BankMsg, Coin, CosmosMsg, Env, Event, Response, Storage, Uint128};

use crate::bank;
use crate::epoch::{set_epoch_tracker, EpochTracker, DAY_EPOCH, STRIDE_EPOCH};
use crate::error::ContractError;
use crate::host_zone::{all_host_zones, load_host_zone, set_host_zone, HostZone};
use crate::records::{
    all_epoch_unbonding_records, append_deposit_record, deposit_records_with_status,
    get_epoch_unbonding_record, load_deposit_record, load_epoch_unbonding_record,
    remove_deposit_record, set_deposit_record, set_epoch_unbonding_record, DepositRecord,
    DepositRecordStatus, EpochUnbondingRecord, HostZoneUnbonding, HostZoneUnbondingStatus,
};
use crate::state::Config;
use crate::transport::{
    peek_sequence, save_pending_batch, take_pending_batch, BatchKind, PendingBatch, Transport,
};

const SECONDS_PER_DAY: u64 = 86_400;

/// Batches queued records into one outbound call per zone and kind.
///
/// A zone whose batch cannot be issued is skipped as a whole for this pass;
/// its records stay queued and the remaining zones proceed.
pub struct EpochBatchProcessor<'a> {
    transport: Transport<'a>,
    env: &'a Env,
}

struct PlannedBatch {
    batch: PendingBatch,
    msg: CosmosMsg,
}

/// Everything one zone will issue this pass, built before any write happens
struct ZonePlan {
    host_zone: HostZone,
    next_sequence: u64,
    batches: Vec<PlannedBatch>,
}

impl ZonePlan {
    fn new(storage: &dyn Storage, host_zone: &HostZone) -> Result<Self, ContractError> {
        Ok(ZonePlan {
            next_sequence: peek_sequence(storage, &host_zone.chain_id)?,
            host_zone: host_zone.clone(),
            batches: vec![],
        })
    }

    fn push(&mut self, kind: BatchKind, record_ids: Vec<u64>, amount: Uint128, msg: CosmosMsg) {
        self.batches.push(PlannedBatch {
            batch: PendingBatch {
                chain_id: self.host_zone.chain_id.clone(),
                sequence: self.next_sequence,
                kind,
                record_ids,
                amount,
            },
            msg,
        });
        self.next_sequence += 1;
    }

    fn commit(self, storage: &mut dyn Storage) -> Result<(Vec<CosmosMsg>, Vec<Event>), ContractError> {
        let mut msgs = vec![];
        let mut events = vec![];

        for PlannedBatch { batch, msg } in self.batches {
            match batch.kind {
                BatchKind::Transfer => {
                    bank::debit(
                        storage,
                        &self.host_zone.deposit_address,
                        &Coin {
                            denom: self.host_zone.ibc_denom.clone(),
                            amount: batch.amount,
                        },
                    )?;
                    for id in &batch.record_ids {
                        let mut record = load_deposit_record(storage, *id)?;
                        record.status = DepositRecordStatus::TransferInProgress;
                        set_deposit_record(storage, &record)?;
                    }
                }
                BatchKind::Delegation => {
                    for id in &batch.record_ids {
                        let mut record = load_deposit_record(storage, *id)?;
                        record.status = DepositRecordStatus::DelegationInProgress;
                        record.delegation_txs_in_progress += 1;
                        set_deposit_record(storage, &record)?;
                    }
                }
                BatchKind::Undelegation => {
                    update_unbondings(storage, &self.host_zone.chain_id, &batch.record_ids, |_, hzu| {
                        hzu.set_status(HostZoneUnbondingStatus::UnbondingInProgress);
                        Ok(())
                    })?;
                }
                BatchKind::ExitTransfer => {
                    update_unbondings(storage, &self.host_zone.chain_id, &batch.record_ids, |_, hzu| {
                        hzu.set_status(HostZoneUnbondingStatus::ExitTransferInProgress);
                        Ok(())
                    })?;
                }
                BatchKind::CommunityPoolTransfer => {}
            }

            save_pending_batch(storage, &batch)?;
            events.push(
                Event::new("batch_issued")
                    .add_attribute("chain_id", &batch.chain_id)
                    .add_attribute("kind", batch.kind.as_str())
                    .add_attribute("sequence", batch.sequence.to_string())
                    .add_attribute("records", batch.record_ids.len().to_string())
                    .add_attribute("amount", batch.amount),
            );
            msgs.push(msg);
        }

        Ok((msgs, events))
    }
}

impl<'a> EpochBatchProcessor<'a> {
    pub fn new(config: &'a Config, env: &'a Env) -> Self {
        EpochBatchProcessor {
            transport: Transport::new(config, env),
            env,
        }
    }

    pub fn begin_epoch(
        &self,
        storage: &mut dyn Storage,
        tracker: EpochTracker,
    ) -> Result<Response, ContractError> {
        set_epoch_tracker(storage, &tracker)?;

        let mut response = Response::new()
            .add_attribute("action", "begin_epoch")
            .add_attribute("epoch_identifier", &tracker.epoch_identifier)
            .add_attribute("epoch_number", tracker.epoch_number.to_string());

        let host_zones: Vec<HostZone> = all_host_zones(storage)?
            .into_iter()
            .filter(|host_zone| !host_zone.halted)
            .collect();

        let plan: fn(&Self, &dyn Storage, &HostZone) -> Result<ZonePlan, ContractError> =
            match tracker.epoch_identifier.as_str() {
                STRIDE_EPOCH => {
                    for host_zone in &host_zones {
                        remove_empty_deposit_records(storage, host_zone, tracker.epoch_number)?;
                        create_deposit_record(storage, host_zone, tracker.epoch_number)?;
                    }
                    Self::plan_deposit_batches
                }
                DAY_EPOCH => {
                    create_epoch_unbonding_record(storage, &host_zones, tracker.epoch_number)?;
                    Self::plan_unbonding_batches
                }
                _ => return Ok(response),
            };

        for host_zone in &host_zones {
            match plan(self, storage, host_zone) {
                Ok(zone_plan) => {
                    let (msgs, events) = zone_plan.commit(storage)?;
                    response = response.add_messages(msgs).add_events(events);
                }
                Err(err) if err.is_transport_failure() => {
                    response = response.add_event(
                        Event::new("zone_skipped")
                            .add_attribute("chain_id", &host_zone.chain_id)
                            .add_attribute("reason", err.to_string()),
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(response)
    }

    fn plan_deposit_batches(
        &self,
        storage: &dyn Storage,
        host_zone: &HostZone,
    ) -> Result<ZonePlan, ContractError> {
        let mut plan = ZonePlan::new(storage, host_zone)?;

        let transfers = funded(deposit_records_with_status(
            storage,
            &host_zone.chain_id,
            DepositRecordStatus::TransferQueue,
        )?);
        if !transfers.is_empty() {
            let amount = total_amount(&transfers)?;
            let msg = self.transport.transfer_batch(host_zone, amount)?;
            plan.push(BatchKind::Transfer, ids(&transfers), amount, msg);
        }

        let delegations = funded(deposit_records_with_status(
            storage,
            &host_zone.chain_id,
            DepositRecordStatus::DelegationQueue,
        )?);
        if !delegations.is_empty() {
            let amount = total_amount(&delegations)?;
            let msg = self
                .transport
                .delegation_batch(host_zone, plan.next_sequence, amount)?;
            plan.push(BatchKind::Delegation, ids(&delegations), amount, msg);
        }

        Ok(plan)
    }

    fn plan_unbonding_batches(
        &self,
        storage: &dyn Storage,
        host_zone: &HostZone,
    ) -> Result<ZonePlan, ContractError> {
        let mut plan = ZonePlan::new(storage, host_zone)?;
        let now = self.env.block.time.seconds();

        let mut undelegate_epochs = vec![];
        let mut undelegate_amount = Uint128::zero();
        let mut exit_epochs = vec![];
        let mut exit_amount = Uint128::zero();

        for record in all_epoch_unbonding_records(storage)? {
            let Some(hzu) = record.host_zone_unbonding(&host_zone.chain_id) else {
                continue;
            };
            match hzu.status {
                HostZoneUnbondingStatus::UnbondingQueue if !hzu.native_token_amount.is_zero() => {
                    undelegate_epochs.push(record.epoch_number);
                    undelegate_amount = undelegate_amount.checked_add(hzu.native_token_amount)?;
                }
                HostZoneUnbondingStatus::ExitTransferQueue if hzu.unbonding_time <= now => {
                    exit_epochs.push(record.epoch_number);
                    exit_amount = exit_amount.checked_add(hzu.native_token_amount)?;
                }
                _ => {}
            }
        }

        if !undelegate_epochs.is_empty() {
            let msg = self
                .transport
                .undelegation_batch(host_zone, plan.next_sequence, undelegate_amount)?;
            plan.push(BatchKind::Undelegation, undelegate_epochs, undelegate_amount, msg);
        }
        if !exit_epochs.is_empty() {
            let msg = self
                .transport
                .exit_transfer_batch(host_zone, plan.next_sequence, exit_amount)?;
            plan.push(BatchKind::ExitTransfer, exit_epochs, exit_amount, msg);
        }

        Ok(plan)
    }

    /// Fans the outcome of one batch back out to each record it carried
    pub fn handle_callback(
        &self,
        storage: &mut dyn Storage,
        chain_id: &str,
        sequence: u64,
        success: bool,
    ) -> Result<Response, ContractError> {
        let batch = take_pending_batch(storage, chain_id, sequence)?;
        let mut host_zone = load_host_zone(storage, chain_id)?;

        let mut response = Response::new()
            .add_attribute("action", "batch_callback")
            .add_attribute("chain_id", chain_id)
            .add_attribute("sequence", sequence.to_string())
            .add_attribute("kind", batch.kind.as_str())
            .add_attribute("success", success.to_string());

        match batch.kind {
            BatchKind::Transfer => {
                for id in &batch.record_ids {
                    let mut record = load_deposit_record(storage, *id)?;
                    expect_deposit_status(&record, DepositRecordStatus::TransferInProgress)?;
                    record.status = if success {
                        DepositRecordStatus::DelegationQueue
                    } else {
                        DepositRecordStatus::TransferQueue
                    };
                    set_deposit_record(storage, &record)?;
                }
                if !success {
                    // timed out transfers are refunded to the deposit account
                    bank::credit(
                        storage,
                        &host_zone.deposit_address,
                        &Coin {
                            denom: host_zone.ibc_denom.clone(),
                            amount: batch.amount,
                        },
                    )?;
                }
            }
            BatchKind::Delegation => {
                for id in &batch.record_ids {
                    let mut record = load_deposit_record(storage, *id)?;
                    expect_deposit_status(&record, DepositRecordStatus::DelegationInProgress)?;
                    record.delegation_txs_in_progress = record
                        .delegation_txs_in_progress
                        .checked_sub(1)
                        .ok_or_else(|| {
                            unexpected(
                                &record.host_zone_id,
                                record.id,
                                "no delegation in progress",
                                "delegation in progress",
                            )
                        })?;

                    if success && record.delegation_txs_in_progress == 0 {
                        remove_deposit_record(storage, record.id);
                        continue;
                    }
                    if !success {
                        record.status = DepositRecordStatus::DelegationQueue;
                    }
                    set_deposit_record(storage, &record)?;
                }
                if success {
                    host_zone.total_delegations = host_zone.total_delegations.checked_add(batch.amount)?;
                    set_host_zone(storage, &host_zone)?;
                }
            }
            BatchKind::Undelegation => {
                let unbonding_time = self.env.block.time.seconds()
                    + host_zone.unbonding_period * SECONDS_PER_DAY;
                let mut unbonded = Uint128::zero();
                let mut burned = Uint128::zero();

                update_unbondings(storage, chain_id, &batch.record_ids, |epoch_number, hzu| {
                    expect_unbonding_status(hzu, epoch_number, HostZoneUnbondingStatus::UnbondingInProgress)?;
                    if success {
                        unbonded = unbonded.checked_add(hzu.native_tokens_to_unbond)?;
                        burned = burned.checked_add(hzu.st_tokens_to_burn)?;
                        hzu.unbonding_time = unbonding_time;
                        hzu.set_status(HostZoneUnbondingStatus::ExitTransferQueue);
                    } else {
                        hzu.set_status(HostZoneUnbondingStatus::UnbondingQueue);
                    }
                    Ok(())
                })?;

                if success {
                    host_zone.total_delegations = host_zone.total_delegations.checked_sub(unbonded)?;
                    set_host_zone(storage, &host_zone)?;
                    if !burned.is_zero() {
                        response = response.add_message(BankMsg::Burn {
                            amount: vec![Coin {
                                denom: host_zone.st_denom(),
                                amount: burned,
                            }],
                        });
                    }
                }
            }
            BatchKind::ExitTransfer => {
                update_unbondings(storage, chain_id, &batch.record_ids, |epoch_number, hzu| {
                    expect_unbonding_status(hzu, epoch_number, HostZoneUnbondingStatus::ExitTransferInProgress)?;
                    hzu.set_status(if success {
                        HostZoneUnbondingStatus::Claimable
                    } else {
                        HostZoneUnbondingStatus::ExitTransferQueue
                    });
                    Ok(())
                })?;
            }
            // carries no records, the acknowledgement only clears the pending batch
            BatchKind::CommunityPoolTransfer => {}
        }

        Ok(response)
    }
}

fn create_deposit_record(
    storage: &mut dyn Storage,
    host_zone: &HostZone,
    epoch_number: u64,
) -> Result<DepositRecord, ContractError> {
    Ok(append_deposit_record(
        storage,
        DepositRecord {
            id: 0,
            amount: Uint128::zero(),
            denom: host_zone.ibc_denom.clone(),
            host_zone_id: host_zone.chain_id.clone(),
            status: DepositRecordStatus::TransferQueue,
            deposit_epoch_number: epoch_number,
            delegation_txs_in_progress: 0,
        },
    )?)
}

/// Drops queued records from earlier epochs that never received a deposit
fn remove_empty_deposit_records(
    storage: &mut dyn Storage,
    host_zone: &HostZone,
    epoch_number: u64,
) -> Result<(), ContractError> {
    for record in deposit_records_with_status(storage, &host_zone.chain_id, DepositRecordStatus::TransferQueue)? {
        if record.amount.is_zero() && record.deposit_epoch_number < epoch_number {
            remove_deposit_record(storage, record.id);
        }
    }
    Ok(())
}

fn create_epoch_unbonding_record(
    storage: &mut dyn Storage,
    host_zones: &[HostZone],
    epoch_number: u64,
) -> Result<(), ContractError> {
    if get_epoch_unbonding_record(storage, epoch_number)?.is_some() {
        return Ok(());
    }
    let record = EpochUnbondingRecord {
        epoch_number,
        host_zone_unbondings: host_zones
            .iter()
            .map(|host_zone| HostZoneUnbonding::new(&host_zone.chain_id, &host_zone.host_denom))
            .collect(),
    };
    set_epoch_unbonding_record(storage, &record)?;
    Ok(())
}

fn update_unbondings<F>(
    storage: &mut dyn Storage,
    chain_id: &str,
    epoch_numbers: &[u64],
    mut update: F,
) -> Result<(), ContractError>
where
    F: FnMut(u64, &mut HostZoneUnbonding) -> Result<(), ContractError>,
{
    for epoch_number in epoch_numbers {
        let mut record = load_epoch_unbonding_record(storage, *epoch_number)?;
        let hzu = record.host_zone_unbonding_mut(chain_id).ok_or_else(|| {
            ContractError::HostZoneUnbondingNotFound {
                chain_id: chain_id.to_string(),
                epoch_number: *epoch_number,
            }
        })?;
        update(*epoch_number, hzu)?;
        set_epoch_unbonding_record(storage, &record)?;
    }
    Ok(())
}

fn funded(records: Vec<DepositRecord>) -> Vec<DepositRecord> {
    records
        .into_iter()
        .filter(|record| !record.amount.is_zero())
        .collect()
}

fn ids(records: &[DepositRecord]) -> Vec<u64> {
    records.iter().map(|record| record.id).collect()
}

fn total_amount(records: &[DepositRecord]) -> Result<Uint128, ContractError> {
    records.iter().try_fold(Uint128::zero(), |total, record| {
        Ok::<_, ContractError>(total.checked_add(record.amount)?)
    })
}

fn unexpected(chain_id: &str, id: u64, actual: &str, expected: &str) -> ContractError {
    ContractError::UnexpectedRecordStatus {
        chain_id: chain_id.to_string(),
        id,
        actual: actual.to_string(),
        expected: expected.to_string(),
    }
}

fn expect_deposit_status(
    record: &DepositRecord,
    expected: DepositRecordStatus,
) -> Result<(), ContractError> {
    if record.status != expected {
        return Err(unexpected(
            &record.host_zone_id,
            record.id,
            record.status.as_str(),
            expected.as_str(),
        ));
    }
    Ok(())
}

fn expect_unbonding_status(
    hzu: &HostZoneUnbonding,
    epoch_number: u64,
    expected: HostZoneUnbondingStatus,
) -> Result<(), ContractError> {
    if hzu.status != expected {
        return Err(unexpected(
            &hzu.host_zone_id,
            epoch_number,
            hzu.status.as_str(),
            expected.as_str(),
        ));
    }
    Ok(())
}
