// ============================================
// liquid_staking_ledger/src/transport.rs
// Outbound batches: IBC transfers and interchain account transactions

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    to_json_binary, Coin, CosmosMsg, Env, IbcMsg, IbcTimeout, StdResult, Storage, Uint128,
    WasmMsg,
};

use crate::error::ContractError;
use crate::host_zone::HostZone;
use crate::state::{Config, BATCH_SEQUENCES, PENDING_BATCHES};

#[cw_serde]
#[derive(Copy, Eq)]
pub enum BatchKind {
    Transfer,
    Delegation,
    Undelegation,
    ExitTransfer,
    CommunityPoolTransfer,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Transfer => "transfer",
            BatchKind::Delegation => "delegation",
            BatchKind::Undelegation => "undelegation",
            BatchKind::ExitTransfer => "exit_transfer",
            BatchKind::CommunityPoolTransfer => "community_pool_transfer",
        }
    }
}

/// One outbound call awaiting its completion callback
#[cw_serde]
pub struct PendingBatch {
    pub chain_id: String,
    pub sequence: u64,
    pub kind: BatchKind,
    /// Deposit record ids for deposit batches, epoch numbers for unbonding batches
    pub record_ids: Vec<u64>,
    pub amount: Uint128,
}

#[cw_serde]
pub enum IcaControllerMsg {
    SubmitTx {
        connection_id: String,
        sequence: u64,
        msgs: Vec<RemoteMsg>,
    },
}

/// Messages executed by our interchain accounts on the host
#[cw_serde]
pub enum RemoteMsg {
    Delegate {
        delegator_address: String,
        amount: Coin,
    },
    Undelegate {
        delegator_address: String,
        amount: Coin,
    },
    Send {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
}

pub struct Transport<'a> {
    config: &'a Config,
    env: &'a Env,
}

impl<'a> Transport<'a> {
    pub fn new(config: &'a Config, env: &'a Env) -> Self {
        Transport { config, env }
    }

    /// IBC transfer of queued deposits from the deposit account to the delegation ICA
    pub fn transfer_batch(
        &self,
        host_zone: &HostZone,
        amount: Uint128,
    ) -> Result<CosmosMsg, ContractError> {
        let kind = BatchKind::Transfer;
        require(host_zone, kind, &host_zone.transfer_channel_id, "transfer channel")?;
        require(host_zone, kind, &host_zone.delegation_ica_address, "delegation ICA")?;

        let timeout = self
            .env
            .block
            .time
            .plus_seconds(self.config.ibc_transfer_timeout_seconds);

        Ok(CosmosMsg::Ibc(IbcMsg::Transfer {
            channel_id: host_zone.transfer_channel_id.clone(),
            to_address: host_zone.delegation_ica_address.clone(),
            amount: Coin {
                denom: host_zone.ibc_denom.clone(),
                amount,
            },
            timeout: IbcTimeout::with_timestamp(timeout),
        }))
    }

    pub fn delegation_batch(
        &self,
        host_zone: &HostZone,
        sequence: u64,
        amount: Uint128,
    ) -> Result<CosmosMsg, ContractError> {
        let kind = BatchKind::Delegation;
        require(host_zone, kind, &host_zone.connection_id, "connection")?;
        require(host_zone, kind, &host_zone.delegation_ica_address, "delegation ICA")?;

        self.submit_tx(
            host_zone,
            sequence,
            vec![RemoteMsg::Delegate {
                delegator_address: host_zone.delegation_ica_address.clone(),
                amount: Coin {
                    denom: host_zone.host_denom.clone(),
                    amount,
                },
            }],
        )
    }

    pub fn undelegation_batch(
        &self,
        host_zone: &HostZone,
        sequence: u64,
        amount: Uint128,
    ) -> Result<CosmosMsg, ContractError> {
        let kind = BatchKind::Undelegation;
        require(host_zone, kind, &host_zone.connection_id, "connection")?;
        require(host_zone, kind, &host_zone.delegation_ica_address, "delegation ICA")?;

        self.submit_tx(
            host_zone,
            sequence,
            vec![RemoteMsg::Undelegate {
                delegator_address: host_zone.delegation_ica_address.clone(),
                amount: Coin {
                    denom: host_zone.host_denom.clone(),
                    amount,
                },
            }],
        )
    }

    /// Sweeps unbonded tokens from the delegation ICA to the redemption ICA
    pub fn exit_transfer_batch(
        &self,
        host_zone: &HostZone,
        sequence: u64,
        amount: Uint128,
    ) -> Result<CosmosMsg, ContractError> {
        let kind = BatchKind::ExitTransfer;
        require(host_zone, kind, &host_zone.connection_id, "connection")?;
        require(host_zone, kind, &host_zone.delegation_ica_address, "delegation ICA")?;
        require(host_zone, kind, &host_zone.redemption_ica_address, "redemption ICA")?;

        self.submit_tx(
            host_zone,
            sequence,
            vec![RemoteMsg::Send {
                from_address: host_zone.delegation_ica_address.clone(),
                to_address: host_zone.redemption_ica_address.clone(),
                amount: vec![Coin {
                    denom: host_zone.host_denom.clone(),
                    amount,
                }],
            }],
        )
    }

    /// Moves a coin from the community pool deposit ICA to the stake holding address
    pub fn community_pool_transfer(
        &self,
        host_zone: &HostZone,
        sequence: u64,
        coin: Coin,
    ) -> Result<CosmosMsg, ContractError> {
        if host_zone.community_pool_stake_holding_address.is_empty() {
            return Err(ContractError::missing_address(
                &host_zone.chain_id,
                "community pool stake holding",
            ));
        }
        if host_zone.community_pool_deposit_ica_address.is_empty() {
            return Err(ContractError::missing_address(
                &host_zone.chain_id,
                "community pool deposit ICA",
            ));
        }
        if host_zone.connection_id.is_empty() {
            return Err(ContractError::missing_address(&host_zone.chain_id, "connection"));
        }

        self.submit_tx(
            host_zone,
            sequence,
            vec![RemoteMsg::Send {
                from_address: host_zone.community_pool_deposit_ica_address.clone(),
                to_address: host_zone.community_pool_stake_holding_address.clone(),
                amount: vec![coin],
            }],
        )
    }

    fn submit_tx(
        &self,
        host_zone: &HostZone,
        sequence: u64,
        msgs: Vec<RemoteMsg>,
    ) -> Result<CosmosMsg, ContractError> {
        Ok(CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.config.ica_controller.to_string(),
            msg: to_json_binary(&IcaControllerMsg::SubmitTx {
                connection_id: host_zone.connection_id.clone(),
                sequence,
                msgs,
            })?,
            funds: vec![],
        }))
    }
}

fn require(
    host_zone: &HostZone,
    kind: BatchKind,
    value: &str,
    what: &str,
) -> Result<(), ContractError> {
    if value.is_empty() {
        return Err(ContractError::TransportFailure {
            chain_id: host_zone.chain_id.clone(),
            kind: kind.as_str().to_string(),
            reason: format!("missing {}", what),
        });
    }
    Ok(())
}

// ============ Sequences and pending batches ============

/// Next unused batch sequence for a zone. Nothing is reserved until a batch
/// with that sequence is saved.
pub fn peek_sequence(storage: &dyn Storage, chain_id: &str) -> StdResult<u64> {
    Ok(BATCH_SEQUENCES.may_load(storage, chain_id)?.unwrap_or(1))
}

pub fn save_pending_batch(storage: &mut dyn Storage, batch: &PendingBatch) -> StdResult<()> {
    let next = peek_sequence(storage, &batch.chain_id)?.max(batch.sequence + 1);
    BATCH_SEQUENCES.save(storage, &batch.chain_id, &next)?;
    PENDING_BATCHES.save(storage, (&batch.chain_id, batch.sequence), batch)
}

pub fn get_pending_batch(
    storage: &dyn Storage,
    chain_id: &str,
    sequence: u64,
) -> StdResult<Option<PendingBatch>> {
    PENDING_BATCHES.may_load(storage, (chain_id, sequence))
}

/// Removes and returns the batch a callback refers to
pub fn take_pending_batch(
    storage: &mut dyn Storage,
    chain_id: &str,
    sequence: u64,
) -> Result<PendingBatch, ContractError> {
    let batch = get_pending_batch(storage, chain_id, sequence)?.ok_or_else(|| {
        ContractError::PendingBatchNotFound {
            chain_id: chain_id.to_string(),
            sequence,
        }
    })?;
    PENDING_BATCHES.remove(storage, (chain_id, sequence));
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redemption_rate::RedemptionRateBoundsConfig;
    use cosmwasm_std::testing::{mock_env, MockStorage};
    use cosmwasm_std::{from_json, Addr, Decimal};

    fn config() -> Config {
        Config {
            owner: Addr::unchecked("owner"),
            operator: Addr::unchecked("operator"),
            ica_controller: Addr::unchecked("ica_controller"),
            ibc_transfer_timeout_seconds: 600,
            redemption_rate_bounds: RedemptionRateBoundsConfig {
                outer_min_adjustment: Decimal::percent(5),
                outer_max_adjustment: Decimal::percent(10),
                chain_buffers: vec![],
            },
        }
    }

    fn host_zone() -> HostZone {
        HostZone {
            chain_id: "GAIA".to_string(),
            connection_id: "connection-0".to_string(),
            transfer_channel_id: "channel-0".to_string(),
            bech32_prefix: "cosmos".to_string(),
            host_denom: "uatom".to_string(),
            ibc_denom: "ibc/atom".to_string(),
            deposit_address: "deposit".to_string(),
            delegation_ica_address: "cosmos1delegation".to_string(),
            fee_ica_address: String::new(),
            redemption_ica_address: String::new(),
            community_pool_deposit_ica_address: "cosmos1cpdeposit".to_string(),
            community_pool_stake_holding_address: "holding".to_string(),
            redemption_rate: Decimal::one(),
            min_redemption_rate: Decimal::percent(90),
            max_redemption_rate: Decimal::percent(150),
            total_delegations: Uint128::zero(),
            unbonding_period: 21,
            redemptions_enabled: true,
            halted: false,
        }
    }

    #[test]
    fn transfer_batch_targets_delegation_ica() {
        let config = config();
        let env = mock_env();
        let msg = Transport::new(&config, &env)
            .transfer_batch(&host_zone(), Uint128::new(5_000))
            .unwrap();

        match msg {
            CosmosMsg::Ibc(IbcMsg::Transfer { channel_id, to_address, amount, .. }) => {
                assert_eq!(channel_id, "channel-0");
                assert_eq!(to_address, "cosmos1delegation");
                assert_eq!(amount.amount, Uint128::new(5_000));
                assert_eq!(amount.denom, "ibc/atom");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn delegation_batch_goes_through_ica_controller() {
        let config = config();
        let env = mock_env();
        let msg = Transport::new(&config, &env)
            .delegation_batch(&host_zone(), 7, Uint128::new(300))
            .unwrap();

        let CosmosMsg::Wasm(WasmMsg::Execute { contract_addr, msg, .. }) = msg else {
            panic!("expected a wasm execute");
        };
        assert_eq!(contract_addr, "ica_controller");
        let submitted: IcaControllerMsg = from_json(&msg).unwrap();
        let IcaControllerMsg::SubmitTx { sequence, msgs, .. } = submitted;
        assert_eq!(sequence, 7);
        assert_eq!(
            msgs,
            vec![RemoteMsg::Delegate {
                delegator_address: "cosmos1delegation".to_string(),
                amount: Coin {
                    denom: "uatom".to_string(),
                    amount: Uint128::new(300),
                },
            }]
        );
    }

    #[test]
    fn misconfigured_zone_is_a_transport_failure() {
        let config = config();
        let env = mock_env();
        let transport = Transport::new(&config, &env);

        let mut zone = host_zone();
        zone.delegation_ica_address = String::new();
        let err = transport.transfer_batch(&zone, Uint128::new(1)).unwrap_err();
        assert!(err.is_transport_failure());
        assert!(err.to_string().contains("delegation ICA"));

        let err = transport.exit_transfer_batch(&host_zone(), 1, Uint128::new(1)).unwrap_err();
        assert!(err.to_string().contains("redemption ICA"));
    }

    #[test]
    fn community_pool_transfer_requires_holding_address() {
        let config = config();
        let env = mock_env();
        let transport = Transport::new(&config, &env);
        let coin = Coin {
            denom: "tokens".to_string(),
            amount: Uint128::new(1_000_000),
        };

        transport.community_pool_transfer(&host_zone(), 1, coin.clone()).unwrap();

        let mut zone = host_zone();
        zone.community_pool_stake_holding_address = String::new();
        let err = transport.community_pool_transfer(&zone, 1, coin.clone()).unwrap_err();
        assert!(err.to_string().contains("holding address"));

        let mut zone = host_zone();
        zone.community_pool_deposit_ica_address = String::new();
        let err = transport.community_pool_transfer(&zone, 1, coin).unwrap_err();
        assert!(err.to_string().contains("community pool deposit ICA"));
    }

    #[test]
    fn pending_batches_advance_the_sequence() {
        let mut storage = MockStorage::new();
        assert_eq!(peek_sequence(&storage, "GAIA").unwrap(), 1);

        let batch = PendingBatch {
            chain_id: "GAIA".to_string(),
            sequence: 1,
            kind: BatchKind::Transfer,
            record_ids: vec![4, 5],
            amount: Uint128::new(10),
        };
        save_pending_batch(&mut storage, &batch).unwrap();
        assert_eq!(peek_sequence(&storage, "GAIA").unwrap(), 2);
        assert_eq!(peek_sequence(&storage, "osmosis-1").unwrap(), 1);

        assert_eq!(take_pending_batch(&mut storage, "GAIA", 1).unwrap(), batch);
        let err = take_pending_batch(&mut storage, "GAIA", 1).unwrap_err();
        assert_eq!(
            err,
            ContractError::PendingBatchNotFound {
                chain_id: "GAIA".to_string(),
                sequence: 1
            }
        );
    }
}
