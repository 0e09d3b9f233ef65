// ============================================
// liquid_staking_ledger/src/lib.rs
// Library root

pub mod bank;
pub mod batch;
pub mod contract;
pub mod epoch;
pub mod error;
pub mod host_zone;
pub mod legacy;
pub mod migrations;
pub mod msg;
pub mod records;
pub mod redemption_rate;
pub mod state;
pub mod transport;
pub mod upgrades;

pub use crate::error::ContractError;
