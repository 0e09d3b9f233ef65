// ============================================
// liquid_staking_ledger/examples/schema.rs
// Schema generation

use cosmwasm_schema::write_api;
use liquid_staking_ledger::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg, SudoMsg};

fn main() {
    write_api! {
        instantiate: InstantiateMsg,
        execute: ExecuteMsg,
        query: QueryMsg,
        migrate: MigrateMsg,
        sudo: SudoMsg,
    }
}
