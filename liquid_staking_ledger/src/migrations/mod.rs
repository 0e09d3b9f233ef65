// ============================================
// liquid_staking_ledger/src/migrations/mod.rs
// One-shot state migrations run by the upgrade handler

pub mod backfill;
pub mod bounds;
pub mod custodial;

pub use backfill::{backfill, BackfillSummary};
pub use bounds::{reestimate_queued_unbondings, reset_redemption_rate_bounds, RedemptionRateSnapshot};
pub use custodial::{initiate_migration, CustodialMigration, CustodialMigrationResult};
