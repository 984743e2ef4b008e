//! `SeaORM` entity definitions.

pub mod amlo_reports;
pub mod amlo_reservations;
pub mod audit_logs;
pub mod balances;
pub mod bot_provider_reports;
pub mod branch_balance_alerts;
pub mod branch_currencies;
pub mod branch_operating_statuses;
pub mod branches;
pub mod currencies;
pub mod eod_balance_snapshots;
pub mod eod_balance_verifications;
pub mod eod_session_locks;
pub mod eod_statuses;
pub mod ledger_entries;
pub mod operators;
pub mod rate_publishes;
pub mod rates;
pub mod sessions;
pub mod transaction_counters;
