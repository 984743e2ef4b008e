//! Core business logic for Satang.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and calculations live
//! here.
//!
//! # Modules
//!
//! - `currency` - Decimal money handling and the base/foreign movement split
//! - `ledger` - Append-only ledger entries and the transaction planning engine
//! - `period` - Business-period derivation and the mutation gate
//! - `eod` - End-of-day settlement pipeline as a typed state machine
//! - `amlo` - AMLO reservation lifecycle, report numbering, and form filling
//! - `receipt` - Deterministic receipt rendering over a canvas abstraction
//! - `storage` - Receipt/report file tree with atomic writes

pub mod amlo;
pub mod currency;
pub mod eod;
pub mod ledger;
pub mod period;
pub mod receipt;
pub mod storage;
