#![doc(test(attr(deny(warnings))))]

//! Mess Ledger settles the monthly books of a shared housing unit: shared
//! costs, cash payments, grocery purchases and meal counts are turned into
//! per-member balances, and reconciled months can be locked against edits.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

pub use crate::core::services::{
    MonthLockService, RecordService, ServiceError, ServiceResult, SettlementInputs,
    SettlementOptions, SettlementService,
};
pub use domain::{MemberSettlement, SettlementReport};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Mess Ledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
