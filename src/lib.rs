#![doc(test(attr(deny(warnings))))]

//! Cashbook Core offers ledger, cashbook, and payment-reminder primitives
//! for small-business bookkeeping, centered on a running-balance engine
//! that stays consistent under arbitrary-order entry mutation.

pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod storage;
pub mod utils;

pub use errors::{LedgerError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Cashbook Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
