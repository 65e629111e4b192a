#![doc(test(attr(deny(warnings))))]

//! Bank Core manages named accounts with floating point balances, persisted
//! write-through to a JSON file, plus the console menu that drives them.

pub mod cli;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!(
            toolchain = %utils::build_info::current().toolchain(),
            "Bank Core tracing initialized."
        );
    });
}
