//! Concurrent rate-controlled dispatch engine for the txbench load harness.
//!
//! The engine paces work generation against a target rate, fans transactional
//! workers out as independent tasks, consumes their completion signals until
//! a wall-clock deadline, and renders the aggregate run summary.

mod runner;
mod worker;

pub use runner::LoadRunner;
pub use worker::TransactionWorker;
