//! rentpay - rent collection through the Paystack hosted checkout
//!
//! Verifies Paystack webhooks, talks to the Paystack transaction API and
//! reconciles verified transactions into payment records and the rent ledger.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod models;
pub mod payments;
