//! Poultry production ledger engine
//!
//! Storage, services and configuration around the pure calculations in the
//! `shared` crate. The `poultry-ledger` binary drives these from the command
//! line; tests and other front ends use them directly.

pub mod config;
pub mod error;
pub mod services;
pub mod storage;

pub use self::config::Config;
pub use error::{AppError, AppResult};
