//! Scripts for deploying, verifying and governing the exchange proxy contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod client;
mod commands;
pub mod config;
pub mod constants;
pub mod deployer;
pub mod errors;
pub mod governance;
pub mod queue;
mod solidity;
pub mod verifier;
