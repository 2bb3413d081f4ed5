//! Keeper and client core for the AgriRisk prediction markets: contract
//! access, a cached market view, automatic resolution of expired markets and
//! a wallet session.

pub mod access;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod events;
pub mod logging;
pub mod network;
pub mod service;
pub mod state;
pub mod strategy;
pub mod wallet;
