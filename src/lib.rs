//! LoopFund Notify - real-time notification client
//!
//! This crate keeps a user's notification feed in sync with the LoopFund
//! backend: an initial REST load, push delivery over a WebSocket with
//! reconnect, and server-confirmed read-state changes, reconciled into one
//! id-keyed store with a derived unread count.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
