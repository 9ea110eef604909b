//! Core modules for nestview.
//!
//! Storage, configuration, the host contract and shared helpers live here.
//! The local-view behavior itself lives in `plugins`.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod host;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
pub mod tui;
