//! Library crate for net-diag-rs: port reachability scanner and the HTTP service around it.
pub mod commands;
pub mod config;
pub mod error;
pub mod lookup;
pub mod ports;
pub mod scanner;
pub mod server;
pub mod types;
