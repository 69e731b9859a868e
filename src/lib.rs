//! Fileserve - password-gated file shares with in-browser video delivery
//!
//! This library crate exposes the server and batch workflows for the binary
//! and for integration testing.

pub mod auth;
pub mod config;
pub mod delivery;
pub mod resolve;
pub mod server;
pub mod webify;
