//! Shared networking infrastructure.

pub mod client;

pub use client::build_client;
