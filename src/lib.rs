//! # RandomX Solo Miner
//!
//! A standalone proof-of-work miner for Zcash-derivative chains whose
//! block PoW is a single RandomX hash over the 140-byte block header.
//! The miner polls a node for work over JSON-RPC, searches the 256-bit
//! nonce space across worker threads, and submits winning blocks,
//! handling RandomX epoch transitions, node disconnects and runtime
//! thread-count changes along the way.
//!
//! ## Layout
//!
//! - [`core`] — header codec, compact targets, nonces, block serialization
//! - [`randomx`] — cache/dataset/VM lifecycle behind a [`randomx::VmPool`]
//! - [`numa`] — topology discovery and worker placement
//! - [`miner`] — the worker-thread engine
//! - [`rpc`] — the JSON-RPC 1.0 node client

#![warn(rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod core;
pub mod error;
pub mod miner;
pub mod numa;
pub mod randomx;
pub mod rpc;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{BlockTemplate, Hash256, Nonce256, Target};
pub use crate::error::{Error, Result};
pub use crate::miner::{Miner, Solution};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
