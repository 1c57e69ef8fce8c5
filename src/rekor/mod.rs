// src/rekor/mod.rs
pub mod client;
pub mod types;

pub use client::{LogClient, RekorClient};
pub use types::{LogInfo, SignedTreeHeadWire};
