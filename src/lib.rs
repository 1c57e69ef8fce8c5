// src/lib.rs
// Library interface for sth-watch
pub mod archiver;
pub mod checker;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod monitor;
pub mod rekor;
pub mod storage;
pub mod types;
pub mod verify;

#[cfg(test)]
mod test_support;
