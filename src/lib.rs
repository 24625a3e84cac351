//! vodframes - backfill missing stream screenshots from archived broadcasts
//!
//! This crate provides:
//! - A resolver from wall-clock time to the HLS segment that recorded it
//! - A drift-correcting recovery loop that reads the on-stream clock with OCR
//! - CLI commands for recovery, single-segment clips and archive lookups

pub mod artifacts;
pub mod clock;
pub mod commands;
pub mod config;
pub mod drift;
pub mod error;
pub mod frames;
pub mod http;
pub mod playlist;
pub mod progress;
pub mod recovery;
pub mod segment;
pub mod store;
pub mod timestamp;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};
