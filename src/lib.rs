//! Set-associative cache simulator.
//!
//! Replays a trace of reads and writes against a single cache of the given
//! capacity, associativity and block size under LRU or random replacement,
//! and counts hits and misses per access kind.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod replace;
pub mod sim;
pub mod stats;
pub mod trace;
