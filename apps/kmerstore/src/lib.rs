//! # kmerstore
//!
//! Library half of the kmerstore binary: command-line parsing, command
//! implementations and configuration loading. Split out so integration
//! tests can drive commands without spawning a process.

pub mod cli;
pub mod config;
