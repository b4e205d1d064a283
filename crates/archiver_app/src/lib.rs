//! Site list configuration and command line of the `archiver` binary.
pub mod cli;
pub mod config;
