//! Shared setup for the sluice binaries

pub mod common;
