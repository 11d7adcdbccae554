//! `lca-scenarios` library crate.
//!
//! The binary (`lcs`) is a thin wrapper around this library so that:
//!
//! - scoring and scenario logic is testable without spawning processes
//! - the graph store and scorer seams can be swapped for a real backend
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod contribution;
pub mod data;
pub mod domain;
pub mod error;
pub mod graph;
pub mod io;
pub mod math;
pub mod report;
pub mod scenario;
pub mod scoring;
pub mod synthesis;
