//! File I/O: graph JSON, coefficient CSV ingest, and CSV exports.

pub mod export;
pub mod graph;
pub mod ingest;
