//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - graph identities and records (`NodeKey`, `Activity`, `Exchange`)
//! - scoring inputs and outputs (`ImpactMethod`, `FunctionalUnit`, `ScoreResult`)
//! - scenario inputs and outputs (`ScalingCoefficientSet`, `ScenarioRun`, `ContributionRecord`)

pub mod types;

pub use types::*;
