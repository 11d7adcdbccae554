//! Mathematical utilities: technosphere solve and logistic interpolation.

pub mod logistic;
pub mod solve;

pub use logistic::*;
pub use solve::*;
