//! Scenario engine: coefficient tables, exchange scaling, and batch runs
//! across scenario databases.

pub mod batch;
pub mod coefficients;
pub mod mutator;

pub use batch::{modify_activity_across_databases, percent_change, run_batch, scenario_db_name, BatchConfig};
pub use coefficients::{Anchors, CoefficientRow, CoefficientTable, Selection};
pub use mutator::{modify_activity, modify_permanently, modify_temporarily};
