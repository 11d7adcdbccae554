//! Activity graph store interface.
//!
//! Every call receives the database it targets explicitly; a store never
//! carries a "current" database or project selection.

use crate::domain::{Activity, Exchange, NodeKey};
use crate::error::LcaError;

pub mod memory;

#[cfg(test)]
pub(crate) mod fixtures;

pub use memory::MemoryStore;

/// Result of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// Read/write access to a production graph.
pub trait GraphStore {
    fn has_database(&self, database: &str) -> bool;

    /// Search `database` for an activity by name, then narrow by reference
    /// product and location when given. Returns the first remaining match.
    fn find_by_name_product_location(
        &self,
        database: &str,
        name: &str,
        reference_product: Option<&str>,
        location: Option<&str>,
    ) -> Lookup<Activity>;

    fn find_by_id(&self, database: &str, code: &str) -> Lookup<Activity>;

    fn get(&self, key: &NodeKey) -> Lookup<Activity>;

    /// All exchanges whose output is `key`, in stored order.
    fn exchanges_of(&self, key: &NodeKey) -> Result<Vec<Exchange>, LcaError>;

    /// Write `exchange.amount` back to the stored exchange with the same id.
    fn persist(&mut self, exchange: &Exchange) -> Result<(), LcaError>;
}
