//! In-memory graph store backed by a graph JSON file.

use std::collections::HashMap;

use crate::domain::{Activity, Exchange, ExchangeId, ExchangeKind, NodeKey};
use crate::error::LcaError;
use crate::graph::{GraphStore, Lookup};
use crate::io::graph::{DatabaseFile, ExchangeFile, NodeFile};

#[derive(Debug, Clone)]
struct StoredExchange {
    id: ExchangeId,
    kind: ExchangeKind,
    input: NodeKey,
    amount: f64,
}

#[derive(Debug, Clone)]
struct StoredNode {
    activity: Activity,
    exchanges: Vec<StoredExchange>,
}

#[derive(Debug, Clone)]
struct StoredDatabase {
    name: String,
    nodes: Vec<StoredNode>,
    by_code: HashMap<String, usize>,
}

/// Location of an exchange inside the store: (database, node, exchange) indices.
type ExchangeSlot = (usize, usize, usize);

/// A whole project graph held in memory.
///
/// Databases keep their file order; exchanges keep their per-node order and get
/// store-wide ids at load time.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    databases: Vec<StoredDatabase>,
    by_name: HashMap<String, usize>,
    slots: HashMap<ExchangeId, ExchangeSlot>,
}

impl MemoryStore {
    /// Build a store from parsed database files.
    ///
    /// Fails on duplicate database names or node codes, non-finite amounts, and
    /// exchanges whose input node does not exist in any database.
    pub fn from_databases(files: &[DatabaseFile]) -> Result<Self, LcaError> {
        let mut store = MemoryStore::default();
        let mut next_id = 0u64;

        for db_file in files {
            if store.by_name.contains_key(&db_file.name) {
                return Err(LcaError::Precondition(format!(
                    "Duplicate database name '{}'.",
                    db_file.name
                )));
            }

            let db_idx = store.databases.len();
            let mut db = StoredDatabase {
                name: db_file.name.clone(),
                nodes: Vec::with_capacity(db_file.nodes.len()),
                by_code: HashMap::new(),
            };

            for node in &db_file.nodes {
                if db.by_code.contains_key(&node.code) {
                    return Err(LcaError::Precondition(format!(
                        "Duplicate node code '{}' in database '{}'.",
                        node.code, db_file.name
                    )));
                }

                let node_idx = db.nodes.len();
                let mut exchanges = Vec::with_capacity(node.exchanges.len());
                for exc in &node.exchanges {
                    if !exc.amount.is_finite() {
                        return Err(LcaError::NumericData(format!(
                            "Non-finite exchange amount on '{}' in '{}'.",
                            node.code, db_file.name
                        )));
                    }
                    let id = ExchangeId(next_id);
                    next_id += 1;
                    store.slots.insert(id, (db_idx, node_idx, exchanges.len()));
                    exchanges.push(StoredExchange {
                        id,
                        kind: exc.kind,
                        input: exc.input.clone(),
                        amount: exc.amount,
                    });
                }

                db.by_code.insert(node.code.clone(), node_idx);
                db.nodes.push(StoredNode {
                    activity: Activity {
                        key: NodeKey::new(&db_file.name, &node.code),
                        kind: node.kind,
                        name: node.name.clone(),
                        reference_product: node.reference_product.clone(),
                        location: node.location.clone(),
                        unit: node.unit.clone(),
                        categories: node.categories.clone(),
                    },
                    exchanges,
                });
            }

            store.by_name.insert(db.name.clone(), db_idx);
            store.databases.push(db);
        }

        store.ensure_inputs_resolve()?;
        Ok(store)
    }

    /// Export the current state (including persisted mutations) as database files.
    pub fn to_databases(&self) -> Vec<DatabaseFile> {
        self.databases
            .iter()
            .map(|db| DatabaseFile {
                name: db.name.clone(),
                nodes: db
                    .nodes
                    .iter()
                    .map(|node| NodeFile {
                        code: node.activity.key.code.clone(),
                        name: node.activity.name.clone(),
                        kind: node.activity.kind,
                        reference_product: node.activity.reference_product.clone(),
                        location: node.activity.location.clone(),
                        unit: node.activity.unit.clone(),
                        categories: node.activity.categories.clone(),
                        exchanges: node
                            .exchanges
                            .iter()
                            .map(|e| ExchangeFile {
                                input: e.input.clone(),
                                amount: e.amount,
                                kind: e.kind,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn database_names(&self) -> Vec<&str> {
        self.databases.iter().map(|db| db.name.as_str()).collect()
    }

    fn ensure_inputs_resolve(&self) -> Result<(), LcaError> {
        for db in &self.databases {
            for node in &db.nodes {
                for exc in &node.exchanges {
                    if self.node(&exc.input).is_none() {
                        return Err(LcaError::Lookup(format!(
                            "Exchange input {} of {} does not exist.",
                            exc.input, node.activity.key
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn node(&self, key: &NodeKey) -> Option<&StoredNode> {
        let db = &self.databases[*self.by_name.get(&key.database)?];
        db.by_code.get(&key.code).map(|&idx| &db.nodes[idx])
    }

    fn resolve_exchange(&self, output: &NodeKey, stored: &StoredExchange) -> Exchange {
        // Inputs are validated at load time, so a missing node only happens for
        // stores built by hand; fall back to the raw code.
        let (name, unit, location, categories) = match self.node(&stored.input) {
            Some(input) => (
                input.activity.name.clone(),
                input.activity.unit.clone(),
                input.activity.location.clone(),
                input.activity.categories.clone(),
            ),
            None => (stored.input.code.clone(), String::new(), None, Vec::new()),
        };

        Exchange {
            id: stored.id,
            kind: stored.kind,
            input: stored.input.clone(),
            output: output.clone(),
            amount: stored.amount,
            name,
            unit,
            location,
            categories,
        }
    }
}

impl GraphStore for MemoryStore {
    fn has_database(&self, database: &str) -> bool {
        self.by_name.contains_key(database)
    }

    fn find_by_name_product_location(
        &self,
        database: &str,
        name: &str,
        reference_product: Option<&str>,
        location: Option<&str>,
    ) -> Lookup<Activity> {
        let Some(&db_idx) = self.by_name.get(database) else {
            return Lookup::NotFound;
        };
        let db = &self.databases[db_idx];

        // Exact name matches rank ahead of partial (search-style) matches.
        let needle = name.to_lowercase();
        let exact = db.nodes.iter().filter(|n| n.activity.name == name);
        let partial = db
            .nodes
            .iter()
            .filter(|n| n.activity.name != name && n.activity.name.to_lowercase().contains(&needle));

        exact
            .chain(partial)
            .map(|n| &n.activity)
            .filter(|a| reference_product.is_none_or(|p| a.reference_product.as_deref() == Some(p)))
            .find(|a| location.is_none_or(|l| a.location.as_deref() == Some(l)))
            .cloned()
            .into()
    }

    fn find_by_id(&self, database: &str, code: &str) -> Lookup<Activity> {
        self.get(&NodeKey::new(database, code))
    }

    fn get(&self, key: &NodeKey) -> Lookup<Activity> {
        self.node(key).map(|n| n.activity.clone()).into()
    }

    fn exchanges_of(&self, key: &NodeKey) -> Result<Vec<Exchange>, LcaError> {
        let node = self
            .node(key)
            .ok_or_else(|| LcaError::Lookup(format!("Activity {key} not found.")))?;
        Ok(node
            .exchanges
            .iter()
            .map(|stored| self.resolve_exchange(key, stored))
            .collect())
    }

    fn persist(&mut self, exchange: &Exchange) -> Result<(), LcaError> {
        if !exchange.amount.is_finite() {
            return Err(LcaError::Store(format!(
                "Refusing to persist non-finite amount for exchange '{}'.",
                exchange.name
            )));
        }

        let &(db_idx, node_idx, exc_idx) = self
            .slots
            .get(&exchange.id)
            .ok_or_else(|| LcaError::Store(format!("Unknown exchange id {}.", exchange.id.0)))?;

        let stored = &mut self.databases[db_idx].nodes[node_idx].exchanges[exc_idx];
        stored.amount = exchange.amount;
        Ok(())
    }
}
