//! Matrix-based scorer over any `GraphStore`.
//!
//! For a functional unit the scorer:
//! 1. collects every process reachable through production/technosphere inputs
//! 2. builds the technosphere matrix `A` and biosphere matrix `B`
//! 3. solves `A s = f` for the supply vector `s`
//! 4. characterizes `B diag(s)` with the method's factors
//!
//! Processes without a production exchange produce one unit of output.

use std::collections::{HashMap, VecDeque};

use nalgebra::{DMatrix, DVector};

use crate::domain::{Exchange, ExchangeKind, FunctionalUnit, ImpactMethod, NodeKey, NodeKind};
use crate::error::LcaError;
use crate::graph::GraphStore;
use crate::io::graph::MethodFile;
use crate::math::solve_square;
use crate::scoring::{Evaluation, Scorer};

#[derive(Debug, Clone)]
struct MethodTable {
    unit: Option<String>,
    factors: HashMap<NodeKey, f64>,
}

/// Scorer holding characterization factors for a set of impact methods.
#[derive(Debug, Clone, Default)]
pub struct MatrixScorer {
    methods: HashMap<ImpactMethod, MethodTable>,
}

impl MatrixScorer {
    pub fn new(methods: &[MethodFile]) -> Result<Self, LcaError> {
        let mut tables = HashMap::with_capacity(methods.len());
        for file in methods {
            let method = ImpactMethod::new(file.name.iter().cloned());
            let mut factors = HashMap::with_capacity(file.factors.len());
            for cf in &file.factors {
                if !cf.factor.is_finite() {
                    return Err(LcaError::NumericData(format!(
                        "Non-finite characterization factor for {} in method '{method}'.",
                        cf.flow
                    )));
                }
                factors.insert(cf.flow.clone(), cf.factor);
            }
            tables.insert(
                method,
                MethodTable {
                    unit: file.unit.clone(),
                    factors,
                },
            );
        }
        Ok(Self { methods: tables })
    }

    pub fn has_method(&self, method: &ImpactMethod) -> bool {
        self.methods.contains_key(method)
    }

    /// Known methods in sorted order.
    pub fn methods(&self) -> Vec<&ImpactMethod> {
        let mut out: Vec<_> = self.methods.keys().collect();
        out.sort();
        out
    }

    pub fn method_unit(&self, method: &ImpactMethod) -> Option<&str> {
        self.methods.get(method).and_then(|t| t.unit.as_deref())
    }
}

/// Processes reachable from a functional unit, with their exchanges.
struct System {
    processes: Vec<NodeKey>,
    index: HashMap<NodeKey, usize>,
    exchanges: Vec<Vec<Exchange>>,
}

impl System {
    fn discover<S: GraphStore + ?Sized>(store: &S, unit: &FunctionalUnit) -> Result<Self, LcaError> {
        let mut system = System {
            processes: Vec::new(),
            index: HashMap::new(),
            exchanges: Vec::new(),
        };
        let mut queue = VecDeque::new();

        for (key, _) in &unit.demands {
            system.admit(store, key, &mut queue)?;
        }

        while let Some(j) = queue.pop_front() {
            let key = system.processes[j].clone();
            let exchanges = store
                .exchanges_of(&key)
                .map_err(|e| LcaError::Oracle(e.to_string()))?;
            for exc in &exchanges {
                if exc.kind != ExchangeKind::Biosphere {
                    system.admit(store, &exc.input, &mut queue)?;
                }
            }
            system.exchanges[j] = exchanges;
        }

        Ok(system)
    }

    fn admit<S: GraphStore + ?Sized>(
        &mut self,
        store: &S,
        key: &NodeKey,
        queue: &mut VecDeque<usize>,
    ) -> Result<(), LcaError> {
        if self.index.contains_key(key) {
            return Ok(());
        }
        let node = store
            .get(key)
            .found()
            .ok_or_else(|| LcaError::Oracle(format!("Process {key} not found in store.")))?;
        if node.kind != NodeKind::Process {
            return Err(LcaError::Oracle(format!(
                "Node {key} is an elementary flow, not a process."
            )));
        }
        let j = self.processes.len();
        self.index.insert(key.clone(), j);
        self.processes.push(key.clone());
        self.exchanges.push(Vec::new());
        queue.push_back(j);
        Ok(())
    }
}

impl Scorer for MatrixScorer {
    fn evaluate<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        unit: &FunctionalUnit,
        method: &ImpactMethod,
    ) -> Result<Evaluation, LcaError> {
        let table = self
            .methods
            .get(method)
            .ok_or_else(|| LcaError::Oracle(format!("Unknown impact method '{method}'.")))?;
        if unit.demands.is_empty() {
            return Err(LcaError::Oracle("Empty functional unit.".to_string()));
        }

        let system = System::discover(store, unit)?;
        let n = system.processes.len();

        let mut technosphere = DMatrix::<f64>::zeros(n, n);
        let mut flows: Vec<NodeKey> = Vec::new();
        let mut flow_index: HashMap<NodeKey, usize> = HashMap::new();
        let mut entries: Vec<(usize, usize, f64)> = Vec::new();

        for (j, exchanges) in system.exchanges.iter().enumerate() {
            let mut has_production = false;
            for exc in exchanges {
                match exc.kind {
                    ExchangeKind::Production => {
                        has_production = true;
                        technosphere[(system.index[&exc.input], j)] += exc.amount;
                    }
                    ExchangeKind::Technosphere => {
                        technosphere[(system.index[&exc.input], j)] -= exc.amount;
                    }
                    ExchangeKind::Biosphere => {
                        let i = *flow_index.entry(exc.input.clone()).or_insert_with(|| {
                            flows.push(exc.input.clone());
                            flows.len() - 1
                        });
                        entries.push((i, j, exc.amount));
                    }
                }
            }
            if !has_production {
                technosphere[(j, j)] += 1.0;
            }
        }

        let mut biosphere = DMatrix::<f64>::zeros(flows.len(), n);
        for (i, j, amount) in entries {
            biosphere[(i, j)] += amount;
        }

        let mut demand = DVector::<f64>::zeros(n);
        for (key, amount) in &unit.demands {
            demand[system.index[key]] += amount;
        }

        let supply = solve_square(&technosphere, &demand).ok_or_else(|| {
            LcaError::Oracle(format!(
                "Technosphere matrix is singular for functional unit rooted at {}.",
                unit.demands[0].0
            ))
        })?;

        let factors = flows
            .iter()
            .map(|f| table.factors.get(f).copied().unwrap_or(0.0))
            .collect();

        Ok(Evaluation::new(system.processes, supply, flows, factors, &biosphere))
    }
}
