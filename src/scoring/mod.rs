//! Impact scoring: the scorer interface, evaluation results and the
//! comprehensive (multi-method) score used by the scenario engine.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::{Activity, ActivityTarget, Exchange, ExchangeKind, FunctionalUnit, ImpactMethod, NodeKey, ScoreResult};
use crate::error::LcaError;
use crate::graph::GraphStore;

pub mod matrix;
pub mod methods;

pub use matrix::MatrixScorer;
pub use methods::MethodPreset;

/// Turns a functional unit into a characterized result under one impact method.
pub trait Scorer {
    fn evaluate<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        unit: &FunctionalUnit,
        method: &ImpactMethod,
    ) -> Result<Evaluation, LcaError>;
}

/// One cell of the characterized inventory: an elementary flow emitted by a process.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryContribution {
    pub flow: NodeKey,
    pub process: NodeKey,
    pub impact: f64,
}

/// A solved and characterized graph evaluation.
///
/// The characterized inventory is a `flows x processes` matrix whose cell
/// `(i, j)` is `factor_i * B[i, j] * supply_j`; its sum is the total score.
#[derive(Debug, Clone)]
pub struct Evaluation {
    score: f64,
    processes: Vec<NodeKey>,
    process_index: HashMap<NodeKey, usize>,
    supply: DVector<f64>,
    flows: Vec<NodeKey>,
    flow_index: HashMap<NodeKey, usize>,
    factors: Vec<f64>,
    characterized: DMatrix<f64>,
}

impl Evaluation {
    /// Build an evaluation from a solved supply vector and the biosphere matrix
    /// (`flows x processes`, uncharacterized, per unit of process output).
    pub fn new(
        processes: Vec<NodeKey>,
        supply: DVector<f64>,
        flows: Vec<NodeKey>,
        factors: Vec<f64>,
        biosphere: &DMatrix<f64>,
    ) -> Self {
        let mut characterized = DMatrix::zeros(flows.len(), processes.len());
        for i in 0..flows.len() {
            for j in 0..processes.len() {
                characterized[(i, j)] = factors[i] * biosphere[(i, j)] * supply[j];
            }
        }
        let score = characterized.sum();

        Self {
            score,
            process_index: index_of(&processes),
            processes,
            supply,
            flow_index: index_of(&flows),
            flows,
            factors,
            characterized,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Supply of `process` needed to satisfy the functional unit.
    pub fn supply(&self, process: &NodeKey) -> Option<f64> {
        self.process_index.get(process).map(|&j| self.supply[j])
    }

    pub fn characterization_factor(&self, flow: &NodeKey) -> Option<f64> {
        self.flow_index.get(flow).map(|&i| self.factors[i])
    }

    /// Characterized total of `flow` across the whole supply chain.
    pub fn flow_score(&self, flow: &NodeKey) -> Option<f64> {
        self.flow_index
            .get(flow)
            .map(|&i| self.characterized.row(i).sum())
    }

    /// Characterized amount of `flow` emitted directly by `process`.
    pub fn direct_flow_score(&self, flow: &NodeKey, process: &NodeKey) -> Option<f64> {
        let i = *self.flow_index.get(flow)?;
        let j = *self.process_index.get(process)?;
        Some(self.characterized[(i, j)])
    }

    /// Characterized impact of a single biosphere exchange of a process in
    /// this solution: `factor * amount * supply(output)`.
    pub fn exchange_score(&self, exchange: &Exchange) -> Option<f64> {
        if exchange.kind != ExchangeKind::Biosphere {
            return None;
        }
        let factor = self.characterization_factor(&exchange.input)?;
        let supply = self.supply(&exchange.output)?;
        Some(factor * exchange.amount * supply)
    }

    /// The `n` largest characterized inventory cells by absolute value.
    pub fn top_contributors(&self, n: usize) -> Vec<InventoryContribution> {
        let mut cells = Vec::new();
        for i in 0..self.flows.len() {
            for j in 0..self.processes.len() {
                let impact = self.characterized[(i, j)];
                if impact != 0.0 {
                    cells.push(InventoryContribution {
                        flow: self.flows[i].clone(),
                        process: self.processes[j].clone(),
                        impact,
                    });
                }
            }
        }
        cells.sort_by(|a, b| {
            b.impact
                .abs()
                .partial_cmp(&a.impact.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cells.truncate(n);
        cells
    }
}

fn index_of(keys: &[NodeKey]) -> HashMap<NodeKey, usize> {
    keys.iter().enumerate().map(|(i, k)| (k.clone(), i)).collect()
}

/// Score `{activity: 1}` under every method.
///
/// Any method failing fails the whole call; callers decide whether to skip.
pub fn run_comprehensive<S, C>(
    store: &S,
    scorer: &C,
    activity: &Activity,
    methods: &[ImpactMethod],
) -> Result<ScoreResult, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let unit = FunctionalUnit::single(activity.key.clone(), 1.0);
    let mut results = ScoreResult::default();
    for method in methods {
        let evaluation = scorer.evaluate(store, &unit, method)?;
        tracing::debug!(activity = %activity.name, %method, score = evaluation.score(), "scored");
        results.insert(method.clone(), evaluation.score());
    }
    Ok(results)
}

/// Comprehensive scores for several activities of one database, labelled
/// `"name (location)"`. Unresolved or unscorable activities are skipped.
pub fn run_comparative<S, C>(
    store: &S,
    scorer: &C,
    database: &str,
    targets: &[ActivityTarget],
    methods: &[ImpactMethod],
) -> Vec<(String, ScoreResult)>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let mut out = Vec::with_capacity(targets.len());
    for target in targets {
        let Some(activity) = store
            .find_by_name_product_location(
                database,
                &target.name,
                target.reference_product.as_deref(),
                target.location.as_deref(),
            )
            .found()
        else {
            tracing::warn!(database, activity = %target.label(), "activity not found; skipping");
            continue;
        };

        match run_comprehensive(store, scorer, &activity, methods) {
            Ok(scores) => out.push((target.label(), scores)),
            Err(e) => tracing::warn!(database, activity = %target.label(), error = %e, "scoring failed; skipping"),
        }
    }
    out
}
