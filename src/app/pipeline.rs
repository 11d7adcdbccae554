//! Shared workspace loading used by every subcommand.
//!
//! graph JSON -> validated store + scorer, plus method checks that turn an
//! unknown method into a usage error before any work starts.

use std::path::Path;

use crate::domain::{ImpactMethod, ModifyMode, ScenarioRun};
use crate::error::AppError;
use crate::graph::MemoryStore;
use crate::io::graph::{read_graph_json, write_graph_json, GraphFile, MethodFile};
use crate::scenario::{run_batch, BatchConfig, CoefficientTable};
use crate::scoring::MatrixScorer;

/// A loaded project: the store holds the databases, the scorer the methods.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub store: MemoryStore,
    pub scorer: MatrixScorer,
    methods: Vec<MethodFile>,
}

impl Workspace {
    pub fn from_graph(graph: &GraphFile) -> Result<Self, AppError> {
        let store = MemoryStore::from_databases(&graph.databases)?;
        let scorer = MatrixScorer::new(&graph.methods)?;
        tracing::info!(
            databases = store.database_names().len(),
            methods = graph.methods.len(),
            "workspace loaded"
        );
        Ok(Self {
            store,
            scorer,
            methods: graph.methods.clone(),
        })
    }

    /// Keep the requested methods the scorer knows; fail if none remain.
    ///
    /// With no methods requested every known method is used.
    pub fn usable_methods(&self, requested: Vec<ImpactMethod>) -> Result<Vec<ImpactMethod>, AppError> {
        if requested.is_empty() {
            return Ok(self.scorer.methods().into_iter().cloned().collect());
        }
        let (known, unknown): (Vec<_>, Vec<_>) = requested.into_iter().partition(|m| self.scorer.has_method(m));
        for m in &unknown {
            tracing::warn!(method = %m, "method not in graph; skipping");
        }
        if known.is_empty() {
            return Err(AppError::new(2, "None of the requested impact methods exist in the graph."));
        }
        Ok(known)
    }

    /// Write the current store (including permanent edits) back as graph JSON.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let graph = GraphFile {
            databases: self.store.to_databases(),
            methods: self.methods.clone(),
        };
        write_graph_json(path, &graph)?;
        tracing::info!(path = %path.display(), "graph saved");
        Ok(())
    }

    /// Run the batch. Permanent runs save to `save_to` even when no
    /// comparison rows came out.
    pub fn run_scenarios(
        &mut self,
        tables: &[CoefficientTable],
        config: &BatchConfig,
        save_to: &Path,
    ) -> Result<Vec<ScenarioRun>, AppError> {
        let runs = run_batch(&mut self.store, &self.scorer, tables, config)?;
        if config.mode == ModifyMode::Permanent {
            self.save(save_to)?;
        }
        Ok(runs)
    }
}

pub fn load_workspace(path: &Path) -> Result<Workspace, AppError> {
    let graph = read_graph_json(path)?;
    Workspace::from_graph(&graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeKey;
    use crate::graph::fixtures::{gwp, steel_graph};
    use crate::graph::GraphStore;
    use crate::scenario::CoefficientRow;

    #[test]
    fn unknown_methods_are_dropped_and_empty_selection_means_all() {
        let ws = Workspace::from_graph(&steel_graph()).unwrap();
        let methods = ws.usable_methods(vec![gwp(), ImpactMethod::new(["nope"])]).unwrap();
        assert_eq!(methods, vec![gwp()]);
        assert_eq!(ws.usable_methods(vec![]).unwrap().len(), 2);

        let err = ws.usable_methods(vec![ImpactMethod::new(["nope"])]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn permanent_run_without_rows_still_saves_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let mut ws = Workspace::from_graph(&steel_graph()).unwrap();

        let mut table = CoefficientTable::new("steel");
        table.push(CoefficientRow::new("Carbon dioxide, fossil", true).with(2025, 2.0));
        // no methods: every comparison row is dropped, the scaling is not
        let config = BatchConfig {
            databases: vec!["ei".into()],
            years: vec![2025],
            methods: vec![],
            mode: ModifyMode::Permanent,
            interpolation: None,
        };

        let runs = ws.run_scenarios(&[table], &config, &path).unwrap();
        assert!(runs.is_empty());

        let back = load_workspace(&path).unwrap();
        assert_eq!(back.store.exchanges_of(&NodeKey::new("ei", "steel")).unwrap()[2].amount, 3.0);
    }

    #[test]
    fn temporary_run_does_not_write_the_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let mut ws = Workspace::from_graph(&steel_graph()).unwrap();
        let config = BatchConfig {
            databases: vec!["ei".into()],
            years: vec![2025],
            methods: vec![gwp()],
            mode: ModifyMode::Temporary,
            interpolation: None,
        };

        let runs = ws.run_scenarios(&[CoefficientTable::new("steel")], &config, &path).unwrap();
        assert_eq!(runs.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn saved_workspace_reloads_with_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let mut ws = Workspace::from_graph(&steel_graph()).unwrap();

        let key = NodeKey::new("ei", "steel");
        let mut co2 = ws.store.exchanges_of(&key).unwrap().remove(2);
        co2.amount = 3.0;
        ws.store.persist(&co2).unwrap();
        ws.save(&path).unwrap();

        let back = load_workspace(&path).unwrap();
        assert_eq!(back.store.exchanges_of(&key).unwrap()[2].amount, 3.0);
        assert!(back.scorer.has_method(&gwp()));
    }
}
