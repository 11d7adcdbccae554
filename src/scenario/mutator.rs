//! Scaling an activity's biosphere exchanges and scoring the result.
//!
//! Permanent mode writes every scaled amount back and leaves it there.
//! Temporary mode snapshots all biosphere amounts of the activity first and
//! restores them on every exit path, including early returns and panics
//! while scoring.

use crate::domain::{
    Activity, Exchange, ExchangeKind, ImpactMethod, ModifyMode, NodeKey, ScalingCoefficientSet, ScoreResult,
};
use crate::error::LcaError;
use crate::graph::GraphStore;
use crate::scoring::{run_comprehensive, Scorer};

/// Apply `coefficients` to `activity` in the given mode and return the
/// comprehensive score of the modified activity.
///
/// An empty coefficient set scores the activity as is.
pub fn modify_activity<S, C>(
    mode: ModifyMode,
    store: &mut S,
    scorer: &C,
    activity: &Activity,
    coefficients: &ScalingCoefficientSet,
    methods: &[ImpactMethod],
) -> Result<ScoreResult, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    if coefficients.is_empty() {
        return run_comprehensive(&*store, scorer, activity, methods);
    }
    match mode {
        ModifyMode::Permanent => modify_permanently(store, scorer, activity, coefficients, methods),
        ModifyMode::Temporary => modify_temporarily(store, scorer, activity, coefficients, methods),
    }
}

/// Scale and persist matching biosphere exchanges one at a time, then score.
///
/// A failing write stops the sequence; exchanges already written stay scaled.
pub fn modify_permanently<S, C>(
    store: &mut S,
    scorer: &C,
    activity: &Activity,
    coefficients: &ScalingCoefficientSet,
    methods: &[ImpactMethod],
) -> Result<ScoreResult, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let exchanges = store.exchanges_of(&activity.key)?;
    let mut modified = 0usize;
    for exchange in exchanges.iter().filter(|e| e.kind == ExchangeKind::Biosphere) {
        if let Some(scaled) = scaled_exchange(exchange, coefficients) {
            store.persist(&scaled)?;
            modified += 1;
        }
    }
    tracing::info!(activity = %activity.name, modified, "biosphere exchanges permanently scaled");

    run_comprehensive(&*store, scorer, activity, methods)
}

/// Scale matching biosphere exchanges, score, and restore the original amounts.
///
/// A scoring failure is returned only after the amounts are restored. If the
/// restore itself fails, the restore error wins and the scoring error is logged.
pub fn modify_temporarily<S, C>(
    store: &mut S,
    scorer: &C,
    activity: &Activity,
    coefficients: &ScalingCoefficientSet,
    methods: &[ImpactMethod],
) -> Result<ScoreResult, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let mut guard = Rollback::acquire(store, &activity.key)?;
    let modified = guard.apply(coefficients)?;
    tracing::debug!(activity = %activity.name, modified, "biosphere exchanges temporarily scaled");

    let scored = run_comprehensive(guard.store(), scorer, activity, methods);
    let restored = guard.release();

    match (scored, restored) {
        (scored, Ok(())) => scored,
        (scored, Err(restore_err)) => {
            if let Err(e) = scored {
                tracing::error!(activity = %activity.name, error = %e, "scoring failed before restore failure");
            }
            Err(restore_err)
        }
    }
}

/// A copy of `exchange` with its amount multiplied, when a finite coefficient
/// exists for its name.
fn scaled_exchange(exchange: &Exchange, coefficients: &ScalingCoefficientSet) -> Option<Exchange> {
    let factor = coefficients.get(&exchange.name)?;
    if !factor.is_finite() {
        tracing::warn!(exchange = %exchange.name, factor, "non-finite scaling coefficient; exchange left unchanged");
        return None;
    }
    let mut scaled = exchange.clone();
    scaled.amount *= factor;
    tracing::debug!(
        exchange = %exchange.name,
        from = exchange.amount,
        to = scaled.amount,
        factor,
        "scaling exchange"
    );
    Some(scaled)
}

/// Restores snapshotted biosphere amounts when released or dropped.
struct Rollback<'a, S: GraphStore + ?Sized> {
    store: &'a mut S,
    snapshot: Vec<Exchange>,
    released: bool,
}

impl<'a, S: GraphStore + ?Sized> Rollback<'a, S> {
    /// Snapshot every biosphere exchange of `key`.
    fn acquire(store: &'a mut S, key: &NodeKey) -> Result<Self, LcaError> {
        let snapshot = store
            .exchanges_of(key)?
            .into_iter()
            .filter(|e| e.kind == ExchangeKind::Biosphere)
            .collect();
        Ok(Self {
            store,
            snapshot,
            released: false,
        })
    }

    fn apply(&mut self, coefficients: &ScalingCoefficientSet) -> Result<usize, LcaError> {
        let mut modified = 0;
        for exchange in &self.snapshot {
            if let Some(scaled) = scaled_exchange(exchange, coefficients) {
                self.store.persist(&scaled)?;
                modified += 1;
            }
        }
        Ok(modified)
    }

    fn store(&self) -> &S {
        &*self.store
    }

    /// Write back every snapshotted amount; keeps going past failures and
    /// reports the first.
    fn restore(&mut self) -> Result<(), LcaError> {
        self.released = true;
        let mut first_err = None;
        for exchange in &self.snapshot {
            if let Err(e) = self.store.persist(exchange) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn release(mut self) -> Result<(), LcaError> {
        self.restore()
    }
}

impl<S: GraphStore + ?Sized> Drop for Rollback<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.restore() {
            tracing::error!(error = %e, "failed to restore biosphere exchanges");
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::graph::fixtures::{gwp, steel_graph, steel_scorer, steel_store, wdp, FailingScorer, STEEL_GWP};
    use crate::graph::MemoryStore;

    const CO2: &str = "Carbon dioxide, fossil";
    const CH4: &str = "Methane, fossil";

    fn steel(store: &MemoryStore) -> Activity {
        store.find_by_id("ei", "steel").found().unwrap()
    }

    fn amounts(store: &MemoryStore) -> Vec<f64> {
        store
            .exchanges_of(&NodeKey::new("ei", "steel"))
            .unwrap()
            .iter()
            .map(|e| e.amount)
            .collect()
    }

    #[test]
    fn permanent_scaling_persists() {
        let mut graph = steel_graph();
        graph.databases[1].nodes[0].exchanges[2].amount = 5.0;
        let mut store = MemoryStore::from_databases(&graph.databases).unwrap();
        let scorer = steel_scorer();
        let activity = steel(&store);
        let set: ScalingCoefficientSet = [(CO2, 2.0)].into_iter().collect();

        let scores = modify_activity(ModifyMode::Permanent, &mut store, &scorer, &activity, &set, &[gwp()]).unwrap();

        assert_eq!(amounts(&store)[2], 10.0);
        assert!((scores.get(&gwp()).unwrap() - (10.0 + 2.8 + 4.42)).abs() < 1e-9);
    }

    #[test]
    fn temporary_scaling_scores_modified_graph_then_restores() {
        let mut store = steel_store();
        let scorer = steel_scorer();
        let activity = steel(&store);
        let before = amounts(&store);
        let set: ScalingCoefficientSet = [(CO2, 0.0), (CH4, 2.0)].into_iter().collect();

        let scores =
            modify_activity(ModifyMode::Temporary, &mut store, &scorer, &activity, &set, &[gwp(), wdp()]).unwrap();

        assert!((scores.get(&gwp()).unwrap() - (5.6 + 4.42)).abs() < 1e-9);
        assert!((scores.get(&wdp()).unwrap() - 1.8).abs() < 1e-9);
        assert_eq!(amounts(&store), before);
    }

    #[test]
    fn temporary_round_trip_holds_for_random_coefficients() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut store = steel_store();
        let scorer = steel_scorer();
        let activity = steel(&store);
        let before = amounts(&store);
        let names = [CO2, CH4, "Water, river", "Sulfur dioxide"];

        for _ in 0..50 {
            let mut set = ScalingCoefficientSet::new();
            for name in names {
                if rng.gen_bool(0.6) {
                    set.insert(name, rng.gen_range(0.0..3.0));
                }
            }

            let scores =
                modify_activity(ModifyMode::Temporary, &mut store, &scorer, &activity, &set, &[gwp()]).unwrap();
            let expected = 1.5 * set.get(CO2).unwrap_or(1.0) + 2.8 * set.get(CH4).unwrap_or(1.0) + 4.42;
            assert!((scores.get(&gwp()).unwrap() - expected).abs() < 1e-9);
            assert_eq!(amounts(&store), before);
        }
    }

    #[test]
    fn temporary_scaling_restores_when_scoring_fails() {
        let mut store = steel_store();
        let scorer = FailingScorer {
            inner: steel_scorer(),
            root: None,
        };
        let activity = steel(&store);
        let before = amounts(&store);
        let set: ScalingCoefficientSet = [(CO2, 3.0)].into_iter().collect();

        let err = modify_activity(ModifyMode::Temporary, &mut store, &scorer, &activity, &set, &[gwp()]).unwrap_err();

        assert!(matches!(err, LcaError::Oracle(_)));
        assert_eq!(amounts(&store), before);
    }

    #[test]
    fn dropped_guard_restores_amounts() {
        let mut store = steel_store();
        let before = amounts(&store);
        let set: ScalingCoefficientSet = [(CO2, 4.0)].into_iter().collect();
        {
            let mut guard = Rollback::acquire(&mut store, &NodeKey::new("ei", "steel")).unwrap();
            assert_eq!(guard.apply(&set).unwrap(), 1);
            let scaled = guard.store().exchanges_of(&NodeKey::new("ei", "steel")).unwrap()[2].amount;
            assert_eq!(scaled, 6.0);
        }
        assert_eq!(amounts(&store), before);
    }

    #[test]
    fn unmatched_and_non_finite_coefficients_change_nothing() {
        let mut store = steel_store();
        let scorer = steel_scorer();
        let activity = steel(&store);
        let before = amounts(&store);
        let set: ScalingCoefficientSet = [("Unobtainium", 2.0), (CO2, f64::NAN)].into_iter().collect();

        let scores = modify_activity(ModifyMode::Permanent, &mut store, &scorer, &activity, &set, &[gwp()]).unwrap();

        assert!((scores.get(&gwp()).unwrap() - STEEL_GWP).abs() < 1e-9);
        assert_eq!(amounts(&store), before);
    }

    #[test]
    fn empty_set_scores_unmodified_activity() {
        let mut store = steel_store();
        let scorer = steel_scorer();
        let activity = steel(&store);

        let scores = modify_activity(
            ModifyMode::Temporary,
            &mut store,
            &scorer,
            &activity,
            &ScalingCoefficientSet::new(),
            &[gwp()],
        )
        .unwrap();
        assert!((scores.get(&gwp()).unwrap() - STEEL_GWP).abs() < 1e-9);
    }
}
