//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the store, the scorer and the scenario engine
//! - exported to JSON/CSV
//! - reloaded later for synthesis across runs

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Identity of a node (process or elementary flow) inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub database: String,
    pub code: String,
}

impl NodeKey {
    pub fn new(database: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.database, self.code)
    }
}

/// Whether a node is a modeled process or an elementary flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Process,
    Biosphere,
}

/// Edge kind of an exchange.
///
/// Production exchanges carry the reference output of a process and never
/// count as a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Production,
    Technosphere,
    Biosphere,
}

impl ExchangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ExchangeKind::Production => "production",
            ExchangeKind::Technosphere => "technosphere",
            ExchangeKind::Biosphere => "biosphere",
        }
    }
}

/// A node of the production graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub name: String,
    pub reference_product: Option<String>,
    pub location: Option<String>,
    pub unit: String,
    /// Open-ended classification (compartments for elementary flows).
    pub categories: Vec<String>,
}

/// Store-assigned exchange identity, stable for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

/// A directed edge `input -> output` with the input node's descriptive fields
/// resolved for convenience.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub id: ExchangeId,
    pub kind: ExchangeKind,
    pub input: NodeKey,
    pub output: NodeKey,
    pub amount: f64,
    pub name: String,
    pub unit: String,
    pub location: Option<String>,
    pub categories: Vec<String>,
}

/// A multi-part impact method identifier, e.g.
/// `("ReCiPe Midpoint (H)", "climate change", "GWP100")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImpactMethod(Vec<String>);

impl ImpactMethod {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ImpactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" | "))
    }
}

impl FromStr for ImpactMethod {
    type Err = String;

    /// Parse `"a|b|c"` (whitespace around separators is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<String> = s
            .split('|')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(format!("Invalid impact method '{s}': expected `a|b|c`."));
        }
        Ok(Self(parts))
    }
}

/// Root demand of a graph evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalUnit {
    pub demands: Vec<(NodeKey, f64)>,
}

impl FunctionalUnit {
    pub fn single(key: NodeKey, amount: f64) -> Self {
        Self {
            demands: vec![(key, amount)],
        }
    }
}

/// Scores per impact method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreResult {
    scores: HashMap<ImpactMethod, f64>,
}

impl ScoreResult {
    pub fn insert(&mut self, method: ImpactMethod, score: f64) {
        self.scores.insert(method, score);
    }

    pub fn get(&self, method: &ImpactMethod) -> Option<f64> {
        self.scores.get(method).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Exchange name -> multiplier for one activity and one scenario year.
///
/// Matching against exchange names is exact; keys that match nothing are no-ops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalingCoefficientSet {
    factors: BTreeMap<String, f64>,
}

impl ScalingCoefficientSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exchange_name: impl Into<String>, factor: f64) {
        self.factors.insert(exchange_name.into(), factor);
    }

    pub fn get(&self, exchange_name: &str) -> Option<f64> {
        self.factors.get(exchange_name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ScalingCoefficientSet {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, factor) in iter {
            set.insert(name, factor);
        }
        set
    }
}

/// Whether scenario mutations are written back durably or rolled back after scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModifyMode {
    Permanent,
    Temporary,
}

/// Lookup triple for an activity inside a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTarget {
    pub name: String,
    pub reference_product: Option<String>,
    pub location: Option<String>,
}

impl ActivityTarget {
    pub fn new(name: impl Into<String>, reference_product: Option<String>, location: Option<String>) -> Self {
        Self {
            name: name.into(),
            reference_product,
            location,
        }
    }

    pub fn label(&self) -> String {
        match &self.location {
            Some(loc) => format!("{} ({loc})", self.name),
            None => self.name.clone(),
        }
    }
}

impl From<&Activity> for ActivityTarget {
    fn from(activity: &Activity) -> Self {
        Self {
            name: activity.name.clone(),
            reference_product: activity.reference_product.clone(),
            location: activity.location.clone(),
        }
    }
}

/// Share of an activity's total score attributed to one direct exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionRecord {
    /// Key of the exchange's input node (supplier process or elementary flow).
    pub exchange_id: NodeKey,
    pub exchange_name: String,
    pub exchange_unit: String,
    pub exchange_location: Option<String>,
    pub kind: ExchangeKind,
    /// Compartment path for biosphere flows; empty for technosphere inputs.
    pub compartment: Vec<String>,
    pub impact: f64,
    pub percentage: f64,
}

/// Reference output of an activity, used by the contribution table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSummary {
    pub amount: f64,
    pub unit: String,
    pub location: Option<String>,
}

/// Contribution breakdown of one activity under one method.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionReport {
    pub activity: Activity,
    pub method: ImpactMethod,
    /// Score of `{activity: 1}` under `method`.
    pub total_score: f64,
    /// Impact-descending, ties in original exchange order.
    pub records: Vec<ContributionRecord>,
    pub production: Option<ProductionSummary>,
}

/// One before/after comparison for a (database, year, activity, method).
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    pub database: String,
    pub year: i32,
    pub activity: String,
    pub location: Option<String>,
    pub method: ImpactMethod,
    pub score_before: f64,
    pub score_after: f64,
    pub difference: f64,
    /// `+inf` when the baseline is exactly zero and the modified score is not.
    pub percent_change: f64,
    pub activity_id: String,
}
