//! Synthetic scenario project generation for demos and smoke runs.
//!
//! The generated project has:
//! - one shared biosphere database
//! - one scenario database per year, all with the same process codes so the
//!   tracked activity can be resolved by id in the first database
//! - a GWP-like and a water method
//! - a coefficient table for the tracked activity with only the first and
//!   last years filled, so interpolation has something to do
//!
//! Supply chains are acyclic (process `i` only buys from processes `< i`) and
//! emissions decline linearly with the scenario year.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;

use crate::domain::{ActivityTarget, ExchangeKind, NodeKey, NodeKind};
use crate::error::AppError;
use crate::io::graph::{DatabaseFile, ExchangeFile, FactorFile, GraphFile, MethodFile, NodeFile};
use crate::scenario::{scenario_db_name, CoefficientRow, CoefficientTable};

const BIOSPHERE_DB: &str = "biosphere3";
pub const TRACKED_CODE: &str = "tracked";

/// Elementary flows: (code, name, unit, compartments, GWP factor).
const FLOWS: [(&str, &str, &str, &[&str], f64); 5] = [
    ("co2", "Carbon dioxide, fossil", "kilogram", &["air", "non-urban air or from high stacks"], 1.0),
    ("ch4", "Methane, fossil", "kilogram", &["air"], 28.0),
    ("n2o", "Dinitrogen monoxide", "kilogram", &["air"], 265.0),
    ("so2", "Sulfur dioxide", "kilogram", &["air", "urban air close to ground"], 0.0),
    ("water", "Water, river", "cubic meter", &["natural resource", "in water"], 0.0),
];

/// Emission reduction per year after the first scenario year.
const ANNUAL_DECLINE: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub seed: u64,
    /// Supplier processes besides the tracked activity.
    pub processes: usize,
    pub years: Vec<i32>,
    pub model: String,
    pub pathway: String,
    pub suffix: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            processes: 12,
            years: vec![2025, 2030, 2035, 2040],
            model: "remind".to_string(),
            pathway: "SSP2-Base".to_string(),
            suffix: "demo".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoProject {
    pub graph: GraphFile,
    pub databases: Vec<String>,
    pub years: Vec<i32>,
    pub tracked: ActivityTarget,
    pub coefficients: CoefficientTable,
}

pub fn generate_demo(config: &DemoConfig) -> Result<DemoProject, AppError> {
    if config.processes == 0 {
        return Err(AppError::new(2, "Demo needs at least one supplier process."));
    }
    if config.years.len() < 2 || config.years.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AppError::new(2, "Demo years must be at least two strictly increasing years."));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let amounts = LogNormal::new(-1.0, 0.8).map_err(|e| AppError::new(4, format!("Amount distribution error: {e}")))?;

    let template = supply_chain(&mut rng, &amounts, config.processes);
    let first_year = config.years[0];

    let mut databases = Vec::with_capacity(config.years.len());
    let mut graph = GraphFile {
        databases: vec![biosphere()],
        methods: methods(),
    };

    for &year in &config.years {
        let name = scenario_db_name(&config.model, &config.pathway, year, &config.suffix);
        let decline = (1.0 - ANNUAL_DECLINE * f64::from(year - first_year)).max(0.1);
        graph.databases.push(DatabaseFile {
            name: name.clone(),
            nodes: template.iter().map(|node| retarget(node, &name, decline)).collect(),
        });
        databases.push(name);
    }

    let tracked_node = &template[template.len() - 1];
    let tracked = ActivityTarget::new(
        tracked_node.name.clone(),
        tracked_node.reference_product.clone(),
        tracked_node.location.clone(),
    );
    let coefficients = coefficient_table(&mut rng, &tracked, first_year, config.years[config.years.len() - 1]);

    tracing::debug!(
        databases = databases.len(),
        processes = config.processes + 1,
        "demo project generated"
    );

    Ok(DemoProject {
        graph,
        databases,
        years: config.years.clone(),
        tracked,
        coefficients,
    })
}

fn sample_seed(config: &DemoConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.processes.hash(&mut hasher);
    config.years.hash(&mut hasher);
    hasher.finish()
}

fn biosphere() -> DatabaseFile {
    DatabaseFile {
        name: BIOSPHERE_DB.to_string(),
        nodes: FLOWS
            .iter()
            .map(|&(code, name, unit, categories, _)| NodeFile {
                code: code.to_string(),
                name: name.to_string(),
                kind: NodeKind::Biosphere,
                reference_product: None,
                location: None,
                unit: unit.to_string(),
                categories: categories.iter().map(|c| c.to_string()).collect(),
                exchanges: vec![],
            })
            .collect(),
    }
}

fn methods() -> Vec<MethodFile> {
    let factor = |code: &str, factor: f64| FactorFile {
        flow: NodeKey::new(BIOSPHERE_DB, code),
        factor,
    };
    vec![
        MethodFile {
            name: vec!["IPCC 2013".into(), "climate change".into(), "GWP 100a".into()],
            unit: Some("kg CO2-Eq".into()),
            factors: FLOWS
                .iter()
                .filter(|f| f.4 != 0.0)
                .map(|f| factor(f.0, f.4))
                .collect(),
        },
        MethodFile {
            name: vec!["ReCiPe Midpoint (H)".into(), "water depletion".into(), "WDP".into()],
            unit: Some("m3".into()),
            factors: vec![factor("water", 1.0)],
        },
    ]
}

/// Supplier processes `p000..` followed by the tracked activity, with
/// technosphere inputs keyed to a placeholder database.
fn supply_chain(rng: &mut StdRng, amounts: &LogNormal<f64>, n: usize) -> Vec<NodeFile> {
    const PRODUCTS: [&str; 6] = ["electricity", "heat", "natural gas", "steel", "cement", "transport"];
    const LOCATIONS: [&str; 4] = ["GLO", "RER", "CN", "US"];

    let mut nodes: Vec<NodeFile> = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let tracked = i == n;
        let code = if tracked { TRACKED_CODE.to_string() } else { format!("p{i:03}") };
        let product = if tracked {
            "hydrogen, gaseous".to_string()
        } else {
            PRODUCTS[i % PRODUCTS.len()].to_string()
        };
        let name = if tracked {
            "hydrogen production, steam methane reforming".to_string()
        } else {
            format!("{product} production, variant {i}")
        };

        let mut exchanges = vec![ExchangeFile {
            input: NodeKey::new("", &code),
            amount: 1.0,
            kind: ExchangeKind::Production,
        }];

        // the tracked activity always buys from the last few suppliers
        let n_inputs = if tracked { n.min(3) } else { rng.gen_range(0..=i.min(3)) };
        let mut suppliers: Vec<usize> = (0..i).collect();
        suppliers.shuffle(rng);
        if tracked {
            suppliers = (n.saturating_sub(3)..n).collect();
        }
        for &j in suppliers.iter().take(n_inputs) {
            exchanges.push(ExchangeFile {
                input: NodeKey::new("", nodes[j].code.clone()),
                amount: amounts.sample(rng),
                kind: ExchangeKind::Technosphere,
            });
        }

        for &(flow, ..) in &FLOWS {
            if tracked || rng.gen_bool(0.6) {
                exchanges.push(ExchangeFile {
                    input: NodeKey::new(BIOSPHERE_DB, flow),
                    amount: amounts.sample(rng),
                    kind: ExchangeKind::Biosphere,
                });
            }
        }

        nodes.push(NodeFile {
            code,
            name,
            kind: NodeKind::Process,
            reference_product: Some(product),
            location: Some(LOCATIONS[i % LOCATIONS.len()].to_string()),
            unit: "kilogram".to_string(),
            categories: vec![],
            exchanges,
        });
    }
    nodes
}

/// Point placeholder technosphere keys at `database` and scale emissions.
fn retarget(node: &NodeFile, database: &str, decline: f64) -> NodeFile {
    let mut node = node.clone();
    for e in &mut node.exchanges {
        match e.kind {
            ExchangeKind::Biosphere => e.amount *= decline,
            ExchangeKind::Production | ExchangeKind::Technosphere => e.input.database = database.to_string(),
        }
    }
    node
}

/// Flag the greenhouse gases for scaling, fill only the anchor years.
fn coefficient_table(rng: &mut StdRng, tracked: &ActivityTarget, first: i32, last: i32) -> CoefficientTable {
    let mut table = CoefficientTable::new(TRACKED_CODE);
    for &(code, name, ..) in &FLOWS {
        let modify = matches!(code, "co2" | "ch4" | "n2o");
        let mut row = CoefficientRow::new(name, modify)
            .with(first, rng.gen_range(0.85..1.0))
            .with(last, rng.gen_range(0.3..0.7));
        row.activity_name = Some(tracked.name.clone());
        row.activity_location = tracked.location.clone();
        table.push(row);
    }
    table
}
