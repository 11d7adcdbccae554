//! Small hand-checked graphs shared by unit tests.
//!
//! `steel` (ei, GLO):  production 1, 2.0 elec, 1.5 CO2, 0.1 CH4
//! `elec`  (ei, GLO):  production 1, 0.3 coal, 0.5 CO2
//! `coal`  (ei, GLO):  production 1, 0.2 CH4, 0.1 CO2, 3.0 water
//! `idle`  (ei, GLO):  production 1 only
//!
//! Under GWP (CO2 = 1, CH4 = 28):
//! coal = 5.7, elec = 0.5 + 0.3 * 5.7 = 2.21, steel = 1.5 + 2.8 + 2 * 2.21 = 8.72

use crate::domain::{ExchangeKind, ImpactMethod, NodeKey, NodeKind};
use crate::graph::MemoryStore;
use crate::io::graph::{DatabaseFile, ExchangeFile, FactorFile, GraphFile, MethodFile, NodeFile};
use crate::scoring::MatrixScorer;

pub(crate) const STEEL_GWP: f64 = 8.72;

pub(crate) fn gwp() -> ImpactMethod {
    ImpactMethod::new(["IPCC 2013", "climate change", "GWP 100a"])
}

pub(crate) fn wdp() -> ImpactMethod {
    ImpactMethod::new(["ReCiPe Midpoint (H)", "water depletion", "WDP"])
}

fn flow(code: &str, name: &str, unit: &str, categories: &[&str]) -> NodeFile {
    NodeFile {
        code: code.into(),
        name: name.into(),
        kind: NodeKind::Biosphere,
        reference_product: None,
        location: None,
        unit: unit.into(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        exchanges: vec![],
    }
}

fn process(code: &str, name: &str, product: &str, exchanges: Vec<ExchangeFile>) -> NodeFile {
    let mut all = vec![exc("ei", code, 1.0, ExchangeKind::Production)];
    all.extend(exchanges);
    NodeFile {
        code: code.into(),
        name: name.into(),
        kind: NodeKind::Process,
        reference_product: Some(product.into()),
        location: Some("GLO".into()),
        unit: "kilogram".into(),
        categories: vec![],
        exchanges: all,
    }
}

fn exc(database: &str, code: &str, amount: f64, kind: ExchangeKind) -> ExchangeFile {
    ExchangeFile {
        input: NodeKey::new(database, code),
        amount,
        kind,
    }
}

pub(crate) fn steel_graph() -> GraphFile {
    use ExchangeKind::{Biosphere, Technosphere};

    let biosphere = DatabaseFile {
        name: "biosphere".into(),
        nodes: vec![
            flow("co2", "Carbon dioxide, fossil", "kilogram", &["air"]),
            flow("ch4", "Methane, fossil", "kilogram", &["air", "urban air"]),
            flow("water", "Water, river", "cubic meter", &["natural resource", "in water"]),
        ],
    };

    let ei = DatabaseFile {
        name: "ei".into(),
        nodes: vec![
            process(
                "steel",
                "steel production",
                "steel",
                vec![
                    exc("ei", "elec", 2.0, Technosphere),
                    exc("biosphere", "co2", 1.5, Biosphere),
                    exc("biosphere", "ch4", 0.1, Biosphere),
                ],
            ),
            process(
                "elec",
                "electricity production, medium voltage",
                "electricity, medium voltage",
                vec![
                    exc("ei", "coal", 0.3, Technosphere),
                    exc("biosphere", "co2", 0.5, Biosphere),
                ],
            ),
            process(
                "coal",
                "hard coal mining",
                "hard coal",
                vec![
                    exc("biosphere", "ch4", 0.2, Biosphere),
                    exc("biosphere", "co2", 0.1, Biosphere),
                    exc("biosphere", "water", 3.0, Biosphere),
                ],
            ),
            process("idle", "idle process", "nothing", vec![]),
        ],
    };

    let methods = vec![
        MethodFile {
            name: gwp().parts().to_vec(),
            unit: Some("kg CO2-Eq".into()),
            factors: vec![
                FactorFile {
                    flow: NodeKey::new("biosphere", "co2"),
                    factor: 1.0,
                },
                FactorFile {
                    flow: NodeKey::new("biosphere", "ch4"),
                    factor: 28.0,
                },
            ],
        },
        MethodFile {
            name: wdp().parts().to_vec(),
            unit: Some("m3".into()),
            factors: vec![FactorFile {
                flow: NodeKey::new("biosphere", "water"),
                factor: 1.0,
            }],
        },
    ];

    GraphFile {
        databases: vec![biosphere, ei],
        methods,
    }
}

pub(crate) fn steel_store() -> MemoryStore {
    MemoryStore::from_databases(&steel_graph().databases).unwrap()
}

pub(crate) fn steel_scorer() -> MatrixScorer {
    MatrixScorer::new(&steel_graph().methods).unwrap()
}

/// The steel graph duplicated into one scenario database per name, with
/// biosphere flows shared.
pub(crate) fn scenario_graph(databases: &[&str]) -> GraphFile {
    let base = steel_graph();
    let template = base.databases[1].clone();
    let mut graph = GraphFile {
        databases: vec![base.databases[0].clone()],
        methods: base.methods,
    };
    for &name in databases {
        let mut db = template.clone();
        db.name = name.to_string();
        for node in &mut db.nodes {
            for e in &mut node.exchanges {
                if e.input.database == "ei" {
                    e.input.database = name.to_string();
                }
            }
        }
        graph.databases.push(db);
    }
    graph
}

/// Wraps the matrix scorer and fails evaluations rooted at a given process
/// code (or every evaluation when `root` is `None`).
pub(crate) struct FailingScorer {
    pub inner: MatrixScorer,
    pub root: Option<&'static str>,
}

impl crate::scoring::Scorer for FailingScorer {
    fn evaluate<S: crate::graph::GraphStore + ?Sized>(
        &self,
        store: &S,
        unit: &crate::domain::FunctionalUnit,
        method: &ImpactMethod,
    ) -> Result<crate::scoring::Evaluation, crate::error::LcaError> {
        let rooted_here = self
            .root
            .is_none_or(|code| unit.demands.iter().any(|(k, _)| k.code == code));
        if rooted_here {
            return Err(crate::error::LcaError::Oracle("solver exploded".into()));
        }
        self.inner.evaluate(store, unit, method)
    }
}
