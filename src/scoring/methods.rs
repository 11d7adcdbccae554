//! Built-in impact method lists.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::ImpactMethod;

const RECIPE_MIDPOINT_H: &str = "ReCiPe Midpoint (H)";
const RECIPE_ENDPOINT_HA: &str = "ReCiPe Endpoint (H,A)";

/// ReCiPe Midpoint (H) categories in reporting order.
const MIDPOINT_CATEGORIES: [(&str, &str); 18] = [
    ("terrestrial ecotoxicity", "TETPinf"),
    ("natural land transformation", "NLTP"),
    ("photochemical oxidant formation", "POFP"),
    ("human toxicity", "HTPinf"),
    ("marine eutrophication", "MEP"),
    ("climate change", "GWP100"),
    ("particulate matter formation", "PMFP"),
    ("agricultural land occupation", "ALOP"),
    ("freshwater eutrophication", "FEP"),
    ("metal depletion", "MDP"),
    ("terrestrial acidification", "TAP100"),
    ("water depletion", "WDP"),
    ("urban land occupation", "ULOP"),
    ("ionising radiation", "IRP_HE"),
    ("fossil depletion", "FDP"),
    ("freshwater ecotoxicity", "FETPinf"),
    ("marine ecotoxicity", "METPinf"),
    ("ozone depletion", "ODPinf"),
];

/// Named method sets selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MethodPreset {
    /// All 18 ReCiPe Midpoint (H) categories.
    RecipeMidpointH,
    /// ReCiPe Endpoint (H,A) damage totals.
    RecipeEndpointHa,
    /// ReCiPe Midpoint (H) with climate change replaced by IPCC 2013
    /// GWP 100a including hydrogen and biogenic CO2 (for premise databases).
    RecipeMidpointHPremiseGwp,
}

impl MethodPreset {
    pub fn methods(self) -> Vec<ImpactMethod> {
        match self {
            MethodPreset::RecipeMidpointH => MIDPOINT_CATEGORIES
                .iter()
                .map(|&(category, indicator)| ImpactMethod::new([RECIPE_MIDPOINT_H, category, indicator]))
                .collect(),
            MethodPreset::RecipeEndpointHa => ["human health", "ecosystem quality", "resources"]
                .into_iter()
                .map(|area| ImpactMethod::new([RECIPE_ENDPOINT_HA, area, "total"]))
                .collect(),
            MethodPreset::RecipeMidpointHPremiseGwp => MIDPOINT_CATEGORIES
                .iter()
                .map(|&(category, indicator)| {
                    if indicator == "GWP100" {
                        ImpactMethod::new(["IPCC 2013", "climate change", "GWP 100a, incl. H and bio CO2"])
                    } else {
                        ImpactMethod::new([RECIPE_MIDPOINT_H, category, indicator])
                    }
                })
                .collect(),
        }
    }
}
