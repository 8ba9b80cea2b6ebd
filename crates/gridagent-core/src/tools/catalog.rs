//! The power system tools: names, descriptions and argument contracts

use rmcp::schemars;
use serde::Deserialize;
use serde_json::Value;

use crate::grid::{Algorithm, GridResult, PowerFlowOptions};
use crate::types::ToolDescriptor;

fn default_algorithm() -> String {
    "nr".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_iteration() -> usize {
    10
}

fn default_tolerance() -> f64 {
    1e-8
}

fn default_contingency_type() -> String {
    "N-1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct LoadNetworkArgs {
    /// Path to a network file (.json or .p)
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PowerFlowArgs {
    /// Solver algorithm: "nr" (Newton-Raphson) or "gs" (Gauss-Seidel)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Take transformer phase shifts into account
    #[serde(default = "default_true")]
    pub calculate_voltage_angles: bool,
    /// Maximum number of solver iterations
    #[serde(default = "default_max_iteration")]
    pub max_iteration: usize,
    /// Convergence tolerance in MVA
    #[serde(default = "default_tolerance")]
    pub tolerance_mva: f64,
}

impl Default for PowerFlowArgs {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            calculate_voltage_angles: true,
            max_iteration: default_max_iteration(),
            tolerance_mva: default_tolerance(),
        }
    }
}

impl PowerFlowArgs {
    pub fn options(&self) -> GridResult<PowerFlowOptions> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let options = PowerFlowOptions {
            algorithm,
            calculate_voltage_angles: self.calculate_voltage_angles,
            max_iteration: self.max_iteration,
            tolerance_mva: self.tolerance_mva,
        };
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ContingencyArgs {
    /// "N-1" (one element out at a time) or "N-2" (every pair of elements)
    #[serde(default = "default_contingency_type")]
    pub contingency_type: String,
    /// Element types to outage: "line", "trafo". Defaults to both.
    #[serde(default)]
    pub elements: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct LoadAndRunArgs {
    /// Path to a network file (.json or .p)
    pub file_path: String,
    #[serde(flatten)]
    pub power_flow: PowerFlowArgs,
}

/// Every tool the analysis server offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTool {
    CreateEmptyNetwork,
    LoadNetwork,
    RunPowerFlow,
    RunContingencyAnalysis,
    GetNetworkInfo,
    LoadAndRunPowerFlow,
}

impl PowerTool {
    pub const ALL: [PowerTool; 6] = [
        PowerTool::CreateEmptyNetwork,
        PowerTool::LoadNetwork,
        PowerTool::RunPowerFlow,
        PowerTool::RunContingencyAnalysis,
        PowerTool::GetNetworkInfo,
        PowerTool::LoadAndRunPowerFlow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PowerTool::CreateEmptyNetwork => "create_empty_network",
            PowerTool::LoadNetwork => "load_network",
            PowerTool::RunPowerFlow => "run_power_flow",
            PowerTool::RunContingencyAnalysis => "run_contingency_analysis",
            PowerTool::GetNetworkInfo => "get_network_info",
            PowerTool::LoadAndRunPowerFlow => "load_and_run_power_flow",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            PowerTool::CreateEmptyNetwork => {
                "Create a new empty power network and make it the current network."
            }
            PowerTool::LoadNetwork => {
                "Load a power network from a .json or .p file and make it the current network."
            }
            PowerTool::RunPowerFlow => {
                "Run an AC power flow on the current network. Returns bus voltages, line and \
                 transformer flows and loadings, and whether the calculation converged."
            }
            PowerTool::RunContingencyAnalysis => {
                "Run an N-1 or N-2 contingency analysis on the current network. Each case takes \
                 elements out of service, re-runs the power flow and reports voltage (outside \
                 0.95-1.05 pu) and line loading (above 100%) violations."
            }
            PowerTool::GetNetworkInfo => {
                "Get element counts and the bus, line and transformer tables of the current network."
            }
            PowerTool::LoadAndRunPowerFlow => {
                "Load a network file and immediately run a power flow on it in one step."
            }
        }
    }

    pub fn input_schema(&self) -> Value {
        let schema = match self {
            PowerTool::CreateEmptyNetwork | PowerTool::GetNetworkInfo => {
                schemars::schema_for!(NoArgs)
            }
            PowerTool::LoadNetwork => schemars::schema_for!(LoadNetworkArgs),
            PowerTool::RunPowerFlow => schemars::schema_for!(PowerFlowArgs),
            PowerTool::RunContingencyAnalysis => schemars::schema_for!(ContingencyArgs),
            PowerTool::LoadAndRunPowerFlow => schemars::schema_for!(LoadAndRunArgs),
        };
        let mut value = serde_json::to_value(schema).unwrap_or_else(|_| {
            serde_json::json!({ "type": "object" })
        });
        // Model APIs want a plain object schema
        if let Some(obj) = value.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
            obj.entry("properties").or_insert_with(|| serde_json::json!({}));
        }
        value
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description()).with_schema(self.input_schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_round_trip() {
        for tool in PowerTool::ALL {
            assert_eq!(PowerTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(PowerTool::from_name("run_short_circuit"), None);
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in PowerTool::ALL {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(schema["properties"].is_object());
        }
        let load = PowerTool::LoadNetwork.input_schema();
        assert_eq!(load["required"], json!(["file_path"]));
        let run = PowerTool::LoadAndRunPowerFlow.input_schema();
        assert!(run["properties"]["tolerance_mva"].is_object());
    }

    #[test]
    fn test_power_flow_defaults() {
        let args: PowerFlowArgs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(args.algorithm, "nr");
        assert!(args.calculate_voltage_angles);
        assert_eq!(args.max_iteration, 10);
        assert_eq!(args.tolerance_mva, 1e-8);
        assert_eq!(args.options().unwrap(), PowerFlowOptions::default());

        let gs: LoadAndRunArgs =
            serde_json::from_value(json!({"file_path": "a.p", "algorithm": "gs"})).unwrap();
        assert_eq!(gs.power_flow.options().unwrap().algorithm, Algorithm::GaussSeidel);
    }

    #[test]
    fn test_contingency_defaults() {
        let args: ContingencyArgs = serde_json::from_value(json!({"elements": null})).unwrap();
        assert_eq!(args.contingency_type, "N-1");
        assert!(args.elements.is_none());
    }
}
