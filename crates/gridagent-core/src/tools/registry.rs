//! Tool registry over an analysis session
//!
//! Turns a tool name plus a JSON argument object into a call on the
//! `AnalysisSession` and the outcome into the uniform payload
//!
//! ```text
//! { "status": "success" | "error", "message": "...", <payload fields> }
//! ```
//!
//! Nothing escapes `call`: domain errors, bad arguments, unknown names and
//! panics inside a tool body all come back as `status: "error"` payloads
//! with an `error_kind`.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::catalog::{
    ContingencyArgs, LoadAndRunArgs, LoadNetworkArgs, NoArgs, PowerFlowArgs, PowerTool,
};
use crate::grid::{parse_elements, AnalysisSession, ContingencyKind, GridError, PowerFlowResults};
use crate::logging::Logger;
use crate::types::ToolDescriptor;

/// Why a tool call produced an error payload
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    Grid(#[from] GridError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::Grid(e) => e.kind(),
        }
    }
}

pub type ToolCallResult = Result<Value, ToolError>;

fn parse_args<T: DeserializeOwned>(tool: PowerTool, arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.name().to_string(),
        message: e.to_string(),
    })
}

fn payload_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn success(message: impl Into<String>, fields: Value) -> Value {
    let mut out = Map::new();
    out.insert("status".into(), json!("success"));
    out.insert("message".into(), json!(message.into()));
    if let Value::Object(fields) = fields {
        out.extend(fields);
    }
    Value::Object(out)
}

/// Error payload with a machine-readable kind
pub fn error_payload(kind: &str, message: impl Into<String>) -> Value {
    json!({
        "status": "error",
        "message": message.into(),
        "error_kind": kind,
    })
}

/// Power flow results as reported to the model
pub fn power_flow_payload(res: &PowerFlowResults) -> Value {
    json!({
        "converged": res.converged,
        "iterations": res.iterations,
        "algorithm": res.algorithm,
        "bus_results": payload_value(&res.bus),
        "line_results": payload_value(&res.line),
        "trafo_results": payload_value(&res.trafo),
        "ext_grid_results": payload_value(&res.ext_grid),
    })
}

/// Executes the power system tools against one session
pub struct PowerToolRegistry {
    session: Arc<Mutex<AnalysisSession>>,
    logger: Arc<dyn Logger>,
}

impl PowerToolRegistry {
    pub fn new(session: AnalysisSession, logger: Arc<dyn Logger>) -> Self {
        Self::shared(Arc::new(Mutex::new(session)), logger)
    }

    /// Build over a session that is also held elsewhere
    pub fn shared(session: Arc<Mutex<AnalysisSession>>, logger: Arc<dyn Logger>) -> Self {
        Self { session, logger }
    }

    pub fn session(&self) -> Arc<Mutex<AnalysisSession>> {
        Arc::clone(&self.session)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        PowerTool::ALL.iter().map(PowerTool::descriptor).collect()
    }

    /// Run a tool; always returns a `{status, message, ...}` object
    pub fn call(&self, name: &str, arguments: Value) -> Value {
        let Some(tool) = PowerTool::from_name(name) else {
            self.logger
                .warn(&format!("[PowerToolRegistry] Unknown tool: {}", name));
            return error_payload("unknown_tool", format!("Tool '{}' not found", name));
        };

        self.logger
            .info(&format!("[PowerToolRegistry] Calling {}", name));

        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(tool, arguments))) {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                self.logger
                    .warn(&format!("[PowerToolRegistry] {} failed: {}", name, e));
                error_payload(e.kind(), e.to_string())
            }
            Err(cause) => {
                let detail = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.logger
                    .error(&format!("[PowerToolRegistry] {} panicked: {}", name, detail));
                error_payload("internal", format!("Tool '{}' failed: {}", name, detail))
            }
        }
    }

    fn dispatch(&self, tool: PowerTool, arguments: Value) -> ToolCallResult {
        match tool {
            PowerTool::CreateEmptyNetwork => {
                let _: NoArgs = parse_args(tool, arguments)?;
                let summary = self.session.lock().create_empty();
                Ok(success(
                    "Empty network created successfully",
                    json!({ "network_info": payload_value(&summary) }),
                ))
            }
            PowerTool::LoadNetwork => {
                let args: LoadNetworkArgs = parse_args(tool, arguments)?;
                let summary = self.session.lock().load(Path::new(&args.file_path))?;
                Ok(success(
                    format!("Network loaded successfully from {}", args.file_path),
                    json!({ "network_info": payload_value(&summary) }),
                ))
            }
            PowerTool::RunPowerFlow => {
                let args: PowerFlowArgs = parse_args(tool, arguments)?;
                let options = args.options()?;
                let res = self.session.lock().solve_power_flow(&options)?;
                let message = if res.converged {
                    "Power flow calculation completed successfully"
                } else {
                    "Power flow did not converge"
                };
                Ok(success(message, json!({ "results": power_flow_payload(&res) })))
            }
            PowerTool::RunContingencyAnalysis => {
                let args: ContingencyArgs = parse_args(tool, arguments)?;
                let kind: ContingencyKind = args.contingency_type.parse()?;
                let elements = parse_elements(args.elements.as_deref())?;
                let report = self.session.lock().contingency_sweep(kind, &elements)?;
                Ok(success(
                    "Contingency analysis completed",
                    json!({
                        "results": payload_value(&report.outcomes),
                        "summary": {
                            "contingency_type": report.kind,
                            "total": report.total,
                            "converged": report.converged,
                            "with_violations": report.with_violations,
                            "failed": report.failed,
                        },
                    }),
                ))
            }
            PowerTool::GetNetworkInfo => {
                let _: NoArgs = parse_args(tool, arguments)?;
                let info = self.session.lock().network_info()?;
                Ok(success(
                    "Network information retrieved successfully",
                    json!({ "info": payload_value(&info) }),
                ))
            }
            PowerTool::LoadAndRunPowerFlow => {
                let args: LoadAndRunArgs = parse_args(tool, arguments)?;
                let options = args.power_flow.options()?;
                let outcome = self
                    .session
                    .lock()
                    .load_and_solve(Path::new(&args.file_path), &options)?;
                let message = if outcome.power_flow_results.converged {
                    format!(
                        "Network loaded from {} and power flow completed successfully",
                        args.file_path
                    )
                } else {
                    format!(
                        "Network loaded from {} but power flow did not converge",
                        args.file_path
                    )
                };
                Ok(success(
                    message,
                    json!({
                        "network_info": payload_value(&outcome.network_info),
                        "power_flow_results": power_flow_payload(&outcome.power_flow_results),
                    }),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::fixtures::{ring_network, two_bus};
    use crate::grid::{Network, PowerFlowEngine, PowerFlowOptions};
    use crate::logging::NoOpLogger;
    use tempfile::tempdir;

    fn registry() -> PowerToolRegistry {
        PowerToolRegistry::new(AnalysisSession::new(), Arc::new(NoOpLogger))
    }

    struct PanickingEngine;

    impl PowerFlowEngine for PanickingEngine {
        fn run(&self, _: &Network, _: &PowerFlowOptions) -> crate::grid::GridResult<PowerFlowResults> {
            panic!("index out of range")
        }
    }

    #[test]
    fn test_descriptors() {
        let names: Vec<_> = registry().descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "create_empty_network",
                "load_network",
                "run_power_flow",
                "run_contingency_analysis",
                "get_network_info",
                "load_and_run_power_flow",
            ]
        );
    }

    #[test]
    fn test_no_network_loaded() {
        let reg = registry();
        for tool in ["run_power_flow", "run_contingency_analysis", "get_network_info"] {
            let out = reg.call(tool, json!({}));
            assert_eq!(out["status"], "error", "{}", tool);
            assert_eq!(out["error_kind"], "no_network_loaded");
            assert!(out["message"].as_str().unwrap().contains("No network"));
        }
    }

    #[test]
    fn test_unknown_tool_and_bad_arguments() {
        let reg = registry();
        let out = reg.call("run_short_circuit", json!({}));
        assert_eq!(out["error_kind"], "unknown_tool");
        assert_eq!(out["message"], "Tool 'run_short_circuit' not found");

        let out = reg.call("load_network", json!({"path": "x.json"}));
        assert_eq!(out["error_kind"], "invalid_arguments");

        reg.call("create_empty_network", Value::Null);
        let out = reg.call("run_power_flow", json!({"max_iteration": "ten"}));
        assert_eq!(out["error_kind"], "invalid_arguments");
    }

    #[test]
    fn test_create_then_info() {
        let reg = registry();
        let out = reg.call("create_empty_network", json!({}));
        assert_eq!(out["status"], "success");
        assert_eq!(out["network_info"], json!({"buses": 0, "lines": 0, "trafos": 0}));

        let info = reg.call("get_network_info", json!({}));
        assert_eq!(info["info"]["buses"], 0);
        assert!(info["info"]["bus_data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_load_and_solve_flow() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ring.json");
        ring_network().write_to(&path).unwrap();
        let file_path = path.display().to_string();

        let reg = registry();
        let out = reg.call("load_network", json!({ "file_path": file_path }));
        assert_eq!(out["status"], "success");
        assert_eq!(out["network_info"]["buses"], 4);

        let pf = reg.call("run_power_flow", json!({}));
        assert_eq!(pf["message"], "Power flow calculation completed successfully");
        assert_eq!(pf["results"]["converged"], true);
        assert_eq!(pf["results"]["bus_results"].as_array().unwrap().len(), 4);

        let cont = reg.call("run_contingency_analysis", json!({"elements": ["line"]}));
        assert_eq!(cont["status"], "success");
        assert_eq!(cont["results"].as_array().unwrap().len(), 3);
        assert_eq!(cont["results"][0]["contingency"], "line_0");
        assert_eq!(cont["summary"]["contingency_type"], "N-1");
    }

    #[test]
    fn test_domain_error_kinds() {
        let reg = registry();
        let out = reg.call("load_network", json!({"file_path": "grid.xlsx"}));
        assert_eq!(out["error_kind"], "unsupported_format");
        let out = reg.call("load_network", json!({"file_path": "/nonexistent/grid.json"}));
        assert_eq!(out["error_kind"], "file_not_found");

        reg.call("create_empty_network", json!({}));
        let out = reg.call("run_contingency_analysis", json!({"contingency_type": "N-5"}));
        assert_eq!(out["error_kind"], "invalid_parameter");
        let out = reg.call("run_power_flow", json!({"algorithm": "dc"}));
        assert_eq!(out["error_kind"], "solve_failure");
    }

    #[test]
    fn test_load_and_run_not_converged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heavy.p");
        two_bus(500.0).write_to(&path).unwrap();

        let out = registry().call(
            "load_and_run_power_flow",
            json!({ "file_path": path.display().to_string() }),
        );
        assert_eq!(out["status"], "success");
        assert!(out["message"].as_str().unwrap().contains("did not converge"));
        assert_eq!(out["power_flow_results"]["converged"], false);
        assert_eq!(out["network_info"]["lines"], 1);
    }

    #[test]
    fn test_load_and_run_matches_separate_calls() {
        let dir = tempdir().unwrap();
        let cases = [
            ("ring.json", ring_network(), true),
            ("ring.p", ring_network(), true),
            ("heavy.json", two_bus(500.0), false),
            ("heavy.p", two_bus(500.0), false),
        ];

        for (file, net, converges) in cases {
            let path = dir.path().join(file);
            net.write_to(&path).unwrap();
            let file_path = path.display().to_string();

            let combined = registry();
            let both = combined.call("load_and_run_power_flow", json!({ "file_path": file_path }));
            assert_eq!(both["status"], "success", "{}", file);
            let combined_info = combined.call("get_network_info", json!({}));

            let separate = registry();
            let loaded = separate.call("load_network", json!({ "file_path": file_path }));
            let solved = separate.call("run_power_flow", json!({}));
            assert_eq!(solved["status"], "success", "{}", file);
            let separate_info = separate.call("get_network_info", json!({}));

            assert_eq!(both["network_info"], loaded["network_info"], "{}", file);
            assert_eq!(
                both["power_flow_results"]["converged"],
                solved["results"]["converged"],
                "{}",
                file
            );
            assert_eq!(both["power_flow_results"]["converged"], converges, "{}", file);

            // counts match the file contents on both paths
            for info in [&combined_info["info"], &separate_info["info"]] {
                assert_eq!(info["buses"], net.bus.len(), "{}", file);
                assert_eq!(info["lines"], net.line.len(), "{}", file);
                assert_eq!(info["trafos"], net.trafo.len(), "{}", file);
                assert_eq!(info["loads"], net.load.len(), "{}", file);
                assert_eq!(info["ext_grids"], net.ext_grid.len(), "{}", file);
            }
        }
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let session = AnalysisSession::new().with_engine(Box::new(PanickingEngine));
        let reg = PowerToolRegistry::new(session, Arc::new(NoOpLogger));
        reg.call("create_empty_network", json!({}));

        let out = reg.call("run_power_flow", json!({}));
        assert_eq!(out["error_kind"], "internal");
        assert!(out["message"].as_str().unwrap().contains("index out of range"));

        // The session is still usable afterwards
        assert_eq!(reg.call("get_network_info", json!({}))["status"], "success");
    }
}
