//! Analysis session: the one mutable network a tool server works on

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::contingency::{self, ContingencyKind, ContingencyReport, OutageElement};
use super::error::{GridError, GridResult};
use super::network::{Bus, Line, Network, NetworkSummary, Trafo};
use super::results::PowerFlowResults;
use super::solver::{AcPowerFlowEngine, PowerFlowEngine, PowerFlowOptions};
use crate::logging::{Logger, NoOpLogger};

/// Element counts and the main tables of the loaded network
#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
    pub buses: usize,
    pub lines: usize,
    pub trafos: usize,
    pub generators: usize,
    pub loads: usize,
    pub sgens: usize,
    pub ext_grids: usize,
    pub switches: usize,
    pub bus_data: Vec<Bus>,
    pub line_data: Vec<Line>,
    pub trafo_data: Vec<Trafo>,
}

/// Combined result of `load_and_solve`
#[derive(Debug, Clone, Serialize)]
pub struct LoadAndSolve {
    pub network_info: NetworkSummary,
    pub power_flow_results: PowerFlowResults,
}

/// Holds at most one network and the results of the last solve
pub struct AnalysisSession {
    network: Option<Network>,
    last_results: Option<PowerFlowResults>,
    engine: Box<dyn PowerFlowEngine>,
    logger: Arc<dyn Logger>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            network: None,
            last_results: None,
            engine: Box::new(AcPowerFlowEngine),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn PowerFlowEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.network.is_some()
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    pub fn last_results(&self) -> Option<&PowerFlowResults> {
        self.last_results.as_ref()
    }

    fn loaded(&self) -> GridResult<&Network> {
        self.network.as_ref().ok_or(GridError::NoNetworkLoaded)
    }

    /// Replace the session network (and drop stale results)
    fn install(&mut self, net: Network) -> NetworkSummary {
        let summary = net.summary();
        self.network = Some(net);
        self.last_results = None;
        summary
    }

    pub fn create_empty(&mut self) -> NetworkSummary {
        self.logger.info("[AnalysisSession] Created empty network");
        self.install(Network::empty())
    }

    /// Load a network file. The current network is kept if this fails.
    pub fn load(&mut self, path: &Path) -> GridResult<NetworkSummary> {
        self.logger
            .debug(&format!("[AnalysisSession] Loading network from {}", path.display()));
        let net = Network::read_from(path).map_err(|e| {
            self.logger
                .warn(&format!("[AnalysisSession] Load failed: {}", e));
            e
        })?;
        let summary = self.install(net);
        self.logger.info(&format!(
            "[AnalysisSession] Loaded {} ({} buses, {} lines, {} trafos)",
            path.display(),
            summary.buses,
            summary.lines,
            summary.trafos
        ));
        Ok(summary)
    }

    pub fn save(&self, path: &Path) -> GridResult<()> {
        self.loaded()?.write_to(path)?;
        self.logger
            .info(&format!("[AnalysisSession] Saved network to {}", path.display()));
        Ok(())
    }

    pub fn solve_power_flow(&mut self, options: &PowerFlowOptions) -> GridResult<PowerFlowResults> {
        let net = self.loaded()?;
        let results = self.engine.run(net, options)?;
        self.logger.info(&format!(
            "[AnalysisSession] Power flow ({}) converged={} after {} iterations",
            results.algorithm, results.converged, results.iterations
        ));
        self.last_results = Some(results.clone());
        Ok(results)
    }

    pub fn contingency_sweep(
        &self,
        kind: ContingencyKind,
        elements: &[OutageElement],
    ) -> GridResult<ContingencyReport> {
        let net = self.loaded()?;
        let report = contingency::sweep(self.engine.as_ref(), net, kind, elements);
        self.logger.info(&format!(
            "[AnalysisSession] {} sweep: {} cases, {} with violations, {} failed",
            report.kind, report.total, report.with_violations, report.failed
        ));
        Ok(report)
    }

    pub fn network_info(&self) -> GridResult<NetworkInfo> {
        let net = self.loaded()?;
        Ok(NetworkInfo {
            buses: net.bus.len(),
            lines: net.line.len(),
            trafos: net.trafo.len(),
            generators: net.gen.len(),
            loads: net.load.len(),
            sgens: net.sgen.len(),
            ext_grids: net.ext_grid.len(),
            switches: net.switch.len(),
            bus_data: net.bus.clone(),
            line_data: net.line.clone(),
            trafo_data: net.trafo.clone(),
        })
    }

    /// Load then solve; a load failure short-circuits
    pub fn load_and_solve(
        &mut self,
        path: &Path,
        options: &PowerFlowOptions,
    ) -> GridResult<LoadAndSolve> {
        let network_info = self.load(path)?;
        let power_flow_results = self.solve_power_flow(options)?;
        Ok(LoadAndSolve {
            network_info,
            power_flow_results,
        })
    }
}
