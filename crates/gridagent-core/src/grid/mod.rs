//! Power system analysis: grid model, power flow engine and the session
//! the tool server drives

mod contingency;
mod error;
mod network;
mod results;
mod session;
mod solver;

pub use contingency::{
    parse_elements, ContingencyKind, ContingencyOutcome, ContingencyReport, OutageElement,
    Violations,
};
pub use error::{GridError, GridResult};
pub use network::{
    Bus, ExtGrid, Gen, Line, Load, Network, NetworkFormat, NetworkSummary, StaticGen, Switch,
    SwitchElement, Trafo,
};
pub use results::{
    BusResult, ExtGridResult, LineResult, PowerFlowResults, TrafoResult, MAX_LOADING_PERCENT,
    VM_MAX_PU, VM_MIN_PU,
};
pub use session::{AnalysisSession, LoadAndSolve, NetworkInfo};
pub use solver::{AcPowerFlowEngine, Algorithm, PowerFlowEngine, PowerFlowOptions};

#[cfg(test)]
pub(crate) use network::fixtures;
