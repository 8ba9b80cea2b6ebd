//! Power flow result tables

use serde::{Deserialize, Serialize};

/// Voltage band used to flag bus violations
pub const VM_MIN_PU: f64 = 0.95;
pub const VM_MAX_PU: f64 = 1.05;
/// Line loading limit in percent
pub const MAX_LOADING_PERCENT: f64 = 100.0;

/// Result row for one bus. De-energized buses report NaN, which
/// serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusResult {
    pub index: usize,
    pub vm_pu: f64,
    pub va_degree: f64,
    /// Net demand at the bus (positive = consumption)
    pub p_mw: f64,
    pub q_mvar: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    pub index: usize,
    pub p_from_mw: f64,
    pub q_from_mvar: f64,
    pub p_to_mw: f64,
    pub q_to_mvar: f64,
    pub pl_mw: f64,
    pub ql_mvar: f64,
    pub i_from_ka: f64,
    pub i_to_ka: f64,
    pub i_ka: f64,
    pub vm_from_pu: f64,
    pub vm_to_pu: f64,
    pub loading_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafoResult {
    pub index: usize,
    pub p_hv_mw: f64,
    pub q_hv_mvar: f64,
    pub p_lv_mw: f64,
    pub q_lv_mvar: f64,
    pub pl_mw: f64,
    pub ql_mvar: f64,
    pub i_hv_ka: f64,
    pub i_lv_ka: f64,
    pub loading_percent: f64,
}

/// Power supplied by an external grid (generator convention)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtGridResult {
    pub index: usize,
    pub p_mw: f64,
    pub q_mvar: f64,
}

/// Outcome of one power flow run
///
/// `converged == false` is a valid outcome, not an error. The tables are
/// empty in that case because the last iterate has no physical meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFlowResults {
    pub converged: bool,
    pub iterations: usize,
    pub algorithm: String,
    pub bus: Vec<BusResult>,
    pub line: Vec<LineResult>,
    pub trafo: Vec<TrafoResult>,
    pub ext_grid: Vec<ExtGridResult>,
}

impl PowerFlowResults {
    pub fn not_converged(algorithm: impl Into<String>, iterations: usize) -> Self {
        Self {
            converged: false,
            iterations,
            algorithm: algorithm.into(),
            bus: Vec::new(),
            line: Vec::new(),
            trafo: Vec::new(),
            ext_grid: Vec::new(),
        }
    }

    /// Buses with a voltage magnitude outside the allowed band
    pub fn voltage_violations(&self) -> Vec<usize> {
        self.bus
            .iter()
            .filter(|b| b.vm_pu < VM_MIN_PU || b.vm_pu > VM_MAX_PU)
            .map(|b| b.index)
            .collect()
    }

    /// Lines loaded above their thermal limit
    pub fn loading_violations(&self) -> Vec<usize> {
        self.line
            .iter()
            .filter(|l| l.loading_percent > MAX_LOADING_PERCENT)
            .map(|l| l.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(index: usize, vm_pu: f64) -> BusResult {
        BusResult {
            index,
            vm_pu,
            va_degree: 0.0,
            p_mw: 0.0,
            q_mvar: 0.0,
        }
    }

    #[test]
    fn test_violation_band() {
        let mut res = PowerFlowResults::not_converged("nr", 3);
        res.bus = vec![
            bus(0, 1.0),
            bus(1, 0.94),
            bus(2, 1.051),
            bus(3, 0.95),
            bus(4, f64::NAN),
        ];
        assert_eq!(res.voltage_violations(), vec![1, 2]);
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let json = serde_json::to_value(bus(7, f64::NAN)).unwrap();
        assert!(json["vm_pu"].is_null());
        assert_eq!(json["index"], 7);
    }
}
