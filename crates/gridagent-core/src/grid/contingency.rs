//! Outage sweeps (N-1 and N-2)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{GridError, GridResult};
use super::network::Network;
use super::solver::{PowerFlowEngine, PowerFlowOptions};

/// How many elements are taken out per case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContingencyKind {
    N1,
    N2,
}

impl ContingencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContingencyKind::N1 => "N-1",
            ContingencyKind::N2 => "N-2",
        }
    }
}

impl FromStr for ContingencyKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "N-1" => Ok(ContingencyKind::N1),
            "N-2" => Ok(ContingencyKind::N2),
            other => Err(GridError::invalid(format!(
                "unsupported contingency type '{}', use 'N-1' or 'N-2'",
                other
            ))),
        }
    }
}

/// Element tables that can be outaged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutageElement {
    Line,
    Trafo,
}

impl OutageElement {
    pub const DEFAULT: [OutageElement; 2] = [OutageElement::Line, OutageElement::Trafo];

    fn count(&self, net: &Network) -> usize {
        match self {
            OutageElement::Line => net.line.len(),
            OutageElement::Trafo => net.trafo.len(),
        }
    }

    fn take_out(&self, net: &mut Network, idx: usize) {
        match self {
            OutageElement::Line => net.line[idx].in_service = false,
            OutageElement::Trafo => net.trafo[idx].in_service = false,
        }
    }
}

impl fmt::Display for OutageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutageElement::Line => write!(f, "line"),
            OutageElement::Trafo => write!(f, "trafo"),
        }
    }
}

impl FromStr for OutageElement {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(OutageElement::Line),
            "trafo" => Ok(OutageElement::Trafo),
            other => Err(GridError::invalid(format!(
                "unsupported element type '{}', use 'line' or 'trafo'",
                other
            ))),
        }
    }
}

/// Parse requested element types, falling back to lines and trafos.
/// Duplicates are dropped, first occurrence wins.
pub fn parse_elements(requested: Option<&[String]>) -> GridResult<Vec<OutageElement>> {
    let Some(requested) = requested else {
        return Ok(OutageElement::DEFAULT.to_vec());
    };
    let mut out = Vec::new();
    for name in requested {
        let element: OutageElement = name.parse()?;
        if !out.contains(&element) {
            out.push(element);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Violations {
    pub voltage_violations: Vec<usize>,
    pub loading_violations: Vec<usize>,
}

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.voltage_violations.is_empty() && self.loading_violations.is_empty()
    }
}

/// Result of one outage case. Exactly one of `violations` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyOutcome {
    pub contingency: String,
    pub converged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Violations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyReport {
    pub kind: String,
    pub outcomes: Vec<ContingencyOutcome>,
    pub total: usize,
    pub converged: usize,
    pub with_violations: usize,
    pub failed: usize,
}

type Outage = (OutageElement, usize);

fn label(outages: &[Outage]) -> String {
    outages
        .iter()
        .map(|(e, i)| format!("{}_{}", e, i))
        .collect::<Vec<_>>()
        .join("+")
}

/// Outage every case and re-solve with default options.
///
/// Every element of the requested tables gets a case, including elements
/// already out of service. A failed or non-converged solve is recorded as
/// the outcome's `error` and the sweep moves on.
pub fn sweep(
    engine: &dyn PowerFlowEngine,
    net: &Network,
    kind: ContingencyKind,
    elements: &[OutageElement],
) -> ContingencyReport {
    let candidates: Vec<Outage> = elements
        .iter()
        .flat_map(|e| (0..e.count(net)).map(move |i| (*e, i)))
        .collect();

    let cases: Vec<Vec<Outage>> = match kind {
        ContingencyKind::N1 => candidates.iter().map(|c| vec![*c]).collect(),
        ContingencyKind::N2 => {
            let mut pairs = Vec::new();
            for (a, first) in candidates.iter().enumerate() {
                for second in &candidates[a + 1..] {
                    pairs.push(vec![*first, *second]);
                }
            }
            pairs
        }
    };

    let options = PowerFlowOptions::default();
    let outcomes: Vec<ContingencyOutcome> = cases
        .iter()
        .map(|case| {
            let mut outaged = net.clone();
            for (element, idx) in case {
                element.take_out(&mut outaged, *idx);
            }
            match engine.run(&outaged, &options) {
                Ok(res) if !res.converged => ContingencyOutcome {
                    contingency: label(case),
                    converged: false,
                    violations: None,
                    error: Some(format!(
                        "power flow did not converge after {} iterations",
                        res.iterations
                    )),
                },
                Ok(res) => ContingencyOutcome {
                    contingency: label(case),
                    converged: true,
                    violations: Some(Violations {
                        voltage_violations: res.voltage_violations(),
                        loading_violations: res.loading_violations(),
                    }),
                    error: None,
                },
                Err(e) => ContingencyOutcome {
                    contingency: label(case),
                    converged: false,
                    violations: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    ContingencyReport {
        kind: kind.as_str().to_string(),
        total: outcomes.len(),
        converged: outcomes.iter().filter(|o| o.converged).count(),
        with_violations: outcomes
            .iter()
            .filter(|o| o.violations.as_ref().map_or(false, |v| !v.is_empty()))
            .count(),
        failed: outcomes.iter().filter(|o| o.error.is_some()).count(),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::network::fixtures::ring_network;
    use crate::grid::results::PowerFlowResults;
    use crate::grid::solver::AcPowerFlowEngine;

    /// Fails whenever line 1 is out of service
    struct FlakyEngine;

    impl PowerFlowEngine for FlakyEngine {
        fn run(&self, net: &Network, options: &PowerFlowOptions) -> GridResult<PowerFlowResults> {
            if !net.line[1].in_service {
                return Err(GridError::solve("matrix is singular"));
            }
            AcPowerFlowEngine.run(net, options)
        }
    }

    #[test]
    fn test_parse_kind_and_elements() {
        assert_eq!("n-1".parse::<ContingencyKind>().unwrap(), ContingencyKind::N1);
        assert!(matches!(
            "N-3".parse::<ContingencyKind>(),
            Err(GridError::InvalidParameter(_))
        ));

        assert_eq!(parse_elements(None).unwrap(), OutageElement::DEFAULT.to_vec());
        let requested = vec!["trafo".to_string(), "line".to_string(), "trafo".to_string()];
        assert_eq!(
            parse_elements(Some(&requested)).unwrap(),
            vec![OutageElement::Trafo, OutageElement::Line]
        );
        let bad = vec!["bus".to_string()];
        assert!(matches!(
            parse_elements(Some(&bad)),
            Err(GridError::InvalidParameter(_))
        ));
    }

    /// Solves, but never converges
    struct StalledEngine;

    impl PowerFlowEngine for StalledEngine {
        fn run(&self, net: &Network, options: &PowerFlowOptions) -> GridResult<PowerFlowResults> {
            let mut res = AcPowerFlowEngine.run(net, options)?;
            res.converged = false;
            res.iterations = options.max_iteration;
            Ok(res)
        }
    }

    #[test]
    fn test_n1_covers_every_element() {
        let mut net = ring_network();
        net.line[2].in_service = false;

        let report = sweep(&AcPowerFlowEngine, &net, ContingencyKind::N1, &OutageElement::DEFAULT);
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.contingency.as_str()).collect();
        assert_eq!(ids, vec!["line_0", "line_1", "line_2", "trafo_0"]);
        assert_eq!(report.total, 4);
        assert_eq!(report.failed, 0);

        // line_2 was already out, so its case is the base case
        assert!(report.outcomes[2].converged);

        // Losing the only transformer de-energizes the MV side
        let trafo = &report.outcomes[3];
        assert!(trafo.converged);
        assert!(trafo.violations.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_n2_enumerates_pairs() {
        let net = ring_network();
        let report = sweep(&AcPowerFlowEngine, &net, ContingencyKind::N2, &[OutageElement::Line]);
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.contingency.clone()).collect();
        assert_eq!(ids, vec!["line_0+line_1", "line_0+line_2", "line_1+line_2"]);
        assert_eq!(report.kind, "N-2");
    }

    #[test]
    fn test_failure_does_not_abort_sweep() {
        let net = ring_network();
        let report = sweep(&FlakyEngine, &net, ContingencyKind::N1, &[OutageElement::Line]);
        assert_eq!(report.total, 3);
        assert_eq!(report.failed, 1);

        let failed = &report.outcomes[1];
        assert_eq!(failed.contingency, "line_1");
        assert!(!failed.converged);
        assert!(failed.error.as_deref().unwrap().contains("singular"));
        assert!(report.outcomes[0].error.is_none());
        assert!(report.outcomes[2].error.is_none());
    }

    #[test]
    fn test_non_converged_case_reports_error_not_violations() {
        let net = ring_network();
        let report = sweep(&StalledEngine, &net, ContingencyKind::N1, &[OutageElement::Line]);
        assert_eq!(report.total, 3);
        assert_eq!(report.converged, 0);
        assert_eq!(report.failed, 3);
        assert_eq!(report.with_violations, 0);
        for outcome in &report.outcomes {
            assert!(!outcome.converged);
            assert!(outcome.violations.is_none());
            assert!(outcome.error.as_deref().unwrap().contains("did not converge"));
        }
    }

    #[test]
    fn test_outcome_json_shape() {
        let ok = ContingencyOutcome {
            contingency: "line_3".into(),
            converged: true,
            violations: Some(Violations::default()),
            error: None,
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json["violations"]["voltage_violations"].is_array());
        assert!(json.get("error").is_none());
    }
}
