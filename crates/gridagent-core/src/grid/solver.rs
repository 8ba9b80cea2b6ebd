//! AC power flow engine
//!
//! Builds a per-unit bus admittance matrix from the energized part of the
//! network and solves the power balance equations with Newton-Raphson
//! (polar coordinates, dense Jacobian) or Gauss-Seidel.
//!
//! Buses that cannot be reached from an external grid are left out of the
//! solve and reported as NaN. Running out of iterations, a singular
//! Jacobian or a numerically diverging iterate all end in
//! `converged == false`; only structural problems are errors.

use std::f64::consts::PI;
use std::str::FromStr;

use nalgebra::{Complex, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::error::{GridError, GridResult};
use super::network::Network;
use super::results::{BusResult, ExtGridResult, LineResult, PowerFlowResults, TrafoResult};

type C64 = Complex<f64>;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Iterative method used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Newton-Raphson
    #[serde(rename = "nr")]
    NewtonRaphson,
    /// Gauss-Seidel
    #[serde(rename = "gs")]
    GaussSeidel,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::NewtonRaphson => "nr",
            Algorithm::GaussSeidel => "gs",
        }
    }
}

impl FromStr for Algorithm {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nr" => Ok(Algorithm::NewtonRaphson),
            "gs" => Ok(Algorithm::GaussSeidel),
            other => Err(GridError::solve(format!(
                "unsupported power flow algorithm '{}', use 'nr' or 'gs'",
                other
            ))),
        }
    }
}

/// Numeric parameters of one power flow run
#[derive(Debug, Clone, PartialEq)]
pub struct PowerFlowOptions {
    pub algorithm: Algorithm,
    /// Honour transformer phase shifts
    pub calculate_voltage_angles: bool,
    pub max_iteration: usize,
    /// Largest acceptable power mismatch, in MVA
    pub tolerance_mva: f64,
}

impl Default for PowerFlowOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::NewtonRaphson,
            calculate_voltage_angles: true,
            max_iteration: 10,
            tolerance_mva: 1e-8,
        }
    }
}

impl PowerFlowOptions {
    pub fn validate(&self) -> GridResult<()> {
        if self.max_iteration == 0 {
            return Err(GridError::solve("max_iteration must be at least 1"));
        }
        if !(self.tolerance_mva > 0.0) || !self.tolerance_mva.is_finite() {
            return Err(GridError::solve(format!(
                "tolerance_mva must be a positive number, got {}",
                self.tolerance_mva
            )));
        }
        Ok(())
    }
}

/// Something that can solve a power flow for a network
///
/// The session depends on this trait rather than on a concrete solver so a
/// different engine can be plugged in.
pub trait PowerFlowEngine: Send + Sync {
    fn run(&self, net: &Network, options: &PowerFlowOptions) -> GridResult<PowerFlowResults>;
}

/// Built-in AC power flow engine
#[derive(Debug, Clone, Copy, Default)]
pub struct AcPowerFlowEngine;

impl PowerFlowEngine for AcPowerFlowEngine {
    fn run(&self, net: &Network, options: &PowerFlowOptions) -> GridResult<PowerFlowResults> {
        options.validate()?;
        net.validate().map_err(GridError::SolveFailure)?;

        let model = SolverModel::build(net, options)?;
        let outcome = match options.algorithm {
            Algorithm::NewtonRaphson => model.newton_raphson(options),
            Algorithm::GaussSeidel => model.gauss_seidel(options),
        };

        match outcome {
            Iterate::Converged { v, iterations } => {
                Ok(model.results(net, &v, iterations, options.algorithm))
            }
            Iterate::Stopped { iterations } => Ok(PowerFlowResults::not_converged(
                options.algorithm.as_str(),
                iterations,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusKind {
    Slack,
    Pv,
    Pq,
}

/// Two-port admittances of one branch, in per unit
#[derive(Debug, Clone, Copy)]
struct Branch {
    from: usize,
    to: usize,
    yff: C64,
    yft: C64,
    ytf: C64,
    ytt: C64,
}

impl Branch {
    fn currents(&self, v: &[C64]) -> (C64, C64) {
        let (vf, vt) = (v[self.from], v[self.to]);
        (self.yff * vf + self.yft * vt, self.ytf * vf + self.ytt * vt)
    }
}

enum Iterate {
    Converged { v: Vec<C64>, iterations: usize },
    Stopped { iterations: usize },
}

struct SolverModel {
    sn_mva: f64,
    /// Table bus index -> solver index, `None` when de-energized
    position: Vec<Option<usize>>,
    kind: Vec<BusKind>,
    ybus: DMatrix<C64>,
    s_spec: Vec<C64>,
    v0: Vec<C64>,
    lines: Vec<Option<Branch>>,
    trafos: Vec<Option<Branch>>,
}

impl SolverModel {
    fn build(net: &Network, options: &PowerFlowOptions) -> GridResult<Self> {
        let nb = net.bus.len();
        let sn = net.sn_mva;

        if !net
            .ext_grid
            .iter()
            .any(|e| e.in_service && net.bus[e.bus].in_service)
        {
            return Err(GridError::solve("network has no in-service external grid"));
        }

        let line_ids: Vec<usize> = (0..net.line.len())
            .filter(|&i| {
                let l = &net.line[i];
                net.line_active(i) && net.bus[l.from_bus].in_service && net.bus[l.to_bus].in_service
            })
            .collect();
        let trafo_ids: Vec<usize> = (0..net.trafo.len())
            .filter(|&i| {
                let t = &net.trafo[i];
                net.trafo_active(i) && net.bus[t.hv_bus].in_service && net.bus[t.lv_bus].in_service
            })
            .collect();

        // Energized buses: everything reachable from a slack bus. The walk
        // also seeds each bus with the angle implied by phase shifters.
        let shift_of = |t: usize| {
            if options.calculate_voltage_angles {
                net.trafo[t].shift_degree.to_radians()
            } else {
                0.0
            }
        };
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nb];
        for &i in &line_ids {
            let l = &net.line[i];
            adjacency[l.from_bus].push((l.to_bus, 0.0));
            adjacency[l.to_bus].push((l.from_bus, 0.0));
        }
        for &i in &trafo_ids {
            let t = &net.trafo[i];
            adjacency[t.hv_bus].push((t.lv_bus, -shift_of(i)));
            adjacency[t.lv_bus].push((t.hv_bus, shift_of(i)));
        }
        let mut energized = vec![false; nb];
        let mut start_angle = vec![0.0; nb];
        let mut stack: Vec<(usize, f64)> = net
            .ext_grid
            .iter()
            .filter(|e| e.in_service && net.bus[e.bus].in_service)
            .map(|e| (e.bus, e.va_degree.to_radians()))
            .collect();
        while let Some((b, angle)) = stack.pop() {
            if energized[b] {
                continue;
            }
            energized[b] = true;
            start_angle[b] = angle;
            stack.extend(
                adjacency[b]
                    .iter()
                    .filter(|(n, _)| !energized[*n])
                    .map(|&(n, delta)| (n, angle + delta)),
            );
        }

        let mut position = vec![None; nb];
        let mut n = 0;
        for (b, &on) in energized.iter().enumerate() {
            if on {
                position[b] = Some(n);
                n += 1;
            }
        }

        let mut lines = vec![None; net.line.len()];
        for &i in &line_ids {
            let l = &net.line[i];
            let (Some(from), Some(to)) = (position[l.from_bus], position[l.to_bus]) else {
                continue;
            };
            let zbase = net.bus[l.from_bus].vn_kv.powi(2) / sn;
            let parallel = f64::from(l.parallel);
            let z = C64::new(l.r_ohm_per_km, l.x_ohm_per_km) * l.length_km / parallel / zbase;
            if z.norm() == 0.0 || !z.norm().is_finite() {
                return Err(GridError::solve(format!("line {} has zero impedance", i)));
            }
            let y = z.inv();
            let b = 2.0 * PI * net.f_hz * l.c_nf_per_km * 1e-9 * l.length_km * parallel * zbase;
            let ysh = C64::new(0.0, b / 2.0);
            lines[i] = Some(Branch {
                from,
                to,
                yff: y + ysh,
                yft: -y,
                ytf: -y,
                ytt: y + ysh,
            });
        }

        let mut trafos = vec![None; net.trafo.len()];
        for &i in &trafo_ids {
            let t = &net.trafo[i];
            let (Some(from), Some(to)) = (position[t.hv_bus], position[t.lv_bus]) else {
                continue;
            };
            let vn_hv_bus = net.bus[t.hv_bus].vn_kv;
            let vn_lv_bus = net.bus[t.lv_bus].vn_kv;
            let zk = t.vk_percent / 100.0;
            let rk = t.vkr_percent / 100.0;
            let xk = (zk * zk - rk * rk).max(0.0).sqrt();
            let scale = (sn / t.sn_mva) * (t.vn_lv_kv / vn_lv_bus).powi(2);
            let z = C64::new(rk, xk) * scale;
            if z.norm() == 0.0 || !z.norm().is_finite() {
                return Err(GridError::solve(format!("trafo {} has zero impedance", i)));
            }
            let y = z.inv();
            let ratio = (t.vn_hv_kv / vn_hv_bus) / (t.vn_lv_kv / vn_lv_bus);
            let shift = shift_of(i);
            let a = C64::from_polar(ratio, shift);
            trafos[i] = Some(Branch {
                from,
                to,
                yff: y / (ratio * ratio),
                yft: -y / a.conj(),
                ytf: -y / a,
                ytt: y,
            });
        }

        let mut ybus = DMatrix::from_element(n, n, C64::new(0.0, 0.0));
        for br in lines.iter().chain(trafos.iter()).flatten() {
            ybus[(br.from, br.from)] += br.yff;
            ybus[(br.from, br.to)] += br.yft;
            ybus[(br.to, br.from)] += br.ytf;
            ybus[(br.to, br.to)] += br.ytt;
        }

        let mut s_spec = vec![C64::new(0.0, 0.0); n];
        for l in net.load.iter().filter(|l| l.in_service) {
            if let Some(p) = position[l.bus] {
                s_spec[p] -= C64::new(l.p_mw, l.q_mvar) * l.scaling / sn;
            }
        }
        for g in net.sgen.iter().filter(|g| g.in_service) {
            if let Some(p) = position[g.bus] {
                s_spec[p] += C64::new(g.p_mw, g.q_mvar) / sn;
            }
        }

        let mut kind = vec![BusKind::Pq; n];
        let mut vm = vec![1.0; n];

        for g in net.gen.iter().filter(|g| g.in_service) {
            if let Some(p) = position[g.bus] {
                s_spec[p] += C64::new(g.p_mw / sn, 0.0);
                if kind[p] == BusKind::Pq {
                    kind[p] = BusKind::Pv;
                    vm[p] = g.vm_pu;
                }
            }
        }

        for e in net.ext_grid.iter().filter(|e| e.in_service) {
            if let Some(p) = position[e.bus] {
                if kind[p] != BusKind::Slack {
                    kind[p] = BusKind::Slack;
                    vm[p] = e.vm_pu;
                    start_angle[e.bus] = e.va_degree.to_radians();
                }
            }
        }

        let mut v0 = vec![C64::new(0.0, 0.0); n];
        for (b, slot) in position.iter().enumerate() {
            if let Some(p) = *slot {
                v0[p] = C64::from_polar(vm[p], start_angle[b]);
            }
        }

        Ok(Self {
            sn_mva: sn,
            position,
            kind,
            ybus,
            s_spec,
            v0,
            lines,
            trafos,
        })
    }

    fn len(&self) -> usize {
        self.kind.len()
    }

    fn currents(&self, v: &[C64]) -> Vec<C64> {
        let n = self.len();
        (0..n)
            .map(|i| (0..n).map(|k| self.ybus[(i, k)] * v[k]).sum())
            .collect()
    }

    /// Largest power mismatch over the equations being solved, in MVA
    fn mismatch(&self, v: &[C64], pvpq: &[usize], pq: &[usize]) -> (Vec<f64>, f64) {
        let current = self.currents(v);
        let mis: Vec<C64> = (0..self.len())
            .map(|i| v[i] * current[i].conj() - self.s_spec[i])
            .collect();

        let f: Vec<f64> = pvpq
            .iter()
            .map(|&i| mis[i].re)
            .chain(pq.iter().map(|&i| mis[i].im))
            .collect();
        let norm = f.iter().fold(0.0_f64, |acc, x| {
            if x.is_finite() && acc.is_finite() {
                acc.max(x.abs())
            } else {
                f64::NAN
            }
        });
        (f, norm * self.sn_mva)
    }

    fn index_sets(&self) -> (Vec<usize>, Vec<usize>) {
        let pvpq = (0..self.len()).filter(|&i| self.kind[i] != BusKind::Slack).collect();
        let pq = (0..self.len()).filter(|&i| self.kind[i] == BusKind::Pq).collect();
        (pvpq, pq)
    }

    fn newton_raphson(&self, options: &PowerFlowOptions) -> Iterate {
        let (pvpq, pq) = self.index_sets();
        let npvpq = pvpq.len();
        let dim = npvpq + pq.len();

        let mut vm: Vec<f64> = self.v0.iter().map(|v| v.norm()).collect();
        let mut va: Vec<f64> = self.v0.iter().map(|v| v.arg()).collect();
        let mut v = self.v0.clone();
        let mut iterations = 0;

        loop {
            let (f, norm) = self.mismatch(&v, &pvpq, &pq);
            if !norm.is_finite() {
                return Iterate::Stopped { iterations };
            }
            if norm < options.tolerance_mva {
                return Iterate::Converged { v, iterations };
            }
            if iterations >= options.max_iteration {
                return Iterate::Stopped { iterations };
            }

            let current = self.currents(&v);
            let j = C64::new(0.0, 1.0);
            let ds_dva = |i: usize, k: usize| {
                let diag = if i == k { current[i] } else { C64::new(0.0, 0.0) };
                j * v[i] * (diag - self.ybus[(i, k)] * v[k]).conj()
            };
            let ds_dvm = |i: usize, k: usize| {
                let off = v[i] * (self.ybus[(i, k)] * (v[k] / vm[k])).conj();
                if i == k {
                    off + current[i].conj() * (v[i] / vm[i])
                } else {
                    off
                }
            };

            let mut jac = DMatrix::<f64>::zeros(dim, dim);
            for (r, &i) in pvpq.iter().enumerate() {
                for (c, &k) in pvpq.iter().enumerate() {
                    jac[(r, c)] = ds_dva(i, k).re;
                }
                for (c, &k) in pq.iter().enumerate() {
                    jac[(r, npvpq + c)] = ds_dvm(i, k).re;
                }
            }
            for (r, &i) in pq.iter().enumerate() {
                for (c, &k) in pvpq.iter().enumerate() {
                    jac[(npvpq + r, c)] = ds_dva(i, k).im;
                }
                for (c, &k) in pq.iter().enumerate() {
                    jac[(npvpq + r, npvpq + c)] = ds_dvm(i, k).im;
                }
            }

            let rhs = DVector::from_vec(f);
            let Some(dx) = jac.lu().solve(&rhs) else {
                return Iterate::Stopped { iterations };
            };
            if dx.iter().any(|x| !x.is_finite()) {
                return Iterate::Stopped { iterations };
            }

            for (r, &i) in pvpq.iter().enumerate() {
                va[i] -= dx[r];
            }
            for (r, &i) in pq.iter().enumerate() {
                vm[i] -= dx[npvpq + r];
            }
            v = vm
                .iter()
                .zip(va.iter())
                .map(|(&m, &a)| C64::from_polar(m, a))
                .collect();
            iterations += 1;
        }
    }

    fn gauss_seidel(&self, options: &PowerFlowOptions) -> Iterate {
        let (pvpq, pq) = self.index_sets();
        let vm_set: Vec<f64> = self.v0.iter().map(|v| v.norm()).collect();
        let mut v = self.v0.clone();
        let mut iterations = 0;

        loop {
            let (_, norm) = self.mismatch(&v, &pvpq, &pq);
            if !norm.is_finite() {
                return Iterate::Stopped { iterations };
            }
            if norm < options.tolerance_mva {
                return Iterate::Converged { v, iterations };
            }
            if iterations >= options.max_iteration {
                return Iterate::Stopped { iterations };
            }

            for &i in &pvpq {
                let yii = self.ybus[(i, i)];
                if yii.norm() == 0.0 {
                    return Iterate::Stopped { iterations };
                }
                let sum: C64 = (0..self.len()).map(|k| self.ybus[(i, k)] * v[k]).sum();
                let mut s = self.s_spec[i];
                if self.kind[i] == BusKind::Pv {
                    s.im = (v[i] * sum.conj()).im;
                }
                let others = sum - yii * v[i];
                let mut vi = ((s / v[i]).conj() - others) / yii;
                if self.kind[i] == BusKind::Pv {
                    vi = vi / vi.norm() * vm_set[i];
                }
                v[i] = vi;
            }
            iterations += 1;
        }
    }

    fn results(
        &self,
        net: &Network,
        v: &[C64],
        iterations: usize,
        algorithm: Algorithm,
    ) -> PowerFlowResults {
        let sn = self.sn_mva;
        let current = self.currents(v);
        let injection: Vec<C64> = (0..self.len()).map(|i| v[i] * current[i].conj()).collect();

        let bus: Vec<BusResult> = (0..net.bus.len())
            .map(|b| match self.position[b] {
                Some(p) => BusResult {
                    index: b,
                    vm_pu: v[p].norm(),
                    va_degree: v[p].arg().to_degrees(),
                    p_mw: -injection[p].re * sn,
                    q_mvar: -injection[p].im * sn,
                },
                None => BusResult {
                    index: b,
                    vm_pu: f64::NAN,
                    va_degree: f64::NAN,
                    p_mw: f64::NAN,
                    q_mvar: f64::NAN,
                },
            })
            .collect();

        let i_base_ka = |bus: usize| sn / (SQRT_3 * net.bus[bus].vn_kv);

        let line = net
            .line
            .iter()
            .enumerate()
            .map(|(idx, l)| {
                let mut row = LineResult {
                    index: idx,
                    p_from_mw: 0.0,
                    q_from_mvar: 0.0,
                    p_to_mw: 0.0,
                    q_to_mvar: 0.0,
                    pl_mw: 0.0,
                    ql_mvar: 0.0,
                    i_from_ka: 0.0,
                    i_to_ka: 0.0,
                    i_ka: 0.0,
                    vm_from_pu: bus[l.from_bus].vm_pu,
                    vm_to_pu: bus[l.to_bus].vm_pu,
                    loading_percent: 0.0,
                };
                if let Some(br) = &self.lines[idx] {
                    let (i_f, i_t) = br.currents(v);
                    let s_f = v[br.from] * i_f.conj() * sn;
                    let s_t = v[br.to] * i_t.conj() * sn;
                    row.p_from_mw = s_f.re;
                    row.q_from_mvar = s_f.im;
                    row.p_to_mw = s_t.re;
                    row.q_to_mvar = s_t.im;
                    row.pl_mw = s_f.re + s_t.re;
                    row.ql_mvar = s_f.im + s_t.im;
                    row.i_from_ka = i_f.norm() * i_base_ka(l.from_bus);
                    row.i_to_ka = i_t.norm() * i_base_ka(l.to_bus);
                    row.i_ka = row.i_from_ka.max(row.i_to_ka);
                    let limit = l.max_i_ka * f64::from(l.parallel);
                    row.loading_percent = if limit > 0.0 {
                        row.i_ka / limit * 100.0
                    } else {
                        f64::NAN
                    };
                }
                row
            })
            .collect();

        let trafo = net
            .trafo
            .iter()
            .enumerate()
            .map(|(idx, t)| {
                let mut row = TrafoResult {
                    index: idx,
                    p_hv_mw: 0.0,
                    q_hv_mvar: 0.0,
                    p_lv_mw: 0.0,
                    q_lv_mvar: 0.0,
                    pl_mw: 0.0,
                    ql_mvar: 0.0,
                    i_hv_ka: 0.0,
                    i_lv_ka: 0.0,
                    loading_percent: 0.0,
                };
                if let Some(br) = &self.trafos[idx] {
                    let (i_hv, i_lv) = br.currents(v);
                    let s_hv = v[br.from] * i_hv.conj() * sn;
                    let s_lv = v[br.to] * i_lv.conj() * sn;
                    row.p_hv_mw = s_hv.re;
                    row.q_hv_mvar = s_hv.im;
                    row.p_lv_mw = s_lv.re;
                    row.q_lv_mvar = s_lv.im;
                    row.pl_mw = s_hv.re + s_lv.re;
                    row.ql_mvar = s_hv.im + s_lv.im;
                    row.i_hv_ka = i_hv.norm() * i_base_ka(t.hv_bus);
                    row.i_lv_ka = i_lv.norm() * i_base_ka(t.lv_bus);
                    let s_hv_mva = row.i_hv_ka * SQRT_3 * net.bus[t.hv_bus].vn_kv;
                    let s_lv_mva = row.i_lv_ka * SQRT_3 * net.bus[t.lv_bus].vn_kv;
                    row.loading_percent = s_hv_mva.max(s_lv_mva) / t.sn_mva * 100.0;
                }
                row
            })
            .collect();

        // The slack injection not explained by local elements comes from the
        // external grids at that bus, shared equally between them.
        let mut grids_at = vec![0usize; self.len()];
        for e in net.ext_grid.iter().filter(|e| e.in_service) {
            if let Some(p) = self.position[e.bus] {
                grids_at[p] += 1;
            }
        }
        let ext_grid = net
            .ext_grid
            .iter()
            .enumerate()
            .map(|(idx, e)| {
                let supplied = match (e.in_service, self.position[e.bus]) {
                    (true, Some(p)) => (injection[p] - self.s_spec[p]) * sn / grids_at[p] as f64,
                    _ => C64::new(0.0, 0.0),
                };
                ExtGridResult {
                    index: idx,
                    p_mw: supplied.re,
                    q_mvar: supplied.im,
                }
            })
            .collect();

        PowerFlowResults {
            converged: true,
            iterations,
            algorithm: algorithm.as_str().to_string(),
            bus,
            line,
            trafo,
            ext_grid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::network::fixtures::{ring_network, two_bus};

    fn run(net: &Network, options: PowerFlowOptions) -> PowerFlowResults {
        AcPowerFlowEngine.run(net, &options).expect("engine should not fail")
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("nr".parse::<Algorithm>().unwrap(), Algorithm::NewtonRaphson);
        assert_eq!("GS".parse::<Algorithm>().unwrap(), Algorithm::GaussSeidel);
        assert!(matches!(
            "bfsw".parse::<Algorithm>(),
            Err(GridError::SolveFailure(_))
        ));
    }

    #[test]
    fn test_two_bus_converges() {
        let res = run(&two_bus(1.0), PowerFlowOptions::default());
        assert!(res.converged);
        assert_eq!(res.bus.len(), 2);
        assert_eq!(res.line.len(), 1);

        let vm = res.bus[1].vm_pu;
        assert!(vm < 1.0 && vm > 0.98, "unexpected receiving voltage {}", vm);
        assert!((res.bus[1].p_mw - 1.0).abs() < 1e-6);

        // Supply = load + losses
        let supplied = res.ext_grid[0].p_mw;
        assert!((supplied - 1.0 - res.line[0].pl_mw).abs() < 1e-6);
        assert!(res.line[0].loading_percent > 20.0 && res.line[0].loading_percent < 40.0);
    }

    #[test]
    fn test_infeasible_load_does_not_converge() {
        let res = run(&two_bus(500.0), PowerFlowOptions::default());
        assert!(!res.converged);
        assert!(res.bus.is_empty());
    }

    #[test]
    fn test_ring_network_with_trafo() {
        let res = run(&ring_network(), PowerFlowOptions::default());
        assert!(res.converged);
        assert!((res.bus[0].vm_pu - 1.02).abs() < 1e-9);
        assert!(res.voltage_violations().is_empty());
        assert!(res.loading_violations().is_empty());
        assert!(res.trafo[0].loading_percent > 0.0);
        assert!(res.trafo[0].p_hv_mw > 3.5);
    }

    #[test]
    fn test_gauss_seidel_matches_newton_raphson() {
        let net = two_bus(1.0);
        let nr = run(&net, PowerFlowOptions::default());
        let gs = run(
            &net,
            PowerFlowOptions {
                algorithm: Algorithm::GaussSeidel,
                max_iteration: 2000,
                tolerance_mva: 1e-6,
                ..Default::default()
            },
        );
        assert!(gs.converged);
        assert_eq!(gs.algorithm, "gs");
        assert!((gs.bus[1].vm_pu - nr.bus[1].vm_pu).abs() < 1e-5);
    }

    #[test]
    fn test_pv_bus_holds_voltage() {
        let mut net = ring_network();
        net.add_gen(3, 1.0, 1.01);
        let res = run(&net, PowerFlowOptions::default());
        assert!(res.converged);
        assert!((res.bus[3].vm_pu - 1.01).abs() < 1e-8);
    }

    #[test]
    fn test_isolated_bus_reports_nan() {
        let mut net = two_bus(1.0);
        net.add_bus("island", 20.0);
        let res = run(&net, PowerFlowOptions::default());
        assert!(res.converged);
        assert!(res.bus[2].vm_pu.is_nan());
        assert!(res.voltage_violations().is_empty());
    }

    #[test]
    fn test_structural_failures() {
        let mut no_slack = two_bus(1.0);
        no_slack.ext_grid.clear();
        assert!(matches!(
            AcPowerFlowEngine.run(&no_slack, &PowerFlowOptions::default()),
            Err(GridError::SolveFailure(_))
        ));

        let mut zero_z = two_bus(1.0);
        zero_z.line[0].r_ohm_per_km = 0.0;
        zero_z.line[0].x_ohm_per_km = 0.0;
        assert!(matches!(
            AcPowerFlowEngine.run(&zero_z, &PowerFlowOptions::default()),
            Err(GridError::SolveFailure(_))
        ));

        let bad_options = PowerFlowOptions {
            max_iteration: 0,
            ..Default::default()
        };
        assert!(matches!(
            AcPowerFlowEngine.run(&two_bus(1.0), &bad_options),
            Err(GridError::SolveFailure(_))
        ));
    }

    #[test]
    fn test_phase_shift_only_with_voltage_angles() {
        let mut net = ring_network();
        net.trafo[0].shift_degree = 150.0;

        let with = run(&net, PowerFlowOptions::default());
        let without = run(
            &net,
            PowerFlowOptions {
                calculate_voltage_angles: false,
                ..Default::default()
            },
        );
        assert!(with.converged && without.converged);
        assert!((with.bus[1].va_degree - without.bus[1].va_degree).abs() > 100.0);
        assert!((with.bus[1].vm_pu - without.bus[1].vm_pu).abs() < 1e-6);
    }
}
