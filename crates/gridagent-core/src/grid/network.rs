//! Tabular grid model and its two on-disk formats
//!
//! A `Network` is a set of element tables (buses, lines, transformers, ...).
//! Each row is addressed by its position in the table and elements refer to
//! buses by that index. Two serializations are supported:
//!
//! - `.json`: human-readable, `serde_json`
//! - `.p`: compact binary snapshot, `bincode`
//!
//! The binary format is not self-describing, so these types must not use
//! `skip_serializing_if`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{GridError, GridResult};

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_parallel() -> u32 {
    1
}

fn default_f_hz() -> f64 {
    50.0
}

/// A bus (node) of the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    #[serde(default)]
    pub name: String,
    /// Nominal voltage in kV
    pub vn_kv: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// An overhead line or cable between two buses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub name: String,
    pub from_bus: usize,
    pub to_bus: usize,
    pub length_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    #[serde(default)]
    pub c_nf_per_km: f64,
    /// Thermal current limit of one system, in kA
    pub max_i_ka: f64,
    #[serde(default = "default_parallel")]
    pub parallel: u32,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// A two-winding transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trafo {
    #[serde(default)]
    pub name: String,
    pub hv_bus: usize,
    pub lv_bus: usize,
    pub sn_mva: f64,
    pub vn_hv_kv: f64,
    pub vn_lv_kv: f64,
    /// Short-circuit voltage in percent
    pub vk_percent: f64,
    /// Real part of the short-circuit voltage in percent
    #[serde(default)]
    pub vkr_percent: f64,
    /// Phase shift between the hv and lv side
    #[serde(default)]
    pub shift_degree: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// A constant-power load (consumer convention)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    #[serde(default)]
    pub name: String,
    pub bus: usize,
    pub p_mw: f64,
    #[serde(default)]
    pub q_mvar: f64,
    #[serde(default = "default_one")]
    pub scaling: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// A voltage-controlled generator (PV bus)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gen {
    #[serde(default)]
    pub name: String,
    pub bus: usize,
    pub p_mw: f64,
    #[serde(default = "default_one")]
    pub vm_pu: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// A static generator with fixed P and Q (generator convention)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticGen {
    #[serde(default)]
    pub name: String,
    pub bus: usize,
    pub p_mw: f64,
    #[serde(default)]
    pub q_mvar: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// Connection to an upstream grid; acts as the slack bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtGrid {
    #[serde(default)]
    pub name: String,
    pub bus: usize,
    #[serde(default = "default_one")]
    pub vm_pu: f64,
    #[serde(default)]
    pub va_degree: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// What a switch connects its bus to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchElement {
    Line,
    Trafo,
}

/// A switch at the terminal of a line or transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    #[serde(default)]
    pub name: String,
    pub bus: usize,
    pub element: usize,
    pub et: SwitchElement,
    #[serde(default = "default_true")]
    pub closed: bool,
}

/// Element counts reported after create/load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub buses: usize,
    pub lines: usize,
    pub trafos: usize,
}

/// On-disk network formats, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFormat {
    Json,
    Binary,
}

impl NetworkFormat {
    /// Pick the format from a path's extension; `None` for anything else
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(NetworkFormat::Json),
            Some("p") => Some(NetworkFormat::Binary),
            _ => None,
        }
    }
}

/// A complete grid model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_f_hz")]
    pub f_hz: f64,
    /// System base power for per-unit conversion
    #[serde(default = "default_one")]
    pub sn_mva: f64,
    #[serde(default)]
    pub bus: Vec<Bus>,
    #[serde(default)]
    pub line: Vec<Line>,
    #[serde(default)]
    pub trafo: Vec<Trafo>,
    #[serde(default)]
    pub load: Vec<Load>,
    #[serde(default)]
    pub gen: Vec<Gen>,
    #[serde(default)]
    pub sgen: Vec<StaticGen>,
    #[serde(default)]
    pub ext_grid: Vec<ExtGrid>,
    #[serde(default)]
    pub switch: Vec<Switch>,
}

impl Default for Network {
    fn default() -> Self {
        Self::empty()
    }
}

impl Network {
    /// Create a network without any elements
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            f_hz: default_f_hz(),
            sn_mva: 1.0,
            bus: Vec::new(),
            line: Vec::new(),
            trafo: Vec::new(),
            load: Vec::new(),
            gen: Vec::new(),
            sgen: Vec::new(),
            ext_grid: Vec::new(),
            switch: Vec::new(),
        }
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            buses: self.bus.len(),
            lines: self.line.len(),
            trafos: self.trafo.len(),
        }
    }

    pub fn add_bus(&mut self, name: impl Into<String>, vn_kv: f64) -> usize {
        self.bus.push(Bus {
            name: name.into(),
            vn_kv,
            in_service: true,
        });
        self.bus.len() - 1
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_line(
        &mut self,
        from_bus: usize,
        to_bus: usize,
        length_km: f64,
        r_ohm_per_km: f64,
        x_ohm_per_km: f64,
        c_nf_per_km: f64,
        max_i_ka: f64,
    ) -> usize {
        self.line.push(Line {
            name: format!("line {}-{}", from_bus, to_bus),
            from_bus,
            to_bus,
            length_km,
            r_ohm_per_km,
            x_ohm_per_km,
            c_nf_per_km,
            max_i_ka,
            parallel: 1,
            in_service: true,
        });
        self.line.len() - 1
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_trafo(
        &mut self,
        hv_bus: usize,
        lv_bus: usize,
        sn_mva: f64,
        vn_hv_kv: f64,
        vn_lv_kv: f64,
        vk_percent: f64,
        vkr_percent: f64,
    ) -> usize {
        self.trafo.push(Trafo {
            name: format!("trafo {}-{}", hv_bus, lv_bus),
            hv_bus,
            lv_bus,
            sn_mva,
            vn_hv_kv,
            vn_lv_kv,
            vk_percent,
            vkr_percent,
            shift_degree: 0.0,
            in_service: true,
        });
        self.trafo.len() - 1
    }

    pub fn add_load(&mut self, bus: usize, p_mw: f64, q_mvar: f64) -> usize {
        self.load.push(Load {
            name: String::new(),
            bus,
            p_mw,
            q_mvar,
            scaling: 1.0,
            in_service: true,
        });
        self.load.len() - 1
    }

    pub fn add_gen(&mut self, bus: usize, p_mw: f64, vm_pu: f64) -> usize {
        self.gen.push(Gen {
            name: String::new(),
            bus,
            p_mw,
            vm_pu,
            in_service: true,
        });
        self.gen.len() - 1
    }

    pub fn add_sgen(&mut self, bus: usize, p_mw: f64, q_mvar: f64) -> usize {
        self.sgen.push(StaticGen {
            name: String::new(),
            bus,
            p_mw,
            q_mvar,
            in_service: true,
        });
        self.sgen.len() - 1
    }

    pub fn add_ext_grid(&mut self, bus: usize, vm_pu: f64) -> usize {
        self.ext_grid.push(ExtGrid {
            name: String::new(),
            bus,
            vm_pu,
            va_degree: 0.0,
            in_service: true,
        });
        self.ext_grid.len() - 1
    }

    /// Whether a line carries current: in service and no open terminal switch
    pub fn line_active(&self, idx: usize) -> bool {
        self.line.get(idx).map_or(false, |l| l.in_service)
            && !self.has_open_switch(SwitchElement::Line, idx)
    }

    /// Whether a transformer carries current
    pub fn trafo_active(&self, idx: usize) -> bool {
        self.trafo.get(idx).map_or(false, |t| t.in_service)
            && !self.has_open_switch(SwitchElement::Trafo, idx)
    }

    fn has_open_switch(&self, et: SwitchElement, element: usize) -> bool {
        self.switch
            .iter()
            .any(|s| s.et == et && s.element == element && !s.closed)
    }

    /// Check that every bus reference resolves and parameters are usable
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sn_mva > 0.0) {
            return Err(format!("sn_mva must be positive, got {}", self.sn_mva));
        }
        if !(self.f_hz > 0.0) {
            return Err(format!("f_hz must be positive, got {}", self.f_hz));
        }

        let n = self.bus.len();
        let check = |table: &str, idx: usize, field: &str, bus: usize| {
            if bus >= n {
                Err(format!(
                    "{}[{}].{} refers to unknown bus {}",
                    table, idx, field, bus
                ))
            } else {
                Ok(())
            }
        };

        for (i, b) in self.bus.iter().enumerate() {
            if !(b.vn_kv > 0.0) {
                return Err(format!("bus[{}].vn_kv must be positive", i));
            }
        }
        for (i, l) in self.line.iter().enumerate() {
            check("line", i, "from_bus", l.from_bus)?;
            check("line", i, "to_bus", l.to_bus)?;
            if l.parallel == 0 {
                return Err(format!("line[{}].parallel must be at least 1", i));
            }
        }
        for (i, t) in self.trafo.iter().enumerate() {
            check("trafo", i, "hv_bus", t.hv_bus)?;
            check("trafo", i, "lv_bus", t.lv_bus)?;
            if !(t.sn_mva > 0.0) {
                return Err(format!("trafo[{}].sn_mva must be positive", i));
            }
        }
        for (i, l) in self.load.iter().enumerate() {
            check("load", i, "bus", l.bus)?;
        }
        for (i, g) in self.gen.iter().enumerate() {
            check("gen", i, "bus", g.bus)?;
        }
        for (i, g) in self.sgen.iter().enumerate() {
            check("sgen", i, "bus", g.bus)?;
        }
        for (i, e) in self.ext_grid.iter().enumerate() {
            check("ext_grid", i, "bus", e.bus)?;
        }
        for (i, s) in self.switch.iter().enumerate() {
            check("switch", i, "bus", s.bus)?;
            let count = match s.et {
                SwitchElement::Line => self.line.len(),
                SwitchElement::Trafo => self.trafo.len(),
            };
            if s.element >= count {
                return Err(format!(
                    "switch[{}] refers to unknown {:?} {}",
                    i, s.et, s.element
                ));
            }
        }
        Ok(())
    }

    /// Read a network from disk; the extension selects the format
    pub fn read_from(path: &Path) -> GridResult<Self> {
        let display = path.display().to_string();
        let format = NetworkFormat::from_path(path)
            .ok_or_else(|| GridError::UnsupportedFormat(display.clone()))?;

        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GridError::FileNotFound(display.clone()),
            _ => GridError::LoadFailure(format!("{}: {}", display, e)),
        })?;

        let net: Network = match format {
            NetworkFormat::Json => serde_json::from_slice(&bytes)
                .map_err(|e| GridError::LoadFailure(format!("invalid JSON in {}: {}", display, e)))?,
            NetworkFormat::Binary => bincode::deserialize(&bytes).map_err(|e| {
                GridError::LoadFailure(format!("invalid binary network in {}: {}", display, e))
            })?,
        };

        net.validate().map_err(GridError::LoadFailure)?;
        Ok(net)
    }

    /// Write the network to disk; the extension selects the format
    pub fn write_to(&self, path: &Path) -> GridResult<()> {
        let display = path.display().to_string();
        let format = NetworkFormat::from_path(path)
            .ok_or_else(|| GridError::UnsupportedFormat(display.clone()))?;

        let bytes = match format {
            NetworkFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| GridError::SaveFailure(e.to_string()))?,
            NetworkFormat::Binary => {
                bincode::serialize(self).map_err(|e| GridError::SaveFailure(e.to_string()))?
            }
        };

        fs::write(path, bytes).map_err(|e| GridError::SaveFailure(format!("{}: {}", display, e)))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Network;

    /// 110 kV ext grid, one transformer, a 20 kV ring of three lines
    pub fn ring_network() -> Network {
        let mut net = Network::empty();
        net.name = "ring".to_string();
        let hv = net.add_bus("HV", 110.0);
        let b1 = net.add_bus("MV1", 20.0);
        let b2 = net.add_bus("MV2", 20.0);
        let b3 = net.add_bus("MV3", 20.0);
        net.add_ext_grid(hv, 1.02);
        net.add_trafo(hv, b1, 25.0, 110.0, 20.0, 12.0, 0.41);
        net.add_line(b1, b2, 4.0, 0.161, 0.117, 273.0, 0.362);
        net.add_line(b2, b3, 3.0, 0.161, 0.117, 273.0, 0.362);
        net.add_line(b3, b1, 5.0, 0.161, 0.117, 273.0, 0.362);
        net.add_load(b2, 2.0, 0.5);
        net.add_load(b3, 1.5, 0.3);
        net
    }

    /// Two 20 kV buses over a 10 km line
    pub fn two_bus(load_mw: f64) -> Network {
        let mut net = Network::empty();
        let a = net.add_bus("source", 20.0);
        let b = net.add_bus("sink", 20.0);
        net.add_ext_grid(a, 1.0);
        net.add_line(a, b, 10.0, 0.5, 0.4, 0.0, 0.1);
        net.add_load(b, load_mw, 0.0);
        net
    }
}
