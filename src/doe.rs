//! Design-of-Experiments Sweep
//!
//! Builds an MMI for every (width, length) pair of a near-square grid and
//! writes each one to its own GDS file.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::LayoutResult;
use crate::gds::write_gds;
use crate::mmi::{mmi_2x2, MmiConfig};

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "doe_manifest.json";

/// Sweep parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoeConfig {
    pub output_dir: PathBuf,
    /// Target number of designs. Each axis gets `ceil(sqrt(n_grid))` values.
    pub n_grid: usize,
    pub width_range: (f64, f64),
    pub length_range: (f64, f64),
    /// Parameters held fixed across the sweep.
    pub base: MmiConfig,
    pub write_manifest: bool,
}

impl Default for DoeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("mmi_doe_gds"),
            n_grid: 9,
            width_range: (2.0, 4.0),
            length_range: (20.0, 40.0),
            base: MmiConfig::default(),
            write_manifest: false,
        }
    }
}

impl DoeConfig {
    pub fn new(output_dir: impl Into<PathBuf>, n_grid: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            n_grid,
            ..Default::default()
        }
    }

    /// Sweep values along each axis.
    pub fn axes(&self) -> (Array1<f64>, Array1<f64>) {
        let k = points_per_axis(self.n_grid);
        (
            linspace(self.width_range.0, self.width_range.1, k),
            linspace(self.length_range.0, self.length_range.1, k),
        )
    }
}

/// `ceil(sqrt(n_grid))`, computed exactly on integers.
pub fn points_per_axis(n_grid: usize) -> usize {
    let mut k = (n_grid as f64).sqrt() as usize;
    while k * k < n_grid {
        k += 1;
    }
    while k > 0 && (k - 1) * (k - 1) >= n_grid {
        k -= 1;
    }
    k
}

/// `n` evenly spaced values over [start, end]; a single value is `start`.
pub fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => Array1::linspace(start, end, n),
    }
}

/// File name for one grid point, with both values rounded to two decimals.
pub fn doe_file_name(width_mmi: f64, length_mmi: f64) -> String {
    format!("mmi_w{:.2}_L{:.2}.gds", width_mmi, length_mmi)
}

/// One written design.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoeEntry {
    pub file_name: String,
    pub cell_name: String,
    pub width_mmi: f64,
    pub length_mmi: f64,
}

/// Outcome of a sweep, in write order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DoeReport {
    pub output_dir: PathBuf,
    pub written: Vec<DoeEntry>,
}

impl DoeReport {
    pub fn total(&self) -> usize {
        self.written.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.written.iter().map(|e| self.output_dir.join(&e.file_name))
    }

    /// Save the report as a JSON manifest.
    pub fn save_manifest(&self, path: &Path) -> LayoutResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a manifest written by [`DoeReport::save_manifest`].
    pub fn load_manifest(path: &Path) -> LayoutResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Run the sweep: width outer, length inner. The first failing design aborts
/// the remaining ones. Existing files with the same names are overwritten.
pub fn generate_doe_gds(cfg: &DoeConfig) -> LayoutResult<DoeReport> {
    fs::create_dir_all(&cfg.output_dir)?;
    let (widths, lengths) = cfg.axes();

    let mut report = DoeReport {
        output_dir: cfg.output_dir.clone(),
        written: Vec::with_capacity(widths.len() * lengths.len()),
    };

    for &w in widths.iter() {
        for &l in lengths.iter() {
            let mmi_cfg = cfg.base.clone().with_width(w).with_length(l);
            let comp = mmi_2x2(&mmi_cfg)?;
            let file_name = doe_file_name(w, l);
            let path = cfg.output_dir.join(&file_name);
            write_gds(&comp, &path)?;
            info!("Wrote {}", path.display());

            report.written.push(DoeEntry {
                file_name,
                cell_name: comp.name().to_string(),
                width_mmi: w,
                length_mmi: l,
            });
        }
    }

    if cfg.write_manifest {
        report.save_manifest(&cfg.output_dir.join(MANIFEST_FILE))?;
    }
    info!(total = report.total(), dir = %cfg.output_dir.display(), "Total designs: {}", report.total());
    Ok(report)
}
