//! 2x2 Multimode Interference Coupler
//!
//! Geometric envelope of a self-imaging 2x2 MMI: two input tapers, a
//! rectangular multimode section and two output tapers.
//!
//! ```text
//!        in2 ──▷┌──────────────┐◁── out2
//!               │  multimode   │
//!        in1 ──▷└──────────────┘◁── out1
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::component::{Component, Instance};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::Layer;
use crate::primitives::{changed_cell_name, layer_suffix, rectangle, taper};

/// MMI geometry parameters. All lengths in um.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MmiConfig {
    pub width_mmi: f64,
    pub length_mmi: f64,
    pub input_width: f64,
    pub output_width: f64,
    pub taper_length: f64,
    pub gap_mmi: f64,
    pub layer: Layer,
}

impl Default for MmiConfig {
    fn default() -> Self {
        Self {
            width_mmi: 3.0,
            length_mmi: 30.0,
            input_width: 0.5,
            output_width: 0.5,
            taper_length: 10.0,
            gap_mmi: 0.20,
            layer: Layer::WG,
        }
    }
}

impl MmiConfig {
    pub fn with_width(mut self, width_mmi: f64) -> Self {
        self.width_mmi = width_mmi;
        self
    }

    pub fn with_length(mut self, length_mmi: f64) -> Self {
        self.length_mmi = length_mmi;
        self
    }

    /// Width each taper reaches at the multimode section, so that both tapers
    /// and the gap fill `width_mmi` exactly.
    pub fn width_taper(&self) -> f64 {
        (self.width_mmi - self.gap_mmi) / 2.0
    }

    /// Centre-to-centre spacing of the two arms.
    pub fn pitch(&self) -> f64 {
        self.gap_mmi + self.width_taper()
    }

    /// Total length from input to output ports.
    pub fn total_length(&self) -> f64 {
        self.length_mmi + 2.0 * self.taper_length
    }

    /// Reject degenerate parameter sets before any geometry is built.
    pub fn validate(&self) -> LayoutResult<()> {
        let positive = [
            ("width_mmi", self.width_mmi),
            ("length_mmi", self.length_mmi),
            ("input_width", self.input_width),
            ("output_width", self.output_width),
            ("taper_length", self.taper_length),
            ("gap_mmi", self.gap_mmi),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(LayoutError::InvalidParameter {
                    name,
                    value,
                    reason: "must be positive and finite".to_string(),
                });
            }
        }
        if self.gap_mmi >= self.width_mmi {
            return Err(LayoutError::InvalidParameter {
                name: "gap_mmi",
                value: self.gap_mmi,
                reason: format!("must be smaller than width_mmi = {}", self.width_mmi),
            });
        }
        Ok(())
    }

    fn cell_name(&self) -> String {
        let d = Self::default();
        let mut name = changed_cell_name(
            "mmi_2x2",
            &[
                ("W", self.width_mmi, d.width_mmi),
                ("L", self.length_mmi, d.length_mmi),
                ("IW", self.input_width, d.input_width),
                ("OW", self.output_width, d.output_width),
                ("TL", self.taper_length, d.taper_length),
                ("G", self.gap_mmi, d.gap_mmi),
            ],
        );
        if self.layer != d.layer {
            name.push('_');
            name.push_str(&layer_suffix(self.layer));
        }
        name
    }
}

/// Metadata attached to every MMI cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MmiInfo {
    pub width_mmi: f64,
    pub length_mmi: f64,
    pub input_width: f64,
    pub output_width: f64,
    pub taper_length: f64,
    pub gap_mmi: f64,
    pub width_taper: f64,
    pub pitch: f64,
}

impl From<&MmiConfig> for MmiInfo {
    fn from(cfg: &MmiConfig) -> Self {
        Self {
            width_mmi: cfg.width_mmi,
            length_mmi: cfg.length_mmi,
            input_width: cfg.input_width,
            output_width: cfg.output_width,
            taper_length: cfg.taper_length,
            gap_mmi: cfg.gap_mmi,
            width_taper: cfg.width_taper(),
            pitch: cfg.pitch(),
        }
    }
}

/// Build the 2x2 MMI cell with ports `in1`, `in2`, `out1`, `out2`.
///
/// Inputs sit at x = 0 and outputs at x = `length_mmi + 2 * taper_length`,
/// both pairs at y = -pitch/2 (`*1`) and +pitch/2 (`*2`).
pub fn mmi_2x2(cfg: &MmiConfig) -> LayoutResult<Component> {
    cfg.validate()?;
    let width_taper = cfg.width_taper();
    let pitch = cfg.pitch();

    let mut c = Component::new(cfg.cell_name());

    let taper_in = Arc::new(taper(cfg.taper_length, cfg.input_width, width_taper, cfg.layer)?);
    let taper_out = Arc::new(taper(cfg.taper_length, width_taper, cfg.output_width, cfg.layer)?);
    let body = Arc::new(rectangle((cfg.length_mmi, cfg.width_mmi), cfg.layer, false)?);

    let taper_in1 = Instance::new(Arc::clone(&taper_in)).moved(0.0, -pitch / 2.0);
    let taper_in2 = Instance::new(taper_in).moved(0.0, pitch / 2.0);
    let mmi_rect = Instance::new(body).moved(cfg.taper_length, -cfg.width_mmi / 2.0);
    let out_x = cfg.length_mmi + cfg.taper_length;
    let taper_out1 = Instance::new(Arc::clone(&taper_out)).moved(out_x, -pitch / 2.0);
    let taper_out2 = Instance::new(taper_out).moved(out_x, pitch / 2.0);

    c.add_port("in1", &taper_in1.port("o1")?)?;
    c.add_port("in2", &taper_in2.port("o1")?)?;
    c.add_port("out1", &taper_out1.port("o2")?)?;
    c.add_port("out2", &taper_out2.port("o2")?)?;

    for inst in [taper_in1, taper_in2, mmi_rect, taper_out1, taper_out2] {
        c.add_instance(inst);
    }

    c.set_info(&MmiInfo::from(cfg))?;
    debug!(cell = %c.name(), width_taper, pitch, "built mmi_2x2");
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use pretty_assertions::assert_eq;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_default_derived_values() {
        let cfg = MmiConfig::default();
        assert!((cfg.width_taper() - 1.4).abs() < TOL);
        assert!((cfg.pitch() - 1.6).abs() < TOL);
    }

    #[test]
    fn test_default_port_positions() {
        let c = mmi_2x2(&MmiConfig::default()).unwrap();
        assert_eq!(c.port_names(), vec!["in1", "in2", "out1", "out2"]);

        let in1 = c.port("in1").unwrap();
        let in2 = c.port("in2").unwrap();
        assert!(in1.center.approx_eq(Point::new(0.0, -0.8), TOL));
        assert!(in2.center.approx_eq(Point::new(0.0, 0.8), TOL));
        assert!((in1.orientation - 180.0).abs() < TOL);

        let out1 = c.port("out1").unwrap();
        let out2 = c.port("out2").unwrap();
        assert!(out1.center.approx_eq(Point::new(50.0, -0.8), TOL));
        assert!(out2.center.approx_eq(Point::new(50.0, 0.8), TOL));
        assert!(out1.orientation.abs() < TOL);
        assert_eq!(out1.width, 0.5);
    }

    #[test]
    fn test_port_geometry_across_parameters() {
        let widths = [1.5, 2.0, 3.3, 6.0];
        let gaps = [0.1, 0.2, 0.5];
        let taper_lengths = [5.0, 10.0, 20.0];
        for &w in &widths {
            for &g in &gaps {
                for &tl in &taper_lengths {
                    let cfg = MmiConfig {
                        width_mmi: w,
                        gap_mmi: g,
                        taper_length: tl,
                        length_mmi: 25.0,
                        ..Default::default()
                    };
                    assert!(cfg.width_taper() > 0.0);
                    assert!((cfg.pitch() - (g + cfg.width_taper())).abs() < TOL);

                    let c = mmi_2x2(&cfg).unwrap();
                    let half = cfg.pitch() / 2.0;
                    let in1 = c.port("in1").unwrap();
                    let in2 = c.port("in2").unwrap();
                    let out1 = c.port("out1").unwrap();
                    let out2 = c.port("out2").unwrap();
                    assert!((in1.center.y + half).abs() < TOL);
                    assert!((in2.center.y - half).abs() < TOL);
                    assert!((out1.center.y + half).abs() < TOL);
                    assert!((out2.center.y - half).abs() < TOL);
                    assert!((out1.center.x - in1.center.x - (25.0 + 2.0 * tl)).abs() < TOL);
                    assert!((out2.center.x - in2.center.x - (25.0 + 2.0 * tl)).abs() < TOL);
                }
            }
        }
    }

    #[test]
    fn test_tapers_fill_mmi_width() {
        let cfg = MmiConfig::default();
        let c = mmi_2x2(&cfg).unwrap();
        let bb = c.bbox().unwrap();
        assert!((bb.height() - cfg.width_mmi).abs() < TOL);
        assert!((bb.width() - cfg.total_length()).abs() < TOL);

        // Outer edge of the upper input taper meets the top of the body.
        let upper_taper_top = c.instances()[1]
            .cell
            .polygons()[0]
            .points
            .iter()
            .map(|p| p.y + cfg.pitch() / 2.0)
            .fold(f64::MIN, f64::max);
        assert!((upper_taper_top - cfg.width_mmi / 2.0).abs() < TOL);
    }

    #[test]
    fn test_metadata_record() {
        let cfg = MmiConfig::default().with_width(2.5).with_length(22.0);
        let c = mmi_2x2(&cfg).unwrap();
        let info: MmiInfo = c.info_as().unwrap();
        assert_eq!(info, MmiInfo::from(&cfg));
        assert_eq!(c.info_f64("gap_mmi"), Some(0.2));
        assert_eq!(c.name(), "mmi_2x2_W2p5_L22");
    }

    #[test]
    fn test_polygons_on_waveguide_layer() {
        let c = mmi_2x2(&MmiConfig::default()).unwrap();
        assert_eq!(c.polygons_on(Layer::WG).len(), 5);
        assert_eq!(mmi_2x2(&MmiConfig::default()).unwrap().name(), "mmi_2x2");
    }

    #[test]
    fn test_gap_not_smaller_than_width_rejected() {
        for gap in [3.0, 4.0] {
            let cfg = MmiConfig {
                gap_mmi: gap,
                ..Default::default()
            };
            assert!(matches!(
                mmi_2x2(&cfg),
                Err(LayoutError::InvalidParameter { name: "gap_mmi", .. })
            ));
        }
        let cfg = MmiConfig {
            taper_length: -1.0,
            ..Default::default()
        };
        assert!(mmi_2x2(&cfg).is_err());
    }
}
