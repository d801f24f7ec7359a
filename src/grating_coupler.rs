//! Elliptical Grating Coupler
//!
//! Focusing grating coupler for TE fiber coupling. Teeth follow confocal
//! ellipses whose parameters come from the phase-matching condition between
//! the slab mode and a fiber tilted by `fiber_angle`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::{Component, Port};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{Layer, Point, Polygon};
use crate::primitives::{changed_cell_name, layer_suffix};

/// Angular resolution of the elliptical arcs, in degrees.
const ANGLE_STEP_DEG: f64 = 1.0;

/// Width assigned to the fiber port (mode field diameter of SMF-28 at 1550 nm).
const FIBER_PORT_WIDTH: f64 = 10.0;

/// Grating coupler parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GratingCouplerConfig {
    pub taper_length: f64,
    /// Full opening angle of the taper fan, degrees.
    pub taper_angle: f64,
    /// Design wavelength in um.
    pub wavelength: f64,
    /// Fiber tilt from vertical, degrees.
    pub fiber_angle: f64,
    pub grating_line_width: f64,
    pub wg_width: f64,
    pub neff: f64,
    pub nclad: f64,
    /// Ellipse index of the taper edge.
    pub p_start: usize,
    pub n_periods: usize,
    pub layer: Layer,
}

impl Default for GratingCouplerConfig {
    fn default() -> Self {
        Self {
            taper_length: 16.6,
            taper_angle: 40.0,
            wavelength: 1.554,
            fiber_angle: 15.0,
            grating_line_width: 0.343,
            wg_width: 0.5,
            neff: 2.638,
            nclad: 1.443,
            p_start: 26,
            n_periods: 30,
            layer: Layer::WG,
        }
    }
}

/// Ellipse parameters of the first grating line, scaled by the line index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipseParams {
    pub a1: f64,
    pub b1: f64,
    pub x1: f64,
}

impl EllipseParams {
    /// Grating period along the axis.
    pub fn period(&self) -> f64 {
        self.a1 + self.x1
    }
}

impl GratingCouplerConfig {
    /// Solve the phase-matching ellipse for this configuration.
    pub fn ellipse(&self) -> LayoutResult<EllipseParams> {
        let sthc = self.fiber_angle.to_radians().sin();
        let d = self.neff.powi(2) - self.nclad.powi(2) * sthc.powi(2);
        if !(d > 0.0) {
            return Err(LayoutError::InvalidParameter {
                name: "neff",
                value: self.neff,
                reason: format!("no guided grating for nclad={} at {} deg", self.nclad, self.fiber_angle),
            });
        }
        Ok(EllipseParams {
            a1: self.wavelength * self.neff / d,
            b1: self.wavelength / d.sqrt(),
            x1: self.wavelength * self.nclad * sthc / d,
        })
    }

    fn validate(&self) -> LayoutResult<()> {
        let positive = [
            ("taper_length", self.taper_length),
            ("wavelength", self.wavelength),
            ("grating_line_width", self.grating_line_width),
            ("wg_width", self.wg_width),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(LayoutError::InvalidParameter {
                    name,
                    value,
                    reason: "must be positive".to_string(),
                });
            }
        }
        if !(self.taper_angle > 0.0 && self.taper_angle < 180.0) {
            return Err(LayoutError::InvalidParameter {
                name: "taper_angle",
                value: self.taper_angle,
                reason: "must lie in (0, 180) degrees".to_string(),
            });
        }
        if self.n_periods == 0 || self.p_start == 0 {
            return Err(LayoutError::InvalidParameter {
                name: "n_periods",
                value: self.n_periods as f64,
                reason: "need at least one period and a non-zero p_start".to_string(),
            });
        }
        Ok(())
    }

    fn cell_name(&self) -> String {
        let d = Self::default();
        let mut name = changed_cell_name(
            "grating_coupler_elliptical_te",
            &[
                ("TL", self.taper_length, d.taper_length),
                ("TA", self.taper_angle, d.taper_angle),
                ("WL", self.wavelength, d.wavelength),
                ("FA", self.fiber_angle, d.fiber_angle),
                ("LW", self.grating_line_width, d.grating_line_width),
                ("W", self.wg_width, d.wg_width),
                ("NE", self.neff, d.neff),
                ("NC", self.nclad, d.nclad),
                ("PS", self.p_start as f64, d.p_start as f64),
                ("N", self.n_periods as f64, d.n_periods as f64),
            ],
        );
        if self.layer != d.layer {
            name.push('_');
            name.push_str(&layer_suffix(self.layer));
        }
        name
    }
}

/// Points on the ellipse `(x0 + a cos t, b sin t)` for t in [theta_min, theta_max] degrees.
fn ellipse_arc(a: f64, b: f64, x0: f64, theta_min: f64, theta_max: f64) -> Vec<Point> {
    let n = ((theta_max - theta_min) / ANGLE_STEP_DEG).ceil().max(1.0) as usize;
    (0..=n)
        .map(|i| {
            let theta = theta_min + (theta_max - theta_min) * i as f64 / n as f64;
            let z = Complex64::from_polar(1.0, theta.to_radians());
            Point::new(x0 + a * z.re, b * z.im)
        })
        .collect()
}

/// Band of `width` centred on an elliptical arc, offset along the ellipse normal.
fn grating_tooth(a: f64, b: f64, x0: f64, width: f64, half_angle: f64) -> Vec<Point> {
    let n = ((2.0 * half_angle) / ANGLE_STEP_DEG).ceil().max(1.0) as usize;
    let mut outer = Vec::with_capacity(n + 1);
    let mut inner = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let theta = (-half_angle + 2.0 * half_angle * i as f64 / n as f64).to_radians();
        let z = Complex64::from_polar(1.0, theta);
        let backbone = Point::new(x0 + a * z.re, b * z.im);
        let normal = Point::new(z.re / a, z.im / b);
        let normal = normal * (1.0 / normal.norm());
        outer.push(backbone + normal * (width / 2.0));
        inner.push(backbone - normal * (width / 2.0));
    }
    inner.reverse();
    outer.extend(inner);
    outer
}

/// Build the elliptical TE grating coupler. Port `o1` is the waveguide end,
/// facing 180 degrees; `o2` marks the fiber coupling point.
pub fn grating_coupler_elliptical_te(cfg: &GratingCouplerConfig) -> LayoutResult<Component> {
    cfg.validate()?;
    let e = cfg.ellipse()?;
    let half_angle = cfg.taper_angle / 2.0;
    let p_start = cfg.p_start as f64;

    let a_taper = p_start * e.a1;
    let b_taper = p_start * e.b1;
    let x_taper = p_start * e.x1;
    let x_output = a_taper + x_taper - cfg.taper_length + cfg.grating_line_width / 2.0;

    let mut c = Component::new(cfg.cell_name());

    let mut taper = vec![
        Point::new(x_output, cfg.wg_width / 2.0),
        Point::new(x_output, -cfg.wg_width / 2.0),
    ];
    taper.extend(ellipse_arc(a_taper, b_taper, x_taper, -half_angle, half_angle));
    c.add_polygon(Polygon::new(cfg.layer, taper));

    for p in (cfg.p_start + 1)..=(cfg.p_start + cfg.n_periods) {
        let p = p as f64;
        c.add_polygon(Polygon::new(
            cfg.layer,
            grating_tooth(p * e.a1, p * e.b1, p * e.x1, cfg.grating_line_width, half_angle),
        ));
    }

    let p_mid = p_start + (cfg.n_periods as f64 + 1.0) / 2.0;
    let fiber_x = p_mid * e.period();

    c.add_port(
        "o1",
        &Port::new("o1", Point::new(x_output, 0.0), 180.0, cfg.wg_width, cfg.layer),
    )?;
    c.add_port(
        "o2",
        &Port::new("o2", Point::new(fiber_x, 0.0), 0.0, FIBER_PORT_WIDTH, cfg.layer),
    )?;
    c.set_info(cfg)?;
    c.set_info(&serde_json::json!({ "period": e.period(), "fiber_x": fiber_x }))?;

    debug!(cell = %c.name(), period = e.period(), "built grating coupler");
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ellipse() {
        let e = GratingCouplerConfig::default().ellipse().unwrap();
        assert!((e.a1 - 0.6011).abs() < 1e-3, "a1 = {}", e.a1);
        assert!((e.b1 - 0.5951).abs() < 1e-3, "b1 = {}", e.b1);
        assert!((e.x1 - 0.0851).abs() < 1e-3, "x1 = {}", e.x1);
    }

    #[test]
    fn test_coupler_structure() {
        let cfg = GratingCouplerConfig::default();
        let gc = grating_coupler_elliptical_te(&cfg).unwrap();
        assert_eq!(gc.name(), "grating_coupler_elliptical_te");

        // Taper plus one polygon per period.
        assert_eq!(gc.polygons().len(), 1 + cfg.n_periods);
        assert!(gc.polygons().iter().all(|p| p.layer == Layer::WG));

        let o1 = gc.port("o1").unwrap();
        assert_eq!(o1.orientation, 180.0);
        assert_eq!(o1.width, 0.5);
        assert!(o1.center.y.abs() < 1e-12);

        // Waveguide port is the leftmost point of the cell.
        let bb = gc.bbox().unwrap();
        assert!((bb.min.x - o1.center.x).abs() < 1e-9);
        assert!(gc.port("o2").unwrap().center.x > o1.center.x);
    }

    #[test]
    fn test_teeth_do_not_overlap() {
        let cfg = GratingCouplerConfig::default();
        let e = cfg.ellipse().unwrap();
        assert!(cfg.grating_line_width < e.period());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = GratingCouplerConfig {
            taper_angle: 0.0,
            ..Default::default()
        };
        assert!(grating_coupler_elliptical_te(&cfg).is_err());

        let cfg = GratingCouplerConfig {
            neff: 0.1,
            ..Default::default()
        };
        assert!(matches!(cfg.ellipse(), Err(LayoutError::InvalidParameter { .. })));
    }

    #[test]
    fn test_non_default_name() {
        let cfg = GratingCouplerConfig {
            n_periods: 20,
            ..Default::default()
        };
        let gc = grating_coupler_elliptical_te(&cfg).unwrap();
        assert_eq!(gc.name(), "grating_coupler_elliptical_te_N20");
    }
}
