//! Primitive Cells
//!
//! Rectangle and linear taper factories, plus the parameter-derived cell naming
//! every factory in the crate uses.

use serde::Serialize;
use tracing::debug;

use crate::component::{Component, Port};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{Layer, Point, Polygon};

/// Render a parameter value for a cell name: `3.0 -> "3"`, `0.5 -> "0p5"`, `-1.25 -> "m1p25"`.
pub fn clean_value(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    let s = if s == "-0" { "0" } else { s };
    s.replace('-', "m").replace('.', "p")
}

/// Build a cell name from a prefix and its parameters.
pub fn cell_name(prefix: &str, params: &[(&str, f64)]) -> String {
    let mut name = prefix.to_string();
    for (key, value) in params {
        name.push('_');
        name.push_str(key);
        name.push_str(&clean_value(*value));
    }
    name
}

/// Build a cell name from only the parameters that differ from their defaults,
/// given as `(key, value, default)`.
pub fn changed_cell_name(prefix: &str, params: &[(&str, f64, f64)]) -> String {
    let changed: Vec<(&str, f64)> = params
        .iter()
        .filter(|(_, value, default)| (value - default).abs() > 1e-9)
        .map(|(key, value, _)| (*key, *value))
        .collect();
    cell_name(prefix, &changed)
}

pub(crate) fn layer_suffix(layer: Layer) -> String {
    format!("L{}_{}", layer.layer, layer.datatype)
}

fn require_positive(cell: &str, what: &str, v: f64) -> LayoutResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::InvalidGeometry {
            cell: cell.to_string(),
            reason: format!("{what} must be positive and finite, got {v}"),
        })
    }
}

#[derive(Serialize)]
struct RectangleInfo {
    width: f64,
    height: f64,
    centered: bool,
}

/// Rectangle of `size = (width, height)`. The lower-left corner sits at the
/// origin unless `centered` is set. Edge ports `e1`..`e4` run west, north,
/// east, south.
pub fn rectangle(size: (f64, f64), layer: Layer, centered: bool) -> LayoutResult<Component> {
    let (w, h) = size;
    let name = format!(
        "{}_{}",
        cell_name("rectangle", &[("S", w), ("", h)]),
        layer_suffix(layer)
    );
    require_positive(&name, "width", w)?;
    require_positive(&name, "height", h)?;

    let origin = if centered {
        Point::new(-w / 2.0, -h / 2.0)
    } else {
        Point::ORIGIN
    };
    let center = origin + Point::new(w / 2.0, h / 2.0);

    let mut c = Component::new(&name);
    c.add_polygon(Polygon::rect(layer, origin, w, h));
    let edges = [
        ("e1", Point::new(origin.x, center.y), 180.0, h),
        ("e2", Point::new(center.x, origin.y + h), 90.0, w),
        ("e3", Point::new(origin.x + w, center.y), 0.0, h),
        ("e4", Point::new(center.x, origin.y), 270.0, w),
    ];
    for (port_name, at, orientation, width) in edges {
        c.add_port(port_name, &Port::new(port_name, at, orientation, width, layer))?;
    }
    c.set_info(&RectangleInfo {
        width: w,
        height: h,
        centered,
    })?;
    debug!(cell = %name, "built rectangle");
    Ok(c)
}

#[derive(Serialize)]
struct TaperInfo {
    length: f64,
    width1: f64,
    width2: f64,
}

/// Linear taper from `width1` at x=0 (port `o1`, facing 180) to `width2` at
/// x=`length` (port `o2`, facing 0).
pub fn taper(length: f64, width1: f64, width2: f64, layer: Layer) -> LayoutResult<Component> {
    let name = format!(
        "{}_{}",
        cell_name("taper", &[("L", length), ("W", width1), ("W", width2)]),
        layer_suffix(layer)
    );
    require_positive(&name, "length", length)?;
    require_positive(&name, "width1", width1)?;
    require_positive(&name, "width2", width2)?;

    let mut c = Component::new(&name);
    c.add_polygon(Polygon::new(
        layer,
        vec![
            Point::new(0.0, width1 / 2.0),
            Point::new(length, width2 / 2.0),
            Point::new(length, -width2 / 2.0),
            Point::new(0.0, -width1 / 2.0),
        ],
    ));
    c.add_port("o1", &Port::new("o1", Point::ORIGIN, 180.0, width1, layer))?;
    c.add_port("o2", &Port::new("o2", Point::new(length, 0.0), 0.0, width2, layer))?;
    c.set_info(&TaperInfo {
        length,
        width1,
        width2,
    })?;
    debug!(cell = %name, "built taper");
    Ok(c)
}
