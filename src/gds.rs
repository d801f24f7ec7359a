//! GDSII Output
//!
//! Converts a component hierarchy into a [`gds21::GdsLibrary`]: one structure per
//! distinct cell, children first. User unit is 1 um, database unit 1 nm.

use gds21::{GdsBoundary, GdsElement, GdsLibrary, GdsPoint, GdsStrans, GdsStruct, GdsStructRef, GdsUnits};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::component::{Component, Instance, Port};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{Point, Polygon, EPS};

/// Database units per micrometre.
pub const DB_PER_UM: f64 = 1000.0;

/// Largest vertex count a single BOUNDARY record can carry.
const MAX_BOUNDARY_POINTS: usize = 8191;

/// Paths are handed to `gds21` as UTF-8 strings.
fn path_str(path: &Path) -> LayoutResult<&str> {
    path.to_str()
        .ok_or_else(|| LayoutError::Gds(format!("non UTF-8 path {}", path.display())))
}

fn snap(p: Point) -> (i32, i32) {
    ((p.x * DB_PER_UM).round() as i32, (p.y * DB_PER_UM).round() as i32)
}

/// Convert `top` and every cell it references into a GDS library named after `top`.
pub fn to_gds_library(top: &Component) -> LayoutResult<GdsLibrary> {
    let mut lib = GdsLibrary::new(top.name());
    lib.units = GdsUnits::new(1.0 / DB_PER_UM, 1e-6 / DB_PER_UM);
    for cell in top.dependencies() {
        if cell.name() == top.name() {
            return Err(LayoutError::InvalidGeometry {
                cell: top.name().to_string(),
                reason: "cell references a cell with its own name".to_string(),
            });
        }
        lib.structs.push(convert_cell(&cell)?);
    }
    lib.structs.push(convert_cell(top)?);
    Ok(lib)
}

fn convert_cell(c: &Component) -> LayoutResult<GdsStruct> {
    let mut s = GdsStruct::new(c.name());
    for poly in c.polygons() {
        s.elems.push(GdsElement::GdsBoundary(convert_polygon(c.name(), poly)?));
    }
    for inst in c.instances() {
        s.elems.push(GdsElement::GdsStructRef(convert_instance(inst)));
    }
    Ok(s)
}

fn convert_polygon(cell: &str, poly: &Polygon) -> LayoutResult<GdsBoundary> {
    let mut pts: Vec<(i32, i32)> = poly.points.iter().map(|p| snap(*p)).collect();
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return Err(LayoutError::InvalidGeometry {
            cell: cell.to_string(),
            reason: format!("polygon collapses to {} points on the 1 nm grid", pts.len()),
        });
    }
    if pts.len() + 1 > MAX_BOUNDARY_POINTS {
        return Err(LayoutError::InvalidGeometry {
            cell: cell.to_string(),
            reason: format!("polygon has {} points, GDSII allows {}", pts.len(), MAX_BOUNDARY_POINTS - 1),
        });
    }
    // GDSII boundaries repeat the first vertex.
    pts.push(pts[0]);

    Ok(GdsBoundary {
        layer: poly.layer.layer,
        datatype: poly.layer.datatype,
        xy: pts.into_iter().map(|(x, y)| GdsPoint::new(x, y)).collect(),
        ..Default::default()
    })
}

fn convert_instance(inst: &Instance) -> GdsStructRef {
    let t = &inst.transform;
    let rotated = t.rotation.abs() > EPS;
    let strans = if t.x_reflection || rotated {
        Some(GdsStrans {
            reflected: t.x_reflection,
            angle: if rotated { Some(t.rotation) } else { None },
            ..Default::default()
        })
    } else {
        None
    };
    let (x, y) = snap(t.origin);
    GdsStructRef {
        name: inst.cell.name().to_string(),
        xy: GdsPoint::new(x, y),
        strans,
        ..Default::default()
    }
}

/// Write `component` and its hierarchy to a GDSII file, replacing any existing file.
pub fn write_gds(component: &Component, path: impl AsRef<Path>) -> LayoutResult<()> {
    let path = path.as_ref();
    let lib = to_gds_library(component)?;
    lib.save(path_str(path)?)?;
    debug!(cell = %component.name(), path = %path.display(), structs = lib.structs.len(), "wrote GDS");
    Ok(())
}

/// Load a GDSII file for inspection.
pub fn read_gds(path: impl AsRef<Path>) -> LayoutResult<GdsLibrary> {
    Ok(GdsLibrary::load(path_str(path.as_ref())?)?)
}

/// Sidecar record written next to a GDS file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellMetadata {
    pub name: String,
    pub info: Map<String, Value>,
    pub ports: Vec<Port>,
}

impl CellMetadata {
    pub fn of(component: &Component) -> Self {
        Self {
            name: component.name().to_string(),
            info: component.info().clone(),
            ports: component.ports().cloned().collect(),
        }
    }

    /// Save metadata to file.
    pub fn save(&self, path: &Path) -> LayoutResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load metadata from file.
    pub fn load(path: &Path) -> LayoutResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Write the GDS file plus a `<stem>.json` record of the cell's info and ports.
/// Returns the metadata path.
pub fn write_gds_with_metadata(component: &Component, path: impl AsRef<Path>) -> LayoutResult<PathBuf> {
    let path = path.as_ref();
    write_gds(component, path)?;
    let meta_path = path.with_extension("json");
    CellMetadata::of(component).save(&meta_path)?;
    Ok(meta_path)
}
