//! Hierarchical Layout Components
//!
//! A [`Component`] owns polygons, placed [`Instance`]s of other components and a
//! named set of [`Port`]s. Components are assembled through `&mut` methods while a
//! cell factory runs and are shared read-only as `Arc<Component>` afterwards.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{BBox, Layer, Point, Polygon, Transform};

/// Named optical attachment point on a component boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub center: Point,
    /// Direction pointing out of the component, degrees counter-clockwise from +x.
    pub orientation: f64,
    pub width: f64,
    pub layer: Layer,
}

impl Port {
    /// Create new port.
    pub fn new(name: impl Into<String>, center: Point, orientation: f64, width: f64, layer: Layer) -> Self {
        Self {
            name: name.into(),
            center,
            orientation,
            width,
            layer,
        }
    }

    /// Unit vector along the port orientation.
    pub fn direction(&self) -> Point {
        Point::from_angle(self.orientation)
    }

    pub fn transformed(&self, t: &Transform) -> Port {
        Port {
            name: self.name.clone(),
            center: t.apply(self.center),
            orientation: t.apply_angle(self.orientation),
            width: self.width,
            layer: self.layer,
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Port {
        Port {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Placement of a shared component inside a parent.
#[derive(Clone, Debug)]
pub struct Instance {
    pub cell: Arc<Component>,
    pub transform: Transform,
}

impl Instance {
    /// Place `cell` at the origin, unrotated.
    pub fn new(cell: Arc<Component>) -> Self {
        Self {
            cell,
            transform: Transform::IDENTITY,
        }
    }

    /// Translate the instance by `(dx, dy)`.
    pub fn moved(mut self, dx: f64, dy: f64) -> Self {
        self.transform = self.transform.then(&Transform::translation(dx, dy));
        self
    }

    /// Rotate the instance about the parent origin.
    pub fn rotated(mut self, angle_deg: f64) -> Self {
        self.transform = self.transform.then(&Transform::rotation(angle_deg));
        self
    }

    /// Reflect the instance across the line through `p1` and `p2`.
    pub fn mirrored(mut self, p1: Point, p2: Point) -> Self {
        self.transform = self.transform.then(&Transform::mirror(p1, p2));
        self
    }

    /// Port of the placed cell, in parent coordinates.
    pub fn port(&self, name: &str) -> LayoutResult<Port> {
        Ok(self.cell.port(name)?.transformed(&self.transform))
    }

    pub fn ports(&self) -> impl Iterator<Item = Port> + '_ {
        self.cell.ports().map(move |p| p.transformed(&self.transform))
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(
            self.cell
                .flat_polygons()
                .iter()
                .flat_map(|p| p.points.iter().map(|pt| self.transform.apply(*pt))),
        )
    }
}

/// Named geometric assembly.
#[derive(Clone, Debug, Default)]
pub struct Component {
    name: String,
    polygons: Vec<Polygon>,
    instances: Vec<Instance>,
    ports: IndexMap<String, Port>,
    info: Map<String, Value>,
}

impl Component {
    /// Create new empty component.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_polygon(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    /// Place an instance and return it for port lookups.
    pub fn add_instance(&mut self, instance: Instance) -> &Instance {
        self.instances.push(instance);
        &self.instances[self.instances.len() - 1]
    }

    /// Expose `port` under `name`. Port names are unique within a component.
    pub fn add_port(&mut self, name: &str, port: &Port) -> LayoutResult<()> {
        if self.ports.contains_key(name) {
            return Err(LayoutError::InvalidGeometry {
                cell: self.name.clone(),
                reason: format!("duplicate port `{name}`"),
            });
        }
        self.ports.insert(name.to_string(), port.renamed(name));
        Ok(())
    }

    /// Merge the fields of `record` (which must serialize to a JSON object) into
    /// the component metadata.
    pub fn set_info<T: Serialize>(&mut self, record: &T) -> LayoutResult<()> {
        match serde_json::to_value(record)? {
            Value::Object(map) => {
                self.info.extend(map);
                Ok(())
            }
            other => Err(LayoutError::InvalidGeometry {
                cell: self.name.clone(),
                reason: format!("metadata must be a record, got {other}"),
            }),
        }
    }

    pub fn info(&self) -> &Map<String, Value> {
        &self.info
    }

    /// Numeric metadata field.
    pub fn info_f64(&self, key: &str) -> Option<f64> {
        self.info.get(key).and_then(Value::as_f64)
    }

    /// Decode the metadata record into a typed struct.
    pub fn info_as<T: DeserializeOwned>(&self) -> LayoutResult<T> {
        Ok(serde_json::from_value(Value::Object(self.info.clone()))?)
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn port_names(&self) -> Vec<&str> {
        self.ports.keys().map(String::as_str).collect()
    }

    pub fn port(&self, name: &str) -> LayoutResult<&Port> {
        self.ports.get(name).ok_or_else(|| LayoutError::PortNotFound {
            component: self.name.clone(),
            port: name.to_string(),
        })
    }

    /// Every polygon of the hierarchy, in this component's coordinates.
    pub fn flat_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        self.collect_polygons(&Transform::IDENTITY, &mut out);
        out
    }

    fn collect_polygons(&self, t: &Transform, out: &mut Vec<Polygon>) {
        out.extend(self.polygons.iter().map(|p| p.transformed(t)));
        for inst in &self.instances {
            inst.cell.collect_polygons(&inst.transform.then(t), out);
        }
    }

    /// Flattened polygons on a single layer.
    pub fn polygons_on(&self, layer: Layer) -> Vec<Polygon> {
        self.flat_polygons()
            .into_iter()
            .filter(|p| p.layer == layer)
            .collect()
    }

    /// Number of instances anywhere in the hierarchy whose cell name starts with `prefix`.
    pub fn count_instances(&self, prefix: &str) -> usize {
        self.instances
            .iter()
            .map(|inst| {
                let own = usize::from(inst.cell.name.starts_with(prefix));
                own + inst.cell.count_instances(prefix)
            })
            .sum()
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.flat_polygons().into_iter().flat_map(|p| p.points))
    }

    /// Distinct sub-cells by name, children before parents. Excludes `self`.
    pub fn dependencies(&self) -> Vec<Arc<Component>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_dependencies(&mut seen, &mut out);
        out
    }

    fn collect_dependencies(&self, seen: &mut HashSet<String>, out: &mut Vec<Arc<Component>>) {
        for inst in &self.instances {
            if seen.contains(&inst.cell.name) {
                continue;
            }
            inst.cell.collect_dependencies(seen, out);
            seen.insert(inst.cell.name.clone());
            out.push(Arc::clone(&inst.cell));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn square(name: &str) -> Component {
        let mut c = Component::new(name);
        c.add_polygon(Polygon::rect(Layer::WG, Point::ORIGIN, 1.0, 1.0));
        c.add_port("o1", &Port::new("x", Point::new(0.0, 0.5), 180.0, 1.0, Layer::WG))
            .unwrap();
        c
    }

    #[test]
    fn test_instance_port_follows_transform() {
        let cell = Arc::new(square("sq"));
        let inst = Instance::new(cell)
            .mirrored(Point::ORIGIN, Point::new(0.0, 1.0))
            .moved(-200.0, 0.0);
        let p = inst.port("o1").unwrap();
        assert!(p.center.approx_eq(Point::new(-200.0, 0.5), 1e-9));
        assert!(p.orientation.abs() < 1e-9);
        assert_eq!(p.name, "o1");
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut c = square("sq");
        let p = c.port("o1").unwrap().clone();
        assert!(c.add_port("o1", &p).is_err());
        assert!(matches!(
            c.port("missing"),
            Err(LayoutError::PortNotFound { .. })
        ));
    }

    #[test]
    fn test_flatten_and_dependencies() {
        let leaf = Arc::new(square("leaf"));
        let mut mid = Component::new("mid");
        mid.add_instance(Instance::new(Arc::clone(&leaf)));
        mid.add_instance(Instance::new(Arc::clone(&leaf)).moved(5.0, 0.0));
        let mid = Arc::new(mid);

        let mut top = Component::new("top");
        top.add_instance(Instance::new(Arc::clone(&mid)).moved(0.0, 10.0));
        top.add_instance(Instance::new(leaf));

        assert_eq!(top.flat_polygons().len(), 3);
        assert_eq!(top.count_instances("leaf"), 3);

        let names: Vec<String> = top.dependencies().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["leaf".to_string(), "mid".to_string()]);

        let bb = top.bbox().unwrap();
        assert!(bb.min.approx_eq(Point::new(0.0, 0.0), 1e-12));
        assert!(bb.max.approx_eq(Point::new(6.0, 11.0), 1e-12));
    }

    #[test]
    fn test_info_record() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Params {
            width: f64,
            length: f64,
        }

        let mut c = Component::new("info");
        c.set_info(&Params { width: 3.0, length: 30.0 }).unwrap();
        assert_eq!(c.info_f64("width"), Some(3.0));
        let back: Params = c.info_as().unwrap();
        assert_eq!(back, Params { width: 3.0, length: 30.0 });
        assert!(c.set_info(&1.0).is_err());
    }
}
