//! Fiber-Array Test Circuit
//!
//! Wires a device with `in1`, `in2`, `out1`, `out2` ports to four grating
//! couplers on a fiber-array pitch: two inputs on the left, two outputs on the
//! right.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::component::{Component, Instance};
use crate::cross_section::CrossSection;
use crate::error::LayoutResult;
use crate::geometry::Point;
use crate::grating_coupler::{grating_coupler_elliptical_te, GratingCouplerConfig};
use crate::primitives::clean_value;
use crate::routing::route_single;

/// Test-circuit placement and routing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCircuitConfig {
    /// Centre-to-centre distance between fiber channels (127 um V-groove arrays).
    pub fiber_pitch: f64,
    /// Horizontal distance of each coupler column from the device origin.
    pub coupler_offset: f64,
    pub bend_radius: f64,
    pub cross_section: CrossSection,
    pub grating_coupler: GratingCouplerConfig,
}

impl Default for TestCircuitConfig {
    fn default() -> Self {
        Self {
            fiber_pitch: 127.0,
            coupler_offset: 200.0,
            bend_radius: 10.0,
            cross_section: CrossSection::default(),
            grating_coupler: GratingCouplerConfig::default(),
        }
    }
}

/// Place `device` between four grating couplers and route all four arms.
///
/// The device is shifted up by half the fiber pitch so it sits midway between
/// the two coupler rows. Routing failures abort the build.
pub fn test_circuit_mmi(device: Arc<Component>, cfg: &TestCircuitConfig) -> LayoutResult<Component> {
    let pitch = cfg.fiber_pitch;
    let dx = cfg.coupler_offset;
    let mut c = Component::new(format!(
        "mmi_test_circuit_{}_P{}",
        device.name(),
        clean_value(pitch)
    ));

    let mmi = Instance::new(device).moved(0.0, pitch / 2.0);

    let gc = Arc::new(grating_coupler_elliptical_te(&cfg.grating_coupler)?);
    let y_axis = (Point::ORIGIN, Point::new(0.0, 1.0));
    let gc1 = Instance::new(Arc::clone(&gc))
        .mirrored(y_axis.0, y_axis.1)
        .moved(-dx, 0.0);
    let gc2 = Instance::new(Arc::clone(&gc))
        .mirrored(y_axis.0, y_axis.1)
        .moved(-dx, pitch);
    let gc3 = Instance::new(Arc::clone(&gc)).moved(dx, 0.0);
    let gc4 = Instance::new(gc).moved(dx, pitch);

    let connections = [
        (gc1.port("o1")?, mmi.port("in1")?),
        (gc2.port("o1")?, mmi.port("in2")?),
        (mmi.port("out1")?, gc3.port("o1")?),
        (mmi.port("out2")?, gc4.port("o1")?),
    ];
    for (from, to) in &connections {
        route_single(&mut c, from, to, cfg.bend_radius, &cfg.cross_section)?;
    }

    c.add_port("fiber_in1", &gc1.port("o2")?)?;
    c.add_port("fiber_in2", &gc2.port("o2")?)?;
    c.add_port("fiber_out1", &gc3.port("o2")?)?;
    c.add_port("fiber_out2", &gc4.port("o2")?)?;

    for inst in [mmi, gc1, gc2, gc3, gc4] {
        c.add_instance(inst);
    }
    c.set_info(&serde_json::json!({
        "fiber_pitch": pitch,
        "coupler_offset": dx,
        "bend_radius": cfg.bend_radius,
    }))?;

    debug!(cell = %c.name(), "built test circuit");
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LayoutError, RoutingError};
    use crate::geometry::Layer;
    use crate::mmi::{mmi_2x2, MmiConfig};

    fn default_circuit() -> Component {
        let mmi = Arc::new(mmi_2x2(&MmiConfig::default()).unwrap());
        test_circuit_mmi(mmi, &TestCircuitConfig::default()).unwrap()
    }

    #[test]
    fn test_default_circuit_structure() {
        let c = default_circuit();
        assert_eq!(c.count_instances("grating_coupler"), 4);
        assert_eq!(c.count_instances("mmi_2x2"), 1);
        // Four routed waveguides directly in the circuit.
        assert_eq!(c.polygons().len(), 4);
        assert!(c.polygons().iter().all(|p| p.layer == Layer::WG));
        assert!(!c.polygons_on(Layer::WG).is_empty());
    }

    #[test]
    fn test_mmi_centred_between_fiber_rows() {
        let c = default_circuit();
        let mmi = &c.instances()[0];
        let in1 = mmi.port("in1").unwrap();
        let in2 = mmi.port("in2").unwrap();
        assert!(((in1.center.y + in2.center.y) / 2.0 - 63.5).abs() < 1e-9);
    }

    #[test]
    fn test_input_couplers_face_device() {
        let c = default_circuit();
        let gc1 = &c.instances()[1];
        let gc3 = &c.instances()[3];
        let o1 = gc1.port("o1").unwrap();
        assert!(o1.orientation.abs() < 1e-9);
        assert!(o1.center.x < -200.0);
        let o3 = gc3.port("o1").unwrap();
        assert!((o3.orientation - 180.0).abs() < 1e-9);
        assert!(o3.center.x > 200.0);
        assert!((c.port("fiber_in2").unwrap().center.y - 127.0).abs() < 1e-9);
    }

    #[test]
    fn test_unroutable_pitch_fails() {
        let mmi = Arc::new(mmi_2x2(&MmiConfig::default()).unwrap());
        let cfg = TestCircuitConfig {
            fiber_pitch: 20.0,
            ..Default::default()
        };
        let err = test_circuit_mmi(mmi, &cfg).unwrap_err();
        assert!(matches!(err, LayoutError::Routing(RoutingError::Infeasible { .. })));
    }
}
