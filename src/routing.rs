//! Single Waveguide Routing
//!
//! Connects two ports with a Manhattan path whose corners are replaced by
//! circular bends, then extrudes the centreline to the cross-section width.
//! Handles the port configurations a fiber-array test circuit needs: straight,
//! one bend (L) and two bends (S).

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

use crate::component::{Component, Port};
use crate::cross_section::CrossSection;
use crate::error::{LayoutError, LayoutResult, RoutingError};
use crate::geometry::{is_manhattan, Point, Polygon, EPS};

/// Segments used to approximate each 90 degree bend.
const BEND_SEGMENTS: usize = 32;

/// Ports whose widths differ from the cross section by more than this are refused.
const WIDTH_TOLERANCE: f64 = 1e-3;

/// Geometry of a routed waveguide.
#[derive(Clone, Debug)]
pub struct Route {
    /// Manhattan corner points, port to port.
    pub waypoints: Vec<Point>,
    /// Centreline with bends discretized.
    pub centerline: Vec<Point>,
    pub n_bends: usize,
    /// Physical centreline length in um.
    pub length: f64,
}

/// Route `port1` to `port2` and add the waveguide polygon to `component`.
///
/// The path leaves `port1` along its orientation and enters `port2` against
/// its orientation. Fails when the ports do not carry the cross-section width,
/// are not Manhattan, or sit too close for `radius`.
pub fn route_single(
    component: &mut Component,
    port1: &Port,
    port2: &Port,
    radius: f64,
    xs: &CrossSection,
) -> LayoutResult<Route> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(LayoutError::InvalidParameter {
            name: "radius",
            value: radius,
            reason: "bend radius must be positive".to_string(),
        });
    }
    for port in [port1, port2] {
        if (port.width - xs.width).abs() > WIDTH_TOLERANCE {
            return Err(RoutingError::WidthMismatch {
                port: port.name.clone(),
                port_width: port.width,
                xs_width: xs.width,
            }
            .into());
        }
        if !is_manhattan(port.orientation) {
            return Err(RoutingError::NonManhattan {
                port: port.name.clone(),
                orientation: port.orientation,
            }
            .into());
        }
    }

    let waypoints = manhattan_waypoints(port1, port2, radius)?;
    let n_bends = waypoints.len() - 2;
    let centerline = round_corners(&waypoints, radius);
    let outline = extrude(&centerline, xs.width);

    let legs: f64 = waypoints.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    let length = legs - n_bends as f64 * (2.0 - FRAC_PI_2) * radius;

    component.add_polygon(Polygon::new(xs.layer, outline));
    debug!(
        from = %port1.name,
        to = %port2.name,
        n_bends,
        length,
        "routed waveguide"
    );

    Ok(Route {
        waypoints,
        centerline,
        n_bends,
        length,
    })
}

/// Axis-aligned unit vector for a Manhattan orientation.
fn axis(orientation: f64) -> Point {
    let d = Point::from_angle(orientation);
    Point::new(d.x.round(), d.y.round())
}

fn manhattan_waypoints(port1: &Port, port2: &Port, radius: f64) -> Result<Vec<Point>, RoutingError> {
    let p1 = port1.center;
    let p2 = port2.center;
    let heading = axis(port1.orientation);
    let arrival = -axis(port2.orientation);
    let delta = p2 - p1;
    let along = delta.dot(heading);
    let lateral = delta.dot(heading.perp());

    let infeasible = |available: f64, required: f64| RoutingError::Infeasible {
        from: port1.name.clone(),
        to: port2.name.clone(),
        available,
        required,
    };
    let unsupported = |reason: &str| RoutingError::Unsupported {
        from: port1.name.clone(),
        to: port2.name.clone(),
        reason: reason.to_string(),
    };

    let alignment = heading.dot(arrival);
    if alignment > 0.5 {
        if lateral.abs() < EPS {
            if along <= EPS {
                return Err(unsupported("ports face away from each other"));
            }
            return Ok(vec![p1, p2]);
        }
        if along < 2.0 * radius {
            return Err(infeasible(along, 2.0 * radius));
        }
        if lateral.abs() < 2.0 * radius {
            return Err(infeasible(lateral.abs(), 2.0 * radius));
        }
        let c1 = p1 + heading * (along / 2.0);
        let c2 = c1 + heading.perp() * lateral;
        Ok(vec![p1, c1, c2, p2])
    } else if alignment.abs() <= 0.5 {
        let corner = p1 + heading * along;
        let second = (p2 - corner).dot(arrival);
        if along < radius {
            return Err(infeasible(along, radius));
        }
        if second < radius {
            return Err(infeasible(second, radius));
        }
        Ok(vec![p1, corner, p2])
    } else {
        Err(unsupported("U-turn between ports facing the same way"))
    }
}

/// Replace each interior corner with a circular arc of `radius`.
fn round_corners(waypoints: &[Point], radius: f64) -> Vec<Point> {
    let mut out = vec![waypoints[0]];
    for w in waypoints.windows(3) {
        let (prev, corner, next) = (w[0], w[1], w[2]);
        let d_in = unit(corner - prev);
        let d_out = unit(next - corner);
        let turn = d_in.cross(d_out).signum();

        let start = corner - d_in * radius;
        let center = start + d_in.perp() * (radius * turn);
        let arm = (start - center).to_complex();
        for k in 0..=BEND_SEGMENTS {
            let angle = turn * FRAC_PI_2 * k as f64 / BEND_SEGMENTS as f64;
            let p = center + Point::from_complex(arm * Complex64::from_polar(1.0, angle));
            push_distinct(&mut out, p);
        }
    }
    if let Some(last) = waypoints.last() {
        push_distinct(&mut out, *last);
    }
    out
}

fn push_distinct(points: &mut Vec<Point>, p: Point) {
    if points.last().map_or(true, |q| !q.approx_eq(p, 1e-9)) {
        points.push(p);
    }
}

fn unit(v: Point) -> Point {
    v * (1.0 / v.norm())
}

/// Outline of a path of `width` following `centerline`.
fn extrude(centerline: &[Point], width: f64) -> Vec<Point> {
    let n = centerline.len();
    let half = width / 2.0;
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);

    for i in 0..n {
        let d_prev = if i > 0 {
            Some(unit(centerline[i] - centerline[i - 1]))
        } else {
            None
        };
        let d_next = if i + 1 < n {
            Some(unit(centerline[i + 1] - centerline[i]))
        } else {
            None
        };
        let (tangent, miter) = match (d_prev, d_next) {
            (Some(a), Some(b)) => {
                let t = unit(a + b);
                // Stretch the offset so both adjacent edges keep the full width.
                (t, 1.0 / t.dot(a).max(0.5))
            }
            (Some(a), None) | (None, Some(a)) => (a, 1.0),
            (None, None) => (Point::new(1.0, 0.0), 1.0),
        };
        let offset = tangent.perp() * (half * miter);
        left.push(centerline[i] + offset);
        right.push(centerline[i] - offset);
    }

    right.reverse();
    left.extend(right);
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Layer;
    use std::f64::consts::PI;

    fn port(name: &str, x: f64, y: f64, orientation: f64) -> Port {
        Port::new(name, Point::new(x, y), orientation, 0.5, Layer::WG)
    }

    #[test]
    fn test_straight_route() {
        let mut c = Component::new("r");
        let xs = CrossSection::default();
        let r = route_single(&mut c, &port("a", 0.0, 0.0, 0.0), &port("b", 100.0, 0.0, 180.0), 10.0, &xs)
            .unwrap();
        assert_eq!(r.n_bends, 0);
        assert!((r.length - 100.0).abs() < 1e-9);
        assert!((c.polygons()[0].area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_s_route() {
        let mut c = Component::new("r");
        let xs = CrossSection::default();
        let r = route_single(&mut c, &port("a", 0.0, 0.0, 0.0), &port("b", 100.0, 50.0, 180.0), 10.0, &xs)
            .unwrap();
        assert_eq!(r.n_bends, 2);
        assert_eq!(
            r.waypoints,
            vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 50.0),
                Point::new(100.0, 50.0)
            ]
        );
        let expected = 100.0 + 50.0 - 4.0 * 10.0 + PI * 10.0;
        assert!((r.length - expected).abs() < 1e-9);

        // Arc tangent points are on the centreline.
        assert!(r.centerline.iter().any(|p| p.approx_eq(Point::new(40.0, 0.0), 1e-9)));
        assert!(r.centerline.iter().any(|p| p.approx_eq(Point::new(50.0, 10.0), 1e-9)));
        assert!(r.centerline.iter().any(|p| p.approx_eq(Point::new(60.0, 50.0), 1e-9)));

        // Waveguide area is close to length times width.
        let area = c.polygons()[0].area();
        assert!((area - expected * 0.5).abs() < 0.05, "area {area}");
    }

    #[test]
    fn test_l_route() {
        let mut c = Component::new("r");
        let xs = CrossSection::default();
        let r = route_single(&mut c, &port("a", 0.0, 0.0, 0.0), &port("b", 50.0, 40.0, 270.0), 10.0, &xs)
            .unwrap();
        assert_eq!(r.n_bends, 1);
        assert_eq!(r.waypoints[1], Point::new(50.0, 0.0));
        let expected = 90.0 - 20.0 + PI * 5.0;
        assert!((r.length - expected).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_radius() {
        let mut c = Component::new("r");
        let xs = CrossSection::default();
        let err = route_single(&mut c, &port("a", 0.0, 0.0, 0.0), &port("b", 100.0, 5.0, 180.0), 10.0, &xs)
            .unwrap_err();
        assert!(matches!(err, LayoutError::Routing(RoutingError::Infeasible { .. })));
        assert!(c.polygons().is_empty());
    }

    #[test]
    fn test_width_mismatch() {
        let mut c = Component::new("r");
        let xs = CrossSection::strip(0.45, Layer::WG);
        let err = route_single(&mut c, &port("a", 0.0, 0.0, 0.0), &port("b", 100.0, 0.0, 180.0), 10.0, &xs)
            .unwrap_err();
        assert!(matches!(err, LayoutError::Routing(RoutingError::WidthMismatch { .. })));
    }

    #[test]
    fn test_rejects_non_manhattan_and_u_turn() {
        let mut c = Component::new("r");
        let xs = CrossSection::default();
        assert!(route_single(&mut c, &port("a", 0.0, 0.0, 45.0), &port("b", 100.0, 0.0, 180.0), 10.0, &xs).is_err());
        let err = route_single(&mut c, &port("a", 0.0, 0.0, 0.0), &port("b", 100.0, 50.0, 0.0), 10.0, &xs)
            .unwrap_err();
        assert!(matches!(err, LayoutError::Routing(RoutingError::Unsupported { .. })));
    }
}
