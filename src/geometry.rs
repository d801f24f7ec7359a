//! Planar Geometry Primitives
//!
//! Points, layers, polygons and GDSII-style placement transforms.
//! Coordinates are in micrometres.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Tolerance used when comparing coordinates and angles.
pub const EPS: f64 = 1e-9;

/// Point (or vector) in the layout plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Create new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle_deg` (counter-clockwise from +x).
    pub fn from_angle(angle_deg: f64) -> Self {
        Self::from_complex(Complex64::from_polar(1.0, angle_deg.to_radians()))
    }

    #[inline]
    pub fn to_complex(self) -> Complex64 {
        Complex64::new(self.x, self.y)
    }

    #[inline]
    pub fn from_complex(z: Complex64) -> Self {
        Self { x: z.re, y: z.im }
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product.
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Vector rotated by +90 degrees.
    pub fn perp(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn approx_eq(self, other: Point, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// GDSII (layer, datatype) channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Layer {
    pub layer: i16,
    pub datatype: i16,
}

impl Layer {
    /// Silicon waveguide core.
    pub const WG: Layer = Layer::new(1, 0);

    pub const fn new(layer: i16, datatype: i16) -> Self {
        Self { layer, datatype }
    }
}

impl From<(i16, i16)> for Layer {
    fn from((layer, datatype): (i16, i16)) -> Self {
        Self { layer, datatype }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    /// Smallest box holding every point, `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BBox { min: first, max: first };
        for p in iter {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn union(self, other: BBox) -> BBox {
        BBox {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        (self.min + self.max) * 0.5
    }
}

/// Closed polygon on a single layer. The closing vertex is implicit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub layer: Layer,
    pub points: Vec<Point>,
}

impl Polygon {
    /// Create new polygon.
    pub fn new(layer: Layer, points: Vec<Point>) -> Self {
        Self { layer, points }
    }

    /// Axis-aligned rectangle with its lower-left corner at `origin`.
    pub fn rect(layer: Layer, origin: Point, width: f64, height: f64) -> Self {
        Self::new(
            layer,
            vec![
                origin,
                origin + Point::new(width, 0.0),
                origin + Point::new(width, height),
                origin + Point::new(0.0, height),
            ],
        )
    }

    /// Copy of the polygon with every vertex mapped through `t`.
    pub fn transformed(&self, t: &Transform) -> Polygon {
        Polygon {
            layer: self.layer,
            points: self.points.iter().map(|p| t.apply(*p)).collect(),
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.points.iter().copied())
    }

    /// Unsigned area (shoelace formula).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| self.points[i].cross(self.points[(i + 1) % n]))
            .sum();
        twice.abs() / 2.0
    }
}

/// Placement transform in GDSII order: optional reflection about the x axis,
/// then counter-clockwise rotation, then translation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub origin: Point,
    /// Rotation in degrees, kept in [0, 360).
    pub rotation: f64,
    pub x_reflection: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        origin: Point::ORIGIN,
        rotation: 0.0,
        x_reflection: false,
    };

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            origin: Point::new(dx, dy),
            ..Self::IDENTITY
        }
    }

    pub fn rotation(angle_deg: f64) -> Self {
        Self {
            rotation: normalize_angle(angle_deg),
            ..Self::IDENTITY
        }
    }

    /// Reflection across the line through `p1` and `p2`.
    pub fn mirror(p1: Point, p2: Point) -> Self {
        let d = p2 - p1;
        let line_angle = d.y.atan2(d.x).to_degrees();
        let reflect = Transform {
            origin: Point::ORIGIN,
            rotation: normalize_angle(2.0 * line_angle),
            x_reflection: true,
        };
        Transform::translation(-p1.x, -p1.y)
            .then(&reflect)
            .then(&Transform::translation(p1.x, p1.y))
    }

    /// Map a point through the transform.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        let mut z = p.to_complex();
        if self.x_reflection {
            z = z.conj();
        }
        z *= Complex64::from_polar(1.0, self.rotation.to_radians());
        Point::from_complex(z) + self.origin
    }

    /// Map a direction angle (degrees) through the transform.
    pub fn apply_angle(&self, angle_deg: f64) -> f64 {
        let a = if self.x_reflection { -angle_deg } else { angle_deg };
        normalize_angle(a + self.rotation)
    }

    /// Composition that applies `self` first and `outer` second.
    pub fn then(&self, outer: &Transform) -> Transform {
        let rotation = if outer.x_reflection {
            outer.rotation - self.rotation
        } else {
            outer.rotation + self.rotation
        };
        Transform {
            origin: outer.apply(self.origin),
            rotation: normalize_angle(rotation),
            x_reflection: outer.x_reflection ^ self.x_reflection,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.x_reflection && self.rotation.abs() < EPS && self.origin.approx_eq(Point::ORIGIN, EPS)
    }
}

/// Fold an angle in degrees into [0, 360), snapping values within `EPS` of 360 to 0.
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let a = angle_deg.rem_euclid(360.0);
    if (360.0 - a).abs() < EPS || a.abs() < EPS {
        0.0
    } else {
        a
    }
}

/// True when the angle lies on a multiple of 90 degrees.
pub fn is_manhattan(angle_deg: f64) -> bool {
    let q = angle_deg / 90.0;
    (q - q.round()).abs() < 1e-6
}
