//! MMI Layout Generator
//!
//! Parameterized 2x2 multimode-interference beamsplitter layout, a
//! grating-coupler test circuit around it, and a design-of-experiments sweep,
//! all written to GDSII.

pub mod component;
pub mod config;
pub mod cross_section;
pub mod doe;
pub mod error;
pub mod gds;
pub mod geometry;
pub mod grating_coupler;
pub mod mmi;
pub mod primitives;
pub mod routing;
pub mod test_circuit;

pub use component::{Component, Instance, Port};
pub use config::RunConfig;
pub use cross_section::CrossSection;
pub use doe::{generate_doe_gds, DoeConfig, DoeReport};
pub use error::{LayoutError, LayoutResult, RoutingError};
pub use gds::{read_gds, write_gds, write_gds_with_metadata};
pub use geometry::{Layer, Point, Polygon, Transform};
pub use grating_coupler::{grating_coupler_elliptical_te, GratingCouplerConfig};
pub use mmi::{mmi_2x2, MmiConfig};
pub use routing::{route_single, Route};
pub use test_circuit::{test_circuit_mmi, TestCircuitConfig};
