//! Error types for layout construction, routing and GDS output.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Failures raised while building or writing a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },

    #[error("invalid geometry in `{cell}`: {reason}")]
    InvalidGeometry { cell: String, reason: String },

    #[error("port `{port}` not found on `{component}`")]
    PortNotFound { component: String, port: String },

    #[error("routing failed: {0}")]
    Routing(#[from] RoutingError),

    #[error("GDS error: {0}")]
    Gds(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<gds21::GdsError> for LayoutError {
    fn from(e: gds21::GdsError) -> Self {
        LayoutError::Gds(e.to_string())
    }
}

/// Reasons the router refuses a port pair.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("port `{port}` width {port_width} does not match cross-section width {xs_width}")]
    WidthMismatch {
        port: String,
        port_width: f64,
        xs_width: f64,
    },

    #[error("port `{port}` orientation {orientation} is not a multiple of 90 degrees")]
    NonManhattan { port: String, orientation: f64 },

    #[error("{from} -> {to}: leg of {available:.3} um is shorter than the {required:.3} um the bends need")]
    Infeasible {
        from: String,
        to: String,
        available: f64,
        required: f64,
    },

    #[error("{from} -> {to}: {reason}")]
    Unsupported {
        from: String,
        to: String,
        reason: String,
    },
}
