//! Element descriptors supplying default dimensions to a dataset

use serde::{Deserialize, Serialize};

use crate::interface::DimRequest;
use crate::schema::Dimension;

/// The kind of element a multi-path dataset backs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Element name, used in log output
    pub name: String,

    /// Declared key dimensions
    pub kdims: Vec<Dimension>,

    /// Declared value dimensions
    pub vdims: Vec<Dimension>,

    /// Closed shapes have no meaningful per-path split
    pub closed_shape: bool,
}

impl Element {
    /// Create a new element descriptor
    pub fn new(name: &str, kdims: Vec<Dimension>, vdims: Vec<Dimension>) -> Self {
        Self {
            name: name.to_string(),
            kdims,
            vdims,
            closed_shape: false,
        }
    }

    /// Open paths over `x` and `y`
    pub fn path() -> Self {
        Self::new("Path", xy(), Vec::new())
    }

    /// Iso-lines over `x` and `y`
    pub fn contours() -> Self {
        Self::new("Contours", xy(), Vec::new())
    }

    /// Filled polygons over `x` and `y`
    pub fn polygons() -> Self {
        Self::new("Polygons", xy(), Vec::new())
    }

    /// A closed geometric shape (box, ellipse, bounds)
    pub fn shape() -> Self {
        let mut element = Self::new("Shape", xy(), Vec::new());
        element.closed_shape = true;
        element
    }

    /// Replace the declared value dimensions
    #[must_use]
    pub fn with_vdims(mut self, vdims: Vec<Dimension>) -> Self {
        self.vdims = vdims;
        self
    }

    /// Dimension request for resolving paths of this element
    pub fn request(&self, kdims: Option<Vec<Dimension>>, vdims: Option<Vec<Dimension>>) -> DimRequest {
        DimRequest {
            kdims,
            vdims,
            default_kdims: self.kdims.clone(),
            default_vdims: self.vdims.clone(),
        }
    }
}

fn xy() -> Vec<Dimension> {
    vec![Dimension::new("x"), Dimension::new("y")]
}
