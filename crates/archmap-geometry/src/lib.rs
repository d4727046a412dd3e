//! Geometric frame of a distribution map.
//!
//! - [`crs`]: coordinate transforms into the working CRS
//! - [`extent`]: paper-scale print rectangle
//! - [`buffer`]: concentric distance buffers around the study area
//! - [`measure`]: centroids, distances and dissolve helpers

pub mod buffer;
pub mod crs;
pub mod extent;
pub mod measure;

pub use buffer::BufferEngine;
pub use crs::{CoordinateTransformer, LocalFrame, Projection, check_working_crs, reproject_layer};
pub use extent::ExtentCalculator;
