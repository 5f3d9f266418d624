//! # face-warp
//!
//! Geometric face alignment for overlaying one face onto another, such as a
//! webcam face onto a reference portrait.
//!
//! This crate provides:
//! - **Triangulation**: Delaunay triangulation of a reference landmark set,
//!   computed once and reused by index for every live frame
//! - **Affine solving**: the exact affine map between a source and a
//!   destination triangle, with degenerate triangles reported as errors
//! - **Similarity alignment**: scale, rotation and translation from a pair of
//!   reference landmarks (the eyes) for mesh-based rendering
//! - **Engine**: a single-flight detect → warp → present tick over pluggable
//!   detectors, drawing surfaces and mesh renderers
//!
//! Landmark detection and rendering are left to the caller through the
//! [`LandmarkDetector`], [`Surface`] and [`MeshTarget`] traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use face_warp::{solve_affine, triangulate, LandmarkSet, Point};
//!
//! // Reference face landmarks (a toy 4-point face).
//! let reference = LandmarkSet::new(vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(10.0, 0.0),
//!     Point::new(10.0, 12.0),
//!     Point::new(0.0, 10.0),
//! ]);
//! let triangulation = triangulate(&reference.points);
//!
//! // A live face from the same detector: same indices, new positions.
//! let live = reference.map(|p| p * 2.0 + Point::new(5.0, 5.0));
//!
//! for t in 0..triangulation.len() {
//!     let src = triangulation.triangle_points(&live, t).unwrap();
//!     let dst = triangulation.triangle_points(&reference, t).unwrap();
//!     let transform = solve_affine(src, dst).unwrap();
//!     // Clip to `dst`, set `transform`, draw the live frame.
//!     assert!((transform.scale_factor() - 0.5).abs() < 1e-4);
//! }
//! ```
//!
//! ## Custom Surfaces
//!
//! Implement [`Surface`] for your own canvas type:
//!
//! ```rust
//! use face_warp::{AffineTransform, Point, Surface};
//!
//! struct MyCanvas { /* ... */ }
//! struct MyImage;
//!
//! impl Surface<MyImage> for MyCanvas {
//!     fn save(&mut self) {}
//!     fn restore(&mut self) {}
//!     fn clip_to_polygon(&mut self, polygon: &[Point]) {}
//!     fn set_transform(&mut self, transform: &AffineTransform) {}
//!     fn draw_image(&mut self, image: &MyImage) {}
//! }
//! ```

mod affine;
mod config;
mod engine;
mod error;
mod geometry;
mod image;
mod mesh;
mod similarity;
mod surface;
mod triangulate;
mod types;
mod warp;

pub use affine::{solve_affine, solve_affine_with_epsilon, AffineTransform, DEFAULT_EPSILON};
pub use config::EngineConfig;
pub use engine::{LandmarkDetector, TickOutcome, TickState, WarpEngine};
pub use error::{Error, Result};
pub use geometry::{point_in_polygon, polygon_area, signed_area2};
pub use self::image::{sample_bilinear, GrayImage, ImageAccess};
pub use mesh::{MeshBuffers, MeshTarget};
pub use similarity::{
    alignment_info, alignment_info_from_groups, compute_similarity,
    compute_similarity_with_epsilon, fit_similarity, AlignmentInfo, SimilarityTransform,
};
pub use surface::{draw_warp_plan, RasterSurface, Surface};
pub use triangulate::{triangulate, Triangulation};
pub use types::{LandmarkModel, LandmarkSet, Point};
pub use warp::{plan_warps, TriangleWarp, WarpPlan};
