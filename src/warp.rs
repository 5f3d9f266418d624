//! Per-triangle warp planning between two landmark sets.

use serde::Serialize;
use tracing::warn;

use crate::affine::{solve_affine_with_epsilon, AffineTransform};
use crate::error::Result;
use crate::triangulate::Triangulation;
use crate::types::{LandmarkSet, Point};

/// One triangle's destination footprint and the map that fills it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriangleWarp {
    /// Position in the triangulation.
    pub triangle: usize,
    pub indices: [usize; 3],
    /// Clip polygon on the destination surface.
    pub destination: [Point; 3],
    /// Source coordinates to destination coordinates.
    pub transform: AffineTransform,
}

/// The transforms for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarpPlan {
    pub warps: Vec<TriangleWarp>,
    /// Triangles dropped because either side was degenerate.
    pub skipped: usize,
}

impl WarpPlan {
    pub fn len(&self) -> usize {
        self.warps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warps.is_empty()
    }
}

/// Solve one affine per triangle mapping `source` content onto the
/// `destination` shape.
///
/// Both sets must match the triangulation's cardinality. Degenerate
/// triangles are logged and skipped, the rest of the plan stays valid.
pub fn plan_warps(
    triangulation: &Triangulation,
    source: &LandmarkSet,
    destination: &LandmarkSet,
    epsilon: f32,
) -> Result<WarpPlan> {
    triangulation.check_compatible(source)?;
    triangulation.check_compatible(destination)?;

    let mut plan = WarpPlan {
        warps: Vec::with_capacity(triangulation.len()),
        skipped: 0,
    };

    for (t, indices) in triangulation.triangles().iter().enumerate() {
        let src = indices.map(|i| source[i]);
        let dst = indices.map(|i| destination[i]);
        match solve_affine_with_epsilon(src, dst, epsilon) {
            Ok(transform) => plan.warps.push(TriangleWarp {
                triangle: t,
                indices: *indices,
                destination: dst,
                transform,
            }),
            Err(e) if e.is_local() => {
                warn!(triangle = t, error = %e, "skipping triangle");
                plan.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(plan)
}
