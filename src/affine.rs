//! Exact per-triangle affine maps.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::signed_area2;
use crate::types::Point;

/// Default tolerance below which a triangle's doubled area counts as zero.
pub const DEFAULT_EPSILON: f32 = 1e-6;

/// A 2×3 affine matrix in canvas order:
/// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl AffineTransform {
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Map a point; `z` passes through unchanged.
    pub fn apply(&self, p: Point) -> Point {
        Point::new_3d(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
            p.z,
        )
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Area scale of the linear part, as a length ratio.
    pub fn scale_factor(&self) -> f32 {
        self.determinant().abs().sqrt()
    }

    pub fn inverse(&self) -> Result<Self> {
        let det = self.determinant();
        if det.abs() <= f32::EPSILON || !det.is_finite() {
            return Err(Error::SingularTransform);
        }
        let inv = 1.0 / det;
        let a = self.d * inv;
        let b = -self.b * inv;
        let c = -self.c * inv;
        let d = self.a * inv;
        Ok(Self {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }

    /// `self` followed by `next`.
    pub fn then(&self, next: &AffineTransform) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// Coefficients in `[a, b, c, d, e, f]` order.
    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Solve the affine map taking each `src[i]` to `dst[i]`, using the default
/// degeneracy tolerance.
pub fn solve_affine(src: [Point; 3], dst: [Point; 3]) -> Result<AffineTransform> {
    solve_affine_with_epsilon(src, dst, DEFAULT_EPSILON)
}

/// Solve the affine map taking each `src[i]` to `dst[i]` by Cramer's rule.
///
/// Returns [`Error::DegenerateTriangle`] when either triangle's doubled area
/// is within `epsilon` of zero.
pub fn solve_affine_with_epsilon(
    src: [Point; 3],
    dst: [Point; 3],
    epsilon: f32,
) -> Result<AffineTransform> {
    let [p0, p1, p2] = src;
    let denom = signed_area2(p0, p1, p2);
    if denom.is_nan() || denom.abs() <= epsilon {
        return Err(Error::DegenerateTriangle { denominator: denom });
    }

    let dst_area = signed_area2(dst[0], dst[1], dst[2]);
    if dst_area.is_nan() || dst_area.abs() <= epsilon {
        return Err(Error::DegenerateTriangle {
            denominator: dst_area,
        });
    }

    let (x0, y0, x1, y1, x2, y2) = (p0.x, p0.y, p1.x, p1.y, p2.x, p2.y);
    let [u0, u1, u2] = dst.map(|p| p.x);
    let [v0, v1, v2] = dst.map(|p| p.y);

    let a = (u0 * (y1 - y2) + u1 * (y2 - y0) + u2 * (y0 - y1)) / denom;
    let b = (v0 * (y1 - y2) + v1 * (y2 - y0) + v2 * (y0 - y1)) / denom;
    let c = (u0 * (x2 - x1) + u1 * (x0 - x2) + u2 * (x1 - x0)) / denom;
    let d = (v0 * (x2 - x1) + v1 * (x0 - x2) + v2 * (x1 - x0)) / denom;
    let e = (u0 * (x1 * y2 - x2 * y1) + u1 * (x2 * y0 - x0 * y2) + u2 * (x0 * y1 - x1 * y0))
        / denom;
    let f = (v0 * (x1 * y2 - x2 * y1) + v1 * (x2 * y0 - x0 * y2) + v2 * (x0 * y1 - x1 * y0))
        / denom;

    let transform = AffineTransform { a, b, c, d, e, f };
    if !transform.is_finite() {
        return Err(Error::DegenerateTriangle { denominator: denom });
    }
    Ok(transform)
}
