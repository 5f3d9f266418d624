//! Similarity alignment (uniform scale, rotation, translation) between faces.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::affine::{AffineTransform, DEFAULT_EPSILON};
use crate::error::{Error, Result};
use crate::types::{LandmarkSet, Point};

/// Position, size and in-plane rotation of a face, measured from a pair of
/// reference landmarks such as the two eyes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentInfo {
    /// Midpoint of the pair.
    pub center: Point,
    /// Euclidean distance between the pair.
    pub distance: f32,
    /// `atan2(dy, dx)` of the vector from the first landmark to the second.
    pub angle: f32,
}

impl AlignmentInfo {
    pub fn from_pair(a: Point, b: Point) -> Self {
        Self {
            center: a.midpoint(&b),
            distance: a.distance(&b),
            angle: (b.y - a.y).atan2(b.x - a.x),
        }
    }

    /// Re-express in a frame-centered system: (0, 0) at the middle of a
    /// `width` × `height` surface with y pointing up.
    pub fn centered(&self, width: f32, height: f32) -> Self {
        Self {
            center: Point::new_3d(
                self.center.x - width / 2.0,
                height / 2.0 - self.center.y,
                self.center.z,
            ),
            distance: self.distance,
            angle: -self.angle,
        }
    }
}

/// Alignment info from landmarks `idx_a` and `idx_b`.
pub fn alignment_info(landmarks: &LandmarkSet, idx_a: usize, idx_b: usize) -> Result<AlignmentInfo> {
    let a = landmarks.get(idx_a)?;
    let b = landmarks.get(idx_b)?;
    Ok(AlignmentInfo::from_pair(a, b))
}

/// Alignment info from the centroids of two landmark groups (for example
/// the six points outlining each eye).
pub fn alignment_info_from_groups(
    landmarks: &LandmarkSet,
    group_a: &[usize],
    group_b: &[usize],
) -> Result<AlignmentInfo> {
    let a = landmarks.centroid_of(group_a)?;
    let b = landmarks.centroid_of(group_b)?;
    Ok(AlignmentInfo::from_pair(a, b))
}

/// Uniform scale, rotation and translation. No shear.
///
/// Maps a point `p` to `scale · R(rotation) · p + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub scale: f32,
    pub rotation: f32,
    pub translation: Point,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            translation: Point::zero(),
        }
    }

    /// Apply to a point. `z` is scaled but not rotated.
    pub fn apply(&self, p: Point) -> Point {
        let (sin, cos) = self.rotation.sin_cos();
        Point::new_3d(
            self.scale * (cos * p.x - sin * p.y) + self.translation.x,
            self.scale * (sin * p.x + cos * p.y) + self.translation.y,
            self.scale * p.z + self.translation.z,
        )
    }

    pub fn inverse(&self) -> Result<Self> {
        if self.scale.abs() <= f32::EPSILON || !self.scale.is_finite() {
            return Err(Error::SingularTransform);
        }
        let scale = 1.0 / self.scale;
        let rotation = -self.rotation;
        let partial = Self {
            scale,
            rotation,
            translation: Point::zero(),
        };
        let t = partial.apply(self.translation);
        Ok(Self {
            scale,
            rotation,
            translation: Point::new_3d(-t.x, -t.y, -t.z),
        })
    }

    /// The equivalent planar affine matrix.
    pub fn to_affine(&self) -> AffineTransform {
        let (sin, cos) = self.rotation.sin_cos();
        AffineTransform::new(
            self.scale * cos,
            self.scale * sin,
            -self.scale * sin,
            self.scale * cos,
            self.translation.x,
            self.translation.y,
        )
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Similarity taking the reference face onto the live face, with the
/// default degeneracy tolerance.
pub fn compute_similarity(reference: &AlignmentInfo, live: &AlignmentInfo) -> Result<SimilarityTransform> {
    compute_similarity_with_epsilon(reference, live, DEFAULT_EPSILON)
}

/// `scale = live.distance / reference.distance`,
/// `rotation = live.angle − reference.angle` wrapped to (−π, π],
/// `translation = live.center`.
pub fn compute_similarity_with_epsilon(
    reference: &AlignmentInfo,
    live: &AlignmentInfo,
    epsilon: f32,
) -> Result<SimilarityTransform> {
    if reference.distance.is_nan() || reference.distance <= epsilon {
        return Err(Error::DegenerateReference {
            distance: reference.distance,
        });
    }
    Ok(SimilarityTransform {
        scale: live.distance / reference.distance,
        rotation: wrap_angle(live.angle - reference.angle),
        translation: live.center,
    })
}

/// Least-squares similarity taking every point of `from` onto the matching
/// point of `to` (2D Umeyama). `z` is ignored.
pub fn fit_similarity(from: &LandmarkSet, to: &LandmarkSet) -> Result<SimilarityTransform> {
    if from.len() != to.len() {
        return Err(Error::CardinalityMismatch {
            expected: from.len(),
            actual: to.len(),
        });
    }
    if from.is_empty() {
        return Err(Error::DegenerateReference { distance: 0.0 });
    }

    let n = from.len() as f32;
    let mut from_mean = Point::zero();
    let mut to_mean = Point::zero();
    for (p, q) in from.points.iter().zip(to.points.iter()) {
        from_mean += Point::new(p.x, p.y);
        to_mean += Point::new(q.x, q.y);
    }
    from_mean = from_mean * (1.0 / n);
    to_mean = to_mean * (1.0 / n);

    let mut dot = 0.0;
    let mut cross = 0.0;
    let mut variance = 0.0;
    for (p, q) in from.points.iter().zip(to.points.iter()) {
        let (px, py) = (p.x - from_mean.x, p.y - from_mean.y);
        let (qx, qy) = (q.x - to_mean.x, q.y - to_mean.y);
        dot += px * qx + py * qy;
        cross += px * qy - py * qx;
        variance += px * px + py * py;
    }

    if variance.is_nan() || variance <= DEFAULT_EPSILON {
        return Err(Error::DegenerateReference {
            distance: variance.sqrt(),
        });
    }

    let scale = (dot * dot + cross * cross).sqrt() / variance;
    let rotation = cross.atan2(dot);
    let linear = SimilarityTransform {
        scale,
        rotation,
        translation: Point::zero(),
    };
    let moved = linear.apply(from_mean);
    Ok(SimilarityTransform {
        scale,
        rotation,
        translation: Point::new(to_mean.x - moved.x, to_mean.y - moved.y),
    })
}

fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn pair_info() {
        let info = AlignmentInfo::from_pair(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(info.center, Point::new(5.0, 0.0));
        assert_eq!(info.distance, 10.0);
        assert_eq!(info.angle, 0.0);

        let vertical = AlignmentInfo::from_pair(Point::new(0.0, 0.0), Point::new(0.0, 4.0));
        assert!(approx(vertical.angle, PI / 2.0));
    }

    #[test]
    fn identical_info_is_identity_scale_and_rotation() {
        let info = AlignmentInfo::from_pair(Point::new(3.0, 7.0), Point::new(12.0, 9.0));
        let s = compute_similarity(&info, &info).unwrap();
        assert!(approx(s.scale, 1.0));
        assert!(approx(s.rotation, 0.0));
        assert_eq!(s.translation, info.center);
    }

    #[test]
    fn coincident_reference_is_degenerate() {
        let reference = AlignmentInfo::from_pair(Point::new(4.0, 4.0), Point::new(4.0, 4.0));
        let live = AlignmentInfo::from_pair(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert!(matches!(
            compute_similarity(&reference, &live),
            Err(Error::DegenerateReference { .. })
        ));
    }

    #[test]
    fn rotation_wraps_to_half_open_range() {
        let reference = AlignmentInfo {
            center: Point::zero(),
            distance: 1.0,
            angle: -3.0,
        };
        let live = AlignmentInfo {
            center: Point::zero(),
            distance: 1.0,
            angle: 3.0,
        };
        let s = compute_similarity(&reference, &live).unwrap();
        assert!(approx(s.rotation, 6.0 - 2.0 * PI));
    }

    #[test]
    fn groups_use_centroids() {
        let set = LandmarkSet::from_flat_2d(&[0.0, 0.0, 2.0, 0.0, 10.0, 0.0, 12.0, 0.0]);
        let info = alignment_info_from_groups(&set, &[0, 1], &[2, 3]).unwrap();
        assert!(approx(info.distance, 10.0));
        assert!(approx(info.center.x, 6.0));
        assert!(alignment_info_from_groups(&set, &[], &[2]).is_err());
    }

    #[test]
    fn out_of_range_indices() {
        let set = LandmarkSet::from_flat_2d(&[0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(
            alignment_info(&set, 0, 5),
            Err(Error::LandmarkIndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn centered_frame_flips_y() {
        let info = AlignmentInfo::from_pair(Point::new(40.0, 10.0), Point::new(60.0, 30.0));
        let c = info.centered(100.0, 100.0);
        assert_eq!(c.center, Point::new(0.0, 30.0));
        assert!(approx(c.angle, -info.angle));
    }

    #[test]
    fn inverse_undoes_apply() {
        let s = SimilarityTransform {
            scale: 2.5,
            rotation: 0.7,
            translation: Point::new(-3.0, 8.0),
        };
        let inv = s.inverse().unwrap();
        let p = Point::new(4.0, -6.0);
        let back = inv.apply(s.apply(p));
        assert!(approx(back.x, p.x));
        assert!(approx(back.y, p.y));
    }

    #[test]
    fn affine_matches_apply() {
        let s = SimilarityTransform {
            scale: 1.5,
            rotation: -0.4,
            translation: Point::new(2.0, 3.0),
        };
        let p = Point::new(5.0, 1.0);
        let a = s.to_affine().apply(p);
        let b = s.apply(p);
        assert!(approx(a.x, b.x));
        assert!(approx(a.y, b.y));
    }

    #[test]
    fn least_squares_recovers_exact_similarity() {
        let truth = SimilarityTransform {
            scale: 1.8,
            rotation: 0.3,
            translation: Point::new(12.0, -5.0),
        };
        let from = LandmarkSet::from_flat_2d(&[0.0, 0.0, 10.0, 0.0, 10.0, 7.0, 2.0, 9.0, 5.0, 4.0]);
        let to = from.map(|p| truth.apply(p));
        let fitted = fit_similarity(&from, &to).unwrap();
        assert!(approx(fitted.scale, truth.scale));
        assert!(approx(fitted.rotation, truth.rotation));
        assert!((fitted.translation.x - truth.translation.x).abs() < 1e-3);
        assert!((fitted.translation.y - truth.translation.y).abs() < 1e-3);
    }

    #[test]
    fn least_squares_rejects_collapsed_source() {
        let from = LandmarkSet::new(vec![Point::new(1.0, 1.0); 4]);
        let to = LandmarkSet::from_flat_2d(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert!(matches!(
            fit_similarity(&from, &to),
            Err(Error::DegenerateReference { .. })
        ));
    }
}
