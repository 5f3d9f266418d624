use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A landmark position. Planar landmark models leave `z` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub const fn new_3d(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Planar distance; `z` is ignored.
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new_3d(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<[f32; 3]> for Point {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Point::new_3d(x, y, z)
    }
}

/// An ordered, index-stable set of detected landmarks.
///
/// Index `i` refers to the same anatomical feature on every face produced by
/// the same detection model, which is what lets one triangulation serve
/// every frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    pub points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounds-checked access.
    pub fn get(&self, idx: usize) -> Result<Point> {
        self.points
            .get(idx)
            .copied()
            .ok_or(Error::LandmarkIndexOutOfRange {
                index: idx,
                len: self.points.len(),
            })
    }

    /// Mean position of the given landmarks.
    pub fn centroid_of(&self, indices: &[usize]) -> Result<Point> {
        if indices.is_empty() {
            return Err(Error::EmptyLandmarkGroup);
        }
        let mut sum = Point::zero();
        for &idx in indices {
            sum += self.get(idx)?;
        }
        Ok(sum * (1.0 / indices.len() as f32))
    }

    /// Build from `[x0, y0, x1, y1, ...]` coordinates.
    pub fn from_flat_2d(v: &[f32]) -> Self {
        debug_assert!(v.len() % 2 == 0);
        let points = v
            .chunks_exact(2)
            .map(|chunk| Point::new(chunk[0], chunk[1]))
            .collect();
        Self { points }
    }

    /// Returns a copy with every point mapped through `f`.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Point) -> Point,
    {
        Self {
            points: self.points.iter().map(|p| f(*p)).collect(),
        }
    }
}

impl std::ops::Index<usize> for LandmarkSet {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl std::ops::IndexMut<usize> for LandmarkSet {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.points[idx]
    }
}

impl FromIterator<Point> for LandmarkSet {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Which detection model produced a landmark set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkModel {
    /// iBUG 68-point layout used by dlib-style 2D detectors.
    #[default]
    Dlib68,
    /// 468-point face mesh.
    FaceMesh468,
}

impl LandmarkModel {
    pub const fn cardinality(&self) -> usize {
        match self {
            LandmarkModel::Dlib68 => 68,
            LandmarkModel::FaceMesh468 => 468,
        }
    }

    /// Outer eye corners, subject's right then left.
    pub const fn eye_indices(&self) -> (usize, usize) {
        match self {
            LandmarkModel::Dlib68 => (36, 45),
            LandmarkModel::FaceMesh468 => (33, 263),
        }
    }

    /// Eye contour groups, when the model has them.
    pub fn eye_contours(&self) -> Option<(&'static [usize], &'static [usize])> {
        match self {
            LandmarkModel::Dlib68 => Some((&[36, 37, 38, 39, 40, 41], &[42, 43, 44, 45, 46, 47])),
            LandmarkModel::FaceMesh468 => None,
        }
    }
}
