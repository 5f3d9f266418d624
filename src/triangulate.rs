//! Delaunay triangulation of a reference landmark set.
//!
//! The triangulation is computed once from the reference face and then reused
//! by index against every live landmark set from the same detector. Index
//! triples stay meaningful only because landmark indices are anatomically
//! stable, so a triangulation must never be recomputed per frame.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{LandmarkSet, Point};

/// An ordered list of index triples into a landmark set of fixed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangulation {
    /// Landmark count the triangles index into.
    num_points: usize,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Wrap a fixed, externally supplied triangle list.
    pub fn from_triangles(num_points: usize, triangles: Vec<[usize; 3]>) -> Result<Self> {
        for tri in &triangles {
            for &idx in tri {
                if idx >= num_points {
                    return Err(Error::LandmarkIndexOutOfRange {
                        index: idx,
                        len: num_points,
                    });
                }
            }
        }
        Ok(Self {
            num_points,
            triangles,
        })
    }

    /// Build from a flat `[i0, j0, k0, i1, j1, k1, ...]` index list.
    pub fn from_flat(num_points: usize, indices: &[usize]) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(Error::RaggedIndexList { len: indices.len() });
        }
        let triangles = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::from_triangles(num_points, triangles)
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Flat index sequence of length `3 * len()`.
    pub fn to_flat(&self) -> Vec<usize> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Flat `u32` index buffer for mesh renderers.
    pub fn to_index_buffer(&self) -> Vec<u32> {
        self.triangles
            .iter()
            .flatten()
            .map(|&i| i as u32)
            .collect()
    }

    /// Fails unless `landmarks` has the cardinality this triangulation was
    /// built for.
    pub fn check_compatible(&self, landmarks: &LandmarkSet) -> Result<()> {
        if landmarks.len() != self.num_points {
            return Err(Error::CardinalityMismatch {
                expected: self.num_points,
                actual: landmarks.len(),
            });
        }
        Ok(())
    }

    /// Resolve triangle `t` against a landmark set.
    pub fn triangle_points(&self, landmarks: &LandmarkSet, t: usize) -> Result<[Point; 3]> {
        let tri = self
            .triangles
            .get(t)
            .ok_or(Error::LandmarkIndexOutOfRange {
                index: t,
                len: self.triangles.len(),
            })?;
        Ok([
            landmarks.get(tri[0])?,
            landmarks.get(tri[1])?,
            landmarks.get(tri[2])?,
        ])
    }

    /// Load a triangulation saved with [`Triangulation::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let triangulation: Self = bincode::deserialize(&bytes)?;
        Self::from_triangles(triangulation.num_points, triangulation.triangles)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

/// The vertex at infinity. Every convex hull edge `(a, b)` carries a ghost
/// face `[b, a, GHOST]` whose finite edge has the outside on its left.
const GHOST: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vertex {
    x: f64,
    y: f64,
}

impl From<Point> for Vertex {
    fn from(p: Point) -> Self {
        Self {
            x: p.x as f64,
            y: p.y as f64,
        }
    }
}

/// Twice the signed area of `(a, b, c)`, positive when counter-clockwise.
fn orient(a: Vertex, b: Vertex, c: Vertex) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Positive when `p` is strictly inside the circumcircle of the
/// counter-clockwise triangle `(a, b, c)`.
fn incircle(a: Vertex, b: Vertex, c: Vertex, p: Vertex) -> f64 {
    let (adx, ady) = (a.x - p.x, a.y - p.y);
    let (bdx, bdy) = (b.x - p.x, b.y - p.y);
    let (cdx, cdy) = (c.x - p.x, c.y - p.y);
    (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
        + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
}

/// Whether inserting `p` destroys `face`.
///
/// A ghost face conflicts with points strictly outside its hull edge, and
/// with points on the edge's open segment, which split it.
fn in_conflict(verts: &[Vertex], face: [usize; 3], p: Vertex) -> bool {
    let [a, b, c] = face;
    if c != GHOST {
        return incircle(verts[a], verts[b], verts[c], p) > 0.0;
    }
    let (a, b) = (verts[a], verts[b]);
    let side = orient(a, b, p);
    if side != 0.0 {
        return side > 0.0;
    }
    let (ex, ey) = (b.x - a.x, b.y - a.y);
    let t = (p.x - a.x) * ex + (p.y - a.y) * ey;
    t > 0.0 && t < ex * ex + ey * ey
}

/// First three distinct, non-collinear points, in counter-clockwise order.
fn seed_triangle(verts: &[Vertex]) -> Option<[usize; 3]> {
    let a = 0;
    let b = (1..verts.len()).find(|&j| verts[j] != verts[a])?;
    let c = (1..verts.len()).find(|&k| k != b && orient(verts[a], verts[b], verts[k]) != 0.0)?;
    if orient(verts[a], verts[b], verts[c]) > 0.0 {
        Some([a, b, c])
    } else {
        Some([a, c, b])
    }
}

/// Delaunay triangulation of `points` (Bowyer-Watson).
///
/// Hull-side faces are kept symbolically against a vertex at infinity, so
/// slivers between a shallow contour and the hull are never lost. Every
/// returned triple has positive signed area. Fewer than three usable points
/// or an all-collinear input yields an empty triangulation; callers skip
/// rendering rather than failing. Duplicate points are ignored but indices
/// always refer to positions in `points`.
pub fn triangulate(points: &[Point]) -> Triangulation {
    let n = points.len();
    let empty = Triangulation {
        num_points: n,
        triangles: Vec::new(),
    };

    if n < 3 {
        debug!(points = n, "too few points to triangulate");
        return empty;
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        warn!("non-finite landmark coordinates, triangulation skipped");
        return empty;
    }

    let verts: Vec<Vertex> = points.iter().map(|&p| Vertex::from(p)).collect();
    let Some(seed) = seed_triangle(&verts) else {
        warn!(points = n, "degenerate landmark set produced no triangles");
        return empty;
    };

    let [a, b, c] = seed;
    let mut faces: Vec<[usize; 3]> = vec![seed, [b, a, GHOST], [c, b, GHOST], [a, c, GHOST]];
    let mut inserted: Vec<usize> = seed.to_vec();

    for i in 0..n {
        if seed.contains(&i) {
            continue;
        }
        let p = verts[i];
        if let Some(&dup) = inserted.iter().find(|&&j| verts[j] == p) {
            warn!(index = i, duplicate_of = dup, "duplicate landmark ignored");
            continue;
        }

        let (bad, mut kept): (Vec<_>, Vec<_>) = faces
            .into_iter()
            .partition(|&face| in_conflict(&verts, face, p));
        if bad.is_empty() {
            warn!(index = i, "landmark could not be inserted");
            faces = kept;
            continue;
        }
        inserted.push(i);

        for (bi, face) in bad.iter().enumerate() {
            for e in 0..3 {
                let (x, y) = (face[e], face[(e + 1) % 3]);
                let shared = bad
                    .iter()
                    .enumerate()
                    .any(|(bj, other)| bj != bi && has_edge(other, x, y));
                if shared {
                    continue;
                }
                // Keep the vertex at infinity last.
                kept.push(if x == GHOST {
                    [y, i, GHOST]
                } else if y == GHOST {
                    [i, x, GHOST]
                } else {
                    [x, y, i]
                });
            }
        }
        faces = kept;
    }

    let triangles: Vec<[usize; 3]> = faces
        .into_iter()
        .filter(|face| !face.contains(&GHOST))
        .filter(|&[a, b, c]| orient(verts[a], verts[b], verts[c]) > 0.0)
        .collect();

    if triangles.is_empty() {
        warn!(points = n, "degenerate landmark set produced no triangles");
    } else {
        debug!(points = n, triangles = triangles.len(), "triangulated");
    }

    Triangulation {
        num_points: n,
        triangles,
    }
}

fn has_edge(v: &[usize; 3], a: usize, b: usize) -> bool {
    (0..3).any(|e| {
        let (x, y) = (v[e], v[(e + 1) % 3]);
        (x == a && y == b) || (x == b && y == a)
    })
}
