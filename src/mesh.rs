//! Buffers for the 3D face-mesh path.

use crate::error::Result;
use crate::similarity::{AlignmentInfo, SimilarityTransform};
use crate::triangulate::Triangulation;
use crate::types::{LandmarkSet, Point};

/// A mesh renderer's geometry inputs.
pub trait MeshTarget {
    /// Replace the `[x, y, z, ...]` position buffer.
    fn set_positions(&mut self, positions: &[f32]);

    /// Replace the `[u, v, ...]` texture coordinate buffer.
    fn set_uvs(&mut self, uvs: &[f32]);

    /// Signal that the buffers changed and must be re-uploaded.
    fn mark_needs_update(&mut self);
}

/// CPU-side copy of a face mesh: positions, UVs and the fixed index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new(triangulation: &Triangulation) -> Self {
        let n = triangulation.num_points();
        Self {
            positions: vec![0.0; n * 3],
            uvs: vec![0.0; n * 2],
            indices: triangulation.to_index_buffer(),
        }
    }

    /// Place `live` into the reference frame.
    ///
    /// `to_live` is the similarity from reference to live alignment (see
    /// [`crate::similarity::compute_similarity`]), both expressed in
    /// frame-centered coordinates. Each live point is pulled back through it
    /// and re-anchored on the reference center, so the live eyes land on the
    /// reference eyes.
    pub fn update_positions(
        &mut self,
        live: &LandmarkSet,
        frame: (f32, f32),
        to_live: &SimilarityTransform,
        reference: &AlignmentInfo,
    ) -> Result<()> {
        let back = to_live.inverse()?;
        let (w, h) = frame;
        self.positions.clear();
        self.positions.reserve(live.len() * 3);
        for p in &live.points {
            let centered = Point::new_3d(p.x - w / 2.0, h / 2.0 - p.y, -p.z);
            let q = back.apply(centered) + reference.center;
            self.positions.extend_from_slice(&[q.x, q.y, q.z]);
        }
        Ok(())
    }

    /// Texture coordinates of `landmarks` within a `width` × `height` image,
    /// with v pointing up.
    pub fn update_uvs(&mut self, landmarks: &LandmarkSet, width: f32, height: f32) {
        self.uvs.clear();
        self.uvs.reserve(landmarks.len() * 2);
        for p in &landmarks.points {
            self.uvs.push(p.x / width);
            self.uvs.push(1.0 - p.y / height);
        }
    }

    /// Push positions and UVs to a renderer.
    pub fn upload<M: MeshTarget + ?Sized>(&self, target: &mut M) {
        target.set_positions(&self.positions);
        target.set_uvs(&self.uvs);
        target.mark_needs_update();
    }
}
