//! The warp engine: a reference face, its triangulation, and the per-tick
//! detect → warp → present pass.
//!
//! Scheduling is single-threaded and cooperative. Detection is the only step
//! that suspends; a single-flight guard makes sure at most one pass is in
//! progress, and a tick that arrives while one is running is dropped.

use std::cell::Cell;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::image::ImageAccess;
use crate::mesh::{MeshBuffers, MeshTarget};
use crate::similarity::{
    alignment_info, alignment_info_from_groups, compute_similarity_with_epsilon, AlignmentInfo,
    SimilarityTransform,
};
use crate::surface::{draw_warp_plan, Surface};
use crate::triangulate::{triangulate, Triangulation};
use crate::types::LandmarkSet;
use crate::warp::{plan_warps, WarpPlan};

/// Produces landmarks for a frame, or `None` when no face is found.
pub trait LandmarkDetector<I: ?Sized> {
    fn detect(&self, image: &I) -> impl Future<Output = Option<LandmarkSet>>;
}

/// Where the engine is within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    Idle,
    DetectingLandmarks,
    Warping,
    Presenting,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Output was written to the surface or mesh.
    Presented { drawn: usize, skipped: usize },
    /// Another pass was in flight; this tick was dropped.
    Busy,
    /// The engine is disabled.
    Disabled,
    /// No face in the frame; previous output left untouched.
    NoFace,
    /// The engine was disabled while the pass was running; nothing presented.
    Discarded,
    /// The frame could not be aligned; previous output left untouched.
    Skipped,
}

struct PassGuard<'a> {
    engine: &'a WarpEngine,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.engine.state.set(TickState::Idle);
        self.engine.in_flight.set(false);
    }
}

pub struct WarpEngine {
    config: EngineConfig,
    reference: LandmarkSet,
    reference_size: (f32, f32),
    triangulation: Triangulation,
    reference_alignment: AlignmentInfo,
    in_flight: Cell<bool>,
    state: Cell<TickState>,
    enabled: Cell<bool>,
}

impl WarpEngine {
    /// Build an engine from reference landmarks, triangulating them.
    ///
    /// `reference_size` is the width and height of the reference image.
    pub fn from_reference(
        config: EngineConfig,
        reference: LandmarkSet,
        reference_size: (u32, u32),
    ) -> Result<Self> {
        if reference.is_empty() {
            return Err(Error::Setup("reference face has no landmarks".into()));
        }
        let triangulation = triangulate(&reference.points);
        Self::with_triangulation(config, reference, triangulation, reference_size)
    }

    /// Build an engine with a fixed triangulation, such as a face mesh's
    /// published index list.
    pub fn with_triangulation(
        config: EngineConfig,
        reference: LandmarkSet,
        triangulation: Triangulation,
        reference_size: (u32, u32),
    ) -> Result<Self> {
        if reference.is_empty() {
            return Err(Error::Setup("reference face has no landmarks".into()));
        }
        if reference.len() != config.model.cardinality() {
            warn!(
                expected = config.model.cardinality(),
                actual = reference.len(),
                "reference landmark count differs from the configured model"
            );
        }
        triangulation
            .check_compatible(&reference)
            .map_err(|e| Error::Setup(e.to_string()))?;
        if triangulation.is_empty() {
            return Err(Error::Setup(
                "reference landmarks are degenerate, no triangles".into(),
            ));
        }

        let reference_alignment = alignment_for(&config, &reference)
            .and_then(|info| {
                if info.distance.is_nan() || info.distance <= config.epsilon {
                    Err(Error::DegenerateReference {
                        distance: info.distance,
                    })
                } else {
                    Ok(info)
                }
            })
            .map_err(|e| Error::Setup(format!("reference eye pair unusable: {}", e)))?;

        info!(
            landmarks = reference.len(),
            triangles = triangulation.len(),
            "warp engine ready"
        );

        Ok(Self {
            config,
            reference,
            reference_size: (reference_size.0 as f32, reference_size.1 as f32),
            triangulation,
            reference_alignment,
            in_flight: Cell::new(false),
            state: Cell::new(TickState::Idle),
            enabled: Cell::new(true),
        })
    }

    /// Detect the reference face in `image` and build an engine from it.
    ///
    /// Fails with [`Error::Setup`] when no face is found.
    pub async fn setup<I, D>(config: EngineConfig, detector: &D, image: &I) -> Result<Self>
    where
        I: ImageAccess + ?Sized,
        D: LandmarkDetector<I>,
    {
        let reference = detector
            .detect(image)
            .await
            .ok_or(Error::MissingDetection)
            .map_err(|e| Error::Setup(format!("reference image: {}", e)))?;
        Self::from_reference(config, reference, (image.width(), image.height()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reference(&self) -> &LandmarkSet {
        &self.reference
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Reference eye alignment in reference image coordinates.
    pub fn reference_alignment(&self) -> &AlignmentInfo {
        &self.reference_alignment
    }

    pub fn state(&self) -> TickState {
        self.state.get()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Disabling stops new ticks and makes an in-flight pass discard its
    /// output instead of presenting it.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Per-triangle transforms taking `live` image content onto the
    /// reference face.
    pub fn warp_plan(&self, live: &LandmarkSet) -> Result<WarpPlan> {
        plan_warps(&self.triangulation, live, &self.reference, self.config.epsilon)
    }

    /// Similarity from the reference face to the live face, both measured in
    /// frame-centered coordinates of their own images.
    pub fn align(&self, live: &LandmarkSet, live_size: (f32, f32)) -> Result<SimilarityTransform> {
        let reference = self.centered_reference();
        let live = alignment_for(&self.config, live)?.centered(live_size.0, live_size.1);
        compute_similarity_with_epsilon(&reference, &live, self.config.epsilon)
    }

    fn centered_reference(&self) -> AlignmentInfo {
        self.reference_alignment
            .centered(self.reference_size.0, self.reference_size.1)
    }

    fn begin_pass(&self) -> Option<PassGuard<'_>> {
        if self.in_flight.replace(true) {
            return None;
        }
        Some(PassGuard { engine: self })
    }

    async fn detect_live<I, D>(&self, detector: &D, frame: &I) -> Result<LandmarkSet>
    where
        I: ?Sized,
        D: LandmarkDetector<I>,
    {
        self.state.set(TickState::DetectingLandmarks);
        let live = detector.detect(frame).await.ok_or(Error::MissingDetection)?;
        self.triangulation.check_compatible(&live)?;
        Ok(live)
    }

    /// Run one 2D pass: detect the live face in `frame`, warp it triangle by
    /// triangle onto the reference, and draw onto `surface`.
    pub async fn tick<I, D, S>(&self, detector: &D, surface: &mut S, frame: &I) -> Result<TickOutcome>
    where
        I: ?Sized,
        D: LandmarkDetector<I>,
        S: Surface<I> + ?Sized,
    {
        if !self.enabled.get() {
            return Ok(TickOutcome::Disabled);
        }
        let Some(_pass) = self.begin_pass() else {
            debug!("pass already in flight, tick dropped");
            return Ok(TickOutcome::Busy);
        };

        let live = match self.detect_live(detector, frame).await {
            Ok(live) => live,
            Err(Error::MissingDetection) => {
                debug!("no face in frame, keeping previous output");
                return Ok(TickOutcome::NoFace);
            }
            Err(e) => return Err(e),
        };

        self.state.set(TickState::Warping);
        let plan = self.warp_plan(&live)?;

        if !self.enabled.get() {
            debug!("engine disabled during pass, output discarded");
            return Ok(TickOutcome::Discarded);
        }

        self.state.set(TickState::Presenting);
        let drawn = draw_warp_plan(surface, frame, &plan);
        debug!(drawn, skipped = plan.skipped, "frame presented");
        Ok(TickOutcome::Presented {
            drawn,
            skipped: plan.skipped,
        })
    }

    /// Run one 3D pass: detect the live face, align it onto the reference
    /// frame with a similarity transform, and upload the mesh buffers.
    ///
    /// UVs address `frame`, so the renderer textures the mesh with it.
    pub async fn tick_mesh<I, D, M>(&self, detector: &D, mesh: &mut M, frame: &I) -> Result<TickOutcome>
    where
        I: ImageAccess + ?Sized,
        D: LandmarkDetector<I>,
        M: MeshTarget + ?Sized,
    {
        if !self.enabled.get() {
            return Ok(TickOutcome::Disabled);
        }
        let Some(_pass) = self.begin_pass() else {
            debug!("pass already in flight, tick dropped");
            return Ok(TickOutcome::Busy);
        };

        let live = match self.detect_live(detector, frame).await {
            Ok(live) => live,
            Err(Error::MissingDetection) => {
                debug!("no face in frame, keeping previous mesh");
                return Ok(TickOutcome::NoFace);
            }
            Err(e) => return Err(e),
        };

        self.state.set(TickState::Warping);
        let size = (frame.width() as f32, frame.height() as f32);
        let to_live = match self.align(&live, size) {
            Ok(s) => s,
            Err(e) if e.is_local() => {
                warn!(error = %e, "live face cannot be aligned, frame skipped");
                return Ok(TickOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };
        if to_live.scale.is_nan() || to_live.scale <= self.config.epsilon {
            warn!(scale = to_live.scale, "live eye pair collapsed, frame skipped");
            return Ok(TickOutcome::Skipped);
        }

        let mut buffers = MeshBuffers::new(&self.triangulation);
        buffers.update_positions(&live, size, &to_live, &self.centered_reference())?;
        buffers.update_uvs(&live, size.0, size.1);

        if !self.enabled.get() {
            debug!("engine disabled during pass, output discarded");
            return Ok(TickOutcome::Discarded);
        }

        self.state.set(TickState::Presenting);
        buffers.upload(mesh);
        Ok(TickOutcome::Presented {
            drawn: self.triangulation.len(),
            skipped: 0,
        })
    }
}

fn alignment_for(config: &EngineConfig, landmarks: &LandmarkSet) -> Result<AlignmentInfo> {
    if config.eye_contours {
        if let Some((a, b)) = config.model.eye_contours() {
            return alignment_info_from_groups(landmarks, a, b);
        }
    }
    let (a, b) = config.eye_pair();
    alignment_info(landmarks, a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn square_engine() -> WarpEngine {
        let config = EngineConfig {
            eye_indices: Some((0, 1)),
            ..EngineConfig::default()
        };
        let reference = LandmarkSet::from_flat_2d(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0, 4.0, 6.0]);
        WarpEngine::from_reference(config, reference, (20, 20)).unwrap()
    }

    #[test]
    fn setup_rejects_empty_reference() {
        let err = WarpEngine::from_reference(EngineConfig::default(), LandmarkSet::default(), (1, 1));
        assert!(matches!(err, Err(Error::Setup(_))));
    }

    #[test]
    fn setup_rejects_collinear_reference() {
        let config = EngineConfig {
            eye_indices: Some((0, 1)),
            ..EngineConfig::default()
        };
        let reference: LandmarkSet = (0..5).map(|i| Point::new(i as f32, 0.0)).collect();
        assert!(matches!(
            WarpEngine::from_reference(config, reference, (10, 10)),
            Err(Error::Setup(_))
        ));
    }

    #[test]
    fn setup_rejects_coincident_eyes() {
        let config = EngineConfig {
            eye_indices: Some((1, 1)),
            ..EngineConfig::default()
        };
        let reference = LandmarkSet::from_flat_2d(&[0.0, 0.0, 10.0, 0.0, 0.0, 10.0]);
        assert!(matches!(
            WarpEngine::from_reference(config, reference, (10, 10)),
            Err(Error::Setup(_))
        ));
    }

    #[test]
    fn setup_rejects_eye_index_out_of_range() {
        let reference = LandmarkSet::from_flat_2d(&[0.0, 0.0, 10.0, 0.0, 0.0, 10.0]);
        assert!(matches!(
            WarpEngine::from_reference(EngineConfig::default(), reference, (10, 10)),
            Err(Error::Setup(_))
        ));
    }

    #[test]
    fn warp_plan_maps_live_onto_reference() {
        let engine = square_engine();
        let live = engine.reference().map(|p| p * 0.5 + Point::new(3.0, 3.0));
        let plan = engine.warp_plan(&live).unwrap();
        assert_eq!(plan.len(), engine.triangulation().len());
        for warp in &plan.warps {
            for (k, &i) in warp.indices.iter().enumerate() {
                let mapped = warp.transform.apply(live[i]);
                assert!((mapped.x - warp.destination[k].x).abs() < 1e-4);
                assert!((mapped.y - warp.destination[k].y).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn align_same_face_is_identity() {
        let engine = square_engine();
        let s = engine.align(&engine.reference().clone(), (20.0, 20.0)).unwrap();
        assert!((s.scale - 1.0).abs() < 1e-5);
        assert!(s.rotation.abs() < 1e-5);
    }

    /// A 68-point face: jittered grid, with each eye drawn as a hexagon of
    /// radius 3 around (35.5, 42.5) and (75.5, 42.5).
    fn dlib_face() -> LandmarkSet {
        let mut face: LandmarkSet = (0..68)
            .map(|i| {
                let jitter = (i % 5) as f32 * 0.17;
                Point::new((i % 10) as f32 * 11.0 + jitter, (i / 10) as f32 * 13.0 - jitter)
            })
            .collect();
        for (first, cx) in [(36, 35.5f32), (42, 75.5f32)] {
            for k in 0..6 {
                let theta = k as f32 * std::f32::consts::PI / 3.0;
                face[first + k] = Point::new(cx + 3.0 * theta.cos(), 42.5 + 3.0 * theta.sin());
            }
        }
        face
    }

    #[test]
    fn eye_contours_align_on_centroids() {
        let contours = EngineConfig {
            eye_contours: true,
            ..EngineConfig::default()
        };
        let engine = WarpEngine::from_reference(contours, dlib_face(), (100, 80)).unwrap();
        let info = engine.reference_alignment();
        assert!((info.distance - 40.0).abs() < 1e-3, "{}", info.distance);
        assert!((info.center.x - 55.5).abs() < 1e-3);
        assert!((info.center.y - 42.5).abs() < 1e-3);
        assert!(info.angle.abs() < 1e-4);

        // Eye corners 36 and 45 sit on opposite inner sides of the hexagons.
        let corners = WarpEngine::from_reference(EngineConfig::default(), dlib_face(), (100, 80)).unwrap();
        assert!((corners.reference_alignment().distance - 34.0).abs() < 1e-3);

        let live = dlib_face().map(|p| p * 2.0);
        let s = engine.align(&live, (200.0, 160.0)).unwrap();
        assert!((s.scale - 2.0).abs() < 1e-4);
        assert!(s.rotation.abs() < 1e-4);
    }

    #[test]
    fn starts_idle_and_enabled() {
        let engine = square_engine();
        assert_eq!(engine.state(), TickState::Idle);
        assert!(engine.is_enabled());
        assert!(!engine.is_busy());
        engine.set_enabled(false);
        assert!(!engine.is_enabled());
    }
}
