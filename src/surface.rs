//! Drawing surfaces for the 2D warp path.
//!
//! Triangles are composited with the canvas idiom: clip to the destination
//! triangle, set the triangle's affine as the current transform, then draw
//! the whole source image. Only the content mapped into the clip survives,
//! so the transform is never used outside its own triangle.

use tracing::warn;

use crate::affine::AffineTransform;
use crate::geometry::{bounds, point_in_polygon};
use crate::image::{sample_bilinear, GrayImage, ImageAccess};
use crate::types::Point;
use crate::warp::WarpPlan;

/// A 2D drawing surface that draws images of type `I`.
pub trait Surface<I: ?Sized> {
    /// Push the current clip and transform.
    fn save(&mut self);

    /// Pop the clip and transform pushed by the matching `save`.
    fn restore(&mut self);

    /// Intersect the clip region with a closed polygon.
    fn clip_to_polygon(&mut self, polygon: &[Point]);

    /// Replace the current transform.
    fn set_transform(&mut self, transform: &AffineTransform);

    /// Draw `image` at the origin under the current transform and clip.
    fn draw_image(&mut self, image: &I);
}

/// Composite every triangle of `plan` with `source` onto `surface`.
///
/// Returns the number of triangles drawn.
pub fn draw_warp_plan<I, S>(surface: &mut S, source: &I, plan: &WarpPlan) -> usize
where
    I: ?Sized,
    S: Surface<I> + ?Sized,
{
    for warp in &plan.warps {
        surface.save();
        surface.clip_to_polygon(&warp.destination);
        surface.set_transform(&warp.transform);
        surface.draw_image(source);
        surface.restore();
    }
    plan.warps.len()
}

#[derive(Debug, Clone)]
struct DrawState {
    clips: Vec<Vec<Point>>,
    transform: AffineTransform,
}

/// Software surface over a grayscale canvas.
///
/// Clips are polygons in canvas coordinates; a pixel is painted when its
/// center lies inside every active clip.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    canvas: GrayImage,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl RasterSurface {
    pub fn new(canvas: GrayImage) -> Self {
        Self {
            canvas,
            state: DrawState {
                clips: Vec::new(),
                transform: AffineTransform::identity(),
            },
            stack: Vec::new(),
        }
    }

    pub fn canvas(&self) -> &GrayImage {
        &self.canvas
    }

    pub fn into_canvas(self) -> GrayImage {
        self.canvas
    }

    fn pixel_range(&self) -> (i32, i32, i32, i32) {
        let (w, h) = (self.canvas.width() as i32, self.canvas.height() as i32);
        let mut range = (0, 0, w, h);
        for clip in &self.state.clips {
            let Some((lo, hi)) = bounds(clip) else {
                return (0, 0, 0, 0);
            };
            range.0 = range.0.max(lo.x.floor() as i32);
            range.1 = range.1.max(lo.y.floor() as i32);
            range.2 = range.2.min(hi.x.ceil() as i32 + 1);
            range.3 = range.3.min(hi.y.ceil() as i32 + 1);
        }
        range
    }
}

impl<I: ImageAccess + ?Sized> Surface<I> for RasterSurface {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn clip_to_polygon(&mut self, polygon: &[Point]) {
        self.state.clips.push(polygon.to_vec());
    }

    fn set_transform(&mut self, transform: &AffineTransform) {
        self.state.transform = *transform;
    }

    fn draw_image(&mut self, image: &I) {
        let inverse = match self.state.transform.inverse() {
            Ok(inv) => inv,
            Err(e) => {
                warn!(error = %e, "cannot draw under a singular transform");
                return;
            }
        };

        let (src_w, src_h) = (image.width() as f32, image.height() as f32);
        let (x0, y0, x1, y1) = self.pixel_range();
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if !self
                    .state
                    .clips
                    .iter()
                    .all(|clip| point_in_polygon(center, clip))
                {
                    continue;
                }
                let src = inverse.apply(center);
                if src.x < 0.0 || src.y < 0.0 || src.x >= src_w || src.y >= src_h {
                    continue;
                }
                let value = sample_bilinear(image, src.x - 0.5, src.y - 0.5);
                self.canvas
                    .put_pixel(x, y, value.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
}
