//! Grayscale frames as the warp pipeline reads and writes them.

/// Read access to an 8-bit grayscale frame.
pub trait ImageAccess {
    /// Intensity at `(x, y)`; pixels outside the frame read as black.
    fn get_pixel(&self, x: i32, y: i32) -> u8;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Row-major grayscale buffer, used both for camera frames and for the
/// canvas a [`crate::RasterSurface`] paints into.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(vec![0; (width * height) as usize], width, height)
    }

    /// Fill every pixel from `f(x, y)`.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(data, width, height)
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as u32 * self.width + x as u32) as usize)
    }

    /// Writes outside the frame are dropped.
    pub fn put_pixel(&mut self, x: i32, y: i32, value: u8) {
        if let Some(i) = self.offset(x, y) {
            self.data[i] = value;
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i32, y: i32) -> u8 {
        self.offset(x, y).map_or(0, |i| self.data[i])
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Intensity at a fractional position, blended from the four surrounding
/// pixels. Integer coordinates hit pixels exactly.
#[inline]
pub fn sample_bilinear<I: ImageAccess + ?Sized>(image: &I, x: f32, y: f32) -> f32 {
    let (x0, y0) = (x.floor(), y.floor());
    let (tx, ty) = (x - x0, y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);
    let at = |dx: i32, dy: i32| image.get_pixel(ix + dx, iy + dy) as f32;
    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

    lerp(lerp(at(0, 0), at(1, 0), tx), lerp(at(0, 1), at(1, 1), tx), ty)
}
