//! Drawing surface: logical/physical sizing, the [`Canvas`] drawing
//! interface, and a software rasteriser implementing it.
//!
//! All drawing coordinates are logical. A canvas maps them to physical
//! pixels through its current scale, which the compositor sets to the
//! device pixel ratio at the start of a frame and resets at the end.

use crate::palette::Rgba;

mod raster;
#[cfg(test)]
pub(crate) mod recording;

pub use raster::PixelCanvas;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Requested logical size plus device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub logical_width: f32,
    pub logical_height: f32,
    pub device_pixel_ratio: f32,
}

impl SurfaceSize {
    pub fn new(logical_width: f32, logical_height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            logical_width,
            logical_height,
            device_pixel_ratio,
        }
    }

    pub fn square(size: f32, device_pixel_ratio: f32) -> Self {
        Self::new(size, size, device_pixel_ratio)
    }

    /// Whether anything beyond a clear should be painted at this size.
    pub fn is_drawable(&self) -> bool {
        self.logical_width.is_finite()
            && self.logical_height.is_finite()
            && self.logical_width > 0.0
            && self.logical_height > 0.0
            && self.device_pixel_ratio.is_finite()
            && self.device_pixel_ratio > 0.0
    }

    /// Backing buffer dimensions; `(0, 0)` when the size is not drawable.
    pub fn physical(&self) -> (u32, u32) {
        if !self.is_drawable() {
            return (0, 0);
        }
        (
            (self.logical_width * self.device_pixel_ratio).ceil() as u32,
            (self.logical_height * self.device_pixel_ratio).ceil() as u32,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.logical_width * 0.5, self.logical_height * 0.5)
    }

    pub fn min_dimension(&self) -> f32 {
        self.logical_width.min(self.logical_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

/// Radial gradient from `center` (offset 0) out to `radius` (offset 1).
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub center: Point,
    pub radius: f32,
    stops: Vec<GradientStop>,
}

impl RadialGradient {
    pub fn new(center: Point, radius: f32) -> Self {
        Self {
            center,
            radius,
            stops: Vec::new(),
        }
    }

    /// Adds a colour stop. Stops must be added in increasing offset order.
    pub fn stop(mut self, offset: f32, color: Rgba) -> Self {
        self.stops.push(GradientStop {
            offset: offset.clamp(0.0, 1.0),
            color,
        });
        self
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn color_at(&self, point: Point) -> Rgba {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Rgba::TRANSPARENT,
        };

        let t = if self.radius > 0.0 {
            point.distance(self.center) / self.radius
        } else {
            1.0
        };

        if t <= first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }

        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                let local = if span > f32::EPSILON {
                    (t - a.offset) / span
                } else {
                    1.0
                };
                return a.color.lerp(b.color, local);
            }
        }

        last.color
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    Radial(RadialGradient),
}

impl Paint {
    pub fn color_at(&self, point: Point) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::Radial(gradient) => gradient.color_at(point),
        }
    }
}

/// Minimal 2D drawing interface the compositor paints through.
pub trait Canvas {
    /// Backing buffer dimensions in physical pixels.
    fn physical_size(&self) -> (u32, u32);

    /// Reallocates the backing buffer. Contents are discarded.
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    /// Logical-to-physical scale applied to every subsequent draw call.
    fn set_scale(&mut self, factor: f32);

    fn reset_transform(&mut self);

    fn fill_circle(&mut self, center: Point, radius: f32, paint: &Paint);

    /// Fills a closed polygon, optionally blurred by `blur` logical pixels.
    fn fill_polygon(&mut self, points: &[Point], paint: &Paint, blur: f32);

    /// Strokes an open polyline with round caps and joins.
    fn stroke_polyline(&mut self, points: &[Point], width: f32, paint: &Paint);
}
