//! Canvas double that records draw calls instead of rasterising.

use super::{Canvas, Paint, Point};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawCall {
    Clear,
    SetScale(f32),
    ResetTransform,
    Circle { center: Point, radius: f32, paint: Paint },
    Polygon { vertices: usize, blur: f32, paint: Paint },
    Stroke { vertices: usize, width: f32, paint: Paint },
}

impl DrawCall {
    /// Fill and stroke calls, as opposed to state changes.
    pub(crate) fn is_paint(&self) -> bool {
        matches!(
            self,
            DrawCall::Circle { .. } | DrawCall::Polygon { .. } | DrawCall::Stroke { .. }
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingCanvas {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub(crate) fn paint_calls(&self) -> usize {
        self.calls.iter().filter(|c| c.is_paint()).count()
    }
}

impl Canvas for RecordingCanvas {
    fn physical_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn set_scale(&mut self, factor: f32) {
        self.calls.push(DrawCall::SetScale(factor));
    }

    fn reset_transform(&mut self) {
        self.calls.push(DrawCall::ResetTransform);
    }

    fn fill_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            paint: paint.clone(),
        });
    }

    fn fill_polygon(&mut self, points: &[Point], paint: &Paint, blur: f32) {
        self.calls.push(DrawCall::Polygon {
            vertices: points.len(),
            blur,
            paint: paint.clone(),
        });
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f32, paint: &Paint) {
        self.calls.push(DrawCall::Stroke {
            vertices: points.len(),
            width,
            paint: paint.clone(),
        });
    }
}
